pub mod jwt;
pub use jwt::{AccessToken, Claims, JwtService};

pub mod token_service;
pub mod token_service_impl;
pub use token_service::{RefreshTokenService, TokenError};
pub use token_service_impl::SeaOrmRefreshTokenService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthSession};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{PageMeta, UserError, UserPage, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod profile_service;
pub mod profile_service_impl;
pub use profile_service::{Actor, ProfileError, ProfileInput, ProfileService};
pub use profile_service_impl::SeaOrmProfileService;

pub mod image;
pub use image::{ImageError, ImageStorageService};

pub mod scheduler;
pub use scheduler::Scheduler;
