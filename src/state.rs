use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ImageStorageService, JwtService, ProfileService, RefreshTokenService,
    SeaOrmAuthService, SeaOrmProfileService, SeaOrmRefreshTokenService, SeaOrmUserService,
    UserService,
};

/// Services shared by the HTTP server, the scheduler and CLI commands.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub jwt: Arc<JwtService>,

    pub token_service: Arc<dyn RefreshTokenService>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub profile_service: Arc<dyn ProfileService>,

    pub image_service: Arc<ImageStorageService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let jwt = Arc::new(JwtService::new(&config.auth));

        let token_service = Arc::new(SeaOrmRefreshTokenService::new(store.clone(), &config.auth))
            as Arc<dyn RefreshTokenService + Send + Sync + 'static>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            jwt.clone(),
            token_service.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn UserService + Send + Sync + 'static>;

        let profile_service = Arc::new(SeaOrmProfileService::new(
            store.clone(),
            config.uploads.default_profile_image.clone(),
        )) as Arc<dyn ProfileService + Send + Sync + 'static>;

        let image_service = Arc::new(ImageStorageService::new(&config.uploads));

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            jwt,
            token_service,
            auth_service,
            user_service,
            profile_service,
            image_service,
        }
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
