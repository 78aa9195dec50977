//! Domain types for accounts.
//!
//! [`UserRole`] is shared between the ORM layer and the API.

pub mod password;
pub mod validation;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use password::PasswordStrength;
pub use validation::FieldErrors;

/// Account role. Stored as an integer column, exposed as its lowercase label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    #[sea_orm(num_value = 0)]
    User,
    #[sea_orm(num_value = 1)]
    Moderator,
    #[sea_orm(num_value = 2)]
    Admin,
}

impl UserRole {
    /// Moderators and admins may act on content owned by other users.
    #[must_use]
    pub const fn can_moderate(&self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(format!(
                "Unknown role '{other}', expected one of: user, moderator, admin"
            )),
        }
    }
}
