use crate::config::Config;
use crate::domain::UserRole;
use crate::services::UserError;
use crate::state::SharedState;

pub async fn cmd_promote(config: Config, email: &str, role: UserRole) -> anyhow::Result<()> {
    let shared = SharedState::new(config).await?;

    match shared.user_service.set_role(email, role).await {
        Ok(()) => {
            println!("✓ {email} is now {role}");
            Ok(())
        }
        Err(UserError::NotFound(_)) => {
            println!("No user registered with email {email}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
