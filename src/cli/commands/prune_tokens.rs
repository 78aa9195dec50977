use std::sync::Arc;

use crate::config::Config;
use crate::services::Scheduler;
use crate::state::SharedState;

pub async fn cmd_prune_tokens(config: Config) -> anyhow::Result<()> {
    let scheduler_config = config.scheduler.clone();
    let shared = SharedState::new(config).await?;

    let scheduler = Scheduler::new(Arc::clone(&shared.token_service), scheduler_config);
    let removed = scheduler.run_once().await?;

    println!("✓ Removed {removed} expired refresh token(s)");
    Ok(())
}
