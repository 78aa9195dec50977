use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::token_service::RefreshTokenService;

pub struct Scheduler {
    tokens: Arc<dyn RefreshTokenService>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
    shutdown: Notify,
}

impl Scheduler {
    pub fn new(tokens: Arc<dyn RefreshTokenService>, config: SchedulerConfig) -> Self {
        Self {
            tokens,
            config,
            running: Arc::new(RwLock::new(false)),
            shutdown: Notify::new(),
        }
    }

    /// Runs the cron jobs until [`Scheduler::stop`] is called.
    ///
    /// A `stop` that lands before `start` still ends it.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let tokens = Arc::clone(&self.tokens);
        let running = Arc::clone(&self.running);
        let cleanup_job = Job::new_async(self.config.token_cleanup_cron.as_str(), move |_uuid, _lock| {
            let tokens = Arc::clone(&tokens);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                prune_expired_tokens(tokens.as_ref()).await;
            })
        })?;

        sched.add(cleanup_job).await?;
        sched.start().await?;

        info!(
            "Token cleanup scheduled: {}",
            self.config.token_cleanup_cron
        );

        self.shutdown.notified().await;

        *self.running.write().await = false;
        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
        // Stores a permit when `start` is not waiting yet
        self.shutdown.notify_one();
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Prunes expired tokens immediately. Returns the number removed.
    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual token cleanup...");
        Ok(self.tokens.clear_expired().await?)
    }
}

async fn prune_expired_tokens(tokens: &dyn RefreshTokenService) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "prune_tokens", "Starting scheduled token cleanup");

    match tokens.clear_expired().await {
        Ok(removed) => info!(
            event = "job_finished",
            job_name = "prune_tokens",
            removed,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled token cleanup finished"
        ),
        Err(e) => {
            error!(event = "job_failed", job_name = "prune_tokens", error = %e, "Scheduled token cleanup failed");
        }
    }
}
