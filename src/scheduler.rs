use anyhow::Result;
use tokio::sync::mpsc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::triggers::Trigger;

pub struct SchedulerConfig {
    pub cron_expression: String,
}

impl SchedulerConfig {
    pub fn new(cron: String) -> Self {
        Self { cron_expression: cron }
    }
}

/// Start a cron job that sends [`Trigger::Scheduled`] into `requests`.
/// The returned scheduler must be kept alive and shut down by the caller.
pub async fn start_scheduler(config: SchedulerConfig, requests: mpsc::Sender<Trigger>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    info!("⏰ Scheduler initialized with cron: {}", config.cron_expression);

    let job = Job::new_async(config.cron_expression.as_str(), move |_uuid, _l| {
        let requests = requests.clone();
        Box::pin(async move {
            info!("🔄 Scheduled sort triggered");
            if let Err(e) = requests.send(Trigger::Scheduled).await {
                warn!("⚠️  Trigger layer stopped, dropping scheduled sort: {}", e);
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_cron_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let result = start_scheduler(SchedulerConfig::new("not a cron".to_string()), tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_valid_cron_starts() {
        let (tx, _rx) = mpsc::channel(1);
        let mut scheduler = start_scheduler(SchedulerConfig::new("0 */30 * * * *".to_string()), tx)
            .await
            .unwrap();
        scheduler.shutdown().await.unwrap();
    }
}
