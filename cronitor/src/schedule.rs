//! Cron scheduling of monitored jobs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;
use uuid::Uuid;

use crate::client::Cronitor;
use crate::error::{CronitorError, Result};

/// Runs jobs on cron schedules, each wrapped with [`Cronitor::run_job`]
pub struct Scheduler {
    client: Cronitor,
    scheduler: JobScheduler,
}

impl Scheduler {
    pub async fn new(client: Cronitor) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| CronitorError::Scheduler(format!("{:?}", e)))?;

        Ok(Self { client, scheduler })
    }

    /// Register `job` under monitor `key`. `cron_expr` uses the
    /// seconds-first six field syntax, e.g. `"0 */5 * * * *"`.
    pub async fn schedule<F, Fut, E>(&self, key: &str, cron_expr: &str, job: F) -> Result<Uuid>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        // fail now rather than on every run
        self.client.monitor(key)?;

        let client = self.client.clone();
        let key = key.to_string();
        let job = Arc::new(job);

        let scheduled_key = key.clone();
        let scheduled = Job::new_async(cron_expr, move |_uuid, _l| {
            let client = client.clone();
            let key = scheduled_key.clone();
            let job = job.clone();

            Box::pin(async move {
                let _ = client.run_job(&key, move || (*job)()).await;
            })
        })
        .map_err(|e| CronitorError::Scheduler(format!("Invalid schedule '{}': {:?}", cron_expr, e)))?;

        let id = self
            .scheduler
            .add(scheduled)
            .await
            .map_err(|e| CronitorError::Scheduler(format!("{:?}", e)))?;

        info!(monitor = %key, schedule = %cron_expr, "Scheduled job");
        Ok(id)
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| CronitorError::Scheduler(format!("{:?}", e)))
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| CronitorError::Scheduler(format!("{:?}", e)))
    }
}
