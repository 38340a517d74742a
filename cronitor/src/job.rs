//! Wrapping jobs with run/complete/fail telemetry

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::warn;

use crate::client::Cronitor;
use crate::error::CronitorError;
use crate::monitor::{PingParams, State};

/// Longest message sent with a `fail` or `complete` ping
pub const MAX_MESSAGE_CHARS: usize = 1600;

/// Error of a wrapped job
#[derive(Error, Debug)]
pub enum JobError<E> {
    /// The job could not be monitored (e.g. an empty key); it did not run
    #[error("Monitor error: {0}")]
    Monitor(#[source] CronitorError),

    /// The job itself failed
    #[error("Job failed: {0}")]
    Job(E),
}

impl<E> JobError<E> {
    pub fn into_job_error(self) -> Option<E> {
        match self {
            JobError::Job(e) => Some(e),
            JobError::Monitor(_) => None,
        }
    }
}

/// Keep the tail of a message, at most `MAX_MESSAGE_CHARS` characters
fn tail(message: &str) -> &str {
    let count = message.chars().count();
    if count <= MAX_MESSAGE_CHARS {
        return message;
    }
    let skip = count - MAX_MESSAGE_CHARS;
    match message.char_indices().nth(skip) {
        Some((offset, _)) => &message[offset..],
        None => message,
    }
}

impl Cronitor {
    /// Run `job` under monitor `key`.
    ///
    /// Sends `run` before the job and `complete` or `fail` after it, all
    /// three sharing one series. Ping failures never affect the job.
    pub async fn run_job<F, Fut, T, E>(&self, key: &str, job: F) -> Result<T, JobError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run_monitored(key, job, |_| None).await
    }

    /// Like [`Cronitor::run_job`], but the job's textual output is sent as
    /// the `complete` ping's message, truncated to its last
    /// `MAX_MESSAGE_CHARS` characters.
    pub async fn run_job_with_output<F, Fut, T, E>(
        &self,
        key: &str,
        job: F,
    ) -> Result<T, JobError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: AsRef<str>,
        E: fmt::Display,
    {
        self.run_monitored(key, job, |output| Some(tail(output.as_ref()).to_string()))
            .await
    }

    async fn run_monitored<F, Fut, T, E, M>(
        &self,
        key: &str,
        job: F,
        complete_message: M,
    ) -> Result<T, JobError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        M: FnOnce(&T) -> Option<String>,
    {
        let monitor = self.monitor(key).map_err(JobError::Monitor)?;
        let series = self.new_series();

        monitor.ping(PingParams::new().state(State::Run).series(series.as_str())).await;

        match job().await {
            Ok(output) => {
                let mut params = PingParams::new().state(State::Complete).series(series.as_str());
                if let Some(message) = complete_message(&output) {
                    params = params.message(message);
                }
                monitor.ping(params).await;
                Ok(output)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(monitor = %key, series = %series, "Job failed: {}", message);
                monitor
                    .ping(
                        PingParams::new()
                            .state(State::Fail)
                            .message(tail(&message))
                            .series(series.as_str()),
                    )
                    .await;
                Err(JobError::Job(e))
            }
        }
    }
}
