//! Tick aggregation for high-frequency work
//!
//! An [`Event`] counts ticks and errors locally and reports them as one
//! metrics ping per interval. The timer starts as soon as the event is
//! created and runs until [`Event::stop`] or [`Event::fail`].
//!
//! ```no_run
//! # async fn demo(client: cronitor::Cronitor) -> cronitor::Result<()> {
//! use cronitor::EventOptions;
//!
//! let event = client.event("queue-worker", EventOptions::with_interval(30))?;
//! for _ in 0..100 {
//!     event.tick();
//! }
//! event.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::client::Cronitor;
use crate::error::{CronitorError, Outcome, Result};
use crate::monitor::{Monitor, PingParams, State};

pub const DEFAULT_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOptions {
    /// Seconds between automatic flushes; values below 1 are raised to 1
    pub interval_seconds: u64,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

impl EventOptions {
    pub fn with_interval(interval_seconds: u64) -> Self {
        Self { interval_seconds }
    }
}

/// Ticks and errors recorded since the last flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub ticks: u64,
    pub errors: u64,
}

struct EventState {
    monitor: Monitor,
    interval_seconds: u64,
    counts: Mutex<Counts>,
}

impl EventState {
    fn counts(&self) -> std::sync::MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot and reset both counters in one step
    fn take_counts(&self) -> Counts {
        std::mem::take(&mut *self.counts())
    }

    async fn report(&self, counts: Counts) -> Outcome {
        debug!(
            monitor = %self.monitor.key(),
            count = counts.ticks,
            error_count = counts.errors,
            "Flushing event counts"
        );

        // duration is the configured interval, not the measured gap
        let params = PingParams::new()
            .metric("count", counts.ticks)
            .metric("error_count", counts.errors)
            .metric("duration", self.interval_seconds);

        self.monitor.ping(params).await
    }
}

/// A running tick aggregator that owns its monitor and its timer
pub struct Event {
    state: Arc<EventState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Event {
    /// Create the event and start its flush timer.
    ///
    /// Must be called from within a Tokio runtime. Fails before any timer
    /// exists when `key` is empty or no runtime is available.
    pub fn new(client: &Cronitor, key: &str, options: EventOptions) -> Result<Self> {
        if key.is_empty() {
            return Err(CronitorError::InvalidMonitor(
                "You must initialize Event with a key.".to_string(),
            ));
        }

        let runtime = Handle::try_current().map_err(|e| CronitorError::Runtime(e.to_string()))?;

        let interval_seconds = options.interval_seconds.max(1);
        let state = Arc::new(EventState {
            monitor: Monitor::new(client, key)?,
            interval_seconds,
            counts: Mutex::new(Counts::default()),
        });

        let period = Duration::from_secs(interval_seconds);
        let timer = runtime.spawn(run_timer(state.clone(), Instant::now() + period, period));

        info!(monitor = %key, interval_seconds, "Event started");

        Ok(Self {
            state,
            timer: Mutex::new(Some(timer)),
        })
    }

    pub fn key(&self) -> &str {
        self.state.monitor.key()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.state.interval_seconds)
    }

    /// Whether the flush timer is still live
    pub fn is_running(&self) -> bool {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Counts accumulated since the last flush
    pub fn pending(&self) -> Counts {
        *self.state.counts()
    }

    /// Record one unit of work
    pub fn tick(&self) {
        self.tick_by(1);
    }

    /// Record `count` units of work
    pub fn tick_by(&self, count: u64) {
        let mut counts = self.state.counts();
        counts.ticks = counts.ticks.saturating_add(count);
    }

    /// Record one error
    pub fn error(&self) {
        let mut counts = self.state.counts();
        counts.errors = counts.errors.saturating_add(1);
    }

    /// Record an error. The error count grows by one per call whatever
    /// `count` is; existing callers depend on call-count semantics.
    pub fn error_by(&self, count: u64) {
        let _ = count;
        self.error();
    }

    /// Cancel the timer and flush whatever has not been reported.
    ///
    /// Safe to call repeatedly; later calls flush zero counts.
    pub async fn stop(&self) -> Outcome {
        self.cancel_timer();
        self.flush().await
    }

    /// Stop the event, then report a `fail` state with `message`
    pub async fn fail(&self, message: Option<&str>) -> Outcome {
        self.stop().await;

        let mut params = PingParams::new().state(State::Fail);
        if let Some(message) = message {
            params = params.message(message);
        }
        self.state.monitor.ping(params).await
    }

    async fn flush(&self) -> Outcome {
        let counts = self.state.take_counts();
        self.state.report(counts).await
    }

    fn cancel_timer(&self) {
        let timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(timer) = timer {
            timer.abort();
            info!(monitor = %self.key(), "Event stopped");
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(timer) = timer {
            timer.abort();
            debug!(monitor = %self.state.monitor.key(), "Event dropped while running; timer cancelled");
        }
    }
}

/// Flush on every period. Each report runs as its own task so a slow
/// request never delays the next flush.
async fn run_timer(state: Arc<EventState>, start: Instant, period: Duration) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let counts = state.take_counts();
        let state = state.clone();
        tokio::spawn(async move {
            state.report(counts).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn client() -> Cronitor {
        Cronitor::new(ClientConfig::new("abc123")).unwrap()
    }

    #[test]
    fn test_default_options() {
        assert_eq!(EventOptions::default().interval_seconds, 60);
    }

    #[test]
    fn test_requires_runtime() {
        let result = Event::new(&client(), "job-1", EventOptions::default());
        assert!(matches!(result, Err(CronitorError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_requires_key() {
        let result = Event::new(&client(), "", EventOptions::default());
        assert!(matches!(result, Err(CronitorError::InvalidMonitor(_))));
    }

    #[tokio::test]
    async fn test_whitespace_key_is_a_key() {
        let event = Event::new(&client(), " ", EventOptions::default()).unwrap();
        assert_eq!(event.key(), " ");
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let event = Event::new(&client(), "job-1", EventOptions::with_interval(0)).unwrap();
        assert_eq!(event.interval(), Duration::from_secs(1));
        assert!(event.is_running());
    }

    #[tokio::test]
    async fn test_counters_accumulate() {
        let event = Event::new(&client(), "job-1", EventOptions::default()).unwrap();
        event.tick();
        event.tick_by(4);
        event.tick_by(0);
        event.error();
        event.error_by(5);

        assert_eq!(event.pending(), Counts { ticks: 5, errors: 2 });
        assert_eq!(event.state.take_counts(), Counts { ticks: 5, errors: 2 });
        assert_eq!(event.pending(), Counts::default());
    }
}
