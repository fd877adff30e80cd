//! Idle-time scheduling port
//!
//! Deferred loading waits for the host to report spare capacity. Two
//! implementations exist: one driven by the render loop with a timeout
//! fallback, and one that simply sleeps for fixed delays.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;
use turntable_core::{IdleStrategy, SchedulingConfig};

/// The points in the staged load that wait for idle time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSlot {
    /// Before the environment map is fetched
    Environment,
    /// Before the first background model
    FirstBackground,
    /// Between consecutive background models
    BetweenLoads,
}

#[async_trait]
pub trait IdleScheduler: Send + Sync {
    /// Resolve once the host is idle, or when the slot's budget runs out
    async fn wait(&self, slot: IdleSlot);
}

/// Lets the render loop report spare frame time to a [`HostIdleScheduler`]
#[derive(Debug, Clone)]
pub struct IdleHandle {
    signal: Arc<Notify>,
}

impl IdleHandle {
    /// Wake every task currently waiting for idle time
    pub fn report_idle(&self) {
        self.signal.notify_waiters();
    }
}

/// Waits for an idle report from the host, with a per-slot timeout
#[derive(Debug)]
pub struct HostIdleScheduler {
    signal: Arc<Notify>,
    environment_timeout: Duration,
    first_background_timeout: Duration,
    between_loads_timeout: Duration,
}

impl HostIdleScheduler {
    pub fn new(config: &SchedulingConfig) -> (Self, IdleHandle) {
        let signal = Arc::new(Notify::new());
        let scheduler = Self {
            signal: signal.clone(),
            environment_timeout: Duration::from_millis(config.environment_timeout_ms),
            first_background_timeout: Duration::from_millis(config.first_background_timeout_ms),
            between_loads_timeout: Duration::from_millis(config.between_loads_timeout_ms),
        };
        (scheduler, IdleHandle { signal })
    }

    fn timeout(&self, slot: IdleSlot) -> Duration {
        match slot {
            IdleSlot::Environment => self.environment_timeout,
            IdleSlot::FirstBackground => self.first_background_timeout,
            IdleSlot::BetweenLoads => self.between_loads_timeout,
        }
    }
}

#[async_trait]
impl IdleScheduler for HostIdleScheduler {
    async fn wait(&self, slot: IdleSlot) {
        let timeout = self.timeout(slot);
        match tokio::time::timeout(timeout, self.signal.notified()).await {
            Ok(()) => debug!(?slot, "host reported idle"),
            Err(_) => debug!(?slot, ?timeout, "idle wait timed out"),
        }
    }
}

/// Fixed-delay fallback for hosts that never report idle time
#[derive(Debug, Clone)]
pub struct TimerIdleScheduler {
    environment_delay: Duration,
    first_background_delay: Duration,
    between_loads_delay: Duration,
}

impl TimerIdleScheduler {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            environment_delay: Duration::from_millis(config.environment_delay_ms),
            first_background_delay: Duration::from_millis(config.first_background_delay_ms),
            between_loads_delay: Duration::from_millis(config.between_loads_delay_ms),
        }
    }
}

#[async_trait]
impl IdleScheduler for TimerIdleScheduler {
    async fn wait(&self, slot: IdleSlot) {
        let delay = match slot {
            IdleSlot::Environment => self.environment_delay,
            IdleSlot::FirstBackground => self.first_background_delay,
            IdleSlot::BetweenLoads => self.between_loads_delay,
        };
        debug!(?slot, ?delay, "deferring on timer");
        tokio::time::sleep(delay).await;
    }
}

/// Build the scheduler selected in the config. The handle is present only for
/// the host strategy and must be fed by the render loop.
pub fn scheduler_for(config: &SchedulingConfig) -> (Arc<dyn IdleScheduler>, Option<IdleHandle>) {
    match config.idle_strategy {
        IdleStrategy::Host => {
            let (scheduler, handle) = HostIdleScheduler::new(config);
            (Arc::new(scheduler), Some(handle))
        }
        IdleStrategy::Timer => (Arc::new(TimerIdleScheduler::new(config)), None),
    }
}
