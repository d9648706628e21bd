use crate::error::{self, Result};
use crate::lambda::{InstanceApi, InstanceStatus};
use log::info;
use snafu::ensure;
use std::thread;
use std::time::{Duration, Instant};

/// How long to sleep between status checks while the instance is booting.
const POLL_INTERVAL_SECONDS: u64 = 5;

/// Time source and sleeper, separated from the wait loop so tests can run it without real waits.
pub(crate) trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time with a blocking sleep.
pub(crate) struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Polls the instance API until an instance leaves the transient `booting` status.
pub(crate) struct BootWaiter<'a> {
    api: &'a dyn InstanceApi,
    clock: &'a dyn Clock,
    poll_interval: Duration,
    timeout: Duration,
}

impl<'a> BootWaiter<'a> {
    pub(crate) fn new(api: &'a dyn InstanceApi, clock: &'a dyn Clock, timeout: Duration) -> Self {
        Self {
            api,
            clock,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECONDS),
            timeout,
        }
    }

    /// Blocks until the instance stops reporting `booting`, then returns how long that took.
    /// Gives up once the deadline passes; the instance is left running either way. An instance
    /// that settles on `unhealthy` is an error.
    pub(crate) fn wait(&self, instance_id: &str) -> Result<Duration> {
        let start = self.clock.now();
        let mut status = self.api.instance_status(instance_id)?;
        info!("Instance {} status is {}", instance_id, status);
        while status == InstanceStatus::Booting {
            ensure!(
                self.clock.now().duration_since(start) <= self.timeout,
                error::BootTimeoutSnafu {
                    instance_id,
                    seconds: self.timeout.as_secs(),
                }
            );
            self.clock.sleep(self.poll_interval);
            status = self.api.instance_status(instance_id)?;
            info!(
                "Instance {} status is {} ... waiting.",
                instance_id, status
            );
        }
        ensure!(
            status != InstanceStatus::Unhealthy,
            error::UnhealthySnafu { instance_id }
        );
        Ok(self.clock.now().duration_since(start))
    }
}
