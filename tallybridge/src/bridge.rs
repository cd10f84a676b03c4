use crate::{
    liveness::{LivenessEvent, LivenessState, LivenessTracker},
    protocol::{ProgramSnapshot, TallyStateBuffer},
    source::ProgramSource,
    transport::TallyBroadcaster,
    Error, Result,
};
use futures::{pin_mut, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

/// Timing of the bridge loop.
///
/// The fetch timeout must be shorter than the interval, so that an unresponsive
/// switcher doesn't slow down the broadcast cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Time between the start of each cycle.
    pub interval: Duration,
    /// Maximum time to wait for the switcher on each cycle.
    pub fetch_timeout: Duration,
}

impl BridgeConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(200);

    /// Creates a validated bridge configuration.
    ///
    /// ## Errors
    ///
    /// * [`Error::ParameterOutOfRange`] if either duration is zero, or
    ///   `fetch_timeout` isn't shorter than `interval`
    pub fn new(interval: Duration, fetch_timeout: Duration) -> Result<Self> {
        let config = Self {
            interval,
            fetch_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the loop timing is usable.
    pub fn validate(&self) -> Result {
        if self.interval.is_zero() {
            error!("bridge interval must be greater than zero");
            return Err(Error::ParameterOutOfRange);
        }
        if self.fetch_timeout.is_zero() || self.fetch_timeout >= self.interval {
            error!(
                "fetch timeout {:?} must be greater than zero, and shorter than the {:?} interval",
                self.fetch_timeout, self.interval
            );
            return Err(Error::ParameterOutOfRange);
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Polls a switcher, and broadcasts its tally state on a fixed cadence.
///
/// Each cycle:
///
/// 1. [fetches][ProgramSource::fetch] the switcher's current shots, giving up
///    after [`fetch_timeout`][BridgeConfig::fetch_timeout]
/// 2. logs if the switcher became reachable or unreachable
/// 3. [rebuilds][TallyStateBuffer::rebuild] the tally state from scratch
/// 4. broadcasts the tally state
///
/// A failed fetch or send only affects its own cycle: the next cycle starts
/// from scratch.
pub struct TallyBridge<S> {
    source: S,
    broadcaster: TallyBroadcaster,
    liveness: LivenessTracker,
    config: BridgeConfig,
    /// Set while broadcasts are failing, so that only the first failure is
    /// logged.
    send_failing: bool,
}

impl<S: ProgramSource> TallyBridge<S> {
    /// Creates a bridge from `source` to `broadcaster`.
    ///
    /// ## Errors
    ///
    /// * [`Error::ParameterOutOfRange`] if `config` is
    ///   [invalid][BridgeConfig::validate]
    pub fn new(source: S, broadcaster: TallyBroadcaster, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            broadcaster,
            liveness: LivenessTracker::new(),
            config,
            send_failing: false,
        })
    }

    #[inline]
    pub const fn liveness(&self) -> LivenessState {
        self.liveness.state()
    }

    #[inline]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn fetch(&mut self) -> Result<ProgramSnapshot> {
        timeout(self.config.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Runs a single cycle, returning the tally state which was broadcast.
    pub async fn run_cycle(&mut self) -> TallyStateBuffer {
        let (snapshot, liveness) = match self.fetch().await {
            Ok(snapshot) => (snapshot, true),
            Err(e) => {
                debug!("{} fetch failed: {e}", self.source.name());
                (ProgramSnapshot::default(), false)
            }
        };

        match self.liveness.observe(liveness) {
            Some(LivenessEvent::Opened) => info!("{}: open", self.source.name()),
            Some(LivenessEvent::Closed) => info!("{}: closed", self.source.name()),
            None => (),
        }

        let buffer = TallyStateBuffer::rebuild(&snapshot, liveness);
        self.broadcast(&buffer).await;
        buffer
    }

    async fn broadcast(&mut self, buffer: &TallyStateBuffer) {
        match self.broadcaster.send(buffer).await {
            Ok(()) => {
                if self.send_failing {
                    self.send_failing = false;
                    info!("tally broadcast recovered");
                }
            }

            Err(e) => {
                if self.send_failing {
                    debug!("tally broadcast failed: {e}");
                } else {
                    self.send_failing = true;
                    warn!("tally broadcast failed: {e}");
                }
            }
        }
    }

    /// Runs cycles every [`interval`][BridgeConfig::interval], forever.
    ///
    /// If a cycle takes longer than the interval, the next cycle starts
    /// immediately, and later cycles are delayed.
    pub async fn run(mut self) {
        let mut ticks = interval(self.config.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ticks = IntervalStream::new(ticks);
        pin_mut!(ticks);

        info!(
            "polling {} every {:?}, broadcasting to {}",
            self.source.name(),
            self.config.interval,
            self.broadcaster.destination()
        );

        while ticks.next().await.is_some() {
            let started = Instant::now();
            self.run_cycle().await;
            let elapsed = started.elapsed();
            if elapsed > self.config.interval {
                debug!(
                    "cycle took {elapsed:?}, longer than the {:?} interval",
                    self.config.interval
                );
            }
        }
    }
}
