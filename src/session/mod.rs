//! Drive session with statum state machine for the control loop
//!
//! Owns the steering controller, the smoothed angle and the sample source, and
//! runs one control cycle per frame tick.
//!
//! # State Machine
//!
//! ```text
//! Idle ──► Running ──► Stopped
//!             │           ▲
//!             └───────────┘
//!     (cancel / source exhausted)
//! ```
//!
//! Leaving `Running` always releases every key, including on source errors.

use crate::config::{ConfigError, DriveConfig};
use crate::keys::{KeySink, SinkError};
use crate::perception::{SampleSource, SourceError};
use crate::steering::{
    AngleSmoother, IndicatorColor, PedalArbiter, SteeringController,
};
use chrono::{DateTime, Local};
use statum::{machine, state};
use std::fmt::{self, Display};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

pub type BoxedSink = Box<dyn KeySink + Send>;
pub type BoxedSource = Box<dyn SampleSource + Send>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Display values of one cycle, in place of a rendered HUD
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub intensity: f64,
    pub label: String,
    pub color: IndicatorColor,
    /// `None` when no hands were seen
    pub pedal: Option<&'static str>,
}

impl CycleReport {
    pub fn no_signal() -> Self {
        Self {
            intensity: 0.0,
            label: "NO HANDS".to_string(),
            color: IndicatorColor::NO_SIGNAL,
            pedal: None,
        }
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.label, self.intensity)?;
        if let Some(pedal) = self.pedal {
            write!(f, " | Pedal: {}", pedal)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub cycles: u64,
    pub no_signal_cycles: u64,
    pub sink_errors: u64,
}

/// States for the drive session lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,    // Controller built, loop not started
    Running, // Control cycles in progress
    Stopped, // Keys released, loop finished
}

#[machine]
pub struct DriveSession<S: SessionState> {
    controller: SteeringController<BoxedSink>,
    source: BoxedSource,
    smoother: AngleSmoother,
    frame_interval: Duration,
    started_at: Option<DateTime<Local>>,
    stats: SessionStats,
}

impl<S: SessionState> DriveSession<S> {
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn controller(&self) -> &SteeringController<BoxedSink> {
        &self.controller
    }
}

impl DriveSession<Idle> {
    /// Builds the controller; fails on an invalid configuration
    pub fn create(
        config: &DriveConfig,
        sink: BoxedSink,
        source: BoxedSource,
    ) -> Result<Self, SessionError> {
        let controller = SteeringController::new(config, sink)?;
        let frame_interval = Duration::from_millis(config.perception.frame_interval_ms);
        info!("Drive session created, frame interval {:?}", frame_interval);

        Ok(Self::new(
            controller,
            source,
            AngleSmoother::new(config.steering.smoothing_alpha),
            frame_interval,
            None,                  // started_at
            SessionStats::default(), // stats
        ))
    }

    pub fn start(mut self) -> DriveSession<Running> {
        let now = Local::now();
        info!("Starting drive session at {}", now.format("%H:%M:%S"));
        self.started_at = Some(now);
        self.transition()
    }
}

impl DriveSession<Running> {
    /// One control cycle: pull a sample, steer, arbitrate pedals
    ///
    /// With no sample all keys are released and the smoothed angle is kept.
    /// Steering and pedals are both attempted even if one of them fails; the
    /// first sink error is returned.
    pub fn run_cycle(&mut self, now: Instant) -> Result<CycleReport, SessionError> {
        self.stats.cycles += 1;

        let Some(sample) = self.source.next_sample()? else {
            self.stats.no_signal_cycles += 1;
            self.controller.stop()?;
            return Ok(CycleReport::no_signal());
        };

        let angle = self.smoother.update(Some(sample.raw_angle));
        let steering = self.controller.update_steering_at(angle, now);
        let intent = PedalArbiter::arbitrate(sample.left_closed, sample.right_closed);
        let pedal = self.controller.update_pedals(intent);

        let steering = steering?;
        let pedal = pedal?;
        Ok(CycleReport {
            intensity: steering.intensity,
            label: steering.label,
            color: steering.color,
            pedal: Some(pedal),
        })
    }

    /// Ticks the control loop until cancelled or the source is exhausted
    ///
    /// Sink errors are logged and retried on the next cycle. Any other source
    /// error releases all keys and is returned.
    pub async fn run_until_cancelled(
        mut self,
        token: CancellationToken,
    ) -> Result<DriveSession<Stopped>, SessionError> {
        info!("Starting control loop");

        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Cancellation received, leaving control loop");
                    break;
                }

                _ = ticker.tick() => {
                    match self.run_cycle(Instant::now()) {
                        Ok(report) => trace!("HUD: {}", report),
                        Err(SessionError::Source(SourceError::Exhausted)) => {
                            info!("Sample source exhausted");
                            break;
                        }
                        Err(SessionError::Sink(e)) => {
                            self.stats.sink_errors += 1;
                            warn!("Key sink failed, retrying next cycle: {}", e);
                        }
                        Err(e) => {
                            error!("Control loop aborted: {}", e);
                            if let Err(stop_err) = self.controller.stop() {
                                error!("Failed to release keys after error: {}", stop_err);
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }

        debug!("Transitioning to Stopped state");
        Ok(self.stop())
    }

    /// Releases all keys and leaves the running state
    pub fn stop(mut self) -> DriveSession<Stopped> {
        if let Err(e) = self.controller.stop() {
            warn!("Not all keys could be released: {}", e);
        }
        self.transition()
    }
}

impl DriveSession<Stopped> {
    /// Logs a summary and returns the final statistics
    pub fn finish(self) -> SessionStats {
        let elapsed = self
            .started_at
            .map(|start| Local::now().signed_duration_since(start))
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        info!(
            "Drive session finished after {:.1}s: {} cycles, {} without hands, {} sink errors",
            elapsed, self.stats.cycles, self.stats.no_signal_cycles, self.stats.sink_errors
        );
        self.stats
    }
}
