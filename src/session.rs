//! The acquisition loop: one still per interval until a limit or a stop.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::camera::{Camera, CameraGuard, Negotiated};
use crate::error::TimelapseError;
use crate::sequence::image_path;
use crate::signal::StopSignal;

/// Parameters of one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between capture attempts.
    pub interval: Duration,
    /// Successful captures after which to stop; 0 means no limit.
    pub limit: u32,
    /// Directory receiving the stills.
    pub output_dir: PathBuf,
}

impl SessionConfig {
    /// Build a session config from an interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `interval_secs` is finite and positive.
    pub fn new<P: Into<PathBuf>>(
        interval_secs: f64,
        limit: u32,
        output_dir: P,
    ) -> Result<Self, TimelapseError> {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(TimelapseError::validation(format!(
                "interval must be a positive number of seconds, got {interval_secs}"
            )));
        }
        let interval = Duration::try_from_secs_f64(interval_secs).map_err(|err| {
            TimelapseError::validation(format!("interval {interval_secs}s: {err}"))
        })?;
        Ok(Self {
            interval,
            limit,
            output_dir: output_dir.into(),
        })
    }

    fn validate(&self) -> Result<(), TimelapseError> {
        if self.interval.is_zero() {
            return Err(TimelapseError::validation(
                "interval must be greater than zero",
            ));
        }
        Ok(())
    }

    fn limit_reached(&self, captured: u32) -> bool {
        self.limit > 0 && captured >= self.limit
    }
}

/// Why a session left the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of stills was captured.
    Limit,
    /// A stop was requested (interrupt).
    Signal,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Successful captures, numbered `1..=captured` on disk.
    pub captured: u32,
    /// Capture attempts that failed and were retried.
    pub failed_attempts: u32,
    /// Wall-clock time from loop entry to exit.
    pub elapsed: Duration,
    /// How the loop ended.
    pub stop_reason: StopReason,
    /// Resolution negotiation result from initialization.
    pub negotiated: Negotiated,
}

struct Progress {
    captured: u32,
    failed_attempts: u32,
}

/// Run one timelapse session with `camera`.
///
/// The interval is validated and the output directory created before the
/// camera is touched. The camera is initialized on entry and shut down
/// exactly once on every exit path. Per-frame capture errors are logged and
/// retried after the interval; an initialization error ends the session.
pub fn run_session<C: Camera + ?Sized>(
    camera: &mut C,
    config: &SessionConfig,
    stop: &StopSignal,
) -> Result<SessionReport, TimelapseError> {
    config.validate()?;
    fs::create_dir_all(&config.output_dir).map_err(|source| TimelapseError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    info!(
        "Starting timelapse: one image every {:?} into {} ({})",
        config.interval,
        config.output_dir.display(),
        if config.limit > 0 {
            format!("limit {}", config.limit)
        } else {
            "no limit".to_owned()
        }
    );

    let started = Instant::now();
    let mut progress = Progress {
        captured: 0,
        failed_attempts: 0,
    };
    let outcome = capture_loop(camera, config, stop, &mut progress);
    let elapsed = started.elapsed();

    info!(
        "Timelapse finished: {} images captured in {:.1}s",
        progress.captured,
        elapsed.as_secs_f64()
    );

    let (stop_reason, negotiated) = outcome?;
    Ok(SessionReport {
        captured: progress.captured,
        failed_attempts: progress.failed_attempts,
        elapsed,
        stop_reason,
        negotiated,
    })
}

fn capture_loop<C: Camera + ?Sized>(
    camera: &mut C,
    config: &SessionConfig,
    stop: &StopSignal,
    progress: &mut Progress,
) -> Result<(StopReason, Negotiated), TimelapseError> {
    let mut camera = CameraGuard::acquire(camera)?;
    let negotiated = camera.negotiated();

    loop {
        if stop.is_stopped() {
            info!("Stop requested, ending capture");
            return Ok((StopReason::Signal, negotiated));
        }
        if config.limit_reached(progress.captured) {
            return Ok((StopReason::Limit, negotiated));
        }

        let seq = progress.captured + 1;
        let path = image_path(&config.output_dir, seq);
        match camera.capture_frame(&path) {
            Ok(()) => {
                progress.captured = seq;
                info!("Captured {}", path.display());
                if config.limit_reached(progress.captured) {
                    info!("Reached capture limit of {}", config.limit);
                    return Ok((StopReason::Limit, negotiated));
                }
            }
            Err(err) => {
                progress.failed_attempts += 1;
                warn!("Capture of {} failed: {err}", path.display());
            }
        }

        if stop.wait(config.interval) {
            info!("Stop requested, ending capture");
            return Ok((StopReason::Signal, negotiated));
        }
    }
}
