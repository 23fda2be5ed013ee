use std::time::Duration;
use tokio::time::Instant;

/// Pause/resume stopwatch tracking how long an interview has actually run.
///
/// Time spent paused (for example while the participant is disconnected) is
/// not counted. Uses tokio's clock so paused-time tests can drive it.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    /// Time accumulated over completed running intervals
    accumulated: Duration,

    /// Start of the current running interval, if running
    running_since: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stopwatch that is already running
    pub fn started() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start or resume. No-op if already running.
    pub fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Pause, folding the current interval into the accumulated total.
    /// No-op if already paused.
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    /// Elapsed time rendered as `m:ss.mmm`
    pub fn formatted(&self) -> String {
        let ms = self.elapsed().as_millis();
        let seconds = ms / 1000;
        format!("{}:{:02}.{:03}", seconds / 60, seconds % 60, ms % 1000)
    }
}
