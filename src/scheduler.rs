use std::time::{Duration, Instant};

/// How long the loop waits after the last resize before advancing again
pub const RESIZE_SETTLE: Duration = Duration::from_millis(500);

/// Decides whether the frame loop should advance the simulation
///
/// Resizes arrive in bursts while a terminal is dragged; each one pushes the
/// resume time out again so only the last one counts.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    pub paused: bool,
    resume_at: Option<Instant>,
    settle: Duration,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(RESIZE_SETTLE)
    }
}

impl FrameScheduler {
    pub fn new(settle: Duration) -> Self {
        Self {
            paused: false,
            resume_at: None,
            settle,
        }
    }

    /// Drop any pending resume and hold frames until `settle` after `now`
    pub fn defer(&mut self, now: Instant) {
        self.resume_at = Some(now + self.settle);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Still waiting out a resize
    pub fn is_settling(&self, now: Instant) -> bool {
        matches!(self.resume_at, Some(at) if now < at)
    }

    /// Whether a frame should be advanced at `now`
    pub fn frame_due(&mut self, now: Instant) -> bool {
        if self.is_settling(now) {
            return false;
        }
        self.resume_at = None;
        !self.paused
    }
}
