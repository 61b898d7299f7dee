use std::time::{Duration, Instant};

/// Frame clock.
///
/// Each call to [`Clock::elapsed`] returns the wall time since the previous
/// call and moves the reference point forward. The first call after creation
/// or [`Clock::reset`] returns `0.0`, and deltas never go negative.
#[derive(Debug, Clone)]
pub struct Clock {
    start_time: Instant,
    last_update: Option<Instant>,
    /// Total number of `elapsed` calls since creation
    frame_count: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            last_update: None,
            frame_count: 0,
        }
    }

    /// Seconds since the previous call.
    pub fn elapsed(&mut self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    /// Same as [`Clock::elapsed`] with an explicit "now", for deterministic drivers.
    pub fn elapsed_at(&mut self, now: Instant) -> f32 {
        let delta = match self.last_update {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_update = Some(now);
        self.frame_count += 1;
        delta.as_secs_f32()
    }

    /// Forgets the reference point; the next `elapsed` returns zero.
    pub fn reset(&mut self) {
        self.last_update = None;
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wall time since the clock was created.
    #[must_use]
    pub fn since_start(&self) -> Duration {
        self.start_time.elapsed()
    }
}
