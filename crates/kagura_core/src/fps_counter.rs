use std::time::{Duration, Instant};

/// Samples the frame rate over a fixed reporting window.
pub struct FpsCounter {
    window: Duration,
    last_update: Instant,
    frame_count: u32,
    accumulated_time: Duration,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    /// Reports once per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            last_update: Instant::now(),
            frame_count: 0,
            accumulated_time: Duration::ZERO,
            current_fps: 0.0,
        }
    }

    /// Records a frame. Returns the new rate when a window closes.
    pub fn update(&mut self) -> Option<f32> {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        self.accumulated_time += now.saturating_duration_since(self.last_update);
        self.last_update = now;

        if self.accumulated_time < self.window {
            return None;
        }

        self.current_fps = self.frame_count as f32 / self.accumulated_time.as_secs_f32();
        self.accumulated_time = Duration::ZERO;
        self.frame_count = 0;
        Some(self.current_fps)
    }
}
