use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Frames-per-second estimate over a window that restarts every second
#[derive(Debug, Clone)]
pub struct FrameRateCounter {
    count: u32,
    window_start: Instant,
}

impl FrameRateCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Record one frame at `now` and return the rate seen so far in this window
    ///
    /// The estimate uses the frames counted before this one, then the window
    /// restarts once at least a second has elapsed.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        };

        self.count += 1;
        if elapsed >= WINDOW.as_secs_f64() {
            self.window_start = now;
            self.count = 0;
        }
        fps
    }
}
