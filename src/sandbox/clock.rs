use std::time::Instant;

/// Measures frame deltas and a frames-per-second estimate refreshed once per
/// accumulated second
#[derive(Debug)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_delta: f32,
    accumulated: f32,
    frame_count: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: None,
            frame_delta: 0.0,
            accumulated: 0.0,
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Seconds since the previous tick; zero on the first
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = self.last.map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last = Some(now);
        self.record(delta)
    }

    pub fn record(&mut self, delta: f32) -> f32 {
        self.frame_delta = delta;
        self.accumulated += delta;
        self.frame_count += 1;
        if self.accumulated >= 1.0 {
            self.fps = self.frame_count as f32 / self.accumulated;
            self.accumulated = 0.0;
            self.frame_count = 0;
        }
        delta
    }

    pub fn frame_delta(&self) -> f32 {
        self.frame_delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_updates_each_second() {
        let mut clock = FrameClock::new();
        for _ in 0..59 {
            clock.record(1.0 / 60.0);
        }
        assert_eq!(clock.fps(), 0.0);
        clock.record(1.0 / 60.0 + 1e-4);
        assert!((clock.fps() - 60.0).abs() < 0.1);
    }
}
