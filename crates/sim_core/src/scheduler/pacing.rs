//! Frame pacing: the host primitive that schedules the next tick

use std::time::{Duration, Instant};

/// Blocks until the next frame should begin
pub trait FramePacer {
    /// Wait for the next frame slot
    fn wait_for_next_frame(&mut self);
}

/// Sleeps so that frames start at a fixed rate
#[derive(Debug, Clone)]
pub struct FixedRatePacer {
    frame_duration: Duration,
    frame_start: Instant,
}

impl FixedRatePacer {
    /// Create a pacer targeting `fps` frames per second
    pub fn new(fps: u32) -> Self {
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            frame_start: Instant::now(),
        }
    }

    /// Duration of one frame slot
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}

impl FramePacer for FixedRatePacer {
    fn wait_for_next_frame(&mut self) {
        let elapsed = self.frame_start.elapsed();
        if elapsed < self.frame_duration {
            std::thread::sleep(self.frame_duration - elapsed);
        } else {
            log::trace!(
                "Frame loop behind schedule by: {:?}",
                elapsed - self.frame_duration
            );
        }
        self.frame_start = Instant::now();
    }
}

/// Returns immediately; ticks run back to back
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacer;

impl FramePacer for NoPacer {
    fn wait_for_next_frame(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rate_pacer_duration() {
        let pacer = FixedRatePacer::new(50);
        assert_eq!(pacer.frame_duration(), Duration::from_millis(20));

        // Zero fps is treated as one frame per second
        assert_eq!(FixedRatePacer::new(0).frame_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_fixed_rate_pacer_waits() {
        let mut pacer = FixedRatePacer::new(200);
        let start = Instant::now();
        pacer.wait_for_next_frame();
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
