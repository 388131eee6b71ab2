//! Frame performance statistics

/// Snapshot of frame timing, rebuilt incrementally every tick
///
/// Frame times are wall-clock milliseconds (before time scaling);
/// `last_delta` is the clamped, scaled delta handed to subsystems in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceStats {
    /// Displayed frames per second, refreshed on an interval
    pub fps: f32,
    /// Most recent frame time (ms)
    pub frame_time: f32,
    /// Exponentially smoothed frame time (ms)
    pub average_frame_time: f32,
    /// Shortest frame seen (ms)
    pub min_frame_time: f32,
    /// Longest frame seen (ms)
    pub max_frame_time: f32,
    /// Delta passed to subsystems on the last tick (s)
    pub last_delta: f32,
    /// Ticks recorded since start
    pub frame_count: u64,
}

/// Maintains `PerformanceStats` from per-tick samples
#[derive(Debug, Clone)]
pub(crate) struct StatsTracker {
    stats: PerformanceStats,
    smoothing: f32,
    fps_interval: f64,
    last_fps_update: f64,
}

impl StatsTracker {
    pub(crate) fn new(smoothing: f32, fps_interval: f64) -> Self {
        Self {
            stats: PerformanceStats::default(),
            smoothing,
            fps_interval,
            last_fps_update: 0.0,
        }
    }

    /// Forget all samples; `now` becomes the fps refresh origin
    pub(crate) fn reset(&mut self, now: f64) {
        self.stats = PerformanceStats::default();
        self.last_fps_update = now;
    }

    pub(crate) fn record(&mut self, now: f64, frame_seconds: f64, delta: f32) {
        let frame_ms = (frame_seconds * 1000.0) as f32;
        let stats = &mut self.stats;

        if stats.frame_count == 0 {
            stats.average_frame_time = frame_ms;
            stats.min_frame_time = frame_ms;
            stats.max_frame_time = frame_ms;
        } else {
            stats.average_frame_time += (frame_ms - stats.average_frame_time) * self.smoothing;
            stats.min_frame_time = stats.min_frame_time.min(frame_ms);
            stats.max_frame_time = stats.max_frame_time.max(frame_ms);
        }

        stats.frame_time = frame_ms;
        stats.last_delta = delta;
        stats.frame_count += 1;

        if now - self.last_fps_update >= self.fps_interval {
            stats.fps = if stats.average_frame_time > 0.0 {
                1000.0 / stats.average_frame_time
            } else {
                0.0
            };
            self.last_fps_update = now;
        }
    }

    pub(crate) fn stats(&self) -> &PerformanceStats {
        &self.stats
    }
}
