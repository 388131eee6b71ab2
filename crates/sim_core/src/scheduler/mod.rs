//! Frame loop and subsystem scheduling
//!
//! The scheduler owns every registered subsystem and drives them once per
//! tick in ascending priority order. Ticks are single-threaded: each update
//! runs to completion before the next one starts.
//!
//! ## Tick
//!
//! 1. Honor a pending stop request from a [`LoopHandle`]
//! 2. Flush events deferred on the bus
//! 3. Measure wall time since the previous tick, scale and clamp it
//! 4. Record performance statistics
//! 5. Unless paused, update every enabled subsystem inside its own failure boundary

pub mod pacing;
pub mod stats;
pub mod system;

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;

use crate::core::config::LoopConfig;
use crate::events::{Event, EventArg, EventChannel, EventType};
use crate::foundation::panic_message;
use crate::foundation::time::Clock;

pub use pacing::{FixedRatePacer, FramePacer, NoPacer};
pub use stats::PerformanceStats;
pub use system::{FnSystem, SharedSystem, Subsystem, SystemError};

use stats::StatsTracker;

/// Errors returned by the scheduler
#[derive(Error, Debug)]
pub enum LoopError {
    /// A subsystem failed to initialize; the loop did not start
    #[error("system '{system}' failed to initialize")]
    Initialization {
        /// Name of the failing subsystem
        system: String,
        /// Underlying failure
        #[source]
        source: SystemError,
    },

    /// A subsystem with this name is already registered
    #[error("system '{0}' is already registered")]
    DuplicateSystem(String),

    /// No subsystem with this name is registered
    #[error("unknown system '{0}'")]
    UnknownSystem(String),
}

/// Cloneable handle that can ask a running loop to stop
///
/// The request is honored at the beginning of the next tick, so a subsystem
/// may stop the loop from inside its own update.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    stop_requested: Rc<Cell<bool>>,
}

impl LoopHandle {
    /// Ask the loop to stop before its next tick
    pub fn request_stop(&self) {
        self.stop_requested.set(true);
    }

    /// Whether a stop has been requested and not yet honored
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.get()
    }

    fn reset(&self) {
        self.stop_requested.set(false);
    }
}

struct SystemEntry {
    system: Box<dyn Subsystem>,
    name: String,
    priority: i32,
    enabled: bool,
    initialized: bool,
}

impl SystemEntry {
    fn new(system: Box<dyn Subsystem>) -> Self {
        Self {
            name: system.name().to_string(),
            priority: system.priority(),
            system,
            enabled: true,
            initialized: false,
        }
    }
}

/// Priority-ordered subsystem scheduler with a fixed-timestep-free frame loop
pub struct Scheduler {
    systems: Vec<SystemEntry>,
    config: LoopConfig,
    bus: Rc<dyn EventChannel>,
    clock: Rc<dyn Clock>,
    running: bool,
    paused: bool,
    start_time: f64,
    last_tick: f64,
    time_scale: f32,
    stats: StatsTracker,
    handle: LoopHandle,
}

impl Scheduler {
    /// Create an idle scheduler
    pub fn new(config: LoopConfig, bus: Rc<dyn EventChannel>, clock: Rc<dyn Clock>) -> Self {
        Self {
            stats: StatsTracker::new(config.stats_smoothing, config.fps_update_interval),
            time_scale: config.time_scale.max(0.0),
            systems: Vec::new(),
            config,
            bus,
            clock,
            running: false,
            paused: false,
            start_time: 0.0,
            last_tick: 0.0,
            handle: LoopHandle::default(),
        }
    }

    /// Register a subsystem
    ///
    /// Names must be unique. When the loop is already running the subsystem is
    /// initialized immediately and is not registered if that fails.
    pub fn add_system(&mut self, system: Box<dyn Subsystem>) -> Result<(), LoopError> {
        let mut entry = SystemEntry::new(system);
        if self.index_of(&entry.name).is_some() {
            return Err(LoopError::DuplicateSystem(entry.name));
        }

        if self.running {
            entry
                .system
                .initialize()
                .map_err(|source| LoopError::Initialization {
                    system: entry.name.clone(),
                    source,
                })?;
            entry.initialized = true;
            entry.system.on_enable();
        }

        log::debug!("Registered system '{}' (priority {})", entry.name, entry.priority);
        self.systems.push(entry);
        // Stable sort: equal priorities keep insertion order
        self.systems.sort_by_key(|entry| entry.priority);
        Ok(())
    }

    /// Register a subsystem the caller keeps a shared handle to
    pub fn add_shared<T: Subsystem + 'static>(
        &mut self,
        system: Rc<RefCell<T>>,
    ) -> Result<(), LoopError> {
        self.add_system(Box::new(SharedSystem::new(system)))
    }

    /// Unregister a subsystem, cleaning it up if it was initialized
    pub fn remove_system(&mut self, name: &str) -> Result<Box<dyn Subsystem>, LoopError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| LoopError::UnknownSystem(name.to_string()))?;
        let mut entry = self.systems.remove(index);

        if entry.initialized {
            entry.system.cleanup();
        }
        log::debug!("Removed system '{}'", entry.name);
        Ok(entry.system)
    }

    /// Initialize every subsystem and begin ticking
    ///
    /// Does nothing if the loop is already running. If any subsystem fails to
    /// initialize, the ones initialized before it are cleaned up in reverse
    /// order and the error is returned.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.running {
            return Ok(());
        }

        for index in 0..self.systems.len() {
            let entry = &mut self.systems[index];
            if let Err(source) = entry.system.initialize() {
                let system = entry.name.clone();
                log::error!("System '{}' failed to initialize: {}", system, source);
                self.cleanup_initialized();
                return Err(LoopError::Initialization { system, source });
            }
            entry.initialized = true;
            entry.enabled = true;
            entry.system.on_enable();
        }

        let now = self.clock.now();
        self.start_time = now;
        self.last_tick = now;
        self.stats.reset(now);
        self.running = true;
        self.paused = false;
        self.handle.reset();

        log::info!("Frame loop started with {} systems", self.systems.len());
        self.bus.publish(Event::new(EventType::LoopStarted, now));
        Ok(())
    }

    /// Stop ticking and clean up every initialized subsystem exactly once
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.paused = false;
        self.handle.reset();
        self.cleanup_initialized();

        let now = self.clock.now();
        log::info!(
            "Frame loop stopped after {} frames ({:.2}s)",
            self.stats.stats().frame_count,
            now - self.start_time
        );
        self.bus.publish(Event::new(EventType::LoopStopped, now));
    }

    /// Suspend updates; the frame clock keeps running
    pub fn pause(&mut self) {
        if !self.running || self.paused {
            return;
        }
        self.paused = true;
        log::debug!("Frame loop paused");
        self.bus.publish(Event::new(EventType::LoopPaused, self.clock.now()));
    }

    /// Resume updates without replaying the time spent paused
    pub fn resume(&mut self) {
        if !self.running || !self.paused {
            return;
        }
        self.paused = false;
        self.last_tick = self.clock.now();
        log::debug!("Frame loop resumed");
        self.bus.publish(Event::new(EventType::LoopResumed, self.last_tick));
    }

    /// Run a single frame; returns false when the loop is not running
    pub fn tick(&mut self) -> bool {
        if self.handle.stop_requested() {
            self.stop();
        }
        if !self.running {
            return false;
        }

        self.bus.flush();

        let now = self.clock.now();
        let wall = (now - self.last_tick).max(0.0);
        self.last_tick = now;

        let delta = ((wall as f32) * self.time_scale).min(self.config.max_delta_time);
        self.stats.record(now, wall, delta);

        if !self.paused {
            self.update_systems(delta, now);
        }
        true
    }

    /// Tick until stopped, waiting on `pacer` between frames
    pub fn run(&mut self, pacer: &mut dyn FramePacer) {
        while self.tick() {
            pacer.wait_for_next_frame();
        }
    }

    /// Tick at most `frames` times, returning the number of frames run
    ///
    /// Starts the loop if needed; does not stop it afterwards.
    pub fn run_frames(&mut self, frames: u64, pacer: &mut dyn FramePacer) -> Result<u64, LoopError> {
        self.start()?;

        let mut completed = 0;
        while completed < frames && self.tick() {
            completed += 1;
            pacer.wait_for_next_frame();
        }
        Ok(completed)
    }

    /// Enable or disable a subsystem
    ///
    /// Hooks fire only on transitions of an initialized subsystem.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), LoopError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| LoopError::UnknownSystem(name.to_string()))?;
        let entry = &mut self.systems[index];

        if entry.enabled == enabled {
            return Ok(());
        }
        entry.enabled = enabled;
        if entry.initialized {
            if enabled {
                entry.system.on_enable();
            } else {
                entry.system.on_disable();
            }
        }
        Ok(())
    }

    /// Whether a subsystem is enabled, `None` if unknown
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.index_of(name).map(|index| self.systems[index].enabled)
    }

    /// Set the multiplier applied to wall-clock time (negative clamps to 0)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Current time scale
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether updates are suspended
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Frame timing statistics
    pub fn stats(&self) -> &PerformanceStats {
        self.stats.stats()
    }

    /// Seconds since `start`, zero when idle
    pub fn elapsed(&self) -> f64 {
        if self.running {
            self.clock.now() - self.start_time
        } else {
            0.0
        }
    }

    /// Handle that can request a stop from anywhere
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Names of registered subsystems in execution order
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Number of registered subsystems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Look up a subsystem by name
    pub fn get_system(&self, name: &str) -> Option<&dyn Subsystem> {
        self.index_of(name).map(|index| self.systems[index].system.as_ref())
    }

    /// Look up a subsystem by name for mutation
    pub fn get_system_mut(&mut self, name: &str) -> Option<&mut (dyn Subsystem + 'static)> {
        let index = self.index_of(name)?;
        Some(self.systems[index].system.as_mut())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.systems.iter().position(|entry| entry.name == name)
    }

    fn update_systems(&mut self, delta: f32, now: f64) {
        for entry in &mut self.systems {
            if !entry.enabled || !entry.initialized {
                continue;
            }

            let system = &mut entry.system;
            let result = panic::catch_unwind(AssertUnwindSafe(|| system.update(delta)))
                .unwrap_or_else(|payload| Err(SystemError::Panicked(panic_message(&*payload))));

            if let Err(error) = result {
                log::error!("System '{}' update failed: {}", entry.name, error);
                self.bus.publish(
                    Event::new(EventType::SystemError, now)
                        .with_arg("system", EventArg::Text(entry.name.clone()))
                        .with_arg("message", EventArg::Text(error.to_string())),
                );
            }

            for event in entry.system.drain_events() {
                self.bus.publish(event);
            }
        }
    }

    /// Clean up initialized subsystems, highest priority first
    fn cleanup_initialized(&mut self) {
        for entry in self.systems.iter_mut().rev() {
            if entry.initialized {
                entry.system.cleanup();
                entry.initialized = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingChannel;
    use crate::foundation::time::ManualClock;
    use approx::assert_relative_eq;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        priority: i32,
        log: Log,
        deltas: Rc<RefCell<Vec<f32>>>,
        fail_init: bool,
        fail_update: bool,
        panic_update: bool,
    }

    impl Probe {
        fn new(name: &'static str, priority: i32, log: &Log) -> Self {
            Self {
                name,
                priority,
                log: Rc::clone(log),
                deltas: Rc::new(RefCell::new(Vec::new())),
                fail_init: false,
                fail_update: false,
                panic_update: false,
            }
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, what));
        }
    }

    impl Subsystem for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn initialize(&mut self) -> Result<(), SystemError> {
            self.record("init");
            if self.fail_init {
                return Err(SystemError::InitializationFailed("no device".to_string()));
            }
            Ok(())
        }

        fn update(&mut self, delta_time: f32) -> Result<(), SystemError> {
            self.record("update");
            self.deltas.borrow_mut().push(delta_time);
            if self.panic_update {
                panic!("probe exploded");
            }
            if self.fail_update {
                return Err(SystemError::UpdateFailed("bad state".to_string()));
            }
            Ok(())
        }

        fn cleanup(&mut self) {
            self.record("cleanup");
        }

        fn on_enable(&mut self) {
            self.record("enable");
        }

        fn on_disable(&mut self) {
            self.record("disable");
        }
    }

    fn scheduler() -> (Scheduler, ManualClock, Rc<RecordingChannel>) {
        let clock = ManualClock::new();
        let bus = Rc::new(RecordingChannel::default());
        let scheduler = Scheduler::new(LoopConfig::default(), bus.clone(), Rc::new(clock.clone()));
        (scheduler, clock, bus)
    }

    fn entries(log: &Log, suffix: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|entry| entry.ends_with(suffix))
            .cloned()
            .collect()
    }

    #[test]
    fn test_lower_priority_updates_first() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();

        scheduler.add_system(Box::new(Probe::new("late", 2, &log))).unwrap();
        scheduler.add_system(Box::new(Probe::new("early", 1, &log))).unwrap();
        assert_eq!(scheduler.system_names(), vec!["early", "late"]);

        scheduler.start().unwrap();
        for _ in 0..3 {
            clock.advance(0.016);
            scheduler.tick();
        }

        assert_eq!(
            entries(&log, ":update"),
            vec![
                "early:update", "late:update",
                "early:update", "late:update",
                "early:update", "late:update",
            ]
        );
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let (mut scheduler, _clock, _bus) = scheduler();
        let log = Log::default();

        for name in ["a", "b", "c"] {
            scheduler.add_system(Box::new(Probe::new(name, 5, &log))).unwrap();
        }
        assert_eq!(scheduler.system_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_delta_is_clamped() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();
        let probe = Probe::new("probe", 0, &log);
        let deltas = Rc::clone(&probe.deltas);

        scheduler.add_system(Box::new(probe)).unwrap();
        scheduler.start().unwrap();

        clock.advance(0.5);
        scheduler.tick();
        clock.advance(0.01);
        scheduler.tick();

        let deltas = deltas.borrow();
        assert_relative_eq!(deltas[0], 1.0 / 30.0, epsilon = 1e-6);
        assert_relative_eq!(deltas[1], 0.01, epsilon = 1e-6);
        assert_relative_eq!(scheduler.stats().last_delta, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_time_scale() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();
        let probe = Probe::new("probe", 0, &log);
        let deltas = Rc::clone(&probe.deltas);

        scheduler.add_system(Box::new(probe)).unwrap();
        scheduler.start().unwrap();

        scheduler.set_time_scale(0.5);
        clock.advance(0.02);
        scheduler.tick();

        scheduler.set_time_scale(-3.0);
        assert_eq!(scheduler.time_scale(), 0.0);
        clock.advance(0.02);
        scheduler.tick();

        let deltas = deltas.borrow();
        assert_relative_eq!(deltas[0], 0.01, epsilon = 1e-6);
        assert_eq!(deltas[1], 0.0);
    }

    #[test]
    fn test_failing_update_is_isolated() {
        let (mut scheduler, clock, bus) = scheduler();
        let log = Log::default();

        let mut broken = Probe::new("broken", 1, &log);
        broken.fail_update = true;
        let mut exploding = Probe::new("exploding", 2, &log);
        exploding.panic_update = true;

        scheduler.add_system(Box::new(broken)).unwrap();
        scheduler.add_system(Box::new(exploding)).unwrap();
        scheduler.add_system(Box::new(Probe::new("healthy", 3, &log))).unwrap();
        scheduler.start().unwrap();

        clock.advance(0.016);
        assert!(scheduler.tick());
        clock.advance(0.016);
        assert!(scheduler.tick());

        assert!(scheduler.is_running());
        assert_eq!(entries(&log, "healthy:update").len(), 2);

        let errors = bus.of_type(EventType::SystemError);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0].get_text("system"), Some("broken"));
        assert_eq!(errors[1].get_text("system"), Some("exploding"));
        assert!(errors[1].get_text("message").unwrap().contains("probe exploded"));
    }

    #[test]
    fn test_pause_skips_updates_and_resume_drops_backlog() {
        let (mut scheduler, clock, bus) = scheduler();
        let log = Log::default();
        let probe = Probe::new("probe", 0, &log);
        let deltas = Rc::clone(&probe.deltas);

        scheduler.add_system(Box::new(probe)).unwrap();
        scheduler.start().unwrap();

        scheduler.pause();
        assert!(scheduler.is_paused());
        for _ in 0..5 {
            clock.advance(0.016);
            assert!(scheduler.tick());
        }
        assert!(deltas.borrow().is_empty());

        clock.advance(2.0);
        scheduler.resume();
        scheduler.tick();

        assert_eq!(deltas.borrow().len(), 1);
        assert!(deltas.borrow()[0] < 1e-6);
        assert_eq!(bus.of_type(EventType::LoopPaused).len(), 1);
        assert_eq!(bus.of_type(EventType::LoopResumed).len(), 1);
    }

    #[test]
    fn test_stop_cleans_up_exactly_once() {
        let (mut scheduler, clock, bus) = scheduler();
        let log = Log::default();

        scheduler.add_system(Box::new(Probe::new("a", 1, &log))).unwrap();
        scheduler.add_system(Box::new(Probe::new("b", 2, &log))).unwrap();
        scheduler.start().unwrap();

        clock.advance(0.016);
        scheduler.tick();
        scheduler.stop();
        scheduler.stop();

        assert_eq!(entries(&log, ":cleanup"), vec!["b:cleanup", "a:cleanup"]);
        assert!(!scheduler.tick());
        assert_eq!(bus.of_type(EventType::LoopStarted).len(), 1);
        assert_eq!(bus.of_type(EventType::LoopStopped).len(), 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut scheduler, _clock, _bus) = scheduler();
        let log = Log::default();

        scheduler.add_system(Box::new(Probe::new("a", 1, &log))).unwrap();
        scheduler.start().unwrap();
        scheduler.start().unwrap();

        assert_eq!(entries(&log, ":init").len(), 1);
    }

    #[test]
    fn test_initialization_failure_rolls_back() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();
        let mut broken = Probe::new("broken", 2, &log);
        broken.fail_init = true;

        scheduler.add_system(Box::new(Probe::new("first", 1, &log))).unwrap();
        scheduler.add_system(Box::new(broken)).unwrap();
        scheduler.add_system(Box::new(Probe::new("never", 3, &log))).unwrap();

        let error = scheduler.start().unwrap_err();
        match error {
            LoopError::Initialization { system, .. } => assert_eq!(system, "broken"),
            other => panic!("unexpected error: {other}"),
        }

        assert!(!scheduler.is_running());
        assert_eq!(*log.borrow(), vec!["first:init", "first:enable", "broken:init", "first:cleanup"]);

        clock.advance(0.016);
        assert!(!scheduler.tick());
    }

    #[test]
    fn test_duplicate_and_unknown_names() {
        let (mut scheduler, _clock, _bus) = scheduler();
        let log = Log::default();

        scheduler.add_system(Box::new(Probe::new("a", 1, &log))).unwrap();
        assert!(matches!(
            scheduler.add_system(Box::new(Probe::new("a", 4, &log))),
            Err(LoopError::DuplicateSystem(_))
        ));
        assert!(matches!(scheduler.remove_system("zzz"), Err(LoopError::UnknownSystem(_))));
        assert!(matches!(scheduler.set_enabled("zzz", false), Err(LoopError::UnknownSystem(_))));
    }

    #[test]
    fn test_add_while_running_initializes() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();
        scheduler.start().unwrap();

        scheduler.add_system(Box::new(Probe::new("late", 1, &log))).unwrap();
        clock.advance(0.016);
        scheduler.tick();
        assert_eq!(*log.borrow(), vec!["late:init", "late:enable", "late:update"]);

        let mut broken = Probe::new("broken", 1, &log);
        broken.fail_init = true;
        assert!(scheduler.add_system(Box::new(broken)).is_err());
        assert_eq!(scheduler.system_count(), 1);

        scheduler.remove_system("late").unwrap();
        assert_eq!(entries(&log, ":cleanup"), vec!["late:cleanup"]);
    }

    #[test]
    fn test_disabled_system_is_skipped() {
        let (mut scheduler, clock, _bus) = scheduler();
        let log = Log::default();

        scheduler.add_system(Box::new(Probe::new("a", 1, &log))).unwrap();
        scheduler.start().unwrap();
        scheduler.set_enabled("a", false).unwrap();
        assert_eq!(scheduler.is_enabled("a"), Some(false));

        clock.advance(0.016);
        scheduler.tick();
        scheduler.set_enabled("a", true).unwrap();
        clock.advance(0.016);
        scheduler.tick();

        assert_eq!(
            *log.borrow(),
            vec!["a:init", "a:enable", "a:disable", "a:enable", "a:update"]
        );
    }

    #[test]
    fn test_handle_requests_stop() {
        let (mut scheduler, clock, _bus) = scheduler();
        let handle = scheduler.handle();
        let ticks = Rc::new(Cell::new(0));

        let counter = Rc::clone(&ticks);
        scheduler
            .add_system(Box::new(FnSystem::new("stopper", 0, move |_| {
                counter.set(counter.get() + 1);
                if counter.get() == 3 {
                    handle.request_stop();
                }
                Ok(())
            })))
            .unwrap();

        scheduler.start().unwrap();
        clock.advance(0.016);
        scheduler.run(&mut NoPacer);

        assert_eq!(ticks.get(), 3);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_run_frames_counts_ticks() {
        let (mut scheduler, _clock, _bus) = scheduler();
        let log = Log::default();
        scheduler.add_system(Box::new(Probe::new("a", 1, &log))).unwrap();

        assert_eq!(scheduler.run_frames(4, &mut NoPacer).unwrap(), 4);
        assert!(scheduler.is_running());
        assert_eq!(scheduler.stats().frame_count, 4);
        assert_eq!(entries(&log, ":update").len(), 4);
    }
}
