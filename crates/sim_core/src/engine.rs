//! Core engine implementation

use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::core::config::EngineConfig;
use crate::events::{EventBus, EventChannel};
use crate::foundation::time::{Clock, SystemClock};
use crate::physics::{PhysicsEngine, PhysicsError};
use crate::render::{Camera2D, RenderContext, RenderError, RenderPipeline};
use crate::scheduler::{
    FixedRatePacer, FramePacer, LoopError, LoopHandle, Scheduler, Subsystem,
};

/// Main engine struct
///
/// Wires the event bus, the frame loop, physics and the render pipeline
/// together. Physics and rendering are registered as subsystems; the engine
/// keeps shared handles so the application can reach them between ticks.
pub struct Engine<C: RenderContext + 'static> {
    bus: EventBus,
    scheduler: Scheduler,
    physics: Rc<RefCell<PhysicsEngine>>,
    render: Rc<RefCell<RenderPipeline<C>>>,
    config: EngineConfig,
}

impl<C: RenderContext + 'static> Engine<C> {
    /// Create an engine driven by the wall clock
    pub fn new(config: EngineConfig, context: C) -> Result<Self, EngineError> {
        Self::with_clock(config, context, Rc::new(SystemClock::new()))
    }

    /// Create an engine driven by `clock`
    pub fn with_clock(config: EngineConfig, context: C, clock: Rc<dyn Clock>) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");
        config.validate()?;

        let bus = EventBus::new();
        let channel: Rc<dyn EventChannel> = Rc::new(bus.clone());

        let physics = Rc::new(RefCell::new(PhysicsEngine::new(
            config.physics.clone(),
            Rc::clone(&channel),
        )));
        let render = Rc::new(RefCell::new(RenderPipeline::new(
            context,
            Box::new(Camera2D::from_config(&config.camera)),
            config.render.clone(),
            Rc::clone(&clock),
        )));

        let mut scheduler = Scheduler::new(config.frame_loop.clone(), channel, clock);
        scheduler.add_shared(Rc::clone(&physics))?;
        scheduler.add_shared(Rc::clone(&render))?;

        Ok(Self {
            bus,
            scheduler,
            physics,
            render,
            config,
        })
    }

    /// Create an engine from a `.toml` or `.ron` configuration file
    pub fn from_config_file(path: impl AsRef<Path>, context: C) -> Result<Self, EngineError> {
        let config = EngineConfig::load_from_file(path)?;
        Self::new(config, context)
    }

    /// Event bus shared by every subsystem
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Frame loop
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Frame loop for mutation
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Borrow the physics engine
    pub fn physics(&self) -> Ref<'_, PhysicsEngine> {
        self.physics.borrow()
    }

    /// Mutably borrow the physics engine
    pub fn physics_mut(&self) -> RefMut<'_, PhysicsEngine> {
        self.physics.borrow_mut()
    }

    /// Shared handle to the physics engine, for use inside subsystems
    pub fn physics_handle(&self) -> Rc<RefCell<PhysicsEngine>> {
        Rc::clone(&self.physics)
    }

    /// Borrow the render pipeline
    pub fn render(&self) -> Ref<'_, RenderPipeline<C>> {
        self.render.borrow()
    }

    /// Mutably borrow the render pipeline
    pub fn render_mut(&self) -> RefMut<'_, RenderPipeline<C>> {
        self.render.borrow_mut()
    }

    /// Shared handle to the render pipeline, for use inside subsystems
    pub fn render_handle(&self) -> Rc<RefCell<RenderPipeline<C>>> {
        Rc::clone(&self.render)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle that can stop the loop from anywhere
    pub fn handle(&self) -> LoopHandle {
        self.scheduler.handle()
    }

    /// Register an application subsystem
    pub fn add_system(&mut self, system: Box<dyn Subsystem>) -> Result<(), EngineError> {
        Ok(self.scheduler.add_system(system)?)
    }

    /// Initialize all subsystems and start the loop
    pub fn start(&mut self) -> Result<(), EngineError> {
        Ok(self.scheduler.start()?)
    }

    /// Stop the loop and clean up every subsystem
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Suspend updates
    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// Resume updates
    pub fn resume(&mut self) {
        self.scheduler.resume();
    }

    /// Run a single frame; returns false once the loop has stopped
    pub fn tick(&mut self) -> bool {
        self.scheduler.tick()
    }

    /// Start and run until stopped, paced at the configured frame rate
    pub fn run(&mut self) -> Result<(), EngineError> {
        let mut pacer = self.pacer();
        self.run_with(&mut pacer)
    }

    /// Start and run until stopped, waiting on `pacer` between frames
    pub fn run_with(&mut self, pacer: &mut dyn FramePacer) -> Result<(), EngineError> {
        self.start()?;
        log::info!("Starting main loop...");
        self.scheduler.run(pacer);
        log::info!("Engine shutdown complete");
        Ok(())
    }

    /// Start if needed and run `frames` frames
    pub fn run_frames(&mut self, frames: u64, pacer: &mut dyn FramePacer) -> Result<u64, EngineError> {
        Ok(self.scheduler.run_frames(frames, pacer)?)
    }

    /// Pacer targeting the configured frame rate
    pub fn pacer(&self) -> FixedRatePacer {
        FixedRatePacer::new(self.config.frame_loop.target_fps)
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Frame loop error
    #[error("Loop error: {0}")]
    Loop(#[from] LoopError),

    /// Physics error
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Render error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::ManualClock;
    use crate::render::RecordingContext;

    #[test]
    fn test_registers_core_subsystems_in_priority_order() {
        let engine = Engine::with_clock(
            EngineConfig::default(),
            RecordingContext::new(),
            Rc::new(ManualClock::new()),
        )
        .unwrap();

        assert_eq!(engine.scheduler().system_names(), vec!["physics", "render"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.frame_loop.max_delta_time = 0.0;

        let result = Engine::new(config, RecordingContext::new());
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = Engine::from_config_file("/nonexistent/sim_core.toml", RecordingContext::new());
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Io(_)))));
    }

    #[test]
    fn test_render_runs_every_tick() {
        let clock = ManualClock::new();
        let mut engine = Engine::with_clock(
            EngineConfig::default(),
            RecordingContext::new(),
            Rc::new(clock.clone()),
        )
        .unwrap();

        engine.start().unwrap();
        for _ in 0..3 {
            clock.advance(0.016);
            engine.tick();
        }
        assert_eq!(engine.render().stats().frame_count, 3);

        engine.stop();
        assert!(!engine.tick());
    }
}
