//! Bouncing boxes demo
//!
//! Spawns boxes with random sizes and velocities inside a walled arena, lets
//! them collide under gravity and renders every frame into a software canvas.
//! The camera follows the first box.
//!
//! Usage: `bouncing_boxes [config.toml|config.ron]`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::prelude::*;
use sim_core::prelude::*;
use thiserror::Error;

// Configuration constants
const MAX_BOXES: usize = 24;
const SPAWN_INTERVAL: f32 = 0.25; // Seconds between spawns
const DEMO_FRAMES: u64 = 600;
const STATS_INTERVAL: f32 = 2.0;
const ARENA: Rect = Rect::new(0.0, 0.0, 1600.0, 1200.0);

type BoxList = Rc<RefCell<Vec<(EntityId, DrawableId)>>>;

#[derive(Error, Debug)]
enum DemoError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("render error: {0}")]
    Render(#[from] sim_core::render::RenderError),
}

/// Adds a randomly sized box to the arena on a fixed interval
struct BoxSpawner {
    physics: Rc<RefCell<PhysicsEngine>>,
    render: Rc<RefCell<RenderPipeline<PixelCanvas>>>,
    boxes: BoxList,
    rng: StdRng,
    timer: f32,
    next_sprite: u32,
}

impl BoxSpawner {
    fn spawn(&mut self) -> Result<(), SystemError> {
        let size = self.rng.gen_range(16.0..64.0);
        let position = Vec2::new(
            self.rng.gen_range(ARENA.left() + size..ARENA.right() - size),
            self.rng.gen_range(ARENA.top() + size..ARENA.center().y),
        );
        let velocity = Vec2::new(self.rng.gen_range(-400.0..400.0), self.rng.gen_range(-300.0..100.0));
        let mass = size * size / 1024.0;

        let entity = self
            .physics
            .borrow_mut()
            .add_entity(
                PhysicsEntity::new(position, Vec2::new(size, size))
                    .with_velocity(velocity)
                    .with_mass(mass),
            )
            .map_err(|e| SystemError::UpdateFailed(e.to_string()))?;

        let sprite_id = DrawableId(self.next_sprite);
        self.next_sprite += 1;
        let color = Color::rgb(self.rng.gen(), self.rng.gen(), self.rng.gen());
        self.render
            .borrow_mut()
            .add_object(Box::new(
                Sprite::new(sprite_id, position, Vec2::new(size, size), color)
                    .with_outline(Color::WHITE, 2.0)
                    .with_z_index(1),
            ))
            .map_err(|e| SystemError::UpdateFailed(e.to_string()))?;

        self.boxes.borrow_mut().push((entity, sprite_id));
        log::debug!("Spawned box {} (size {:.1}, mass {:.2})", entity, size, mass);
        Ok(())
    }
}

impl Subsystem for BoxSpawner {
    fn name(&self) -> &str {
        "spawner"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn update(&mut self, delta_time: f32) -> Result<(), SystemError> {
        self.timer += delta_time;
        if self.timer < SPAWN_INTERVAL || self.boxes.borrow().len() >= MAX_BOXES {
            return Ok(());
        }
        self.timer = 0.0;
        self.spawn()
    }

    fn cleanup(&mut self) {
        log::info!("Spawner cleanup: {} boxes in the arena", self.boxes.borrow().len());
    }
}

fn default_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.physics.world_bounds = Some(ARENA);
    config.camera.viewport_width = 320.0;
    config.camera.viewport_height = 240.0;
    config.camera.bounds = Some(ARENA);
    config.render.background = Color::rgb(12, 14, 28);
    config
}

fn load_config() -> Result<EngineConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            Ok(EngineConfig::load_from_file(path)?)
        }
        None => Ok(default_config()),
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let canvas = PixelCanvas::new(
        config.camera.viewport_width as usize,
        config.camera.viewport_height as usize,
    );
    let mut engine = Engine::new(config, canvas)?;

    // Static platform in the middle of the arena
    let platform_size = Vec2::new(480.0, 32.0);
    let platform_position = Vec2::new(ARENA.center().x, ARENA.bottom() - 300.0);
    engine
        .physics_mut()
        .add_entity(PhysicsEntity::new(platform_position, platform_size).with_static(true))?;
    engine.render_mut().add_object(Box::new(Sprite::new(
        DrawableId(0),
        platform_position,
        platform_size,
        Color::rgb(90, 90, 110),
    )))?;

    let collisions = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&collisions);
    engine.bus().on(EventType::CollisionStart, move |_| counter.set(counter.get() + 1));
    engine.bus().on(EventType::SystemError, |event| {
        log::warn!(
            "System '{}' failed: {}",
            event.get_text("system").unwrap_or("?"),
            event.get_text("message").unwrap_or("?")
        );
    });

    let boxes = BoxList::default();
    engine.add_system(Box::new(BoxSpawner {
        physics: engine.physics_handle(),
        render: engine.render_handle(),
        boxes: Rc::clone(&boxes),
        rng: StdRng::from_entropy(),
        timer: SPAWN_INTERVAL,
        next_sprite: 1,
    }))?;

    // Copy simulated positions onto sprites once physics has stepped
    let physics = engine.physics_handle();
    let render = engine.render_handle();
    let synced = Rc::clone(&boxes);
    engine.add_system(Box::new(FnSystem::new("sprite_sync", 20, move |_| {
        let physics = physics.borrow();
        let mut render = render.borrow_mut();
        for (entity, sprite) in synced.borrow().iter() {
            let position = physics
                .get_entity(*entity)
                .map(|body| body.position)
                .ok_or_else(|| SystemError::UpdateFailed(format!("entity {} vanished", entity)))?;
            if let Some(sprite) = render.get_object_as_mut::<Sprite>(*sprite) {
                sprite.position = position;
            }
        }

        if let Some(leader) = synced.borrow().first().and_then(|(entity, _)| physics.get_entity(*entity)) {
            render.camera_mut().follow(leader.position);
        }
        Ok(())
    })))?;

    let render = engine.render_handle();
    let mut since_report = 0.0;
    engine.add_system(Box::new(FnSystem::new("stats", 200, move |delta_time| {
        since_report += delta_time;
        if since_report >= STATS_INTERVAL {
            since_report = 0.0;
            let render = render.borrow();
            let stats = render.stats();
            log::info!(
                "fps {:.1} | drawn {} culled {} | camera at {:?}",
                stats.fps,
                stats.drawn,
                stats.culled,
                render.camera().position()
            );
        }
        Ok(())
    })))?;

    let mut pacer = engine.pacer();
    let frames = engine.run_frames(DEMO_FRAMES, &mut pacer)?;
    let stats = *engine.scheduler().stats();
    engine.stop();

    log::info!(
        "Ran {} frames: {} boxes, {} collisions, average frame {:.2} ms (min {:.2}, max {:.2})",
        frames,
        boxes.borrow().len(),
        collisions.get(),
        stats.average_frame_time,
        stats.min_frame_time,
        stats.max_frame_time
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sim_core::foundation::logging::init_with_level(log::LevelFilter::Info);

    log::info!("Starting bouncing boxes demo");

    match run() {
        Ok(()) => {
            log::info!("Bouncing boxes demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bouncing boxes demo failed: {}", e);
            Err(e.into())
        }
    }
}
