//! # Sim Core
//!
//! A single-threaded real-time simulation core: a priority-ordered frame loop,
//! axis-aligned rigid-body physics with collision events, a 2D camera and a
//! backend-agnostic render pipeline, all connected by an event bus.
//!
//! ## Features
//!
//! - **Frame Loop**: Delta clamping, time scaling, pause/resume, per-subsystem failure isolation
//! - **Physics**: Gravity, air resistance, impulse-based collision response, world bounds
//! - **Collision Events**: `CollisionStart` / `CollisionEnd` published on the event bus
//! - **Camera**: Smoothed follow, zoom limits, world bounds clamping
//! - **Rendering**: Visibility filtering, view culling and z ordering over any drawing surface
//! - **Configuration**: TOML and RON files via serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sim_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     sim_core::foundation::logging::init();
//!
//!     let mut engine = Engine::new(EngineConfig::default(), RecordingContext::new())?;
//!     let ball = engine
//!         .physics_mut()
//!         .add_entity(PhysicsEntity::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)))?;
//!
//!     engine.bus().on(EventType::CollisionStart, |event| {
//!         log::info!("collision: {:?}", event.collision());
//!     });
//!
//!     engine.run_frames(120, &mut NoPacer)?;
//!     log::info!("ball at {:?}", engine.physics().get_entity(ball).map(|e| e.position));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod events;
pub mod scheduler;
pub mod physics;
pub mod render;

mod engine;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Engine, EngineError,
        config::{Config, ConfigError},
        core::config::{CameraConfig, EngineConfig, LoopConfig, PhysicsConfig, RenderConfig},
        events::{Event, EventArg, EventBus, EventChannel, EventType, ListenerId},
        foundation::{
            math::{Rect, Transform2D, Vec2},
            time::{Clock, ManualClock, SystemClock},
        },
        physics::{BodyFlags, Collision, CollisionPair, EntityId, PhysicsEngine, PhysicsEntity, PhysicsError},
        render::{
            Camera, Camera2D, Color, Drawable, DrawableId, PixelCanvas, RecordingContext,
            RenderContext, RenderPipeline, Sprite,
        },
        scheduler::{
            FixedRatePacer, FnSystem, FramePacer, LoopError, LoopHandle, NoPacer, PerformanceStats,
            Scheduler, SharedSystem, Subsystem, SystemError,
        },
    };
}
