//! # Unified Configuration System
//!
//! All tunables of the simulation core in one serializable tree. Every section
//! has a `Default` carrying the standard constants, so a config file only needs
//! the values it changes.
//!
//! ```toml
//! [loop]
//! max_delta_time = 0.0333
//! time_scale = 1.0
//!
//! [physics]
//! gravity = [0.0, 980.0]
//!
//! [physics.world_bounds]
//! x = 0.0
//! y = 0.0
//! width = 800.0
//! height = 600.0
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::{Rect, Vec2};
use crate::render::context::Color;

/// Frame loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Upper bound on the delta passed to subsystems (s)
    pub max_delta_time: f32,
    /// Multiplier applied to wall-clock time
    pub time_scale: f32,
    /// Frame rate targeted by the default pacer
    pub target_fps: u32,
    /// Smoothing factor of the frame-time moving average
    pub stats_smoothing: f32,
    /// Wall time between displayed fps refreshes (s)
    pub fps_update_interval: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_delta_time: 1.0 / 30.0,
            time_scale: 1.0,
            target_fps: 60,
            stats_smoothing: 0.1,
            fps_update_interval: 0.5,
        }
    }
}

/// Physics engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Acceleration applied to bodies with mass (units/s²)
    pub gravity: Vec2,
    /// Per-step velocity multiplier
    pub air_resistance: f32,
    /// Bounce coefficient for collision impulses
    pub restitution: f32,
    /// Velocity multiplier applied when a body hits the world bounds
    pub bounce_damping: f32,
    /// Internal clamp on the integration step (s)
    pub max_delta_time: f32,
    /// Containment rectangle; unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_bounds: Option<Rect>,
    /// Scheduler priority of the physics subsystem
    pub priority: i32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 980.0),
            air_resistance: 0.98,
            restitution: 0.8,
            bounce_damping: 0.8,
            max_delta_time: 1.0 / 30.0,
            world_bounds: None,
            priority: 10,
        }
    }
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Viewport width in pixels
    pub viewport_width: f32,
    /// Viewport height in pixels
    pub viewport_height: f32,
    /// Initial zoom
    pub zoom: f32,
    /// Smallest allowed zoom
    pub min_zoom: f32,
    /// Largest allowed zoom
    pub max_zoom: f32,
    /// Fraction of the remaining distance covered per `follow` call
    pub follow_smoothing: f32,
    /// Rectangle the view is kept inside
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            viewport_height: 600.0,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
            follow_smoothing: 0.1,
            bounds: None,
        }
    }
}

/// Render pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Color the surface is cleared to each frame
    pub background: Color,
    /// Weight of the previous value in the frame-time moving average
    pub stats_smoothing: f32,
    /// Skip drawables outside the camera view
    pub culling: bool,
    /// Scheduler priority of the render subsystem
    pub priority: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            stats_smoothing: 0.9,
            culling: true,
            priority: 100,
        }
    }
}

/// Complete configuration of the simulation core
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame loop
    #[serde(rename = "loop")]
    pub frame_loop: LoopConfig,
    /// Physics engine
    pub physics: PhysicsConfig,
    /// Camera
    pub camera: CameraConfig,
    /// Render pipeline
    pub render: RenderConfig,
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Check value ranges, reporting the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
            if condition {
                Ok(())
            } else {
                Err(ConfigError::Invalid(message.to_string()))
            }
        }

        let frame_loop = &self.frame_loop;
        ensure(frame_loop.max_delta_time > 0.0, "loop.max_delta_time must be positive")?;
        ensure(frame_loop.time_scale >= 0.0, "loop.time_scale must not be negative")?;
        ensure(frame_loop.target_fps > 0, "loop.target_fps must be positive")?;
        ensure(
            (0.0..=1.0).contains(&frame_loop.stats_smoothing),
            "loop.stats_smoothing must be within [0, 1]",
        )?;

        let physics = &self.physics;
        ensure(physics.max_delta_time > 0.0, "physics.max_delta_time must be positive")?;
        ensure(
            (0.0..=1.0).contains(&physics.air_resistance),
            "physics.air_resistance must be within [0, 1]",
        )?;
        ensure(physics.restitution >= 0.0, "physics.restitution must not be negative")?;
        if let Some(bounds) = physics.world_bounds {
            ensure(
                bounds.width > 0.0 && bounds.height > 0.0,
                "physics.world_bounds must have a positive size",
            )?;
        }

        let camera = &self.camera;
        ensure(
            camera.viewport_width > 0.0 && camera.viewport_height > 0.0,
            "camera viewport must have a positive size",
        )?;
        ensure(
            camera.min_zoom > 0.0 && camera.min_zoom <= camera.max_zoom,
            "camera zoom limits must satisfy 0 < min_zoom <= max_zoom",
        )?;

        ensure(
            (0.0..=1.0).contains(&self.render.stats_smoothing),
            "render.stats_smoothing must be within [0, 1]",
        )?;
        Ok(())
    }
}
