//! # Core Module
//!
//! Shared configuration for every subsystem of the simulation core.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration tree (loop, physics, camera, render)
//! - **Foundation**: Low-level utilities (math, time, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    CameraConfig,
    Config,
    ConfigError,
    EngineConfig,
    LoopConfig,
    PhysicsConfig,
    RenderConfig,
};
