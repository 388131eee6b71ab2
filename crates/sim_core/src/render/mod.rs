//! # Rendering System
//!
//! Backend-agnostic 2D rendering: a camera maps world space to the viewport
//! and the pipeline draws registered drawables into any [`RenderContext`].
//!
//! ## Architecture
//!
//! - **Camera**: capability trait plus the [`Camera2D`] implementation
//! - **Context**: canvas-style drawing API with a save/restore state stack
//! - **Canvas**: software RGBA framebuffer for headless output
//! - **Drawable**: objects that draw themselves in world coordinates
//! - **Pipeline**: per-frame visibility filtering, culling and z ordering
//!
//! ## Frame
//!
//! Clear, apply the camera transform, drop hidden and off-screen drawables,
//! stable-sort the rest by z-index, then draw each with its opacity applied.

pub mod camera;
pub mod canvas;
pub mod context;
pub mod drawable;
pub mod pipeline;

pub use camera::{Camera, Camera2D};
pub use canvas::PixelCanvas;
pub use context::{Color, DrawCommand, RecordingContext, RenderContext, StateStack};
pub use drawable::{Drawable, DrawableId, Sprite};
pub use pipeline::{RenderPipeline, RenderStats};

use thiserror::Error;

/// Render pipeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A drawable with this id is already registered
    #[error("drawable {0} is already registered")]
    DuplicateObject(DrawableId),
}
