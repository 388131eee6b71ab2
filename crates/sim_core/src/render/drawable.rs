//! Objects the render pipeline can draw

use std::any::Any;
use std::fmt;

use crate::foundation::math::{Rect, Vec2};

use super::camera::Camera;
use super::context::{Color, RenderContext};

/// Identifier of a drawable within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawableId(pub u32);

impl fmt::Display for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something with a position that can draw itself in world coordinates
///
/// The pipeline has already applied the camera transform when `draw` is
/// called, so implementations draw in world units.
pub trait Drawable {
    /// Unique identifier
    fn id(&self) -> DrawableId;

    /// Center in world coordinates
    fn position(&self) -> Vec2;

    /// Width and height in world units
    fn size(&self) -> Vec2;

    /// Draw order, lower first
    fn z_index(&self) -> i32;

    /// Hidden drawables are skipped entirely
    fn visible(&self) -> bool {
        true
    }

    /// Multiplied into the global alpha while drawing
    fn opacity(&self) -> f32 {
        1.0
    }

    /// World-space bounds used for culling
    fn bounds(&self) -> Rect {
        Rect::from_center(self.position(), self.size())
    }

    /// Issue drawing commands
    fn draw(&self, context: &mut dyn RenderContext, camera: &dyn Camera);

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Filled rectangle with an optional outline
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    id: DrawableId,
    /// Center in world coordinates
    pub position: Vec2,
    /// Width and height in world units
    pub size: Vec2,
    /// Fill color
    pub color: Color,
    /// Outline color and width in world units
    pub outline: Option<(Color, f32)>,
    /// Draw order
    pub z_index: i32,
    /// Whether the sprite is drawn
    pub visible: bool,
    /// Opacity in [0, 1]
    pub opacity: f32,
}

impl Sprite {
    /// Create a visible, opaque sprite at z-index 0
    pub fn new(id: DrawableId, position: Vec2, size: Vec2, color: Color) -> Self {
        Self {
            id,
            position,
            size,
            color,
            outline: None,
            z_index: 0,
            visible: true,
            opacity: 1.0,
        }
    }

    /// Set the draw order
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Add an outline
    pub fn with_outline(mut self, color: Color, width: f32) -> Self {
        self.outline = Some((color, width));
        self
    }

    /// Set the opacity
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

impl Drawable for Sprite {
    fn id(&self) -> DrawableId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn z_index(&self) -> i32 {
        self.z_index
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn draw(&self, context: &mut dyn RenderContext, _camera: &dyn Camera) {
        let rect = self.bounds();
        context.fill_rect(rect, self.color);
        if let Some((color, width)) = self.outline {
            context.stroke_rect(rect, color, width);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
