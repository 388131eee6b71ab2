//! Drawing surface abstraction
//!
//! The pipeline and drawables only talk to [`RenderContext`]: a canvas-style
//! immediate-mode API with a save/restore state stack. Implementations decide
//! where the pixels go.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Rect, Transform2D, Vec2};

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque red
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Opaque blue
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Fully transparent
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Canvas-style drawing API
///
/// Coordinates passed to drawing calls are transformed by the current
/// transform. `save` pushes the transform and global alpha; `restore` pops them.
pub trait RenderContext {
    /// Fill the whole surface, ignoring transform and alpha
    fn clear(&mut self, color: Color);

    /// Push the current drawing state
    fn save(&mut self);

    /// Pop the most recently saved drawing state
    fn restore(&mut self);

    /// Append a translation to the current transform
    fn translate(&mut self, offset: Vec2);

    /// Append a scale to the current transform
    fn scale(&mut self, factor: Vec2);

    /// Current transform
    fn transform(&self) -> Transform2D;

    /// Set the alpha multiplied into every subsequent draw
    fn set_global_alpha(&mut self, alpha: f32);

    /// Current global alpha
    fn global_alpha(&self) -> f32;

    /// Fill a rectangle given in current coordinates
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Outline a rectangle given in current coordinates
    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32);
}

/// Transform and alpha with a save/restore stack
#[derive(Debug, Clone)]
pub struct StateStack {
    transform: Transform2D,
    alpha: f32,
    saved: Vec<(Transform2D, f32)>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self {
            transform: Transform2D::identity(),
            alpha: 1.0,
            saved: Vec::new(),
        }
    }
}

impl StateStack {
    /// Push the current state
    pub fn save(&mut self) {
        self.saved.push((self.transform, self.alpha));
    }

    /// Pop the last saved state; unbalanced calls are ignored
    pub fn restore(&mut self) {
        match self.saved.pop() {
            Some((transform, alpha)) => {
                self.transform = transform;
                self.alpha = alpha;
            }
            None => log::warn!("restore() without matching save()"),
        }
    }

    /// Number of saved states
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Current transform
    pub fn transform(&self) -> Transform2D {
        self.transform
    }

    /// Mutable current transform
    pub fn transform_mut(&mut self) -> &mut Transform2D {
        &mut self.transform
    }

    /// Current alpha
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Set the current alpha, clamped to [0, 1]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }
}

/// A drawing operation captured by [`RecordingContext`]
///
/// Rectangles are in device coordinates (after the transform) and `alpha`
/// is the global alpha in effect when the call was made.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Surface cleared
    Clear(Color),
    /// Filled rectangle
    FillRect {
        /// Device-space rectangle
        rect: Rect,
        /// Fill color
        color: Color,
        /// Effective global alpha
        alpha: f32,
    },
    /// Outlined rectangle
    StrokeRect {
        /// Device-space rectangle
        rect: Rect,
        /// Stroke color
        color: Color,
        /// Line width in device pixels
        line_width: f32,
        /// Effective global alpha
        alpha: f32,
    },
}

/// Context that records commands instead of drawing
///
/// Used headless and in tests to assert on what a frame would draw.
/// `clear` starts a new frame and discards the previous frame's commands.
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    state: StateStack,
    commands: Vec<DrawCommand>,
}

impl RecordingContext {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded since the last `clear`
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recorder empty
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Depth of the save stack
    pub fn save_depth(&self) -> usize {
        self.state.depth()
    }
}

impl RenderContext for RecordingContext {
    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn save(&mut self) {
        self.state.save();
    }

    fn restore(&mut self) {
        self.state.restore();
    }

    fn translate(&mut self, offset: Vec2) {
        self.state.transform_mut().translate(offset);
    }

    fn scale(&mut self, factor: Vec2) {
        self.state.transform_mut().scale(factor);
    }

    fn transform(&self) -> Transform2D {
        self.state.transform()
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.set_alpha(alpha);
    }

    fn global_alpha(&self) -> f32 {
        self.state.alpha()
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            rect: self.state.transform().apply_rect(&rect),
            color,
            alpha: self.state.alpha(),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            rect: self.state.transform().apply_rect(&rect),
            color,
            line_width,
            alpha: self.state.alpha(),
        });
    }
}
