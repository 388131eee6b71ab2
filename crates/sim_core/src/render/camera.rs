//! # 2D Camera System
//!
//! Maps world coordinates to the viewport for rendering and culling.
//!
//! ## Coordinate System
//!
//! - `position` is the world point shown at the center of the viewport
//! - Screen coordinates returned by [`Camera::world_to_screen`] are measured
//!   from the viewport center, in pixels, with +y pointing down
//! - [`Camera::transform`] produces the full world → pixel transform, whose
//!   origin is the top-left corner of the viewport
//!
//! ## Bounds
//!
//! When world bounds are set, every operation that moves or zooms the camera
//! clamps the view rectangle inside them. If the view is larger than the
//! bounds on an axis, the camera centers on the bounds along that axis.

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Rect, Transform2D, Vec2};

/// Capability interface consumed by the render pipeline and drawables
///
/// Any implementation that maps world space to the viewport can be plugged
/// into the pipeline.
pub trait Camera {
    /// World point at the center of the view
    fn position(&self) -> Vec2;

    /// Center the view on `(x, y)`
    fn set_position(&mut self, x: f32, y: f32);

    /// Translate the view by `(dx, dy)` world units
    fn move_by(&mut self, dx: f32, dy: f32);

    /// Ease the view towards `target`
    fn follow(&mut self, target: Vec2);

    /// Keep the view inside `bounds`
    fn set_bounds(&mut self, bounds: Rect);

    /// Allow the view to move freely
    fn clear_bounds(&mut self);

    /// Current world bounds
    fn bounds(&self) -> Option<Rect>;

    /// Current zoom factor (pixels per world unit)
    fn zoom(&self) -> f32;

    /// Change the zoom factor, clamped to the allowed range
    fn set_zoom(&mut self, zoom: f32);

    /// Viewport width and height in pixels
    fn viewport_size(&self) -> Vec2;

    /// Resize the viewport
    fn set_viewport(&mut self, width: f32, height: f32);

    /// World point to screen offset from the viewport center
    fn world_to_screen(&self, world: Vec2) -> Vec2;

    /// Screen offset from the viewport center to world point
    fn screen_to_world(&self, screen: Vec2) -> Vec2;

    /// World rectangle covered by the viewport
    fn view_bounds(&self) -> Rect;

    /// World → pixel transform applied by the render pipeline
    ///
    /// Translate to the viewport center, translate by `-position * zoom`,
    /// then scale by `zoom`.
    fn transform(&self) -> Transform2D {
        let zoom = self.zoom();
        let mut transform = Transform2D::from_translation(self.viewport_size() * 0.5);
        transform.translate(-self.position() * zoom);
        transform.scale(Vec2::new(zoom, zoom));
        transform
    }

    /// Whether any part of `rect` is inside the view
    fn is_visible(&self, rect: &Rect) -> bool {
        self.view_bounds().intersects(rect)
    }
}

/// Orthographic 2D camera with smoothing and world bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    position: Vec2,
    zoom: f32,
    viewport: Vec2,
    bounds: Option<Rect>,
    min_zoom: f32,
    max_zoom: f32,
    follow_smoothing: f32,
}

impl Camera2D {
    /// Create a camera centered on the origin with default limits
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self::from_config(&CameraConfig {
            viewport_width,
            viewport_height,
            ..CameraConfig::default()
        })
    }

    /// Create a camera from settings
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: Vec2::zeros(),
            zoom: 1.0,
            viewport: Vec2::new(config.viewport_width, config.viewport_height),
            bounds: config.bounds,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            follow_smoothing: config.follow_smoothing,
        };
        camera.set_zoom(config.zoom);
        camera
    }

    /// Size of the view in world units
    fn view_size(&self) -> Vec2 {
        self.viewport / self.zoom
    }

    fn clamp_to_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let half = self.view_size() * 0.5;

        self.position.x = clamp_axis(self.position.x, bounds.left(), bounds.right(), half.x);
        self.position.y = clamp_axis(self.position.y, bounds.top(), bounds.bottom(), half.y);
    }
}

fn clamp_axis(value: f32, min: f32, max: f32, half_view: f32) -> f32 {
    if max - min <= half_view * 2.0 {
        (min + max) * 0.5
    } else {
        value.clamp(min + half_view, max - half_view)
    }
}

impl Camera for Camera2D {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
        self.clamp_to_bounds();
    }

    fn move_by(&mut self, dx: f32, dy: f32) {
        self.position += Vec2::new(dx, dy);
        self.clamp_to_bounds();
    }

    fn follow(&mut self, target: Vec2) {
        self.position.x = utils::lerp(self.position.x, target.x, self.follow_smoothing);
        self.position.y = utils::lerp(self.position.y, target.y, self.follow_smoothing);
        self.clamp_to_bounds();
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = Some(bounds);
        self.clamp_to_bounds();
    }

    fn clear_bounds(&mut self) {
        self.bounds = None;
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.clamp_to_bounds();
    }

    fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
        self.clamp_to_bounds();
    }

    fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.position) * self.zoom
    }

    fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen / self.zoom + self.position
    }

    fn view_bounds(&self) -> Rect {
        Rect::from_center(self.position, self.view_size())
    }
}
