//! Math utilities and types
//!
//! Provides the 2D math types used by physics, camera and rendering.

pub use nalgebra::{Matrix3, Vector2, Vector3};

use serde::{Deserialize, Serialize};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3x3 matrix type (2D affine transforms in homogeneous coordinates)
pub type Mat3 = Matrix3<f32>;

/// Axis-aligned rectangle in world or screen space
///
/// `(x, y)` is the minimum corner; `width` and `height` extend towards +x and +y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x coordinate
    pub x: f32,
    /// Minimum y coordinate
    pub y: f32,
    /// Extent along x
    pub width: f32,
    /// Extent along y
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its minimum corner and size
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle of `size` centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x * 0.5,
            y: center.y - size.y * 0.5,
            width: size.x,
            height: size.y,
        }
    }

    /// Left edge
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge (minimum y)
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge (maximum y)
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Size as a vector
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Check if this rectangle overlaps another (touching edges do not count)
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Check if a point lies inside this rectangle (edges inclusive)
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Check if `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }
}

/// 2D affine transform stored as a homogeneous 3x3 matrix
///
/// Composition follows canvas semantics: `translate` and `scale` are applied
/// in local space, so the most recently appended operation affects points first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    matrix: Mat3,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Mat3::identity(),
        }
    }

    /// Pure translation
    pub fn from_translation(offset: Vec2) -> Self {
        Self {
            matrix: Mat3::new_translation(&offset),
        }
    }

    /// Pure scale
    pub fn from_scale(scale: Vec2) -> Self {
        Self {
            matrix: Mat3::new_nonuniform_scaling(&scale),
        }
    }

    /// Append a translation in local space
    pub fn translate(&mut self, offset: Vec2) {
        self.matrix *= Mat3::new_translation(&offset);
    }

    /// Append a scale in local space
    pub fn scale(&mut self, scale: Vec2) {
        self.matrix *= Mat3::new_nonuniform_scaling(&scale);
    }

    /// Compose `self * other` (other is applied first)
    pub fn then(&self, other: &Transform2D) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point
    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.matrix.transform_point(&point.into()).coords
    }

    /// Transform a rectangle, returning its axis-aligned bounds
    ///
    /// Exact for transforms built from translations and scales.
    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let a = self.apply(Vec2::new(rect.left(), rect.top()));
        let b = self.apply(Vec2::new(rect.right(), rect.bottom()));
        let min = a.inf(&b);
        let max = a.sup(&b);
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Inverse transform, if the matrix is invertible
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// Raw homogeneous matrix
    pub fn matrix(&self) -> &Mat3 {
        &self.matrix
    }
}

/// Math utility functions
pub mod utils {
    /// Exponential smoothing step: move `current` towards `target` by `factor`
    pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
        current + (target - current) * factor
    }

    /// Sign of `value` treating zero as positive
    pub fn axis_sign(value: f32) -> f32 {
        if value < 0.0 {
            -1.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(10.0, 0.0, 5.0, 5.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        // Shared edge is not an overlap
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_rect_from_center() {
        let rect = Rect::from_center(Vec2::new(5.0, 5.0), Vec2::new(4.0, 2.0));
        assert_relative_eq!(rect.x, 3.0);
        assert_relative_eq!(rect.y, 4.0);
        assert_relative_eq!(rect.center().x, 5.0);
        assert_relative_eq!(rect.center().y, 5.0);
    }

    #[test]
    fn test_transform_order_matches_canvas() {
        // translate then scale: points are scaled first, then translated
        let mut transform = Transform2D::identity();
        transform.translate(Vec2::new(100.0, 50.0));
        transform.scale(Vec2::new(2.0, 2.0));

        let p = transform.apply(Vec2::new(3.0, 4.0));
        assert_relative_eq!(p.x, 106.0);
        assert_relative_eq!(p.y, 58.0);

        let back = transform.inverse().unwrap().apply(p);
        assert_relative_eq!(back.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(back.y, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_apply_rect() {
        let transform = Transform2D::from_scale(Vec2::new(2.0, 3.0));
        let rect = transform.apply_rect(&Rect::new(1.0, 1.0, 2.0, 2.0));
        assert_relative_eq!(rect.x, 2.0);
        assert_relative_eq!(rect.y, 3.0);
        assert_relative_eq!(rect.width, 4.0);
        assert_relative_eq!(rect.height, 6.0);
    }
}
