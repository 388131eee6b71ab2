//! Software RGBA framebuffer implementing [`RenderContext`]
//!
//! Rectangles are rasterized by pixel center coverage and alpha blended over
//! the existing contents. Anything outside the framebuffer is clipped.

use crate::foundation::math::{Rect, Transform2D, Vec2};

use super::context::{Color, RenderContext, StateStack};

/// CPU framebuffer, 4 bytes per pixel in RGBA order
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
    state: StateStack,
}

impl PixelCanvas {
    /// Create a transparent canvas
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
            state: StateStack::default(),
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Color at `(x, y)`, `None` outside the canvas
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        Some(Color::rgba(
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ))
    }

    /// Resize, discarding contents
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
        }
    }

    /// Pixel span `[start, end)` covered along one axis
    fn span(min: f32, max: f32, limit: usize) -> (usize, usize) {
        let start = (min - 0.5).ceil().max(0.0) as usize;
        let end = ((max - 0.5).ceil().max(0.0) as usize).min(limit);
        (start.min(end), end)
    }

    fn blend_device_rect(&mut self, rect: Rect, color: Color) {
        let alpha = f32::from(color.a) / 255.0 * self.state.alpha();
        if alpha <= 0.0 {
            return;
        }

        let (x0, x1) = Self::span(rect.left(), rect.right(), self.width);
        let (y0, y1) = Self::span(rect.top(), rect.bottom(), self.height);
        let source = [color.r, color.g, color.b];

        for y in y0..y1 {
            for x in x0..x1 {
                let idx = (y * self.width + x) * 4;
                for (channel, value) in source.iter().enumerate() {
                    let dst = f32::from(self.pixels[idx + channel]);
                    let out = f32::from(*value) * alpha + dst * (1.0 - alpha);
                    self.pixels[idx + channel] = out.round().clamp(0.0, 255.0) as u8;
                }
                let dst_alpha = f32::from(self.pixels[idx + 3]) / 255.0;
                let out_alpha = alpha + dst_alpha * (1.0 - alpha);
                self.pixels[idx + 3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

impl RenderContext for PixelCanvas {
    fn clear(&mut self, color: Color) {
        let bytes = [color.r, color.g, color.b, color.a];
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&bytes);
        }
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
        let device = self.state.transform().apply_rect(&rect);
        self.blend_device_rect(device, color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        let lw = line_width.max(0.0);
        if lw * 2.0 >= rect.width || lw * 2.0 >= rect.height {
            self.fill_rect(rect, color);
            return;
        }

        // Edges drawn inside the rectangle without overlapping corners
        let inner_height = rect.height - 2.0 * lw;
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, lw), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - lw, rect.width, lw), color);
        self.fill_rect(Rect::new(rect.x, rect.y + lw, lw, inner_height), color);
        self.fill_rect(Rect::new(rect.right() - lw, rect.y + lw, lw, inner_height), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_fill() {
        let mut canvas = PixelCanvas::new(8, 8);
        canvas.clear(Color::BLACK);
        canvas.fill_rect(Rect::new(2.0, 2.0, 3.0, 3.0), Color::RED);

        assert_eq!(canvas.pixel(2, 2), Some(Color::RED));
        assert_eq!(canvas.pixel(4, 4), Some(Color::RED));
        assert_eq!(canvas.pixel(5, 5), Some(Color::BLACK));
        assert_eq!(canvas.pixel(1, 2), Some(Color::BLACK));
        assert_eq!(canvas.pixel(8, 0), None);
    }

    #[test]
    fn test_fill_is_clipped() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(Rect::new(-10.0, -10.0, 12.0, 100.0), Color::WHITE);

        assert_eq!(canvas.pixel(0, 3), Some(Color::WHITE));
        assert_eq!(canvas.pixel(1, 0), Some(Color::WHITE));
        assert_eq!(canvas.pixel(2, 0), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_global_alpha_blends() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.clear(Color::BLACK);
        canvas.set_global_alpha(0.5);
        canvas.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::WHITE);

        let pixel = canvas.pixel(0, 0).unwrap();
        assert_eq!((pixel.r, pixel.g, pixel.b, pixel.a), (128, 128, 128, 255));
    }

    #[test]
    fn test_transform_applies_to_fill() {
        let mut canvas = PixelCanvas::new(10, 10);
        canvas.translate(Vec2::new(4.0, 4.0));
        canvas.scale(Vec2::new(2.0, 2.0));
        canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::GREEN);

        assert_eq!(canvas.pixel(4, 4), Some(Color::GREEN));
        assert_eq!(canvas.pixel(5, 5), Some(Color::GREEN));
        assert_eq!(canvas.pixel(6, 6), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_stroke_leaves_interior() {
        let mut canvas = PixelCanvas::new(6, 6);
        canvas.stroke_rect(Rect::new(0.0, 0.0, 6.0, 6.0), Color::BLUE, 1.0);

        assert_eq!(canvas.pixel(0, 0), Some(Color::BLUE));
        assert_eq!(canvas.pixel(5, 3), Some(Color::BLUE));
        assert_eq!(canvas.pixel(3, 3), Some(Color::TRANSPARENT));
    }
}
