//! Frame rendering: visibility filtering, culling, depth ordering and drawing

use std::rc::Rc;

use crate::core::config::RenderConfig;
use crate::foundation::math::Vec2;
use crate::foundation::time::Clock;
use crate::scheduler::{Subsystem, SystemError};

use super::camera::Camera;
use super::context::RenderContext;
use super::drawable::{Drawable, DrawableId};
use super::RenderError;

/// Per-frame rendering statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderStats {
    /// Frames per second derived from the smoothed frame time
    pub fps: f32,
    /// Time since the previous frame (ms)
    pub frame_time: f32,
    /// Exponentially smoothed frame time (ms)
    pub average_frame_time: f32,
    /// Drawables drawn last frame
    pub drawn: usize,
    /// Visible drawables skipped because they were outside the view
    pub culled: usize,
    /// Drawables skipped because they were hidden
    pub hidden: usize,
    /// Frames rendered
    pub frame_count: u64,
}

/// Owns the drawables, the camera and the drawing surface
pub struct RenderPipeline<C: RenderContext> {
    objects: Vec<Box<dyn Drawable>>,
    camera: Box<dyn Camera>,
    context: C,
    config: RenderConfig,
    clock: Rc<dyn Clock>,
    stats: RenderStats,
    last_frame: Option<f64>,
}

impl<C: RenderContext> RenderPipeline<C> {
    /// Create a pipeline drawing into `context`
    pub fn new(context: C, camera: Box<dyn Camera>, config: RenderConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            objects: Vec::new(),
            camera,
            context,
            config,
            clock,
            stats: RenderStats::default(),
            last_frame: None,
        }
    }

    /// Register a drawable; ids must be unique
    pub fn add_object(&mut self, object: Box<dyn Drawable>) -> Result<(), RenderError> {
        let id = object.id();
        if self.objects.iter().any(|existing| existing.id() == id) {
            return Err(RenderError::DuplicateObject(id));
        }
        self.objects.push(object);
        Ok(())
    }

    /// Unregister a drawable
    pub fn remove_object(&mut self, id: DrawableId) -> Option<Box<dyn Drawable>> {
        let index = self.objects.iter().position(|object| object.id() == id)?;
        Some(self.objects.remove(index))
    }

    /// Look up a drawable
    pub fn get_object(&self, id: DrawableId) -> Option<&dyn Drawable> {
        self.objects
            .iter()
            .find(|object| object.id() == id)
            .map(|object| &**object)
    }

    /// Look up a drawable for mutation
    pub fn get_object_mut(&mut self, id: DrawableId) -> Option<&mut (dyn Drawable + 'static)> {
        self.objects
            .iter_mut()
            .find(|object| object.id() == id)
            .map(|object| &mut **object)
    }

    /// Look up a drawable as its concrete type
    pub fn get_object_as<T: 'static>(&self, id: DrawableId) -> Option<&T> {
        self.get_object(id)?.as_any().downcast_ref()
    }

    /// Look up a drawable as its concrete type for mutation
    pub fn get_object_as_mut<T: 'static>(&mut self, id: DrawableId) -> Option<&mut T> {
        self.get_object_mut(id)?.as_any_mut().downcast_mut()
    }

    /// Number of registered drawables
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Active camera
    pub fn camera(&self) -> &dyn Camera {
        self.camera.as_ref()
    }

    /// Active camera for mutation
    pub fn camera_mut(&mut self) -> &mut (dyn Camera + 'static) {
        self.camera.as_mut()
    }

    /// Replace the camera
    pub fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.camera = camera;
    }

    /// Drawing surface
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Drawing surface for mutation
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Statistics of the last frame
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Active settings
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Draw one frame
    pub fn render(&mut self) {
        self.update_timing();

        let camera = &*self.camera;
        let context = &mut self.context;
        let zoom = camera.zoom();

        context.clear(self.config.background);
        context.save();
        context.translate(camera.viewport_size() * 0.5);
        context.translate(-camera.position() * zoom);
        context.scale(Vec2::new(zoom, zoom));

        let mut hidden = 0;
        let mut culled = 0;
        let mut queue: Vec<&dyn Drawable> = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            if !object.visible() {
                hidden += 1;
            } else if self.config.culling && !camera.is_visible(&object.bounds()) {
                culled += 1;
            } else {
                queue.push(&**object);
            }
        }
        // Stable: equal z-index keeps registration order
        queue.sort_by_key(|object| object.z_index());

        let base_alpha = context.global_alpha();
        for object in &queue {
            context.save();
            context.set_global_alpha(base_alpha * object.opacity());
            object.draw(&mut *context, camera);
            context.restore();
        }
        context.restore();

        self.stats.drawn = queue.len();
        self.stats.culled = culled;
        self.stats.hidden = hidden;
        log::trace!(
            "Frame {}: drew {}, culled {}, hidden {}",
            self.stats.frame_count,
            self.stats.drawn,
            culled,
            hidden
        );
    }

    fn update_timing(&mut self) {
        let now = self.clock.now();
        if let Some(last) = self.last_frame {
            let sample = ((now - last).max(0.0) * 1000.0) as f32;
            let stats = &mut self.stats;
            stats.frame_time = sample;
            stats.average_frame_time = if stats.average_frame_time > 0.0 {
                let smoothing = self.config.stats_smoothing;
                stats.average_frame_time * smoothing + sample * (1.0 - smoothing)
            } else {
                sample
            };
            stats.fps = if stats.average_frame_time > 0.0 {
                1000.0 / stats.average_frame_time
            } else {
                0.0
            };
        }
        self.last_frame = Some(now);
        self.stats.frame_count += 1;
    }
}

impl<C: RenderContext> Subsystem for RenderPipeline<C> {
    fn name(&self) -> &str {
        "render"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn initialize(&mut self) -> Result<(), SystemError> {
        self.last_frame = None;
        self.stats = RenderStats::default();
        log::debug!("Render pipeline initialized with {} objects", self.objects.len());
        Ok(())
    }

    fn update(&mut self, _delta_time: f32) -> Result<(), SystemError> {
        self.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Rect;
    use crate::foundation::time::ManualClock;
    use crate::render::camera::Camera2D;
    use crate::render::context::{Color, DrawCommand, RecordingContext};
    use crate::render::drawable::Sprite;
    use approx::assert_relative_eq;

    fn pipeline(clock: &ManualClock) -> RenderPipeline<RecordingContext> {
        RenderPipeline::new(
            RecordingContext::new(),
            Box::new(Camera2D::new(100.0, 100.0)),
            RenderConfig::default(),
            Rc::new(clock.clone()),
        )
    }

    fn sprite(id: u32, x: f32, color: Color) -> Sprite {
        Sprite::new(DrawableId(id), Vec2::new(x, 0.0), Vec2::new(10.0, 10.0), color)
    }

    fn fills(context: &RecordingContext) -> Vec<(Color, f32)> {
        context
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillRect { color, alpha, .. } => Some((*color, *alpha)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_hidden_and_culled_are_not_drawn() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);

        pipeline.add_object(Box::new(sprite(1, 0.0, Color::RED))).unwrap();
        let mut hidden = sprite(2, 10.0, Color::GREEN);
        hidden.visible = false;
        pipeline.add_object(Box::new(hidden)).unwrap();
        pipeline.add_object(Box::new(sprite(3, 500.0, Color::BLUE))).unwrap();

        pipeline.render();

        assert_eq!(fills(pipeline.context()), vec![(Color::RED, 1.0)]);
        let stats = pipeline.stats();
        assert_eq!((stats.drawn, stats.culled, stats.hidden), (1, 1, 1));
    }

    #[test]
    fn test_culling_can_be_disabled() {
        let clock = ManualClock::new();
        let mut pipeline = RenderPipeline::new(
            RecordingContext::new(),
            Box::new(Camera2D::new(100.0, 100.0)),
            RenderConfig {
                culling: false,
                ..RenderConfig::default()
            },
            Rc::new(clock),
        );
        pipeline.add_object(Box::new(sprite(1, 500.0, Color::BLUE))).unwrap();

        pipeline.render();
        assert_eq!(pipeline.stats().drawn, 1);
    }

    #[test]
    fn test_draws_in_z_order_stably() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);

        pipeline.add_object(Box::new(sprite(1, 0.0, Color::RED).with_z_index(5))).unwrap();
        pipeline.add_object(Box::new(sprite(2, 0.0, Color::GREEN).with_z_index(-1))).unwrap();
        pipeline.add_object(Box::new(sprite(3, 0.0, Color::BLUE).with_z_index(5))).unwrap();
        pipeline.add_object(Box::new(sprite(4, 0.0, Color::WHITE))).unwrap();

        pipeline.render();

        let order: Vec<Color> = fills(pipeline.context()).into_iter().map(|(color, _)| color).collect();
        assert_eq!(order, vec![Color::GREEN, Color::WHITE, Color::RED, Color::BLUE]);
    }

    #[test]
    fn test_recording_holds_a_single_frame() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);
        pipeline.add_object(Box::new(sprite(1, 0.0, Color::RED))).unwrap();

        for _ in 0..100 {
            clock.advance(0.016);
            pipeline.render();
        }

        assert_eq!(pipeline.context().commands().len(), 2);
        assert_eq!(pipeline.stats().frame_count, 100);
    }

    #[test]
    fn test_frame_structure_and_camera_transform() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);
        pipeline.camera_mut().set_position(20.0, 0.0);
        pipeline.camera_mut().set_zoom(2.0);
        pipeline.add_object(Box::new(sprite(1, 20.0, Color::RED).with_opacity(0.25))).unwrap();

        pipeline.render();

        let context = pipeline.context();
        assert_eq!(context.commands()[0], DrawCommand::Clear(Color::BLACK));
        assert_eq!(
            context.commands()[1],
            DrawCommand::FillRect {
                rect: Rect::new(40.0, 40.0, 20.0, 20.0),
                color: Color::RED,
                alpha: 0.25,
            }
        );
        assert_eq!(context.save_depth(), 0);
    }

    #[test]
    fn test_duplicate_ids_and_downcast() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);

        pipeline.add_object(Box::new(sprite(7, 0.0, Color::RED))).unwrap();
        assert!(matches!(
            pipeline.add_object(Box::new(sprite(7, 0.0, Color::RED))),
            Err(RenderError::DuplicateObject(DrawableId(7)))
        ));

        pipeline
            .get_object_as_mut::<Sprite>(DrawableId(7))
            .unwrap()
            .color = Color::GREEN;
        assert_eq!(pipeline.get_object_as::<Sprite>(DrawableId(7)).unwrap().color, Color::GREEN);

        assert!(pipeline.remove_object(DrawableId(7)).is_some());
        assert!(pipeline.get_object(DrawableId(7)).is_none());
        assert_eq!(pipeline.object_count(), 0);
    }

    #[test]
    fn test_frame_time_smoothing() {
        let clock = ManualClock::new();
        let mut pipeline = pipeline(&clock);

        pipeline.render();
        clock.advance(0.020);
        pipeline.render();
        assert_relative_eq!(pipeline.stats().average_frame_time, 20.0, epsilon = 1e-3);

        clock.advance(0.010);
        pipeline.render();
        // 20 * 0.9 + 10 * 0.1
        assert_relative_eq!(pipeline.stats().average_frame_time, 19.0, epsilon = 1e-3);
        assert_relative_eq!(pipeline.stats().frame_time, 10.0, epsilon = 1e-3);
        assert_relative_eq!(pipeline.stats().fps, 1000.0 / 19.0, epsilon = 1e-2);
        assert_eq!(pipeline.stats().frame_count, 3);
    }
}
