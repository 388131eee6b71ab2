//! Rigid axis-aligned bodies simulated by the physics engine

use std::fmt;

use bitflags::bitflags;

use crate::foundation::math::{Rect, Vec2};

/// Unique identifier of a physics entity, allocated by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// How a body takes part in the simulation
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BodyFlags: u8 {
        /// Not integrated: gravity, forces and velocity never move it
        const KINEMATIC = 1 << 0;
        /// Never displaced or impulsed by collision response
        const IMMOVABLE = 1 << 1;
        /// Fixed scenery
        const STATIC = Self::KINEMATIC.bits() | Self::IMMOVABLE.bits();
    }
}

/// Callback invoked with the other entity whenever this one collides
pub type CollisionCallback = Box<dyn FnMut(&PhysicsEntity)>;

/// A rectangle with mass and velocity
///
/// `position` is the center of the body; `size` is its full width and height.
pub struct PhysicsEntity {
    pub(crate) id: EntityId,
    /// Center position (world units)
    pub position: Vec2,
    /// Velocity (world units per second)
    pub velocity: Vec2,
    /// Full width and height
    pub size: Vec2,
    pub(crate) mass: f32,
    pub(crate) flags: BodyFlags,
    pub(crate) force: Vec2,
    pub(crate) on_collision: Option<CollisionCallback>,
}

impl PhysicsEntity {
    /// Create a dynamic body of mass 1 at rest
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            id: EntityId::default(),
            position,
            velocity: Vec2::zeros(),
            size,
            mass: 1.0,
            flags: BodyFlags::empty(),
            force: Vec2::zeros(),
            on_collision: None,
        }
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the mass; zero makes the body ignore gravity and impulses
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Mark the body as fixed scenery
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.set_static(is_static);
        self
    }

    /// Replace the body flags
    pub fn with_flags(mut self, flags: BodyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Run `callback` with the other entity on every collision
    pub fn with_collision_callback(mut self, callback: impl FnMut(&PhysicsEntity) + 'static) -> Self {
        self.on_collision = Some(Box::new(callback));
        self
    }

    /// Identifier assigned when the body was added to an engine
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Mass
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Current flags
    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    /// Force accumulated since the last integration step
    pub fn accumulated_force(&self) -> Vec2 {
        self.force
    }

    /// Set or clear both static flags
    pub fn set_static(&mut self, is_static: bool) {
        self.flags.set(BodyFlags::STATIC, is_static);
    }

    /// Whether the body is fully static
    pub fn is_static(&self) -> bool {
        self.flags.contains(BodyFlags::STATIC)
    }

    /// Whether integration skips this body
    pub fn is_kinematic(&self) -> bool {
        self.flags.contains(BodyFlags::KINEMATIC)
    }

    /// Whether collision response leaves this body in place
    pub fn is_immovable(&self) -> bool {
        self.flags.contains(BodyFlags::IMMOVABLE)
    }

    /// Inverse mass used by impulse resolution; zero for immovable or massless bodies
    pub fn inverse_mass(&self) -> f32 {
        if self.is_immovable() || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Axis-aligned bounding box
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }
}

impl fmt::Debug for PhysicsEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsEntity")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("size", &self.size)
            .field("mass", &self.mass)
            .field("flags", &self.flags)
            .field("has_callback", &self.on_collision.is_some())
            .finish()
    }
}
