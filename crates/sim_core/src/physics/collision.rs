//! Narrow-phase collision detection and contact records
//!
//! Bodies are axis-aligned boxes, so detection reduces to comparing
//! half-extents against the distance between centers on each axis. The axis
//! with the smaller overlap is the separating axis.

use std::fmt;

use crate::events::{Event, EventArg, EventType};
use crate::foundation::math::{utils::axis_sign, Vec2};

use super::body::{EntityId, PhysicsEntity};

/// Unordered pair of touching entities; the smaller id is always stored first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    /// Smaller entity id
    pub entity_a: EntityId,
    /// Larger entity id
    pub entity_b: EntityId,
}

impl CollisionPair {
    /// Create a pair key, sorting the ids
    pub fn new(entity_a: EntityId, entity_b: EntityId) -> Self {
        if entity_a <= entity_b {
            Self { entity_a, entity_b }
        } else {
            Self {
                entity_a: entity_b,
                entity_b: entity_a,
            }
        }
    }

    /// Whether `id` is one of the two entities
    pub fn involves(&self, id: EntityId) -> bool {
        self.entity_a == id || self.entity_b == id
    }
}

impl fmt::Display for CollisionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_a, self.entity_b)
    }
}

/// Contact between two overlapping entities
///
/// `normal` is a unit axis vector pointing from `entity_a` towards `entity_b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// First entity, in detection order
    pub entity_a: EntityId,
    /// Second entity, in detection order
    pub entity_b: EntityId,
    /// Separating axis, pointing from A to B
    pub normal: Vec2,
    /// Overlap along the normal (always positive)
    pub depth: f32,
    /// `normal * depth`
    pub penetration: Vec2,
}

impl Collision {
    /// Registry key of this contact
    pub fn pair(&self) -> CollisionPair {
        CollisionPair::new(self.entity_a, self.entity_b)
    }

    /// Encode as a `CollisionStart` or `CollisionEnd` event
    pub fn to_event(&self, event_type: EventType, timestamp: f64) -> Event {
        Event::new(event_type, timestamp)
            .with_arg("entity_a", EventArg::Id(self.entity_a.0))
            .with_arg("entity_b", EventArg::Id(self.entity_b.0))
            .with_arg("normal", EventArg::Vector(self.normal))
            .with_arg("depth", EventArg::Scalar(self.depth))
            .with_arg("penetration", EventArg::Vector(self.penetration))
    }

    /// Decode a collision event; `None` if any argument is missing
    pub fn from_event(event: &Event) -> Option<Self> {
        Some(Self {
            entity_a: EntityId(event.get_id("entity_a")?),
            entity_b: EntityId(event.get_id("entity_b")?),
            normal: event.get_vector("normal")?,
            depth: event.get_scalar("depth")?,
            penetration: event.get_vector("penetration")?,
        })
    }
}

impl Event {
    /// Collision payload of a `CollisionStart` / `CollisionEnd` event
    pub fn collision(&self) -> Option<Collision> {
        match self.event_type {
            EventType::CollisionStart | EventType::CollisionEnd => Collision::from_event(self),
            _ => None,
        }
    }
}

/// Test two bodies for overlap
///
/// Touching edges do not count. Ties between the axis overlaps resolve along x;
/// coincident centers produce a positive normal.
pub fn detect(a: &PhysicsEntity, b: &PhysicsEntity) -> Option<Collision> {
    let delta = b.position - a.position;
    let overlap_x = (a.size.x + b.size.x) * 0.5 - delta.x.abs();
    let overlap_y = (a.size.y + b.size.y) * 0.5 - delta.y.abs();

    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }

    let (normal, depth) = if overlap_x <= overlap_y {
        (Vec2::new(axis_sign(delta.x), 0.0), overlap_x)
    } else {
        (Vec2::new(0.0, axis_sign(delta.y)), overlap_y)
    };

    Some(Collision {
        entity_a: a.id,
        entity_b: b.id,
        normal,
        depth,
        penetration: normal * depth,
    })
}
