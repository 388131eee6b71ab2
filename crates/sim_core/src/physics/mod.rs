//! 2D rigid-body physics
//!
//! Axis-aligned boxes with mass and velocity, semi-implicit Euler integration,
//! impulse-based collision response and a contact registry that reports when
//! pairs start and stop touching.
//!
//! Collision detection follows the usual two phases:
//! - **Broad phase**: candidate pairs (all pairs, skipping immovable–immovable)
//! - **Narrow phase**: box overlap test producing the separating axis and depth

pub mod body;
pub mod collision;
pub mod engine;

pub use body::{BodyFlags, CollisionCallback, EntityId, PhysicsEntity};
pub use collision::{detect, Collision, CollisionPair};
pub use engine::PhysicsEngine;

use thiserror::Error;

/// Physics errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// No entity with this id exists
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// Mass must be finite and non-negative
    #[error("invalid mass {0}: must be finite and non-negative")]
    InvalidMass(f32),
}
