//! Physics engine: integration, containment, collision response and contact lifecycle

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::config::PhysicsConfig;
use crate::events::{Event, EventChannel, EventType};
use crate::foundation::math::{Rect, Vec2};
use crate::scheduler::{Subsystem, SystemError};

use super::body::{EntityId, PhysicsEntity};
use super::collision::{detect, Collision, CollisionPair};
use super::PhysicsError;

/// Simulates a set of axis-aligned rigid bodies
///
/// Each step integrates every non-kinematic body, keeps bodies inside the
/// world bounds, resolves overlapping pairs and produces `CollisionStart` /
/// `CollisionEnd` for pairs whose contact state changed since the last step.
///
/// [`PhysicsEngine::update`] publishes those events on the bus straight away.
/// Run as a scheduled subsystem, the engine only buffers them and the
/// scheduler publishes them after the step returns, so collision listeners can
/// borrow the engine through a shared handle.
pub struct PhysicsEngine {
    entities: Vec<PhysicsEntity>,
    next_id: u32,
    config: PhysicsConfig,
    contacts: BTreeMap<CollisionPair, Collision>,
    pending: Vec<Event>,
    bus: Rc<dyn EventChannel>,
    time: f64,
}

impl PhysicsEngine {
    /// Create an empty world
    pub fn new(config: PhysicsConfig, bus: Rc<dyn EventChannel>) -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
            config,
            contacts: BTreeMap::new(),
            pending: Vec::new(),
            bus,
            time: 0.0,
        }
    }

    /// Add a body and return its newly allocated id
    pub fn add_entity(&mut self, mut entity: PhysicsEntity) -> Result<EntityId, PhysicsError> {
        if !entity.mass.is_finite() || entity.mass < 0.0 {
            return Err(PhysicsError::InvalidMass(entity.mass));
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        entity.force = Vec2::zeros();

        log::trace!("Added physics entity {} at {:?}", id, entity.position);
        self.entities.push(entity);
        Ok(id)
    }

    /// Remove a body, silently dropping its contacts
    pub fn remove_entity(&mut self, id: EntityId) -> Result<PhysicsEntity, PhysicsError> {
        let index = self.index_of(id)?;
        self.contacts.retain(|pair, _| !pair.involves(id));
        Ok(self.entities.remove(index))
    }

    /// Look up a body
    pub fn get_entity(&self, id: EntityId) -> Option<&PhysicsEntity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// Look up a body for mutation
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut PhysicsEntity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    /// All bodies in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &PhysicsEntity> {
        self.entities.iter()
    }

    /// Number of bodies
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Remove every body and contact
    pub fn clear(&mut self) {
        self.entities.clear();
        self.contacts.clear();
        self.pending.clear();
    }

    /// Accumulate a force, applied on the next step
    pub fn apply_force(&mut self, id: EntityId, force: Vec2) -> Result<(), PhysicsError> {
        let index = self.index_of(id)?;
        self.entities[index].force += force;
        Ok(())
    }

    /// Change velocity immediately by `impulse / mass`
    ///
    /// Ignored for massless and immovable bodies.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec2) -> Result<(), PhysicsError> {
        let index = self.index_of(id)?;
        let entity = &mut self.entities[index];
        entity.velocity += impulse * entity.inverse_mass();
        Ok(())
    }

    /// Replace the gravity vector
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    /// Current gravity vector
    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    /// Replace the containment rectangle
    pub fn set_world_bounds(&mut self, bounds: Option<Rect>) {
        self.config.world_bounds = bounds;
    }

    /// Current containment rectangle
    pub fn world_bounds(&self) -> Option<Rect> {
        self.config.world_bounds
    }

    /// Active settings
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Simulated seconds accumulated by `update`
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Bodies whose bounds overlap `area`
    pub fn query_aabb(&self, area: &Rect) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.bounds().intersects(area))
            .map(PhysicsEntity::id)
            .collect()
    }

    /// Bodies whose bounds contain `point`
    pub fn query_point(&self, point: Vec2) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.bounds().contains_point(point))
            .map(PhysicsEntity::id)
            .collect()
    }

    /// Contacts found by the last step, ordered by pair
    pub fn collisions(&self) -> impl Iterator<Item = &Collision> {
        self.contacts.values()
    }

    /// Whether two bodies were touching after the last step
    pub fn is_touching(&self, a: EntityId, b: EntityId) -> bool {
        self.contacts.contains_key(&CollisionPair::new(a, b))
    }

    /// Advance the simulation by `dt` seconds and publish collision events
    pub fn update(&mut self, dt: f32) {
        self.step(dt);
        for event in self.drain_events() {
            self.bus.publish(event);
        }
    }

    /// Advance the simulation by `dt` seconds, buffering collision events
    pub fn step(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, self.config.max_delta_time);
        self.time += f64::from(dt);

        self.integrate(dt);
        self.contain();

        let detected = self.resolve_collisions();
        self.update_contacts(detected);
    }

    /// Take the collision events buffered by [`PhysicsEngine::step`]
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    fn index_of(&self, id: EntityId) -> Result<usize, PhysicsError> {
        self.entities
            .iter()
            .position(|entity| entity.id == id)
            .ok_or(PhysicsError::UnknownEntity(id))
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        let air_resistance = self.config.air_resistance;

        for entity in self.entities.iter_mut().filter(|entity| !entity.is_kinematic()) {
            if entity.mass > 0.0 {
                let acceleration = gravity + entity.force / entity.mass;
                entity.velocity += acceleration * dt;
            }
            entity.velocity *= air_resistance;
            entity.position += entity.velocity * dt;
            entity.force = Vec2::zeros();
        }
    }

    /// Clamp bodies inside the world bounds, reflecting and damping velocity
    fn contain(&mut self) {
        let Some(world) = self.config.world_bounds else {
            return;
        };
        let damping = self.config.bounce_damping;

        for entity in self.entities.iter_mut().filter(|entity| !entity.is_kinematic()) {
            let half = entity.size * 0.5;
            contain_axis(
                &mut entity.position.x,
                &mut entity.velocity.x,
                half.x,
                (world.left(), world.right()),
                damping,
            );
            contain_axis(
                &mut entity.position.y,
                &mut entity.velocity.y,
                half.y,
                (world.top(), world.bottom()),
                damping,
            );
        }
    }

    /// Candidate pairs by index; pairs of two immovable bodies are skipped
    ///
    /// All pairs are tested. A spatial partition can replace this without
    /// changing the narrow phase.
    fn broad_phase(&self) -> Vec<(usize, usize)> {
        let count = self.entities.len();
        let mut pairs = Vec::new();
        for i in 0..count {
            for j in (i + 1)..count {
                if self.entities[i].is_immovable() && self.entities[j].is_immovable() {
                    continue;
                }
                pairs.push((i, j));
            }
        }
        pairs
    }

    fn resolve_collisions(&mut self) -> Vec<Collision> {
        let restitution = self.config.restitution;
        let mut detected = Vec::new();

        for (i, j) in self.broad_phase() {
            let (head, tail) = self.entities.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];

            let Some(collision) = detect(a, b) else {
                continue;
            };

            separate(a, b, &collision);
            apply_bounce(a, b, &collision, restitution);

            if let Some(callback) = a.on_collision.as_mut() {
                callback(b);
            }
            if let Some(callback) = b.on_collision.as_mut() {
                callback(a);
            }
            detected.push(collision);
        }
        detected
    }

    /// Replace the contact registry, publishing lifecycle transitions
    fn update_contacts(&mut self, detected: Vec<Collision>) {
        let mut current = BTreeMap::new();
        for collision in detected {
            let pair = collision.pair();
            if !self.contacts.contains_key(&pair) && !current.contains_key(&pair) {
                log::debug!("Collision started: {}", pair);
                self.pending
                    .push(collision.to_event(EventType::CollisionStart, self.time));
            }
            current.insert(pair, collision);
        }

        let previous = std::mem::replace(&mut self.contacts, current);
        for (pair, collision) in previous {
            if !self.contacts.contains_key(&pair) {
                log::debug!("Collision ended: {}", pair);
                self.pending
                    .push(collision.to_event(EventType::CollisionEnd, self.time));
            }
        }
    }
}

/// Keep one axis of a body inside `[min, max]`
///
/// A body longer than the world on this axis is centered on it.
fn contain_axis(position: &mut f32, velocity: &mut f32, half: f32, (min, max): (f32, f32), damping: f32) {
    let (low, high) = (*position - half, *position + half);
    if low >= min && high <= max {
        return;
    }

    *position = if half * 2.0 > max - min {
        (min + max) * 0.5
    } else if low < min {
        min + half
    } else {
        max - half
    };
    *velocity = -*velocity * damping;
}

/// Push two overlapping bodies apart along the collision normal
///
/// Displacement is shared in inverse proportion to mass. An immovable body
/// stays put and its partner takes the full depth. Nothing moves when the
/// total mass is zero.
fn separate(a: &mut PhysicsEntity, b: &mut PhysicsEntity, collision: &Collision) {
    let total_mass = a.mass + b.mass;
    if total_mass <= 0.0 {
        return;
    }
    let correction = collision.normal * collision.depth;

    match (a.is_immovable(), b.is_immovable()) {
        (false, false) => {
            a.position -= correction * (b.mass / total_mass);
            b.position += correction * (a.mass / total_mass);
        }
        (true, false) => b.position += correction,
        (false, true) => a.position -= correction,
        (true, true) => {}
    }
}

/// Exchange an impulse along the normal if the bodies are approaching
fn apply_bounce(a: &mut PhysicsEntity, b: &mut PhysicsEntity, collision: &Collision, restitution: f32) {
    if a.mass + b.mass <= 0.0 {
        return;
    }
    let inverse_a = a.inverse_mass();
    let inverse_b = b.inverse_mass();
    let inverse_sum = inverse_a + inverse_b;
    if inverse_sum <= 0.0 {
        return;
    }

    let normal = collision.normal;
    let approach = (b.velocity - a.velocity).dot(&normal);
    if approach > 0.0 {
        return;
    }

    let impulse = -(1.0 + restitution) * approach / inverse_sum;
    a.velocity -= normal * (impulse * inverse_a);
    b.velocity += normal * (impulse * inverse_b);
}

impl Subsystem for PhysicsEngine {
    fn name(&self) -> &str {
        "physics"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn initialize(&mut self) -> Result<(), SystemError> {
        log::debug!(
            "Physics initialized: {} entities, gravity {:?}",
            self.entities.len(),
            self.config.gravity
        );
        Ok(())
    }

    fn update(&mut self, delta_time: f32) -> Result<(), SystemError> {
        self.step(delta_time);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.contacts.clear();
        self.pending.clear();
    }

    fn drain_events(&mut self) -> Vec<Event> {
        PhysicsEngine::drain_events(self)
    }
}
