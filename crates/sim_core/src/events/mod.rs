//! Event bus following Game Engine Architecture Ch 16.8
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Registration system (only notify interested handlers)
//! - Immediate delivery plus a deferred queue flushed once per tick
//! - Every handler runs inside its own failure boundary
//!
//! Components never own a global bus. They receive an `Rc<dyn EventChannel>`
//! handle, which lets tests substitute a recording channel.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec2;
use crate::foundation::panic_message;

new_key_type! {
    /// Handle returned by subscription, used to unsubscribe
    pub struct ListenerId;
}

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Two physics entities started touching
    CollisionStart,
    /// Two physics entities stopped touching
    CollisionEnd,
    /// A subsystem failed during update
    SystemError,
    /// The frame loop started ticking
    LoopStarted,
    /// The frame loop stopped
    LoopStopped,
    /// Subsystem updates were suspended
    LoopPaused,
    /// Subsystem updates were resumed
    LoopResumed,
    /// Application-defined event (score, health, input actions, ...)
    Custom(&'static str),
}

impl EventType {
    /// Stable snake_case name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollisionStart => "collision_start",
            Self::CollisionEnd => "collision_end",
            Self::SystemError => "system_error",
            Self::LoopStarted => "loop_started",
            Self::LoopStopped => "loop_stopped",
            Self::LoopPaused => "loop_paused",
            Self::LoopResumed => "loop_resumed",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Entity or object identifier
    Id(u32),
    /// 2D vector
    Vector(Vec2),
    /// Scalar value
    Scalar(f32),
    /// Free-form text
    Text(String),
    /// Boolean flag
    Flag(bool),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Timestamp when event was created (seconds)
    pub timestamp: f64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with the given type and timestamp
    pub fn new(event_type: EventType, timestamp: f64) -> Self {
        Self {
            event_type,
            timestamp,
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get an id argument if present
    pub fn get_id(&self, key: &str) -> Option<u32> {
        match self.get_arg(key) {
            Some(EventArg::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get a vector argument if present
    pub fn get_vector(&self, key: &str) -> Option<Vec2> {
        match self.get_arg(key) {
            Some(EventArg::Vector(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get a scalar argument if present
    pub fn get_scalar(&self, key: &str) -> Option<f32> {
        match self.get_arg(key) {
            Some(EventArg::Scalar(s)) => Some(*s),
            _ => None,
        }
    }

    /// Get a text argument if present
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get_arg(key) {
            Some(EventArg::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Get a flag argument if present
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        match self.get_arg(key) {
            Some(EventArg::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }
}

/// Boxed event handler
pub type Handler = Box<dyn FnMut(&Event)>;

/// Publish/subscribe capability injected into components
pub trait EventChannel {
    /// Deliver an event to its listeners immediately
    fn publish(&self, event: Event);

    /// Queue an event for delivery on the next `flush`
    fn post(&self, event: Event);

    /// Register a handler for an event type
    fn subscribe(&self, event_type: EventType, handler: Handler) -> ListenerId;

    /// Remove a handler, returning whether it was registered
    fn unsubscribe(&self, event_type: EventType, id: ListenerId) -> bool;

    /// Deliver all queued events
    fn flush(&self);
}

struct ListenerEntry {
    event_type: EventType,
    once: bool,
    handler: Rc<RefCell<Handler>>,
}

#[derive(Default)]
struct Registry {
    listeners: SlotMap<ListenerId, ListenerEntry>,
    by_type: HashMap<EventType, Vec<ListenerId>>,
    deferred: VecDeque<Event>,
}

impl Registry {
    fn insert(&mut self, event_type: EventType, once: bool, handler: Handler) -> ListenerId {
        let id = self.listeners.insert(ListenerEntry {
            event_type,
            once,
            handler: Rc::new(RefCell::new(handler)),
        });
        self.by_type.entry(event_type).or_default().push(id);
        id
    }

    fn remove(&mut self, event_type: EventType, id: ListenerId) -> bool {
        match self.listeners.get(id) {
            Some(entry) if entry.event_type == event_type => {}
            _ => return false,
        }
        self.listeners.remove(id);
        if let Some(ids) = self.by_type.get_mut(&event_type) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_type.remove(&event_type);
            }
        }
        true
    }
}

/// Synchronous event bus
///
/// Cloning produces another handle to the same listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("listeners", &registry.listeners.len())
            .field("deferred", &registry.deferred.len())
            .finish()
    }
}

impl EventBus {
    /// Create a new bus with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler invoked for every event of `event_type`
    pub fn on(&self, event_type: EventType, handler: impl FnMut(&Event) + 'static) -> ListenerId {
        self.registry
            .borrow_mut()
            .insert(event_type, false, Box::new(handler))
    }

    /// Register a handler invoked for the next event of `event_type` only
    pub fn once(&self, event_type: EventType, handler: impl FnMut(&Event) + 'static) -> ListenerId {
        self.registry
            .borrow_mut()
            .insert(event_type, true, Box::new(handler))
    }

    /// Unregister a handler
    pub fn off(&self, event_type: EventType, id: ListenerId) -> bool {
        self.registry.borrow_mut().remove(event_type, id)
    }

    /// Unregister every handler for `event_type`, or every handler when `None`
    pub fn remove_all_listeners(&self, event_type: Option<EventType>) {
        let mut registry = self.registry.borrow_mut();
        match event_type {
            Some(event_type) => {
                if let Some(ids) = registry.by_type.remove(&event_type) {
                    for id in ids {
                        registry.listeners.remove(id);
                    }
                }
            }
            None => {
                registry.listeners.clear();
                registry.by_type.clear();
            }
        }
    }

    /// Number of handlers registered for `event_type`
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry
            .borrow()
            .by_type
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Number of events waiting in the deferred queue
    pub fn pending_count(&self) -> usize {
        self.registry.borrow().deferred.len()
    }

    /// Dispatch an event to its handlers in registration order
    ///
    /// The handler list is snapshotted before dispatch, so handlers may
    /// subscribe, unsubscribe or emit while running. Returns the number of
    /// handlers that completed without panicking.
    pub fn emit(&self, event: &Event) -> usize {
        let snapshot: Vec<(ListenerId, Rc<RefCell<Handler>>)> = {
            let mut registry = self.registry.borrow_mut();
            let ids = registry
                .by_type
                .get(&event.event_type)
                .cloned()
                .unwrap_or_default();

            let mut snapshot = Vec::with_capacity(ids.len());
            for id in ids {
                let Some(entry) = registry.listeners.get(id) else {
                    continue;
                };
                let once = entry.once;
                snapshot.push((id, Rc::clone(&entry.handler)));
                if once {
                    registry.remove(event.event_type, id);
                }
            }
            snapshot
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                log::warn!(
                    "Skipping re-entrant listener {:?} for '{}'",
                    id,
                    event.event_type
                );
                continue;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    log::error!(
                        "Listener {:?} for '{}' panicked: {}",
                        id,
                        event.event_type,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        delivered
    }

    /// Queue an event for deferred delivery
    pub fn post(&self, event: Event) {
        self.registry.borrow_mut().deferred.push_back(event);
    }

    /// Deliver queued events in FIFO order, returning how many were delivered
    ///
    /// Events posted by handlers during the flush are delivered by it too.
    pub fn flush(&self) -> usize {
        let mut count = 0;
        loop {
            let next = self.registry.borrow_mut().deferred.pop_front();
            let Some(event) = next else {
                break;
            };
            self.emit(&event);
            count += 1;
        }
        count
    }

    /// Drop all queued events without delivering them
    pub fn clear_pending(&self) {
        self.registry.borrow_mut().deferred.clear();
    }
}

impl EventChannel for EventBus {
    fn publish(&self, event: Event) {
        self.emit(&event);
    }

    fn post(&self, event: Event) {
        EventBus::post(self, event);
    }

    fn subscribe(&self, event_type: EventType, handler: Handler) -> ListenerId {
        self.registry.borrow_mut().insert(event_type, false, handler)
    }

    fn unsubscribe(&self, event_type: EventType, id: ListenerId) -> bool {
        self.off(event_type, id)
    }

    fn flush(&self) {
        EventBus::flush(self);
    }
}

/// Channel that records published events instead of dispatching them
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub(crate) events: RefCell<Vec<Event>>,
}

#[cfg(test)]
impl RecordingChannel {
    pub(crate) fn of_type(&self, event_type: EventType) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
impl EventChannel for RecordingChannel {
    fn publish(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn post(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn subscribe(&self, _event_type: EventType, _handler: Handler) -> ListenerId {
        ListenerId::default()
    }

    fn unsubscribe(&self, _event_type: EventType, _id: ListenerId) -> bool {
        false
    }

    fn flush(&self) {}
}
