//! Subsystem trait and adapters

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::events::Event;

/// A unit of per-frame work driven by the scheduler
///
/// Lifecycle: `initialize` once when the loop starts, `update` every active
/// tick in ascending priority order, `cleanup` once when the loop stops or the
/// subsystem is removed.
pub trait Subsystem {
    /// Stable identifier, unique within a scheduler
    fn name(&self) -> &str;

    /// Execution order, lower runs earlier
    fn priority(&self) -> i32;

    /// One-time setup; an error aborts loop start
    fn initialize(&mut self) -> Result<(), SystemError> {
        Ok(())
    }

    /// Advance by `delta_time` seconds; an error is isolated to this tick
    fn update(&mut self, delta_time: f32) -> Result<(), SystemError>;

    /// Release resources
    fn cleanup(&mut self) {}

    /// Called when the subsystem becomes enabled
    fn on_enable(&mut self) {}

    /// Called when the subsystem becomes disabled
    fn on_disable(&mut self) {}

    /// Events buffered during the last `update`
    ///
    /// The scheduler publishes these after `update` returns, once no borrow of
    /// the subsystem is held, so listeners may read the subsystem through a
    /// shared handle.
    fn drain_events(&mut self) -> Vec<Event> {
        Vec::new()
    }
}

/// Errors raised by subsystems
#[derive(Error, Debug)]
pub enum SystemError {
    /// Startup could not complete
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// A single update step failed
    #[error("update failed: {0}")]
    UpdateFailed(String),

    /// The subsystem panicked during update
    #[error("panicked: {0}")]
    Panicked(String),
}

/// Registers a subsystem that the application also keeps a handle to
///
/// Name and priority are captured at construction so the scheduler can sort
/// and look up the entry without borrowing the shared value.
pub struct SharedSystem<T: Subsystem> {
    name: String,
    priority: i32,
    inner: Rc<RefCell<T>>,
}

impl<T: Subsystem> SharedSystem<T> {
    /// Wrap a shared subsystem
    pub fn new(inner: Rc<RefCell<T>>) -> Self {
        let (name, priority) = {
            let system = inner.borrow();
            (system.name().to_string(), system.priority())
        };
        Self { name, priority, inner }
    }

    /// Another handle to the wrapped subsystem
    pub fn handle(&self) -> Rc<RefCell<T>> {
        Rc::clone(&self.inner)
    }
}

impl<T: Subsystem> Subsystem for SharedSystem<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn initialize(&mut self) -> Result<(), SystemError> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| {
            SystemError::InitializationFailed(format!("'{}' is borrowed elsewhere", self.name))
        })?;
        inner.initialize()
    }

    fn update(&mut self, delta_time: f32) -> Result<(), SystemError> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| {
            SystemError::UpdateFailed(format!("'{}' is borrowed elsewhere", self.name))
        })?;
        inner.update(delta_time)
    }

    fn cleanup(&mut self) {
        match self.inner.try_borrow_mut() {
            Ok(mut inner) => inner.cleanup(),
            Err(_) => log::warn!("Skipping cleanup of '{}': borrowed elsewhere", self.name),
        }
    }

    fn on_enable(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.on_enable();
        }
    }

    fn on_disable(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.on_disable();
        }
    }

    fn drain_events(&mut self) -> Vec<Event> {
        match self.inner.try_borrow_mut() {
            Ok(mut inner) => inner.drain_events(),
            Err(_) => {
                log::warn!("Deferring events of '{}': borrowed elsewhere", self.name);
                Vec::new()
            }
        }
    }
}

type UpdateFn = Box<dyn FnMut(f32) -> Result<(), SystemError>>;

/// Subsystem built from a closure, for gameplay glue code
pub struct FnSystem {
    name: String,
    priority: i32,
    update: UpdateFn,
}

impl FnSystem {
    /// Create a subsystem that runs `update` every tick
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        update: impl FnMut(f32) -> Result<(), SystemError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            update: Box::new(update),
        }
    }
}

impl fmt::Debug for FnSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl Subsystem for FnSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn update(&mut self, delta_time: f32) -> Result<(), SystemError> {
        (self.update)(delta_time)
    }
}
