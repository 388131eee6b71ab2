//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the core:
//! - 2D math types and operations
//! - Clocks for frame timing
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;

use std::any::Any;

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
