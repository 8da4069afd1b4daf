#![forbid(unsafe_code)]

//! Dependency tracking and propagation for view-model properties.
//!
//! - [`PropertyRegistry`]: plain and computed property definitions plus the
//!   reverse dependency map (base property → computed properties reading it).
//! - [`DependencyTracker`]: the recording [`Resolve`] context a computed
//!   definition runs against once, at declaration, so its reads can be
//!   logged.
//! - [`propagation`]: which computed properties a write must refresh, and in
//!   what order.
//!
//! # Architecture
//!
//! A computed property is a function of a [`Resolve`] context. At declaration
//! the registry evaluates it against a tracker, turns the distinct names read
//! into reverse-map edges, and discards the tracker. Later reads evaluate the
//! same function against the registry itself, which resolves without
//! recording. Computed values are never cached.
//!
//! # Invariants
//!
//! 1. The reverse map is append-only and each (base, dependent) edge exists
//!    at most once.
//! 2. A definition can only read properties declared before it, so the graph
//!    built through the registry is acyclic.
//! 3. Reading a computed property never mutates a stored value.
//! 4. Writes are rejected for computed properties.

pub mod propagation;
pub mod registry;
pub mod tracker;

pub use registry::{Definition, PropertyRegistry};
pub use tracker::DependencyTracker;

use crate::error::Result;
use crate::value::Value;

/// Name-based property resolution, as seen by a computed definition.
pub trait Resolve {
    /// Current value of `name`.
    fn read(&self, name: &str) -> Result<Value>;

    /// `read` coerced with [`Value::as_number`].
    fn number(&self, name: &str) -> Result<f64> {
        Ok(self.read(name)?.as_number())
    }

    /// `read` in display form.
    fn text(&self, name: &str) -> Result<String> {
        Ok(self.read(name)?.to_string())
    }
}
