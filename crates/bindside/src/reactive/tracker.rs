#![forbid(unsafe_code)]

//! Recording resolution context used once per computed declaration.

use std::cell::RefCell;

use super::Resolve;
use super::registry::PropertyRegistry;
use crate::error::{BindError, Result};
use crate::value::Value;

/// A [`Resolve`] that forwards reads to a registry and logs every name read.
///
/// Only properties already declared in the wrapped registry resolve; any
/// other name fails with [`BindError::UnknownPropertyReference`] and is noted
/// so the declaration can be rejected even if the definition swallowed the
/// error.
pub struct DependencyTracker<'a> {
    registry: &'a PropertyRegistry,
    log: RefCell<Vec<String>>,
    missing: RefCell<Vec<String>>,
}

impl std::fmt::Debug for DependencyTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("log", &self.log.borrow())
            .field("missing", &self.missing.borrow())
            .finish()
    }
}

impl<'a> DependencyTracker<'a> {
    #[must_use]
    pub fn new(registry: &'a PropertyRegistry) -> Self {
        Self {
            registry,
            log: RefCell::new(Vec::new()),
            missing: RefCell::new(Vec::new()),
        }
    }

    /// Every successful read, in order, duplicates included.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Distinct names read, in first-read order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let log = self.log.borrow();
        let mut distinct: Vec<String> = Vec::with_capacity(log.len());
        for name in log.iter() {
            if !distinct.contains(name) {
                distinct.push(name.clone());
            }
        }
        distinct
    }

    /// First undeclared name the definition tried to read.
    #[must_use]
    pub fn first_missing(&self) -> Option<String> {
        self.missing.borrow().first().cloned()
    }

    /// Consume the tracker: the distinct dependency set, or the first
    /// unresolved reference.
    pub fn finish(self) -> Result<Vec<String>> {
        match self.first_missing() {
            Some(name) => Err(BindError::UnknownPropertyReference { name }),
            None => Ok(self.dependencies()),
        }
    }
}

impl Resolve for DependencyTracker<'_> {
    fn read(&self, name: &str) -> Result<Value> {
        if !self.registry.contains(name) {
            self.missing.borrow_mut().push(name.to_owned());
            return Err(BindError::unknown(name));
        }
        tracing::trace!(message = "dependency.read", property = name);
        self.log.borrow_mut().push(name.to_owned());
        self.registry.get(name)
    }
}
