#![forbid(unsafe_code)]

//! Property definitions and the reverse dependency map.
//!
//! # Invariants
//!
//! 1. Names are unique within a registry.
//! 2. A computed property's dependency set is the distinct set of names its
//!    definition read during declaration; each produces exactly one edge.
//! 3. `get` of a never-written plain property is [`Value::Empty`].
//! 4. `set` only touches the written property's slot.
//!
//! # Failure Modes
//!
//! - **Definition fails at declaration**: nothing is registered; the error
//!   (including an undeclared read) is returned to the declarer.
//! - **Definition fails on a later read**: the error is returned from `get`;
//!   stored values are unaffected.

use std::rc::Rc;

use ahash::AHashMap;

use super::Resolve;
use super::propagation::{self, ReverseMap};
use super::tracker::DependencyTracker;
use crate::config::Propagation;
use crate::error::{BindError, Result};
use crate::value::Value;

/// A computed property's definition.
pub type Definition = Rc<dyn Fn(&dyn Resolve) -> Result<Value>>;

enum Slot {
    /// `None` until the first write.
    Plain(Option<Value>),
    Computed {
        definition: Definition,
        dependencies: Vec<String>,
    },
}

struct Property {
    name: String,
    slot: Slot,
}

/// Plain and computed properties of one view model.
#[derive(Default)]
pub struct PropertyRegistry {
    properties: Vec<Property>,
    index: AHashMap<String, usize>,
    dependents: ReverseMap,
    propagation: Propagation,
}

impl std::fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("properties", &self.names())
            .field("dependents", &self.dependents)
            .field("propagation", &self.propagation)
            .finish()
    }
}

impl PropertyRegistry {
    #[must_use]
    pub fn new(propagation: Propagation) -> Self {
        Self {
            propagation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    /// Plain property names in declaration order.
    #[must_use]
    pub fn plain_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| matches!(p.slot, Slot::Plain(_)))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Whether `name` is computed. Fails for undeclared names.
    pub fn is_computed(&self, name: &str) -> Result<bool> {
        Ok(matches!(self.lookup(name)?.slot, Slot::Computed { .. }))
    }

    /// Register a plain property with no value.
    pub fn declare_plain(&mut self, name: &str) -> Result<()> {
        self.ensure_free(name)?;
        self.insert(name, Slot::Plain(None));
        tracing::debug!(message = "property.declare", property = name, computed = false);
        Ok(())
    }

    /// Register a computed property.
    ///
    /// The definition runs once against a [`DependencyTracker`]; each distinct
    /// name it read gains `name` as a dependent.
    pub fn declare_computed(&mut self, name: &str, definition: Definition) -> Result<()> {
        self.ensure_free(name)?;

        let dependencies = {
            let tracker = DependencyTracker::new(self);
            let evaluated = definition(&tracker);
            // An undeclared read wins over whatever the definition returned.
            let dependencies = tracker.finish()?;
            evaluated?;
            dependencies
        };

        for base in &dependencies {
            let entry = self.dependents.entry(base.clone()).or_default();
            if !entry.iter().any(|d| d == name) {
                entry.push(name.to_owned());
            }
        }
        tracing::debug!(
            message = "property.declare",
            property = name,
            computed = true,
            dependencies = ?dependencies
        );
        self.insert(
            name,
            Slot::Computed {
                definition,
                dependencies,
            },
        );
        Ok(())
    }

    /// Current value of `name`. Computed properties are recomputed on every
    /// read.
    pub fn get(&self, name: &str) -> Result<Value> {
        match &self.lookup(name)?.slot {
            Slot::Plain(value) => Ok(value.clone().unwrap_or_default()),
            Slot::Computed { definition, .. } => definition(self),
        }
    }

    /// The raw slot of a plain property: `None` if never written.
    pub fn stored(&self, name: &str) -> Result<Option<Value>> {
        match &self.lookup(name)?.slot {
            Slot::Plain(value) => Ok(value.clone()),
            Slot::Computed { .. } => Err(BindError::AssignToComputedProperty {
                name: name.to_owned(),
            }),
        }
    }

    /// Store `value` in plain property `name` and return the computed
    /// properties to re-render, in refresh order.
    ///
    /// With [`Propagation::Direct`] these are the direct dependents only; with
    /// [`Propagation::Transitive`] every reachable dependent. Nothing is stored
    /// if the walk fails.
    pub fn set(&mut self, name: &str, value: Value) -> Result<Vec<String>> {
        let idx = self.index_of(name)?;
        if matches!(self.properties[idx].slot, Slot::Computed { .. }) {
            return Err(BindError::AssignToComputedProperty {
                name: name.to_owned(),
            });
        }
        let refresh = self.refresh_order(name)?;
        self.properties[idx].slot = Slot::Plain(Some(value));
        Ok(refresh)
    }

    /// Put back a plain property's slot as returned by [`stored`](Self::stored).
    pub fn restore(&mut self, name: &str, previous: Option<Value>) -> Result<()> {
        let idx = self.index_of(name)?;
        match &mut self.properties[idx].slot {
            Slot::Plain(slot) => {
                *slot = previous;
                Ok(())
            }
            Slot::Computed { .. } => Err(BindError::AssignToComputedProperty {
                name: name.to_owned(),
            }),
        }
    }

    /// Computed properties a write to `name` refreshes, per the registry's
    /// propagation mode.
    pub fn refresh_order(&self, name: &str) -> Result<Vec<String>> {
        match self.propagation {
            Propagation::Direct => Ok(propagation::direct(&self.dependents, name)),
            Propagation::Transitive => propagation::transitive(&self.dependents, name),
        }
    }

    /// Computed properties that read `name` directly.
    #[must_use]
    pub fn dependents(&self, name: &str) -> &[String] {
        self.dependents
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct names a computed property read at declaration. Empty for
    /// plain properties.
    pub fn dependencies(&self, name: &str) -> Result<&[String]> {
        match &self.lookup(name)?.slot {
            Slot::Plain(_) => Ok(&[][..]),
            Slot::Computed { dependencies, .. } => Ok(dependencies.as_slice()),
        }
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Err(BindError::DuplicatePropertyName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, slot: Slot) {
        self.index.insert(name.to_owned(), self.properties.len());
        self.properties.push(Property {
            name: name.to_owned(),
            slot,
        });
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| BindError::unknown(name))
    }

    fn lookup(&self, name: &str) -> Result<&Property> {
        Ok(&self.properties[self.index_of(name)?])
    }
}

impl Resolve for PropertyRegistry {
    fn read(&self, name: &str) -> Result<Value> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn full_name() -> Definition {
        Rc::new(|cx: &dyn Resolve| {
            Ok(Value::from(format!(
                "{} {}",
                cx.text("firstName")?,
                cx.text("lastName")?
            )))
        })
    }

    fn names_registry() -> PropertyRegistry {
        let mut reg = PropertyRegistry::default();
        reg.declare_plain("firstName").unwrap();
        reg.declare_plain("lastName").unwrap();
        reg.declare_computed("fullName", full_name()).unwrap();
        reg
    }

    #[test]
    fn unwritten_plain_reads_empty() {
        let reg = names_registry();
        assert_eq!(reg.get("firstName").unwrap(), Value::Empty);
        assert_eq!(reg.stored("firstName").unwrap(), None);
    }

    #[test]
    fn computed_reads_are_fresh() {
        let mut reg = names_registry();
        assert_eq!(reg.set("firstName", "Ada".into()).unwrap(), vec!["fullName"]);
        assert_eq!(reg.set("lastName", "Lovelace".into()).unwrap(), vec!["fullName"]);
        assert_eq!(reg.get("fullName").unwrap(), Value::from("Ada Lovelace"));
        reg.set("firstName", "Augusta".into()).unwrap();
        assert_eq!(reg.get("fullName").unwrap(), Value::from("Augusta Lovelace"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut reg = names_registry();
        assert_eq!(
            reg.declare_plain("firstName"),
            Err(BindError::DuplicatePropertyName {
                name: "firstName".into()
            })
        );
        assert!(matches!(
            reg.declare_computed("fullName", full_name()),
            Err(BindError::DuplicatePropertyName { .. })
        ));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn computed_assignment_rejected_for_any_value() {
        let mut reg = names_registry();
        for value in [Value::Empty, Value::from(false), Value::from(0), Value::from("x")] {
            assert_eq!(
                reg.set("fullName", value),
                Err(BindError::AssignToComputedProperty {
                    name: "fullName".into()
                })
            );
        }
    }

    #[test]
    fn unknown_names_rejected() {
        let mut reg = names_registry();
        assert_eq!(reg.get("age"), Err(BindError::unknown("age")));
        assert_eq!(reg.set("age", 3.into()), Err(BindError::unknown("age")));
        assert!(reg.is_computed("age").is_err());
    }

    #[test]
    fn forward_references_fail_declaration() {
        let mut reg = PropertyRegistry::default();
        reg.declare_plain("a").unwrap();
        let err = reg
            .declare_computed("early", Rc::new(|cx: &dyn Resolve| cx.read("late")))
            .unwrap_err();
        assert_eq!(err, BindError::unknown("late"));
        assert!(!reg.contains("early"));
        assert!(reg.dependents("a").is_empty());
    }

    #[test]
    fn swallowed_unknown_read_still_fails() {
        let mut reg = PropertyRegistry::default();
        let err = reg
            .declare_computed(
                "lenient",
                Rc::new(|cx: &dyn Resolve| Ok(cx.read("ghost").unwrap_or_default())),
            )
            .unwrap_err();
        assert_eq!(err, BindError::unknown("ghost"));
    }

    #[test]
    fn self_reference_is_unknown() {
        let mut reg = PropertyRegistry::default();
        let err = reg
            .declare_computed("me", Rc::new(|cx: &dyn Resolve| cx.read("me")))
            .unwrap_err();
        assert_eq!(err, BindError::unknown("me"));
    }

    #[test]
    fn repeated_reads_produce_one_edge() {
        let mut reg = PropertyRegistry::default();
        reg.declare_plain("base").unwrap();
        reg.declare_computed(
            "quad",
            Rc::new(|cx: &dyn Resolve| {
                Ok(Value::from(
                    cx.number("base")? + cx.number("base")? + cx.number("base")? + cx.number("base")?,
                ))
            }),
        )
        .unwrap();
        assert_eq!(reg.dependents("base"), ["quad"]);
        assert_eq!(reg.dependencies("quad").unwrap(), ["base"]);
        assert_eq!(reg.set("base", 1.into()).unwrap(), vec!["quad"]);
    }

    #[test]
    fn unset_base_counts_as_zero() {
        let mut reg = PropertyRegistry::default();
        reg.declare_plain("base").unwrap();
        reg.declare_computed(
            "doubled",
            Rc::new(|cx: &dyn Resolve| Ok(Value::from(cx.number("base")? * 2.0))),
        )
        .unwrap();
        assert_eq!(reg.get("doubled").unwrap(), Value::Number(0.0));
        reg.set("base", 21.into()).unwrap();
        assert_eq!(reg.get("doubled").unwrap(), Value::Number(42.0));
    }

    #[test]
    fn computed_get_does_not_mutate_plain_values() {
        let mut reg = names_registry();
        reg.set("firstName", "Ada".into()).unwrap();
        for _ in 0..3 {
            let _ = reg.get("fullName").unwrap();
        }
        assert_eq!(reg.stored("firstName").unwrap(), Some(Value::from("Ada")));
        assert_eq!(reg.stored("lastName").unwrap(), None);
    }

    #[test]
    fn computed_definitions_run_on_every_read() {
        let calls = Rc::new(Cell::new(0u32));
        let calls2 = Rc::clone(&calls);
        let mut reg = PropertyRegistry::default();
        reg.declare_plain("x").unwrap();
        reg.declare_computed(
            "y",
            Rc::new(move |cx: &dyn Resolve| {
                calls2.set(calls2.get() + 1);
                cx.read("x")
            }),
        )
        .unwrap();
        // One evaluation at declaration.
        assert_eq!(calls.get(), 1);
        let _ = reg.get("y");
        let _ = reg.get("y");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn direct_mode_stops_at_first_level() {
        let mut reg = PropertyRegistry::new(Propagation::Direct);
        reg.declare_plain("a").unwrap();
        reg.declare_computed("b", Rc::new(|cx: &dyn Resolve| cx.read("a")))
            .unwrap();
        reg.declare_computed("c", Rc::new(|cx: &dyn Resolve| cx.read("b")))
            .unwrap();
        assert_eq!(reg.set("a", 1.into()).unwrap(), vec!["b"]);
        assert_eq!(reg.dependents("b"), ["c"]);
    }

    #[test]
    fn transitive_mode_reaches_chains() {
        let mut reg = PropertyRegistry::new(Propagation::Transitive);
        reg.declare_plain("a").unwrap();
        reg.declare_computed("b", Rc::new(|cx: &dyn Resolve| cx.read("a")))
            .unwrap();
        reg.declare_computed("c", Rc::new(|cx: &dyn Resolve| cx.read("b")))
            .unwrap();
        assert_eq!(reg.set("a", 1.into()).unwrap(), vec!["b", "c"]);
        assert_eq!(reg.get("c").unwrap(), Value::from(1));
    }

    #[test]
    fn restore_puts_back_previous_slot() {
        let mut reg = names_registry();
        reg.set("firstName", "Ada".into()).unwrap();
        let previous = reg.stored("firstName").unwrap();
        reg.set("firstName", "Grace".into()).unwrap();
        reg.restore("firstName", previous).unwrap();
        assert_eq!(reg.get("firstName").unwrap(), Value::from("Ada"));
        assert!(reg.restore("fullName", None).is_err());
    }

    #[test]
    fn declaration_order_is_kept() {
        let reg = names_registry();
        assert_eq!(reg.names(), vec!["firstName", "lastName", "fullName"]);
        assert_eq!(reg.plain_names(), vec!["firstName", "lastName"]);
        assert!(reg.is_computed("fullName").unwrap());
        assert!(!reg.is_computed("firstName").unwrap());
    }
}
