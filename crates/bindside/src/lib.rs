#![forbid(unsafe_code)]

//! Bindside: named properties, computed properties, and actions bound to a
//! scoped region of a document tree.
//!
//! A [`ViewModel`] owns a [`PropertyRegistry`](reactive::PropertyRegistry).
//! Declaring a computed property runs its definition once against a
//! [`DependencyTracker`](reactive::DependencyTracker) to learn which
//! properties it reads; every later write to one of those properties
//! re-renders the computed property's tagged nodes with a fresh value.
//!
//! The document itself is a collaborator behind the [`Document`] trait.
//! [`MemoryDocument`](dom::memory::MemoryDocument) is an in-memory tree that
//! implements it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use bindside::dom::memory::MemoryDocument;
//! use bindside::{ReadySignal, Resolve, Value, create_view_model};
//!
//! let doc = Rc::new(MemoryDocument::new());
//! let root = doc.root_id();
//! let first = doc.element(root, "input", &[("data-prop", "firstName")]);
//! let full = doc.element(root, "span", &[("data-prop", "fullName")]);
//!
//! let ready = ReadySignal::new();
//! let vm = create_view_model(doc.clone(), &ready, None, |vm| {
//!     vm.prop("firstName")?;
//!     vm.prop("lastName")?;
//!     vm.computed("fullName", |cx: &dyn Resolve| {
//!         Ok(Value::from(format!("{} {}", cx.text("firstName")?, cx.text("lastName")?)))
//!     })?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! ready.fire();
//! vm.set("firstName", "Ada").unwrap();
//! vm.set("lastName", "Lovelace").unwrap();
//!
//! assert_eq!(doc.value(first), "Ada");
//! assert_eq!(doc.content(full), "Ada Lovelace");
//! ```

pub mod action;
pub mod config;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod reactive;
pub mod render;
pub mod value;
pub mod view_model;

pub use action::{ActionBinding, parse_action_binding};
pub use config::{BindConfig, Propagation};
pub use dom::{Document, DomEvent, Listener, NodeId};
pub use error::{BindError, Result};
pub use lifecycle::{ReadySignal, ReadySubscription};
pub use reactive::{DependencyTracker, PropertyRegistry, Resolve};
pub use render::{RenderPlan, Renderer};
pub use value::{BoundValue, Value};
pub use view_model::{
    ActionContext, Phase, PropertyHandle, ViewModel, create_view_model,
    create_view_model_with_config,
};
