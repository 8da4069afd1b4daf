#![forbid(unsafe_code)]

//! The view-model facade.
//!
//! A [`ViewModel`] is scoped to a region of a [`Document`]. Properties,
//! computed properties and actions are declared on it, then it activates:
//! tagged controls get change listeners, action attributes get their
//! handlers, and from then on every property write re-renders the written
//! property's nodes and those of its dependents.
//!
//! # Lifecycle
//!
//! ```text
//! Declaring ──schedule──▶ Activating ──ready──▶ Active
//! ```
//!
//! There is no way back. Declarations are only accepted while `Declaring`.
//! Writes before `Active` are stored without rendering; activation renders
//! every stored value once.
//!
//! # Invariants
//!
//! 1. When a write returns `Ok`, the written property's nodes and every
//!    refreshed dependent's nodes show the new values.
//! 2. A write whose dependent recomputation fails leaves both the stored
//!    value and the document unchanged.
//! 3. Activation attaches nothing unless every action binding in scope
//!    parses and names a declared action.
//!
//! # Failure Modes
//!
//! - **Listener-side errors** (a change event that cannot be applied, a
//!   failing action) have no caller; they are logged at `WARN`.
//! - **Deferred activation failure** is logged at `ERROR` and kept for
//!   [`ViewModel::take_activation_error`].
//! - **Re-entrant calls** (a definition or listener reaching back into the
//!   view model while it holds its registry) fail with
//!   [`BindError::Reentrant`]. Definitions should read through the
//!   [`Resolve`] they are given.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use tracing::{debug, error, info, warn};

use crate::action::parse_action_binding;
use crate::config::BindConfig;
use crate::dom::{Document, DomEvent, NodeId};
use crate::error::{BindError, Result};
use crate::lifecycle::{ReadySignal, ReadySubscription};
use crate::reactive::{Definition, PropertyRegistry, Resolve};
use crate::render::{RenderPlan, Renderer};
use crate::value::{BoundValue, Value};

static NEXT_VM_ID: AtomicU64 = AtomicU64::new(1);

fn next_vm_id() -> u64 {
    NEXT_VM_ID.fetch_add(1, Ordering::Relaxed)
}

type Action = Rc<dyn Fn(&ActionContext<'_>) -> Result<()>>;

/// Lifecycle phase of a [`ViewModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Properties and actions may be declared.
    Declaring,
    /// Declarations are closed; waiting for the document to be ready.
    Activating,
    /// Listeners are live and writes render.
    Active,
}

struct ViewModelInner {
    id: u64,
    config: BindConfig,
    renderer: Renderer,
    selector: Option<String>,
    scope: Cell<Option<NodeId>>,
    phase: Cell<Phase>,
    registry: RefCell<PropertyRegistry>,
    actions: RefCell<AHashMap<String, Action>>,
    ready: RefCell<Option<ReadySubscription>>,
    activation_error: RefCell<Option<BindError>>,
}

/// A scoped set of bound properties and actions.
///
/// Cloning a `ViewModel` creates a new handle to the **same** instance.
#[derive(Clone)]
pub struct ViewModel {
    inner: Rc<ViewModelInner>,
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ViewModel");
        s.field("id", &self.inner.id)
            .field("selector", &self.inner.selector)
            .field("phase", &self.inner.phase.get());
        match self.inner.registry.try_borrow() {
            Ok(registry) => s.field("registry", &*registry),
            Err(_) => s.field("registry", &"<busy>"),
        };
        s.finish_non_exhaustive()
    }
}

impl ViewModel {
    /// A view model with the default configuration.
    ///
    /// `selector` limits the scope; `None` means the whole document.
    #[must_use]
    pub fn new(document: Rc<dyn Document>, selector: Option<&str>) -> Self {
        Self::with_config(document, selector, BindConfig::default())
    }

    #[must_use]
    pub fn with_config(
        document: Rc<dyn Document>,
        selector: Option<&str>,
        config: BindConfig,
    ) -> Self {
        let renderer = Renderer::new(document, config.prop_attribute.clone());
        let registry = PropertyRegistry::new(config.propagation);
        Self {
            inner: Rc::new(ViewModelInner {
                id: next_vm_id(),
                config,
                renderer,
                selector: selector.map(str::to_owned),
                scope: Cell::new(None),
                phase: Cell::new(Phase::Declaring),
                registry: RefCell::new(registry),
                actions: RefCell::new(AHashMap::new()),
                ready: RefCell::new(None),
                activation_error: RefCell::new(None),
            }),
        }
    }

    /// Process-unique instance id, as logged in the `vm` field.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    #[must_use]
    pub fn config(&self) -> &BindConfig {
        &self.inner.config
    }

    /// The resolved scope node; `None` until activation.
    #[must_use]
    pub fn scope(&self) -> Option<NodeId> {
        self.inner.scope.get()
    }

    #[must_use]
    pub fn document(&self) -> &Rc<dyn Document> {
        self.inner.renderer.document()
    }

    // ── Declaration ─────────────────────────────────────────────────────

    /// Declare a plain property.
    pub fn prop(&self, name: &str) -> Result<PropertyHandle> {
        self.ensure_declaring(name)?;
        self.registry_mut(name)?.declare_plain(name)?;
        Ok(self.handle_unchecked(name))
    }

    /// Declare a computed property.
    ///
    /// `definition` runs once now, to record which properties it reads, and
    /// again on every read of the property.
    pub fn computed(
        &self,
        name: &str,
        definition: impl Fn(&dyn Resolve) -> Result<Value> + 'static,
    ) -> Result<PropertyHandle> {
        self.ensure_declaring(name)?;
        let definition: Definition = Rc::new(definition);
        self.registry_mut(name)?
            .declare_computed(name, definition)?;
        Ok(self.handle_unchecked(name))
    }

    /// Declare an action that `data-action` style attributes can bind to.
    pub fn action(
        &self,
        name: &str,
        handler: impl Fn(&ActionContext<'_>) -> Result<()> + 'static,
    ) -> Result<()> {
        self.ensure_declaring(name)?;
        let mut actions = self
            .inner
            .actions
            .try_borrow_mut()
            .map_err(|_| reentrant(name))?;
        if actions.contains_key(name) {
            return Err(BindError::DuplicateActionName {
                name: name.to_owned(),
            });
        }
        actions.insert(name.to_owned(), Rc::new(handler));
        debug!(message = "action.declare", vm = self.inner.id, action = name);
        Ok(())
    }

    /// Handle to an already declared property.
    pub fn handle(&self, name: &str) -> Result<PropertyHandle> {
        if !self.registry(name)?.contains(name) {
            return Err(BindError::unknown(name));
        }
        Ok(self.handle_unchecked(name))
    }

    /// Declared property names, in declaration order. Empty while a
    /// declaration is running.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        self.inner
            .registry
            .try_borrow()
            .map(|registry| registry.names().into_iter().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Computed properties that read `name` directly.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.inner
            .registry
            .try_borrow()
            .map(|registry| registry.dependents(name).to_vec())
            .unwrap_or_default()
    }

    // ── Access ──────────────────────────────────────────────────────────

    /// Current value of a property.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.registry(name)?.get(name)
    }

    /// Write a plain property and, once active, re-render it and its
    /// dependents.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write(name, value.into())
    }

    /// Accessor-style call: read on [`BoundValue::Absent`], write otherwise.
    pub fn access(&self, name: &str, arg: BoundValue) -> Result<Option<Value>> {
        match arg {
            BoundValue::Absent => self.get(name).map(Some),
            BoundValue::Supplied(value) => self.write(name, value).map(|()| None),
        }
    }

    /// Seed plain properties from a JSON object, key by key.
    pub fn bind_model(&self, model: &serde_json::Value) -> Result<()> {
        let object = model.as_object().ok_or(BindError::InvalidModel {
            kind: json_kind(model),
        })?;
        for (key, value) in object {
            self.write(key, Value::from(value))?;
        }
        Ok(())
    }

    /// Every property's current value, in declaration order.
    pub fn snapshot(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let registry = self.registry("snapshot")?;
        let mut map = serde_json::Map::new();
        for name in registry.names() {
            map.insert(name.to_owned(), registry.get(name)?.to_json());
        }
        Ok(map)
    }

    /// Nodes bound to `name` in the resolved scope. Empty before activation.
    #[must_use]
    pub fn nodes_for(&self, name: &str) -> Vec<NodeId> {
        self.inner
            .scope
            .get()
            .map(|scope| self.inner.renderer.nodes_for(scope, name))
            .unwrap_or_default()
    }

    /// Run a declared action outside of any DOM event.
    pub fn trigger(&self, action: &str) -> Result<()> {
        let handler = self
            .inner
            .actions
            .try_borrow()
            .map_err(|_| reentrant(action))?
            .get(action)
            .cloned()
            .ok_or_else(|| BindError::UnknownAction {
                name: action.to_owned(),
            })?;
        let target = self
            .inner
            .scope
            .get()
            .unwrap_or_else(|| self.document().root());
        self.run_action(&handler, &DomEvent::new("trigger", target))
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Close declarations and activate when `ready` fires (or now, if it
    /// already has).
    pub fn schedule_activation(&self, ready: &ReadySignal) -> Result<()> {
        if self.phase() == Phase::Declaring {
            self.inner.phase.set(Phase::Activating);
        }
        if ready.is_fired() {
            return self.activate();
        }
        let weak: Weak<ViewModelInner> = Rc::downgrade(&self.inner);
        let subscription = ready.subscribe(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let vm = ViewModel { inner };
            if let Err(err) = vm.activate() {
                error!(vm = vm.inner.id, error = %err, "deferred activation failed");
                *vm.inner.activation_error.borrow_mut() = Some(err);
            }
            // Already cleared when activation succeeded.
            vm.inner.ready.borrow_mut().take();
        });
        *self.inner.ready.borrow_mut() = subscription;
        Ok(())
    }

    /// Resolve the scope, attach listeners, and render stored values.
    pub fn activate(&self) -> Result<()> {
        if self.phase() == Phase::Active {
            return Err(BindError::AlreadyActive);
        }
        let inner = &self.inner;
        let config = &inner.config;
        let document = Rc::clone(inner.renderer.document());

        let scope = match &inner.selector {
            Some(selector) => document
                .select(selector)
                .ok_or_else(|| BindError::ScopeNotFound {
                    selector: selector.clone(),
                })?,
            None => document.root(),
        };

        let mut bindings = Vec::new();
        {
            let actions = inner
                .actions
                .try_borrow()
                .map_err(|_| reentrant("activate"))?;
            for node in document.query_attribute(scope, &config.action_attribute, None) {
                let raw = document
                    .attribute(node, &config.action_attribute)
                    .unwrap_or_default();
                let binding = parse_action_binding(&raw, &config.action_separator)?;
                let handler = actions.get(&binding.action).cloned().ok_or_else(|| {
                    BindError::UnknownAction {
                        name: binding.action.clone(),
                    }
                })?;
                bindings.push((node, binding, handler));
            }
        }

        let initial = self.initial_plan(scope)?;

        let plain: Vec<String> = self
            .registry("activate")?
            .plain_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let mut listeners = 0usize;
        for name in plain {
            for node in inner.renderer.nodes_for(scope, &name) {
                if !document.is_text_control(node) {
                    continue;
                }
                let weak = Rc::downgrade(inner);
                let property = name.clone();
                document.listen(
                    node,
                    &config.change_event,
                    Rc::new(move |event: &DomEvent| {
                        let Some(inner) = weak.upgrade() else {
                            return;
                        };
                        let vm = ViewModel { inner };
                        let value = event.value.clone().map_or(Value::Empty, Value::Text);
                        if let Err(err) = vm.write(&property, value) {
                            warn!(
                                vm = vm.inner.id,
                                property = %property,
                                error = %err,
                                "change listener failed"
                            );
                        }
                    }),
                );
                listeners += 1;
            }
        }

        let action_count = bindings.len();
        for (node, binding, handler) in bindings {
            let weak = Rc::downgrade(inner);
            let action = binding.action;
            document.listen(
                node,
                &binding.event,
                Rc::new(move |event: &DomEvent| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let vm = ViewModel { inner };
                    if let Err(err) = vm.run_action(&handler, event) {
                        warn!(
                            vm = vm.inner.id,
                            action = %action,
                            error = %err,
                            "action failed"
                        );
                    }
                }),
            );
        }

        inner.scope.set(Some(scope));
        inner.phase.set(Phase::Active);
        // A pending ready callback would otherwise activate a second time.
        if let Ok(mut ready) = inner.ready.try_borrow_mut() {
            ready.take();
        }
        info!(
            message = "view_model.activate",
            vm = inner.id,
            scope = %scope,
            listeners,
            actions = action_count
        );
        initial.apply(&inner.renderer);
        Ok(())
    }

    /// Error from a deferred activation, if one failed.
    pub fn take_activation_error(&self) -> Option<BindError> {
        self.inner.activation_error.borrow_mut().take()
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ensure_declaring(&self, name: &str) -> Result<()> {
        if self.phase() != Phase::Declaring {
            return Err(BindError::DeclarationClosed {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn registry(&self, name: &str) -> Result<Ref<'_, PropertyRegistry>> {
        self.inner.registry.try_borrow().map_err(|_| reentrant(name))
    }

    fn registry_mut(&self, name: &str) -> Result<RefMut<'_, PropertyRegistry>> {
        self.inner
            .registry
            .try_borrow_mut()
            .map_err(|_| reentrant(name))
    }

    fn handle_unchecked(&self, name: &str) -> PropertyHandle {
        PropertyHandle {
            vm: self.clone(),
            name: Rc::from(name),
        }
    }

    fn write(&self, name: &str, value: Value) -> Result<()> {
        let inner = &self.inner;
        let (previous, refresh) = {
            let mut registry = self.registry_mut(name)?;
            let previous = registry.stored(name)?;
            let refresh = registry.set(name, value.clone())?;
            (previous, refresh)
        };
        debug!(
            message = "property.write",
            vm = inner.id,
            property = name,
            dependents = ?refresh
        );

        let Some(scope) = inner.scope.get().filter(|_| self.phase() == Phase::Active) else {
            return Ok(());
        };
        match self.plan_write(scope, name, value, &refresh) {
            Ok(plan) => {
                plan.apply(&inner.renderer);
                Ok(())
            }
            Err(err) => {
                self.registry_mut(name)?.restore(name, previous)?;
                Err(err)
            }
        }
    }

    fn plan_write(
        &self,
        scope: NodeId,
        name: &str,
        value: Value,
        refresh: &[String],
    ) -> Result<RenderPlan> {
        let registry = self.registry(name)?;
        let renderer = &self.inner.renderer;
        let mut plan = RenderPlan::new();
        plan.push(name, renderer.nodes_for(scope, name), value);
        for dependent in refresh {
            let value = registry.get(dependent)?;
            plan.push(dependent.as_str(), renderer.nodes_for(scope, dependent), value);
        }
        Ok(plan)
    }

    /// Stored plain values plus everything they refresh. Computed properties
    /// follow declaration order, which already puts inputs first.
    fn initial_plan(&self, scope: NodeId) -> Result<RenderPlan> {
        let registry = self.registry("activate")?;
        let renderer = &self.inner.renderer;
        let mut plan = RenderPlan::new();
        let mut refreshed: AHashSet<String> = AHashSet::new();
        for name in registry.plain_names() {
            if let Some(value) = registry.stored(name)? {
                plan.push(name, renderer.nodes_for(scope, name), value);
                refreshed.extend(registry.refresh_order(name)?);
            }
        }
        for name in registry.names() {
            if refreshed.contains(name) {
                let value = registry.get(name)?;
                plan.push(name, renderer.nodes_for(scope, name), value);
            }
        }
        Ok(plan)
    }

    fn run_action(&self, handler: &Action, event: &DomEvent) -> Result<()> {
        debug!(message = "action.run", vm = self.inner.id, event = %event.name);
        let cx = ActionContext { vm: self, event };
        handler(&cx)
    }
}

fn reentrant(name: &str) -> BindError {
    BindError::Reentrant {
        name: name.to_owned(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Create a view model with the default configuration.
///
/// `setup` declares properties and actions. Activation then runs at once if
/// `ready` has fired, or when it fires.
pub fn create_view_model(
    document: Rc<dyn Document>,
    ready: &ReadySignal,
    selector: Option<&str>,
    setup: impl FnOnce(&ViewModel) -> Result<()>,
) -> Result<ViewModel> {
    create_view_model_with_config(document, ready, selector, BindConfig::default(), setup)
}

/// [`create_view_model`] with an explicit configuration.
pub fn create_view_model_with_config(
    document: Rc<dyn Document>,
    ready: &ReadySignal,
    selector: Option<&str>,
    config: BindConfig,
    setup: impl FnOnce(&ViewModel) -> Result<()>,
) -> Result<ViewModel> {
    let vm = ViewModel::with_config(document, selector, config);
    setup(&vm)?;
    vm.schedule_activation(ready)?;
    Ok(vm)
}

// ---------------------------------------------------------------------------
// PropertyHandle
// ---------------------------------------------------------------------------

/// Typed handle to one property of a [`ViewModel`].
#[derive(Clone)]
pub struct PropertyHandle {
    vm: ViewModel,
    name: Rc<str>,
}

impl std::fmt::Debug for PropertyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyHandle")
            .field("vm", &self.vm.inner.id)
            .field("name", &self.name)
            .finish()
    }
}

impl PropertyHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Result<Value> {
        self.vm.get(&self.name)
    }

    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.vm.set(&self.name, value)
    }

    /// Read on [`BoundValue::Absent`], write otherwise.
    pub fn call(&self, arg: BoundValue) -> Result<Option<Value>> {
        self.vm.access(&self.name, arg)
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.vm
            .inner
            .registry
            .try_borrow()
            .ok()
            .and_then(|registry| registry.is_computed(&self.name).ok())
            .unwrap_or(false)
    }

    /// Nodes bound to this property. Empty before activation.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeId> {
        self.vm.nodes_for(&self.name)
    }
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// What an action handler sees: the view model's properties and the event
/// that triggered it.
pub struct ActionContext<'a> {
    vm: &'a ViewModel,
    event: &'a DomEvent,
}

impl ActionContext<'_> {
    #[must_use]
    pub fn event(&self) -> &DomEvent {
        self.event
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.vm.get(name)
    }

    /// Write a plain property through the full render path.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.vm.set(name, value)
    }

    pub fn handle(&self, name: &str) -> Result<PropertyHandle> {
        self.vm.handle(name)
    }
}

impl Resolve for ActionContext<'_> {
    fn read(&self, name: &str) -> Result<Value> {
        self.vm.get(name)
    }
}
