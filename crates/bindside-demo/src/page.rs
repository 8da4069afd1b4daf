//! The profile page and the user gestures the CLI can simulate on it.

use std::rc::Rc;

use bindside::dom::memory::MemoryDocument;
use bindside::{
    BindConfig, Document, NodeId, ReadySignal, Resolve, Value, ViewModel,
    create_view_model_with_config, parse_action_binding,
};

use crate::error::{DemoError, Result};

pub const SCOPE: &str = "#profile";

/// A built page with its activated view model.
pub struct ProfilePage {
    pub doc: Rc<MemoryDocument>,
    pub vm: ViewModel,
}

impl ProfilePage {
    /// Build the markup, declare the view model, then fire the ready signal.
    ///
    /// Declaration happens before the signal fires, so activation goes
    /// through the deferred path.
    pub fn build(config: BindConfig) -> Result<Self> {
        let doc = Rc::new(MemoryDocument::new());
        let prop = config.prop_attribute.clone();
        let reset = format!("click{}reset", config.action_separator);

        let section = doc.element(doc.root_id(), "section", &[("id", "profile")]);
        doc.element(section, "input", &[(prop.as_str(), "firstName")]);
        doc.element(section, "input", &[(prop.as_str(), "lastName")]);
        let p = doc.element(section, "p", &[]);
        doc.element(p, "span", &[(prop.as_str(), "fullName")]);
        doc.element(section, "span", &[(prop.as_str(), "greeting")]);
        doc.element(
            section,
            "button",
            &[(config.action_attribute.as_str(), reset.as_str())],
        );

        let ready = ReadySignal::new();
        let vm = create_view_model_with_config(doc.clone(), &ready, Some(SCOPE), config, |vm| {
            vm.prop("firstName")?;
            vm.prop("lastName")?;
            vm.computed("fullName", |cx: &dyn Resolve| {
                let first = cx.text("firstName")?;
                let last = cx.text("lastName")?;
                Ok(Value::from(format!("{first} {last}").trim().to_owned()))
            })?;
            vm.computed("greeting", |cx: &dyn Resolve| {
                let full = cx.text("fullName")?;
                if full.is_empty() {
                    return Ok(Value::from("Hello!"));
                }
                Ok(Value::from(format!("Hello, {full}!")))
            })?;
            vm.action("reset", |cx| {
                cx.set("firstName", "")?;
                cx.set("lastName", "")
            })
        })?;

        ready.fire();
        if let Some(err) = vm.take_activation_error() {
            return Err(err.into());
        }
        Ok(Self { doc, vm })
    }

    /// Simulate typing into the first text control bound to `property`.
    ///
    /// Fails with [`DemoError::InputRejected`] when the change listener did
    /// not store the text, as when a dependent recompute fails.
    pub fn type_into(&self, property: &str, text: &str) -> Result<()> {
        let node = self
            .vm
            .nodes_for(property)
            .into_iter()
            .find(|&node| self.doc.is_text_control(node))
            .ok_or_else(|| DemoError::invalid(format!("no input bound to {property}")))?;
        self.doc.type_text(node, text);
        self.doc.dispatch(node, &self.vm.config().change_event);
        if self.vm.get(property)? != Value::from(text) {
            return Err(DemoError::InputRejected {
                property: property.to_owned(),
            });
        }
        Ok(())
    }

    /// Simulate a gesture on the first control bound to `action`.
    pub fn click(&self, action: &str) -> Result<()> {
        let config = self.vm.config();
        let scope = self.vm.scope().unwrap_or_else(|| self.doc.root());
        let (node, event) = self
            .action_controls(scope)?
            .into_iter()
            .find(|(_, binding)| binding.action == action)
            .map(|(node, binding)| (node, binding.event))
            .ok_or_else(|| {
                DemoError::invalid(format!(
                    "no control carries {}=\"<event>{}{action}\"",
                    config.action_attribute, config.action_separator
                ))
            })?;
        self.doc.dispatch(node, &event);
        Ok(())
    }

    fn action_controls(&self, scope: NodeId) -> Result<Vec<(NodeId, bindside::ActionBinding)>> {
        let config = self.vm.config();
        let mut out = Vec::new();
        for node in self
            .doc
            .query_attribute(scope, &config.action_attribute, None)
        {
            let raw = self
                .doc
                .attribute(node, &config.action_attribute)
                .unwrap_or_default();
            out.push((node, parse_action_binding(&raw, &config.action_separator)?));
        }
        Ok(out)
    }
}
