#![forbid(unsafe_code)]

//! Binding configuration.
//!
//! Attribute names, the action separator, the change event, and the
//! propagation mode. Defaults match the markup conventions
//! `data-prop="name"` and `data-action="click::save"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How far a plain-property write reaches into the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Propagation {
    /// Re-render only computed properties that read the written property.
    #[default]
    Direct,
    /// Re-render every computed property reachable through the reverse
    /// dependency map, in topological order.
    Transitive,
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Transitive => f.write_str("transitive"),
        }
    }
}

impl FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "transitive" => Ok(Self::Transitive),
            other => Err(format!(
                "unknown propagation mode {other:?} (expected direct or transitive)"
            )),
        }
    }
}

/// Configuration shared by every view model created with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Attribute whose value names the property a node is bound to.
    pub prop_attribute: String,
    /// Attribute whose value is `<event><separator><action>`.
    pub action_attribute: String,
    pub action_separator: String,
    /// DOM event that carries user edits back into plain properties.
    pub change_event: String,
    pub propagation: Propagation,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            prop_attribute: "data-prop".to_owned(),
            action_attribute: "data-action".to_owned(),
            action_separator: "::".to_owned(),
            change_event: "change".to_owned(),
            propagation: Propagation::Direct,
        }
    }
}

impl BindConfig {
    #[must_use]
    pub fn with_prop_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.prop_attribute = attribute.into();
        self
    }

    #[must_use]
    pub fn with_action_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.action_attribute = attribute.into();
        self
    }

    #[must_use]
    pub fn with_action_separator(mut self, separator: impl Into<String>) -> Self {
        self.action_separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_change_event(mut self, event: impl Into<String>) -> Self {
        self.change_event = event.into();
        self
    }

    #[must_use]
    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Defaults overlaid with `BINDSIDE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay settings from a key lookup (`BINDSIDE_PROP_ATTR`,
    /// `BINDSIDE_ACTION_ATTR`, `BINDSIDE_PROPAGATION`). Unparsable values are
    /// ignored.
    #[must_use]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(attr) = lookup("BINDSIDE_PROP_ATTR").filter(|v| !v.trim().is_empty()) {
            self.prop_attribute = attr.trim().to_owned();
        }
        if let Some(attr) = lookup("BINDSIDE_ACTION_ATTR").filter(|v| !v.trim().is_empty()) {
            self.action_attribute = attr.trim().to_owned();
        }
        if let Some(raw) = lookup("BINDSIDE_PROPAGATION") {
            match raw.parse() {
                Ok(mode) => self.propagation = mode,
                Err(reason) => tracing::warn!(%reason, "ignoring BINDSIDE_PROPAGATION"),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BindConfig::default();
        assert_eq!(config.prop_attribute, "data-prop");
        assert_eq!(config.action_attribute, "data-action");
        assert_eq!(config.action_separator, "::");
        assert_eq!(config.change_event, "change");
        assert_eq!(config.propagation, Propagation::Direct);
    }

    #[test]
    fn propagation_parses_case_insensitively() {
        assert_eq!("Transitive".parse(), Ok(Propagation::Transitive));
        assert_eq!(" direct ".parse(), Ok(Propagation::Direct));
        assert!("deep".parse::<Propagation>().is_err());
        assert_eq!(Propagation::Transitive.to_string(), "transitive");
    }

    #[test]
    fn overlay_reads_known_keys() {
        let config = BindConfig::default().overlay(|key| match key {
            "BINDSIDE_PROP_ATTR" => Some("data-bind".into()),
            "BINDSIDE_PROPAGATION" => Some("transitive".into()),
            _ => None,
        });
        assert_eq!(config.prop_attribute, "data-bind");
        assert_eq!(config.action_attribute, "data-action");
        assert_eq!(config.propagation, Propagation::Transitive);
    }

    #[test]
    fn overlay_ignores_bad_values() {
        let config = BindConfig::default().overlay(|key| match key {
            "BINDSIDE_PROP_ATTR" => Some("   ".into()),
            "BINDSIDE_PROPAGATION" => Some("sideways".into()),
            _ => None,
        });
        assert_eq!(config, BindConfig::default());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: BindConfig =
            serde_json::from_str(r#"{"propagation": "transitive", "change_event": "input"}"#)
                .unwrap();
        assert_eq!(config.propagation, Propagation::Transitive);
        assert_eq!(config.change_event, "input");
        assert_eq!(config.prop_attribute, "data-prop");
    }
}
