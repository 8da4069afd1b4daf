#![forbid(unsafe_code)]

//! Action-binding attributes.
//!
//! A node opts into an action with an attribute value of the form
//! `"<event><separator><action>"`, e.g. `data-action="click::save"`. Exactly
//! two non-empty tokens are required.

use crate::error::{BindError, Result};

/// A parsed (event, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionBinding {
    pub event: String,
    pub action: String,
}

/// Parse an action attribute value.
///
/// Tokens are trimmed. Zero or more than one separator, an empty separator,
/// or an empty token fail with [`BindError::MalformedActionBinding`].
///
/// ```
/// use bindside::parse_action_binding;
///
/// let binding = parse_action_binding("click::save", "::").unwrap();
/// assert_eq!(binding.event, "click");
/// assert_eq!(binding.action, "save");
/// assert!(parse_action_binding("clicksave", "::").is_err());
/// ```
pub fn parse_action_binding(raw: &str, separator: &str) -> Result<ActionBinding> {
    let malformed = || BindError::MalformedActionBinding {
        value: raw.to_owned(),
        separator: separator.to_owned(),
    };
    if separator.is_empty() {
        return Err(malformed());
    }
    let mut tokens = raw.split(separator).map(str::trim);
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(event), Some(action), None) if !event.is_empty() && !action.is_empty() => {
            Ok(ActionBinding {
                event: event.to_owned(),
                action: action.to_owned(),
            })
        }
        _ => Err(malformed()),
    }
}
