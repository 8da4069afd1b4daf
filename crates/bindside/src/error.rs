#![forbid(unsafe_code)]

//! Errors raised by declarations, writes and activation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("property already declared: {name}")]
    DuplicatePropertyName { name: String },

    #[error("unknown property: {name}")]
    UnknownPropertyReference { name: String },

    #[error("cannot assign to computed property: {name}")]
    AssignToComputedProperty { name: String },

    #[error("malformed action binding {value:?}: expected \"<event>{separator}<action>\"")]
    MalformedActionBinding { value: String, separator: String },

    #[error("unknown action: {name}")]
    UnknownAction { name: String },

    #[error("action already declared: {name}")]
    DuplicateActionName { name: String },

    #[error("dependency cycle through computed property: {name}")]
    CyclicDependency { name: String },

    #[error("declarations are closed once activation is scheduled: {name}")]
    DeclarationClosed { name: String },

    #[error("view model is already active")]
    AlreadyActive,

    #[error("scope selector matched nothing: {selector}")]
    ScopeNotFound { selector: String },

    #[error("model must be a JSON object, got {kind}")]
    InvalidModel { kind: &'static str },

    #[error("computed definition failed: {message}")]
    Definition { message: String },

    #[error("view model re-entered while busy: {name}")]
    Reentrant { name: String },
}

impl BindError {
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownPropertyReference { name: name.into() }
    }

    /// Failure raised by a computed definition or an action handler.
    #[must_use]
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Whether the error was raised while declaring (before activation).
    #[must_use]
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePropertyName { .. }
                | Self::DuplicateActionName { .. }
                | Self::UnknownPropertyReference { .. }
                | Self::DeclarationClosed { .. }
        )
    }
}
