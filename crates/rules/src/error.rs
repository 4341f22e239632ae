//! Error types for controller registration, rule dispatch, and commit.

/// Errors raised when registering a controller with the context.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The instance is already registered and the context is configured
    /// to reject duplicates.
    #[error("controller '{0}' is already registered")]
    DuplicateController(String),
}

/// Errors raised inside a matched rule handler.
///
/// The engine never catches these: a failing handler aborts the whole
/// commit so rules and their derived records apply together or not at
/// all.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A rule handler rejected the pending change.
    #[error("rule '{rule}' failed: {message}")]
    Rule { rule: String, message: String },

    /// An entity snapshot could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`BusinessContext::commit`] and
/// [`BusinessContext::commit_async`].
///
/// [`BusinessContext::commit`]: crate::context::BusinessContext::commit
/// [`BusinessContext::commit_async`]: crate::context::BusinessContext::commit_async
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// A business rule failed; nothing was applied.
    #[error("business rules aborted the commit: {0}")]
    Dispatch(#[from] DispatchError),

    /// The underlying store rejected the change set.
    #[error("store rejected the commit: {0}")]
    Store(#[from] crate::store::StoreError),
}
