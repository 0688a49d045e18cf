//! Identifiers for contextual scopes.
//!
//! A scope is a lifetime boundary: every instance created inside it is
//! destroyed together when the scope stops. The built-in variants cover the
//! scopes a typical injection runtime manages natively. Extension scopes use
//! [`ScopeId::Custom`] and are only valid when the runtime declares them.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Contextual scope managed by an injection runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeId {
    /// Lives for as long as the container is booted and the scope is active.
    Application,
    /// One user session.
    Session,
    /// One unit of request handling.
    Request,
    /// A conversation spanning several requests.
    Conversation,
    /// A runtime-specific extension scope. Build it with [`ScopeId::custom`]
    /// so built-in labels never end up here.
    Custom(Cow<'static, str>),
}

impl ScopeId {
    /// Built-in scopes in their natural activation order.
    pub const BUILT_IN: [Self; 4] = [
        Self::Application,
        Self::Session,
        Self::Conversation,
        Self::Request,
    ];

    /// Builds an extension scope identifier.
    ///
    /// Built-in labels (compared case-insensitively) yield the built-in
    /// variant, so `custom("request")` equals [`ScopeId::Request`].
    #[must_use]
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        let label = name.into();
        Self::BUILT_IN
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(&label))
            .unwrap_or_else(|| Self::Custom(label))
    }

    /// Returns the lowercase label used in logs and configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Application => "application",
            Self::Session => "session",
            Self::Request => "request",
            Self::Conversation => "conversation",
            Self::Custom(name) => name.as_ref(),
        }
    }

    /// Returns `true` for the built-in variants.
    #[must_use]
    pub const fn is_built_in(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing a scope identifier fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid scope identifier: '{0}'")]
pub struct ScopeParseError(String);

impl ScopeParseError {
    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ScopeId {
    type Err = ScopeParseError;

    /// Parses a built-in label, or any other identifier as a custom scope.
    ///
    /// Custom names must be non-empty and contain only ASCII alphanumerics,
    /// `-`, `_` or `.`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "application" => Ok(Self::Application),
            "session" => Ok(Self::Session),
            "request" => Ok(Self::Request),
            "conversation" => Ok(Self::Conversation),
            _ if is_valid_custom_name(trimmed) => Ok(Self::custom(trimmed.to_owned())),
            _ => Err(ScopeParseError(value.to_owned())),
        }
    }
}

fn is_valid_custom_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
