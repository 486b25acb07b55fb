//! Route configuration errors.

use thiserror::Error;

use crate::core::types::ComponentId;

/// Failures raised while building or mutating the routing configuration.
///
/// These are configuration-time errors: they fail the registration attempt
/// that caused them and never reach request handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConfigError {
    /// Two navigation targets claim the same route.
    #[error(
        "Navigation targets must have unique routes, found navigation targets '{existing}' and '{attempted}' with the same route{}",
        pattern_suffix(.pattern)
    )]
    AmbiguousRoute {
        pattern: Option<String>,
        existing: ComponentId,
        attempted: ComponentId,
    },

    /// A plain route claims the path an optional parameter would otherwise
    /// leave out, so the parameter is always required in practice.
    #[error(
        "Navigation targets '{target}' and '{optional}' have the same path and '{optional}' has an optional parameter that will never be used as optional"
    )]
    UnusedOptional {
        pattern: String,
        target: ComponentId,
        optional: ComponentId,
    },

    /// A frozen entry was asked to change.
    #[error("Tried to mutate immutable configuration.")]
    ImmutableMutation,

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A pattern-addressed update named a route that was never registered.
    #[error("no route registered for '{pattern}'")]
    UnknownRoute { pattern: String },
}

fn pattern_suffix(pattern: &Option<String>) -> String {
    match pattern {
        Some(pattern) => format!(" '{}'", pattern),
        None => String::new(),
    }
}

impl RouteConfigError {
    /// Attach the offending pattern to an ambiguity reported by an entry.
    pub(crate) fn with_pattern(self, route: &str) -> Self {
        match self {
            Self::AmbiguousRoute {
                existing,
                attempted,
                ..
            } => Self::AmbiguousRoute {
                pattern: Some(route.to_string()),
                existing,
                attempted,
            },
            other => other,
        }
    }
}
