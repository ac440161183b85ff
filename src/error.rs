//! Error types for dependency injection

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error produced by a caller-supplied factory.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors that can occur during binding and resolution
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// The type is already bound in this container or one of its ancestors
    #[error("Dependency of type `{type_name}` already exists in the container tree")]
    DuplicateBinding { type_name: &'static str },

    /// No container in the chain owns the requested type
    #[error("Can't resolve dependency `{type_name}`, is it bound?")]
    UnresolvedDependency { type_name: &'static str },

    /// The binding exists but nothing was installed after `bind()`
    #[error("Binding for `{type_name}` has no resolver installed")]
    NotConfigured { type_name: &'static str },

    /// The type is already being resolved further up the current call stack
    #[error("Circular dependency detected while resolving: {type_name}")]
    CircularDependency { type_name: &'static str },

    /// Container is locked and cannot accept new bindings
    #[error("Container is locked - cannot bind new types")]
    Locked,

    /// The container owning a binding has been dropped
    #[error("Owning container has been dropped")]
    ContainerDropped,

    /// A caller-supplied factory failed
    #[error(transparent)]
    Factory(Arc<dyn StdError + Send + Sync>),

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a DuplicateBinding error for a type
    #[inline]
    pub fn duplicate<T: 'static>() -> Self {
        Self::DuplicateBinding {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create an UnresolvedDependency error for a type
    #[inline]
    pub fn unresolved<T: 'static>() -> Self {
        Self::UnresolvedDependency {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a NotConfigured error for a type
    #[inline]
    pub fn not_configured<T: 'static>() -> Self {
        Self::NotConfigured {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(type_name: &'static str) -> Self {
        Self::CircularDependency { type_name }
    }

    /// Wrap a factory failure.
    ///
    /// A `DiError` coming back out of a factory (for example from a nested
    /// `resolve`) is returned as-is instead of being wrapped.
    pub fn factory<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        match err.into().downcast::<DiError>() {
            Ok(di) => *di,
            Err(other) => Self::Factory(Arc::from(other)),
        }
    }

    /// The user error carried by a `Factory` failure, if any.
    pub fn factory_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Factory(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
