//! Hierarchical dependency injection container
//!
//! The `Container` owns a registry of bindings and an optional parent. Lookups
//! try the container's own registry first and then walk up the parent chain;
//! binds refuse any type already owned anywhere in that chain.

use crate::registry::Registry;
use crate::{DiError, Injectable, ResolvingContext, Result, TypeKey};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Hierarchical dependency injection container.
///
/// Cloning a `Container` gives another handle to the same scope. A child
/// created with [`scope`](Self::scope) keeps its parent alive.
///
/// # Examples
///
/// ```rust
/// use scoped_di::Container;
///
/// let root = Container::new();
/// root.bind::<i32>()?.to_value(3);
/// assert_eq!(*root.resolve::<i32>()?, 3);
///
/// let child = root.scope();
/// assert_eq!(*child.resolve::<i32>()?, 3);
/// assert!(!child.has::<i32>());
/// assert!(child.has_in_tree::<i32>());
/// # Ok::<(), scoped_di::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    registry: Arc<Registry>,
}

impl Container {
    /// Create a new root container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            depth = 0,
            "Creating new root DI container"
        );

        Self {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Create a root container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many types will be bound.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry::with_capacity(capacity)),
        }
    }

    /// Rebuild a container handle from a context's owner link
    pub(crate) fn from_weak(registry: &Weak<Registry>) -> Result<Self> {
        registry
            .upgrade()
            .map(|registry| Self { registry })
            .ok_or(DiError::ContainerDropped)
    }

    /// Create a child container whose parent is this one.
    ///
    /// The child resolves everything its ancestors can, but cannot rebind any
    /// of their types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scoped_di::Container;
    ///
    /// struct AppConfig { debug: bool }
    /// struct RequestId(String);
    ///
    /// let root = Container::new();
    /// root.bind::<AppConfig>()?.to_value(AppConfig { debug: true });
    ///
    /// let request = root.scope();
    /// request.bind::<RequestId>()?.to_value(RequestId("req-123".into()));
    ///
    /// assert!(request.has_in_tree::<AppConfig>());
    /// assert!(!root.has_in_tree::<RequestId>());
    /// # Ok::<(), scoped_di::DiError>(())
    /// ```
    #[inline]
    pub fn scope(&self) -> Self {
        let child = self.registry.child();

        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            parent_depth = self.registry.depth(),
            child_depth = child.depth(),
            parent_bindings = self.registry.len(),
            "Creating child scope from parent container"
        );

        Self {
            registry: Arc::new(child),
        }
    }

    /// Alias for `scope()` - creates a child container.
    #[inline]
    pub fn child(&self) -> Self {
        self.scope()
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Bind `T` in this container and return its context for configuration.
    ///
    /// Fails with [`DiError::DuplicateBinding`] if this container or any
    /// ancestor already binds `T`, and with [`DiError::Locked`] if the
    /// container is locked. A failed bind leaves the registry untouched.
    ///
    /// # Concurrency
    ///
    /// Racing binds of the same type on one container are atomic: exactly one
    /// succeeds. The ancestor check is a separate read, so a bind racing
    /// against a bind of the same type in an *ancestor* can succeed in both
    /// scopes. Bind shared types in the parent before handing out children.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scoped_di::{Container, DiError};
    ///
    /// let container = Container::new();
    /// container.bind::<u16>()?.to_value(8080);
    ///
    /// let again = container.bind::<u16>();
    /// assert!(matches!(again, Err(DiError::DuplicateBinding { .. })));
    /// # Ok::<(), DiError>(())
    /// ```
    pub fn bind<T: Injectable>(&self) -> Result<ResolvingContext<T>> {
        if self.registry.is_locked() {
            #[cfg(feature = "logging")]
            debug!(
                target: "scoped_di",
                service = std::any::type_name::<T>(),
                depth = self.registry.depth(),
                "Bind rejected - container is locked"
            );
            return Err(DiError::Locked);
        }

        let key = TypeKey::of::<T>();
        if self.registry.contains_in_chain(&key) {
            #[cfg(feature = "logging")]
            debug!(
                target: "scoped_di",
                service = key.name(),
                depth = self.registry.depth(),
                "Bind rejected - type already bound in container tree"
            );
            return Err(DiError::duplicate::<T>());
        }

        let context = ResolvingContext::<T>::new(Arc::downgrade(&self.registry));
        if !self.registry.insert_new(key, context.binding()) {
            // lost a race with another bind of the same type
            return Err(DiError::duplicate::<T>());
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            service = key.name(),
            depth = self.registry.depth(),
            binding_count = self.registry.len(),
            "Bound type"
        );

        Ok(context)
    }

    /// The context this container owns for `T`, if any.
    ///
    /// Ancestors are not searched.
    pub fn context<T: Injectable>(&self) -> Option<ResolvingContext<T>> {
        self.registry
            .get(&TypeKey::of::<T>())
            .and_then(ResolvingContext::from_binding)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `T` from this container or the nearest ancestor binding it.
    ///
    /// Fails with [`DiError::UnresolvedDependency`] if no container in the
    /// chain binds `T`; other failures come from the binding itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scoped_di::{Container, DiError};
    ///
    /// let container = Container::new();
    /// assert!(matches!(
    ///     container.resolve::<String>(),
    ///     Err(DiError::UnresolvedDependency { .. })
    /// ));
    /// ```
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>> {
        match self.try_resolve::<T>()? {
            Some(service) => Ok(service),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "scoped_di",
                    service = std::any::type_name::<T>(),
                    depth = self.registry.depth(),
                    "Dependency not found in container or parent chain"
                );
                Err(DiError::unresolved::<T>())
            }
        }
    }

    /// Resolve `T`, returning `Ok(None)` if no container in the chain binds it.
    ///
    /// A binding that exists but fails (unconfigured, factory error) is still
    /// an error.
    pub fn try_resolve<T: Injectable>(&self) -> Result<Option<Arc<T>>> {
        let key = TypeKey::of::<T>();

        let Some((binding, owner_depth)) = self.registry.find_in_chain(&key) else {
            #[cfg(feature = "logging")]
            trace!(
                target: "scoped_di",
                service = key.name(),
                depth = self.registry.depth(),
                "No binding in container chain"
            );
            return Ok(None);
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "scoped_di",
            service = key.name(),
            depth = self.registry.depth(),
            owner_depth = owner_depth,
            location = if owner_depth == self.registry.depth() { "local" } else { "ancestor" },
            "Resolving dependency"
        );
        #[cfg(not(feature = "logging"))]
        let _ = owner_depth;

        let context = ResolvingContext::<T>::from_binding(binding).ok_or_else(|| {
            DiError::Internal(format!("binding for `{}` holds a different type", key.name()))
        })?;

        context.resolve().map(Some)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Whether this container itself binds `T` (ancestors not searched).
    #[inline]
    pub fn has<T: Injectable>(&self) -> bool {
        self.has_key(&TypeKey::of::<T>())
    }

    /// Whether this container or any ancestor binds `T`.
    #[inline]
    pub fn has_in_tree<T: Injectable>(&self) -> bool {
        self.has_key_in_tree(&TypeKey::of::<T>())
    }

    /// Keyed form of [`has`](Self::has).
    #[inline]
    pub fn has_key(&self, key: &TypeKey) -> bool {
        self.registry.contains(key)
    }

    /// Keyed form of [`has_in_tree`](Self::has_in_tree).
    #[inline]
    pub fn has_key_in_tree(&self, key: &TypeKey) -> bool {
        self.registry.contains_in_chain(key)
    }

    /// Number of bindings in this scope (not including parents).
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if this scope has no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Keys bound in this scope.
    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.registry.keys()
    }

    /// Scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.registry.depth()
    }

    /// Whether this container has a parent.
    #[inline]
    pub fn has_parent(&self) -> bool {
        self.registry.parent().is_some()
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Lock the container to reject further binds.
    ///
    /// Existing contexts can still be reconfigured and resolved, and child
    /// scopes are unaffected.
    #[inline]
    pub fn lock(&self) {
        self.registry.lock();

        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            depth = self.registry.depth(),
            binding_count = self.registry.len(),
            "Container locked - no further bindings allowed"
        );
    }

    /// Check if the container is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.registry.is_locked()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("binding_count", &self.len())
            .field("depth", &self.depth())
            .field("has_parent", &self.has_parent())
            .field("locked", &self.is_locked())
            .finish()
    }
}
