//! Resolving contexts - the configurable slot behind each binding
//!
//! `Container::bind` hands back a [`ResolvingContext`]. Configuring it
//! installs (or decorates) the resolver the container will run for that type.

use crate::registry::{Binding, Registry};
use crate::resolver::{AnyResolver, FactoryResolver, Resolve, ResolverKind, ValueResolver};
use crate::{Container, Dependencies, DiError, Injectable, Result, TypeKey};
use parking_lot::RwLock;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Cycle Detection
// =============================================================================

thread_local! {
    /// Slots currently being resolved on this thread, outermost first
    static RESOLVING: RefCell<Vec<(usize, &'static str)>> = const { RefCell::new(Vec::new()) };
}

/// Marks one binding slot as in-flight for the current thread until dropped.
///
/// Keyed on slot identity, not type: the same type resolved through another
/// binding (another container tree) is not a cycle.
struct ResolutionGuard {
    slot: usize,
}

impl ResolutionGuard {
    /// Fails with `CircularDependency` if `slot` is already in flight
    fn enter(slot: usize, type_name: &'static str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(id, _)| *id == slot) {
                #[cfg(feature = "logging")]
                debug!(
                    target: "scoped_di",
                    service = type_name,
                    chain = ?stack.iter().map(|(_, name)| *name).collect::<Vec<_>>(),
                    "Circular dependency detected"
                );
                return Err(DiError::circular(type_name));
            }
            stack.push((slot, type_name));
            Ok(Self { slot })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(id, _)| *id == self.slot) {
                stack.remove(pos);
            }
        });
    }
}

/// Shared state behind a context handle
struct Slot<T> {
    /// Registry of the container that created this binding
    owner: Weak<Registry>,
    /// Currently installed resolver
    current: RwLock<Option<AnyResolver<T>>>,
}

/// Configuration handle for one binding.
///
/// All configuration methods take `&self` and return `&Self`, so calls chain.
/// Each call replaces (or, for [`as_singleton`](Self::as_singleton), wraps)
/// the resolver installed by the previous one. Clones refer to the same
/// binding.
///
/// # Examples
///
/// ```rust
/// use scoped_di::Container;
///
/// struct Config { port: u16 }
/// struct Server { port: u16 }
///
/// let container = Container::new();
/// container.bind::<Config>()?.to_value(Config { port: 8080 });
/// container
///     .bind::<Server>()?
///     .from1(|config: std::sync::Arc<Config>| Server { port: config.port })
///     .as_singleton()?;
///
/// assert_eq!(container.resolve::<Server>()?.port, 8080);
/// # Ok::<(), scoped_di::DiError>(())
/// ```
pub struct ResolvingContext<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Injectable> ResolvingContext<T> {
    /// New, unconfigured context owned by `owner`
    pub(crate) fn new(owner: Weak<Registry>) -> Self {
        Self {
            slot: Arc::new(Slot {
                owner,
                current: RwLock::new(None),
            }),
        }
    }

    /// Recover a context from its registry binding
    pub(crate) fn from_binding(binding: Binding) -> Option<Self> {
        binding.downcast::<Slot<T>>().map(|slot| Self { slot })
    }

    /// Type-erased handle for storing in a registry
    pub(crate) fn binding(&self) -> Binding {
        Binding::new(Arc::clone(&self.slot) as Arc<dyn std::any::Any + Send + Sync>)
    }

    /// Key of the bound type
    #[inline]
    pub fn key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    /// Whether a resolver is installed
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.slot.current.read().is_some()
    }

    /// Strategy of the installed resolver, if any
    #[inline]
    pub fn kind(&self) -> Option<ResolverKind> {
        self.slot.current.read().as_ref().map(AnyResolver::kind)
    }

    /// Replace the installed resolver
    fn install(&self, resolver: AnyResolver<T>) -> &Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            service = std::any::type_name::<T>(),
            kind = %resolver.kind(),
            "Installing resolver"
        );

        *self.slot.current.write() = Some(resolver);
        self
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Install any resolver, replacing the current one.
    pub fn to_resolver<R>(&self, resolver: R) -> &Self
    where
        R: Resolve<T> + 'static,
    {
        self.install(AnyResolver::custom(resolver))
    }

    /// Install an already-built [`AnyResolver`].
    pub fn to_any_resolver(&self, resolver: AnyResolver<T>) -> &Self {
        self.install(resolver)
    }

    /// Always resolve to `value`.
    pub fn to_value(&self, value: T) -> &Self {
        self.install(AnyResolver::Value(ValueResolver::new(value)))
    }

    /// Always resolve to the given shared instance.
    pub fn to_shared(&self, value: Arc<T>) -> &Self {
        self.install(AnyResolver::Value(ValueResolver::from_arc(value)))
    }

    /// Wrap the installed resolver so it runs at most once.
    ///
    /// Fails with [`DiError::NotConfigured`] when nothing is installed yet.
    pub fn as_singleton(&self) -> Result<&Self> {
        let mut current = self.slot.current.write();
        let Some(resolver) = current.take() else {
            #[cfg(feature = "logging")]
            debug!(
                target: "scoped_di",
                service = std::any::type_name::<T>(),
                "as_singleton() called with nothing to decorate"
            );
            return Err(DiError::not_configured::<T>());
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "scoped_di",
            service = std::any::type_name::<T>(),
            wraps = %resolver.kind(),
            "Decorating resolver as singleton"
        );

        *current = Some(resolver.into_singleton());
        Ok(self)
    }

    /// Build a new instance with `factory` on every resolve.
    pub fn from<F>(&self, factory: F) -> &Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.install(AnyResolver::Factory(FactoryResolver::new(factory)))
    }

    /// Like [`from`](Self::from), for factories that can fail.
    ///
    /// The factory's error reaches the caller of `resolve` unchanged (see
    /// [`DiError::factory`]).
    pub fn from_result<F, E>(&self, factory: F) -> &Self
    where
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<crate::BoxError>,
    {
        self.install(AnyResolver::Factory(FactoryResolver::fallible(factory)))
    }

    /// Build a new instance from dependencies resolved out of the owning
    /// container.
    ///
    /// The dependencies are resolved each time the factory runs, not when it
    /// is installed, so later changes to their bindings are observed.
    pub fn with_deps<D, F>(&self, factory: F) -> &Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.try_with_deps(move |deps: D| Ok::<T, DiError>(factory(deps)))
    }

    /// Fallible form of [`with_deps`](Self::with_deps).
    pub fn try_with_deps<D, F, E>(&self, factory: F) -> &Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<crate::BoxError>,
    {
        let owner = self.slot.owner.clone();
        self.install(AnyResolver::Factory(FactoryResolver::from_fn(move || {
            let container = Container::from_weak(&owner)?;

            #[cfg(feature = "logging")]
            trace!(
                target: "scoped_di",
                service = std::any::type_name::<T>(),
                dependencies = ?D::dependency_keys(),
                "Resolving factory dependencies"
            );

            let deps = D::resolve_from(&container)?;
            factory(deps).map(Arc::new).map_err(DiError::factory)
        })))
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Run the installed resolver.
    ///
    /// Fails with [`DiError::NotConfigured`] when nothing is installed, and
    /// with [`DiError::CircularDependency`] when this binding is already being
    /// resolved further up the current thread's stack; otherwise returns
    /// whatever the resolver returns.
    pub fn resolve(&self) -> Result<Arc<T>> {
        // clone out so the slot lock is not held while user code runs
        let Some(resolver) = self.slot.current.read().clone() else {
            return Err(DiError::not_configured::<T>());
        };

        // entered before a singleton touches its cell, which would block on re-entry
        let _guard =
            ResolutionGuard::enter(Arc::as_ptr(&self.slot) as usize, std::any::type_name::<T>())?;
        resolver.resolve()
    }
}

// from1..from8: fixed-arity shorthands for `with_deps`
macro_rules! impl_from_n {
    ($($name:ident => ($($A:ident $a:ident),+);)+) => {
        impl<T: Injectable> ResolvingContext<T> {
            $(
                #[doc = concat!(
                    "Build a new instance from ",
                    stringify!($($A),+),
                    ", resolved from the owning container in that order on every resolve."
                )]
                pub fn $name<$($A: Injectable,)+ F>(&self, factory: F) -> &Self
                where
                    F: Fn($(Arc<$A>),+) -> T + Send + Sync + 'static,
                {
                    self.with_deps(move |($($a,)+): ($(Arc<$A>,)+)| factory($($a),+))
                }
            )+
        }
    };
}

impl_from_n! {
    from1 => (A1 a1);
    from2 => (A1 a1, A2 a2);
    from3 => (A1 a1, A2 a2, A3 a3);
    from4 => (A1 a1, A2 a2, A3 a3, A4 a4);
    from5 => (A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
    from6 => (A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
    from7 => (A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
    from8 => (A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
}

impl<T: Injectable> Resolve<T> for ResolvingContext<T> {
    #[inline]
    fn resolve(&self) -> Result<Arc<T>> {
        ResolvingContext::resolve(self)
    }
}

impl<T> Clone for ResolvingContext<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Injectable> fmt::Debug for ResolvingContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvingContext")
            .field("type", &std::any::type_name::<T>())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Port(u16);

    #[derive(Debug)]
    struct Host(String);

    #[test]
    fn test_unconfigured_context_fails() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();

        assert!(!context.is_configured());
        assert!(matches!(
            context.resolve().unwrap_err(),
            DiError::NotConfigured { .. }
        ));
    }

    #[test]
    fn test_to_value() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context.to_value(Port(80));

        assert_eq!(*context.resolve().unwrap(), Port(80));
        assert_eq!(context.kind(), Some(ResolverKind::Value));
    }

    #[test]
    fn test_later_call_replaces_resolver() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context.to_value(Port(80)).to_value(Port(443));

        assert_eq!(*context.resolve().unwrap(), Port(443));

        context.from(|| Port(8080));
        assert_eq!(*context.resolve().unwrap(), Port(8080));
        assert_eq!(context.kind(), Some(ResolverKind::Factory));
    }

    #[test]
    fn test_as_singleton_without_resolver() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();

        assert!(matches!(
            context.as_singleton().unwrap_err(),
            DiError::NotConfigured { .. }
        ));
        assert!(!context.is_configured());
    }

    #[test]
    fn test_factory_singleton_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context
            .from(move || Port(counter.fetch_add(1, Ordering::SeqCst) as u16))
            .as_singleton()
            .unwrap();

        for _ in 0..5 {
            assert_eq!(*context.resolve().unwrap(), Port(0));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.kind(), Some(ResolverKind::Singleton));
    }

    #[test]
    fn test_to_shared_keeps_identity() {
        let shared = Arc::new(Port(1));
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context.to_shared(Arc::clone(&shared));

        assert!(Arc::ptr_eq(&context.resolve().unwrap(), &shared));
    }

    #[test]
    fn test_to_resolver_with_another_context() {
        let container = Container::new();
        let source = container.bind::<Port>().unwrap();
        source.to_value(Port(22));

        let other = Container::new();
        other.bind::<Port>().unwrap().to_resolver(source.clone());

        assert_eq!(*other.resolve::<Port>().unwrap(), Port(22));

        // delegate follows later changes to the source
        source.to_value(Port(23));
        assert_eq!(*other.resolve::<Port>().unwrap(), Port(23));
    }

    #[test]
    fn test_from1_uses_owning_container() {
        let container = Container::new();
        container.bind::<Port>().unwrap().to_value(Port(5432));
        let context = container.bind::<Host>().unwrap();
        context.from1(|port: Arc<Port>| Host(format!("db:{}", port.0)));

        assert_eq!(context.resolve().unwrap().0, "db:5432");
    }

    #[test]
    fn test_from_result_error_propagates() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context.from_result(|| "http".parse::<u16>().map(Port));

        let err = context.resolve().unwrap_err();
        assert!(err.factory_error().unwrap().is::<std::num::ParseIntError>());
    }

    #[test]
    fn test_try_with_deps_optional() {
        let container = Container::new();
        let context = container.bind::<Host>().unwrap();
        context.try_with_deps(|port: Option<Arc<Port>>| {
            Ok::<_, DiError>(Host(match port {
                Some(port) => format!("localhost:{}", port.0),
                None => "localhost".into(),
            }))
        });

        assert_eq!(context.resolve().unwrap().0, "localhost");

        container.bind::<Port>().unwrap().to_value(Port(3000));
        assert_eq!(context.resolve().unwrap().0, "localhost:3000");
    }

    #[test]
    fn test_self_referential_singleton_context_fails_fast() {
        #[derive(Debug)]
        struct Node;

        let container = Container::new();
        let context = container.bind::<Node>().unwrap();
        context
            .try_with_deps(|_self: Arc<Node>| Ok::<_, DiError>(Node))
            .as_singleton()
            .unwrap();

        // resolving the context directly must not block inside the singleton cell
        assert!(matches!(
            context.resolve().unwrap_err(),
            DiError::CircularDependency { .. }
        ));
        // and the stack is unwound for the next attempt
        assert!(matches!(
            context.resolve().unwrap_err(),
            DiError::CircularDependency { .. }
        ));
    }

    #[test]
    fn test_same_type_through_another_container_is_not_circular() {
        let upstream = Container::new();
        upstream.bind::<Port>().unwrap().to_value(Port(5432));

        let local = Container::new();
        let bridge = upstream.clone();
        local
            .bind::<Port>()
            .unwrap()
            .from_result(move || bridge.resolve::<Port>().map(|port| (*port).clone()))
            .as_singleton()
            .unwrap();

        assert_eq!(*local.resolve::<Port>().unwrap(), Port(5432));
        assert_eq!(*local.context::<Port>().unwrap().resolve().unwrap(), Port(5432));
    }

    #[test]
    fn test_self_delegating_context_is_circular() {
        let container = Container::new();
        let context = container.bind::<Port>().unwrap();
        context.to_resolver(context.clone());

        assert!(matches!(
            context.resolve().unwrap_err(),
            DiError::CircularDependency { .. }
        ));
    }

    #[test]
    fn test_dropped_container() {
        let container = Container::new();
        let context = container.bind::<Host>().unwrap();
        context.from1(|port: Arc<Port>| Host(port.0.to_string()));
        drop(container);

        assert!(matches!(
            context.resolve().unwrap_err(),
            DiError::ContainerDropped
        ));
    }
}
