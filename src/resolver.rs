//! Resolvers - strategies that produce a value on demand
//!
//! A binding's behaviour is one of a closed set of variants held in
//! [`AnyResolver`]: a fixed value, a factory called on every resolve, a
//! singleton decorator caching whatever it wraps, or a caller-supplied
//! [`Resolve`] implementation.

use crate::{DiError, Injectable, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Produces a `T` on demand (trait for external extensibility)
pub trait Resolve<T>: Send + Sync {
    /// Produce the value, or fail
    fn resolve(&self) -> Result<Arc<T>>;
}

/// Which strategy a resolver uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverKind {
    /// Same stored value every time
    Value,
    /// Freshly produced on every resolve
    Factory,
    /// Produced once on first resolve, then cached
    Singleton,
    /// Caller-supplied strategy
    Custom,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value => "value",
            Self::Factory => "factory",
            Self::Singleton => "singleton",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Value Resolver
// =============================================================================

/// Returns a pre-built value; never fails, never has side effects
pub struct ValueResolver<T> {
    value: Arc<T>,
}

impl<T: Injectable> ValueResolver<T> {
    /// Create from an owned value
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// Create from an existing Arc
    #[inline]
    pub fn from_arc(value: Arc<T>) -> Self {
        Self { value }
    }

    /// Return the stored value (just clones the Arc)
    #[inline]
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for ValueResolver<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Injectable> Resolve<T> for ValueResolver<T> {
    #[inline]
    fn resolve(&self) -> Result<Arc<T>> {
        Ok(self.get())
    }
}

// =============================================================================
// Factory Resolver
// =============================================================================

/// Type-erased production function
type FactoryFn<T> = Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// Calls its function on every resolve; nothing is cached
pub struct FactoryResolver<T> {
    factory: FactoryFn<T>,
}

impl<T: Injectable> FactoryResolver<T> {
    /// Create from an infallible factory
    #[inline]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Ok(Arc::new(factory()))),
        }
    }

    /// Create from a fallible factory.
    ///
    /// The error reaches the caller of `resolve` through [`DiError::factory`].
    #[inline]
    pub fn fallible<F, E>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<crate::BoxError>,
    {
        Self {
            factory: Arc::new(move || factory().map(Arc::new).map_err(DiError::factory)),
        }
    }

    /// Create from a function that already speaks `DiError`
    #[inline]
    pub(crate) fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Produce a new instance
    #[inline]
    pub fn create(&self) -> Result<Arc<T>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "scoped_di",
            service = std::any::type_name::<T>(),
            "Creating new instance from factory"
        );

        (self.factory)()
    }
}

impl<T> Clone for FactoryResolver<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: Injectable> Resolve<T> for FactoryResolver<T> {
    #[inline]
    fn resolve(&self) -> Result<Arc<T>> {
        self.create()
    }
}

// =============================================================================
// Singleton Resolver
// =============================================================================

/// Decorates another resolver and caches its first successful result.
///
/// The cache state lives in a `OnceCell`, separate from the value itself, so
/// a cached `None` or empty value is still a cache hit. Concurrent first
/// calls are serialized and only one of them runs the decorated resolver. A
/// failed first call caches nothing.
pub struct SingletonResolver<T> {
    inner: AnyResolver<T>,
    instance: OnceCell<Arc<T>>,
}

impl<T: Injectable> SingletonResolver<T> {
    /// Wrap `inner`
    #[inline]
    pub fn new(inner: AnyResolver<T>) -> Self {
        Self {
            inner,
            instance: OnceCell::new(),
        }
    }

    /// Whether the first value has been produced
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Get the instance, producing it if necessary
    pub fn get(&self) -> Result<Arc<T>> {
        if let Some(instance) = self.instance.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "scoped_di",
                service = std::any::type_name::<T>(),
                "Singleton already initialized, returning cached instance"
            );
            return Ok(Arc::clone(instance));
        }

        let instance = self.instance.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "scoped_di",
                service = std::any::type_name::<T>(),
                wraps = %self.inner.kind(),
                "Singleton initializing on first access"
            );

            self.inner.resolve()
        })?;

        Ok(Arc::clone(instance))
    }
}

impl<T: Injectable> Resolve<T> for SingletonResolver<T> {
    #[inline]
    fn resolve(&self) -> Result<Arc<T>> {
        self.get()
    }
}

// =============================================================================
// AnyResolver - closed set of variants
// =============================================================================

/// The resolver installed in a binding.
///
/// Cloning is cheap and clones share state: a cloned `Singleton` hands out
/// the same cached instance.
pub enum AnyResolver<T> {
    /// Fixed value
    Value(ValueResolver<T>),
    /// New instance each time
    Factory(FactoryResolver<T>),
    /// Cached after first access
    Singleton(Arc<SingletonResolver<T>>),
    /// Caller-supplied strategy
    Custom(Arc<dyn Resolve<T>>),
}

impl<T: Injectable> AnyResolver<T> {
    /// Value resolver for `value`
    #[inline]
    pub fn value(value: T) -> Self {
        Self::Value(ValueResolver::new(value))
    }

    /// Factory resolver for `factory`
    #[inline]
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Factory(FactoryResolver::new(factory))
    }

    /// Wrap an arbitrary resolver
    #[inline]
    pub fn custom<R>(resolver: R) -> Self
    where
        R: Resolve<T> + 'static,
    {
        Self::Custom(Arc::new(resolver))
    }

    /// Decorate `self` so it produces a value at most once
    #[inline]
    pub fn into_singleton(self) -> Self {
        Self::Singleton(Arc::new(SingletonResolver::new(self)))
    }

    /// Which strategy this is
    #[inline]
    pub fn kind(&self) -> ResolverKind {
        match self {
            Self::Value(_) => ResolverKind::Value,
            Self::Factory(_) => ResolverKind::Factory,
            Self::Singleton(_) => ResolverKind::Singleton,
            Self::Custom(_) => ResolverKind::Custom,
        }
    }

    /// Produce the value
    #[inline]
    pub fn resolve(&self) -> Result<Arc<T>> {
        match self {
            Self::Value(r) => Ok(r.get()),
            Self::Factory(r) => r.create(),
            Self::Singleton(r) => r.get(),
            Self::Custom(r) => r.resolve(),
        }
    }
}

impl<T> Clone for AnyResolver<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(r) => Self::Value(r.clone()),
            Self::Factory(r) => Self::Factory(r.clone()),
            Self::Singleton(r) => Self::Singleton(Arc::clone(r)),
            Self::Custom(r) => Self::Custom(Arc::clone(r)),
        }
    }
}

impl<T: Injectable> Resolve<T> for AnyResolver<T> {
    #[inline]
    fn resolve(&self) -> Result<Arc<T>> {
        AnyResolver::resolve(self)
    }
}

impl<T: Injectable> fmt::Debug for AnyResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyResolver")
            .field("kind", &self.kind())
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    struct TestService {
        id: u32,
    }

    #[test]
    fn test_value_resolver() {
        let resolver = ValueResolver::new(TestService { id: 3 });

        let a = resolver.resolve().unwrap();
        let b = resolver.resolve().unwrap();

        assert_eq!(a.id, 3);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_not_called_before_resolve() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let resolver = FactoryResolver::new(move || TestService {
            id: counter.fetch_add(1, Ordering::SeqCst),
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        resolver.resolve().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_runs_every_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let resolver = FactoryResolver::new(move || TestService {
            id: counter.fetch_add(1, Ordering::SeqCst),
        });

        for _ in 0..4 {
            resolver.resolve().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_fallible_factory_error_propagates() {
        let resolver = FactoryResolver::<TestService>::fallible(|| Err("disk full"));

        let err = resolver.resolve().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(err.factory_error().is_some());
    }

    #[test]
    fn test_singleton_resolves_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let resolver = AnyResolver::factory(move || TestService {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
        .into_singleton();

        let first = resolver.resolve().unwrap();
        for _ in 0..3 {
            let again = resolver.resolve().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_caches_none() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let resolver = AnyResolver::<Option<u32>>::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        })
        .into_singleton();

        assert_eq!(*resolver.resolve().unwrap(), None);
        assert_eq!(*resolver.resolve().unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_retries_after_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let inner = FactoryResolver::fallible(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("not yet")
            } else {
                Ok(TestService { id: 7 })
            }
        });
        let resolver = SingletonResolver::new(AnyResolver::Factory(inner));

        assert!(resolver.get().is_err());
        assert!(!resolver.is_initialized());
        assert_eq!(resolver.get().unwrap().id, 7);
        assert_eq!(resolver.get().unwrap().id, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cloned_singleton_shares_cache() {
        let resolver = AnyResolver::factory(|| TestService { id: 1 }).into_singleton();
        let clone = resolver.clone();

        let a = resolver.resolve().unwrap();
        let b = clone.resolve().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_custom_resolver() {
        struct Fixed;

        impl Resolve<TestService> for Fixed {
            fn resolve(&self) -> Result<Arc<TestService>> {
                Ok(Arc::new(TestService { id: 99 }))
            }
        }

        let resolver = AnyResolver::custom(Fixed);
        assert_eq!(resolver.kind(), ResolverKind::Custom);
        assert_eq!(resolver.resolve().unwrap().id, 99);
    }

    #[test]
    fn test_kind() {
        assert_eq!(AnyResolver::value(1u8).kind(), ResolverKind::Value);
        assert_eq!(AnyResolver::factory(|| 1u8).kind(), ResolverKind::Factory);
        assert_eq!(
            AnyResolver::value(1u8).into_singleton().kind(),
            ResolverKind::Singleton
        );
        assert_eq!(ResolverKind::Singleton.to_string(), "singleton");
    }
}
