//! # Scoped DI - Hierarchical Dependency Injection for Rust
//!
//! A thread-safe dependency injection container built around explicit,
//! fluent bindings and nested scopes.
//!
//! ## Features
//!
//! - 🔒 **Type-safe** - Types are keyed by `TypeId`, resolved as `Arc<T>`
//! - 🔄 **Scoped containers** - Children resolve through the full parent chain
//! - 🚫 **No shadowing** - A type is bound at most once per container tree
//! - 🏭 **Factories with dependencies** - `from1..from8` resolve their arguments on every call
//! - ♻️ **Singletons** - Decorate any binding to produce its value exactly once
//! - 🔁 **Cycle detection** - Re-entrant resolution fails instead of recursing
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_di::Container;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//!
//! // Bind a fixed value
//! container.bind::<Database>()?.to_value(Database { url: "postgres://localhost".into() });
//!
//! // Bind a factory whose argument is resolved from the container
//! container
//!     .bind::<UserService>()?
//!     .from1(|db: Arc<Database>| UserService { db })
//!     .as_singleton()?;
//!
//! let users = container.resolve::<UserService>()?;
//! assert_eq!(users.db.url, "postgres://localhost");
//! # Ok::<(), scoped_di::DiError>(())
//! ```
//!
//! ## Resolution Strategies
//!
//! ```rust
//! use scoped_di::Container;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config { debug: bool }
//! struct RequestId(u64);
//! struct Clock;
//!
//! let container = Container::new();
//!
//! // Value - the same instance every time
//! container.bind::<Config>()?.to_value(Config { debug: true });
//!
//! // Factory - a new instance on every resolve
//! container.bind::<RequestId>()?.from(|| RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)));
//!
//! // Singleton - created on first resolve, then cached
//! container.bind::<Clock>()?.from(|| Clock).as_singleton()?;
//!
//! let a = container.resolve::<RequestId>()?;
//! let b = container.resolve::<RequestId>()?;
//! assert_ne!(a.0, b.0);
//! # Ok::<(), scoped_di::DiError>(())
//! ```
//!
//! ## Scoped Containers
//!
//! ```rust
//! use scoped_di::{Container, DiError};
//!
//! struct AppConfig { name: String }
//! struct RequestContext { id: String }
//!
//! let root = Container::new();
//! root.bind::<AppConfig>()?.to_value(AppConfig { name: "MyApp".into() });
//!
//! // Per-request scope - sees everything the root binds
//! let request_scope = root.scope();
//! request_scope.bind::<RequestContext>()?.to_value(RequestContext { id: "req-123".into() });
//!
//! assert_eq!(request_scope.resolve::<AppConfig>()?.name, "MyApp");
//!
//! // Root cannot see request-scoped types
//! assert!(!root.has_in_tree::<RequestContext>());
//!
//! // Rebinding an ancestor's type is refused
//! assert!(matches!(
//!     request_scope.bind::<AppConfig>(),
//!     Err(DiError::DuplicateBinding { .. })
//! ));
//! # Ok::<(), DiError>(())
//! ```
//!
//! ## Concurrency
//!
//! - Registries are `DashMap`s; map guards are released before any resolver runs
//! - Singletons initialize exactly once even under concurrent first access
//! - Children hold their parent alive; contexts hold their container weakly

mod container;
mod context;
mod deps;
mod error;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod registry;
mod resolver;

pub use container::*;
pub use context::*;
pub use deps::*;
pub use error::*;
pub use key::*;
pub use resolver::*;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AnyResolver, Container, Dependencies, DiError, Injectable, Resolve, ResolverKind,
        ResolvingContext, Result, TypeKey,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    #[derive(Debug)]
    struct UserService {
        db: Arc<Database>,
    }

    #[test]
    fn test_concrete_scenario() {
        let c = Container::new();
        c.bind::<i32>().unwrap().to_value(3);
        assert_eq!(*c.resolve::<i32>().unwrap(), 3);

        let d = c.scope();
        assert_eq!(*d.resolve::<i32>().unwrap(), 3);
        assert!(!d.has::<i32>());
        assert!(d.has_in_tree::<i32>());
    }

    #[test]
    fn test_value_singleton_produces_once() {
        let container = Container::new();
        container
            .bind::<Database>()
            .unwrap()
            .to_value(Database { url: "test".into() })
            .as_singleton()
            .unwrap();

        let a = container.resolve::<Database>().unwrap();
        let b = container.resolve::<Database>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_singleton_through_child_scopes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let root = Container::new();
        root.bind::<Database>()
            .unwrap()
            .from(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Database { url: "shared".into() }
            })
            .as_singleton()
            .unwrap();

        let first = root.scope().resolve::<Database>().unwrap();
        let second = root.scope().scope().resolve::<Database>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from1_observes_binding_at_resolution_time() {
        let container = Container::new();
        let db = container.bind::<Database>().unwrap();
        container
            .bind::<UserService>()
            .unwrap()
            .from1(|db: Arc<Database>| UserService { db });

        // dependency configured after the factory was installed
        db.to_value(Database { url: "first".into() });
        assert_eq!(container.resolve::<UserService>().unwrap().db.url, "first");

        db.to_value(Database { url: "second".into() });
        assert_eq!(container.resolve::<UserService>().unwrap().db.url, "second");
    }

    #[test]
    fn test_from1_missing_dependency_skips_factory() {
        let called = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&called);

        let container = Container::new();
        container.bind::<UserService>().unwrap().from1(move |db: Arc<Database>| {
            counter.fetch_add(1, Ordering::SeqCst);
            UserService { db }
        });

        match container.resolve::<UserService>().unwrap_err() {
            DiError::UnresolvedDependency { type_name } => {
                assert!(type_name.ends_with("Database"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_child_factory_resolves_from_parent() {
        let root = Container::new();
        root.bind::<Database>()
            .unwrap()
            .to_value(Database { url: "root".into() });

        let child = root.scope();
        child
            .bind::<UserService>()
            .unwrap()
            .from1(|db: Arc<Database>| UserService { db });

        assert_eq!(child.resolve::<UserService>().unwrap().db.url, "root");
        assert!(root.try_resolve::<UserService>().unwrap().is_none());
    }

    #[test]
    fn test_from8_positional_order() {
        struct Sum(u64);

        let container = Container::new();
        container.bind::<u8>().unwrap().to_value(1);
        container.bind::<u16>().unwrap().to_value(2);
        container.bind::<u32>().unwrap().to_value(3);
        container.bind::<u64>().unwrap().to_value(4);
        container.bind::<i8>().unwrap().to_value(5);
        container.bind::<i16>().unwrap().to_value(6);
        container.bind::<i32>().unwrap().to_value(7);
        container.bind::<i64>().unwrap().to_value(8);

        container.bind::<Sum>().unwrap().from8(
            |a: Arc<u8>,
             b: Arc<u16>,
             c: Arc<u32>,
             d: Arc<u64>,
             e: Arc<i8>,
             f: Arc<i16>,
             g: Arc<i32>,
             h: Arc<i64>| {
                // weight each argument by its position
                Sum(*a as u64
                    + *b as u64 * 10
                    + *c as u64 * 100
                    + *d * 1_000
                    + *e as u64 * 10_000
                    + *f as u64 * 100_000
                    + *g as u64 * 1_000_000
                    + *h as u64 * 10_000_000)
            },
        );

        assert_eq!(container.resolve::<Sum>().unwrap().0, 87_654_321);
    }

    #[test]
    fn test_factory_error_reaches_caller_unchanged() {
        let container = Container::new();
        container
            .bind::<u16>()
            .unwrap()
            .from_result(|| "not-a-port".parse::<u16>());

        let err = container.resolve::<u16>().unwrap_err();
        let expected = "not-a-port".parse::<u16>().unwrap_err();
        assert_eq!(err.to_string(), expected.to_string());
        assert!(err.factory_error().unwrap().is::<std::num::ParseIntError>());

        // and through a dependent factory
        container
            .bind::<Database>()
            .unwrap()
            .from1(|port: Arc<u16>| Database { url: format!("db:{port}") });
        let err = container.resolve::<Database>().unwrap_err();
        assert!(err.factory_error().unwrap().is::<std::num::ParseIntError>());
    }

    #[test]
    fn test_concurrent_singleton_initializes_once() {
        const THREADS: usize = 8;

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let container = Container::new();
        container
            .bind::<Database>()
            .unwrap()
            .from(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(5));
                Database { url: "once".into() }
            })
            .as_singleton()
            .unwrap();

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let scope = container.scope();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    scope.resolve::<Database>().unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_binds_of_same_type() {
        const THREADS: usize = 8;

        let container = Container::new();
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let container = container.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container
                        .bind::<usize>()
                        .map(|context| {
                            context.to_value(i);
                        })
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(*container.resolve::<usize>().unwrap() < THREADS);
    }
}
