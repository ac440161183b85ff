//! Walks through a container's life with logging enabled
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use scoped_di::{Container, DiError};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() -> Result<(), DiError> {
    // JSON if logging-json is enabled, pretty if logging-pretty is enabled
    scoped_di::logging::init();

    println!("=== Scoped DI Logging Demo ===\n");

    // logs: "Creating new root DI container"
    let container = Container::new();

    // logs: "Bound type", "Installing resolver"
    container.bind::<Database>()?.to_value(Database {
        url: "postgres://localhost/mydb".into(),
    });

    // logs: "Decorating resolver as singleton"
    container
        .bind::<UserService>()?
        .from1(|db: Arc<Database>| {
            println!("  [App] UserService being created...");
            UserService { db }
        })
        .as_singleton()?;

    // logs: "Resolving dependency", "Singleton initializing on first access"
    let _users = container.resolve::<UserService>()?;
    // logs: "Singleton already initialized, returning cached instance"
    let _again = container.resolve::<UserService>()?;

    // logs: "No binding in container chain"
    assert!(container.try_resolve::<i32>()?.is_none());

    // logs: "Creating child scope from parent container"
    let request_scope = container.scope();
    request_scope.bind::<RequestContext>()?.to_value(RequestContext {
        request_id: "req-12345".into(),
    });

    // logs: "Resolving dependency" with location = "ancestor"
    let _db = request_scope.resolve::<Database>()?;

    // logs: "Bind rejected - type already bound in container tree"
    let rejected = request_scope.bind::<Database>();
    assert!(matches!(rejected, Err(DiError::DuplicateBinding { .. })));

    // logs: "Container locked - no further bindings allowed"
    container.lock();
    assert!(matches!(container.bind::<u8>(), Err(DiError::Locked)));

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
    Ok(())
}
