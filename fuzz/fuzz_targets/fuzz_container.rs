#![no_main]

//! Fuzz target for container trees
//!
//! Replays random bind / resolve / scope / lock sequences against a small
//! model of the tree and checks every outcome against it.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scoped_di::{Container, DiError};
use std::collections::HashMap;

struct Alpha(u32);
struct Beta(u32);
struct Gamma(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
enum Ty {
    Alpha,
    Beta,
    Gamma,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Strategy {
    Unconfigured,
    Value(u32),
    Factory(u32),
    Singleton(u32),
}

#[derive(Debug, Arbitrary)]
enum Op {
    Scope { parent: u8 },
    Bind { scope: u8, ty: Ty, strategy: Strategy },
    Resolve { scope: u8, ty: Ty },
    Lock { scope: u8 },
}

/// What the model expects one scope to hold
struct ModelScope {
    parent: Option<usize>,
    locked: bool,
    bound: HashMap<Ty, Strategy>,
}

struct Model {
    scopes: Vec<ModelScope>,
}

impl Model {
    fn find(&self, mut scope: usize, ty: Ty) -> Option<Strategy> {
        loop {
            if let Some(strategy) = self.scopes[scope].bound.get(&ty) {
                return Some(*strategy);
            }
            scope = self.scopes[scope].parent?;
        }
    }
}

fn bind<T: Send + Sync + 'static>(
    container: &Container,
    strategy: Strategy,
    make: fn(u32) -> T,
) -> Result<(), DiError> {
    let context = container.bind::<T>()?;
    match strategy {
        Strategy::Unconfigured => {}
        Strategy::Value(v) => {
            context.to_value(make(v));
        }
        Strategy::Factory(v) => {
            context.from(move || make(v));
        }
        Strategy::Singleton(v) => {
            context.from(move || make(v)).as_singleton()?;
        }
    }
    Ok(())
}

fn resolve(container: &Container, ty: Ty) -> Result<u32, DiError> {
    match ty {
        Ty::Alpha => container.resolve::<Alpha>().map(|v| v.0),
        Ty::Beta => container.resolve::<Beta>().map(|v| v.0),
        Ty::Gamma => container.resolve::<Gamma>().map(|v| v.0),
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut containers = vec![Container::new()];
    let mut model = Model {
        scopes: vec![ModelScope {
            parent: None,
            locked: false,
            bound: HashMap::new(),
        }],
    };

    for op in ops.into_iter().take(256) {
        match op {
            Op::Scope { parent } => {
                let parent = parent as usize % containers.len();
                containers.push(containers[parent].scope());
                model.scopes.push(ModelScope {
                    parent: Some(parent),
                    locked: false,
                    bound: HashMap::new(),
                });
            }
            Op::Bind {
                scope,
                ty,
                strategy,
            } => {
                let idx = scope as usize % containers.len();
                let container = &containers[idx];
                let result = match ty {
                    Ty::Alpha => bind(container, strategy, Alpha),
                    Ty::Beta => bind(container, strategy, Beta),
                    Ty::Gamma => bind(container, strategy, Gamma),
                };

                if model.scopes[idx].locked {
                    assert!(matches!(result, Err(DiError::Locked)));
                } else if model.find(idx, ty).is_some() {
                    assert!(matches!(result, Err(DiError::DuplicateBinding { .. })));
                } else {
                    assert!(result.is_ok());
                    model.scopes[idx].bound.insert(ty, strategy);
                }
            }
            Op::Resolve { scope, ty } => {
                let idx = scope as usize % containers.len();
                let result = resolve(&containers[idx], ty);

                match model.find(idx, ty) {
                    None => assert!(matches!(result, Err(DiError::UnresolvedDependency { .. }))),
                    Some(Strategy::Unconfigured) => {
                        assert!(matches!(result, Err(DiError::NotConfigured { .. })))
                    }
                    Some(Strategy::Value(v) | Strategy::Factory(v) | Strategy::Singleton(v)) => {
                        assert_eq!(result.ok(), Some(v))
                    }
                }
            }
            Op::Lock { scope } => {
                let idx = scope as usize % containers.len();
                containers[idx].lock();
                model.scopes[idx].locked = true;
            }
        }
    }
});
