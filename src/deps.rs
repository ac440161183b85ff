//! Factory dependencies resolved from a container
//!
//! A factory installed with [`ResolvingContext::with_deps`] declares what it
//! needs as a [`Dependencies`] type: `()`, `Arc<T>`, `Option<Arc<T>>`, or a
//! tuple of those (1 to 8 elements). Each element is resolved from the owning
//! container, left to right, every time the factory runs.
//!
//! [`ResolvingContext::with_deps`]: crate::ResolvingContext::with_deps

use crate::{Container, Injectable, Result, TypeKey};
use std::sync::Arc;

/// An ordered set of dependencies that can be resolved from a container.
///
/// Resolution stops at the first failing element; later elements are not
/// touched.
pub trait Dependencies: Sized {
    /// Resolve every dependency in declaration order
    fn resolve_from(container: &Container) -> Result<Self>;

    /// Keys of the declared dependencies, in declaration order
    fn dependency_keys() -> Vec<TypeKey>;
}

// No dependencies
impl Dependencies for () {
    #[inline]
    fn resolve_from(_container: &Container) -> Result<Self> {
        Ok(())
    }

    fn dependency_keys() -> Vec<TypeKey> {
        Vec::new()
    }
}

// Required dependency
impl<T: Injectable> Dependencies for Arc<T> {
    #[inline]
    fn resolve_from(container: &Container) -> Result<Self> {
        container.resolve::<T>()
    }

    fn dependency_keys() -> Vec<TypeKey> {
        vec![TypeKey::of::<T>()]
    }
}

// Optional dependency - absent from the chain is not an error
impl<T: Injectable> Dependencies for Option<Arc<T>> {
    #[inline]
    fn resolve_from(container: &Container) -> Result<Self> {
        container.try_resolve::<T>()
    }

    fn dependency_keys() -> Vec<TypeKey> {
        vec![TypeKey::of::<T>()]
    }
}

// Tuple implementations (1-8 elements)
macro_rules! impl_dependencies_tuple {
    ($($D:ident),+) => {
        impl<$($D: Dependencies),+> Dependencies for ($($D,)+) {
            #[inline]
            fn resolve_from(container: &Container) -> Result<Self> {
                Ok(($($D::resolve_from(container)?,)+))
            }

            fn dependency_keys() -> Vec<TypeKey> {
                let mut keys = Vec::new();
                $(keys.extend($D::dependency_keys());)+
                keys
            }
        }
    };
}

impl_dependencies_tuple!(A);
impl_dependencies_tuple!(A, B);
impl_dependencies_tuple!(A, B, C);
impl_dependencies_tuple!(A, B, C, D);
impl_dependencies_tuple!(A, B, C, D, E);
impl_dependencies_tuple!(A, B, C, D, E, F);
impl_dependencies_tuple!(A, B, C, D, E, F, G);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H);
