//! Per-scope binding registry
//!
//! Uses DashMap for concurrent access. Each registry optionally points at its
//! parent, which is what the container walks for hierarchical lookup.

use crate::TypeKey;
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Type-erased handle to one binding slot.
///
/// The slot behind it is always the `ResolvingContext` slot for the type the
/// binding is keyed under.
#[derive(Clone)]
pub(crate) struct Binding {
    slot: Arc<dyn Any + Send + Sync>,
}

impl Binding {
    #[inline]
    pub(crate) fn new(slot: Arc<dyn Any + Send + Sync>) -> Self {
        Self { slot }
    }

    /// Recover the typed slot; `None` if `S` is not what was stored
    #[inline]
    pub(crate) fn downcast<S: Any + Send + Sync>(self) -> Option<Arc<S>> {
        self.slot.downcast::<S>().ok()
    }
}

/// Thread-safe storage for one container's bindings.
pub(crate) struct Registry {
    /// Map from type key to binding
    bindings: DashMap<TypeKey, Binding, RandomState>,
    /// Parent registry for hierarchical resolution
    parent: Option<Arc<Registry>>,
    /// Rejects new bindings once set
    locked: AtomicBool,
    /// Distance from the root (0 = root)
    depth: u32,
}

impl Registry {
    /// Create an empty root registry.
    ///
    /// Uses 8 shards: DI scopes rarely hold more than a few dozen bindings,
    /// and the DashMap default of num_cpus * 4 makes scope creation slow.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a root registry with pre-allocated capacity.
    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            parent: None,
            locked: AtomicBool::new(false),
            depth: 0,
        }
    }

    /// Create a child registry pointing at `self`.
    #[inline]
    pub(crate) fn child(self: &Arc<Self>) -> Self {
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
            parent: Some(Arc::clone(self)),
            locked: AtomicBool::new(false),
            depth: self.depth + 1,
        }
    }

    /// Insert `binding` unless `key` is already present here.
    ///
    /// Returns `false` and leaves the map untouched when the key exists.
    #[inline]
    pub(crate) fn insert_new(&self, key: TypeKey, binding: Binding) -> bool {
        match self.bindings.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(binding);
                true
            }
        }
    }

    /// Check if key exists in this registry only
    #[inline]
    pub(crate) fn contains(&self, key: &TypeKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Check if key exists in this registry or any ancestor.
    pub(crate) fn contains_in_chain(&self, key: &TypeKey) -> bool {
        self.ancestors().any(|registry| registry.contains(key))
    }

    /// Binding stored in this registry only.
    ///
    /// The binding is cloned out so the shard lock is released before the
    /// caller runs any resolver.
    #[inline]
    pub(crate) fn get(&self, key: &TypeKey) -> Option<Binding> {
        self.bindings.get(key).map(|entry| entry.value().clone())
    }

    /// Nearest binding for `key`, walking the parent chain.
    ///
    /// Also returns the depth of the registry that owns it.
    pub(crate) fn find_in_chain(&self, key: &TypeKey) -> Option<(Binding, u32)> {
        self.ancestors()
            .find_map(|registry| registry.get(key).map(|binding| (binding, registry.depth)))
    }

    /// `self`, then each parent up to the root
    #[inline]
    pub(crate) fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            current: Some(self),
        }
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<&Arc<Registry>> {
        self.parent.as_ref()
    }

    #[inline]
    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn keys(&self) -> Vec<TypeKey> {
        self.bindings.iter().map(|entry| *entry.key()).collect()
    }

    #[inline]
    pub(crate) fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.len())
            .field("depth", &self.depth)
            .finish()
    }
}

/// Iterator over a registry and its ancestors
pub(crate) struct Ancestors<'a> {
    current: Option<&'a Registry>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Registry;

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.current?;
        self.current = registry.parent().map(|parent| parent.as_ref());
        Some(registry)
    }
}
