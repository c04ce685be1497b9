//! C1: the typed data store.
//!
//! A two-level keyed map: scope (workflow-wide vs. branch-group-local) -> integer id -> type-erased
//! value. Grounded on the teacher's own preference for small integer-keyed registries resolved
//! through `rustc_hash::FxHashMap`, combined with `nohash_hasher` for the inner id map since
//! data-store and storage ids are small dense integers that gain nothing from a quality hash.
use crate::error::{GaError, GaResult};
use nohash_hasher::IntMap;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

/// Which lifetime a piece of store data belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Lives for the whole flow graph, across branch groups and generations.
    Workflow,
    /// Lives for as long as a particular branch group is connected; torn down on disconnect.
    BranchGroup(u32),
}

/// Integer id of a value within a [`Scope`]. Algorithm stubs mint ids from the reserved range
/// `0x8000..=0x800F` for pipeline-private data (see `stub` module); user ids occupy the rest.
pub type DataId = u32;

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    alive: Arc<AtomicBool>,
}

/// Keyed heterogeneous storage with per-scope lifetimes (C1).
#[derive(Default)]
pub struct DataStore {
    scopes: RwLock<FxHashMap<Scope, IntMap<DataId, Entry>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            scopes: RwLock::new(FxHashMap::default()),
        }
    }

    /// Inserts a value behind a fresh, independently lockable cell. Fails with [`GaError::Duplicate`]
    /// if `id` already exists in `scope`.
    pub fn add<T: Send + Sync + 'static>(
        &self,
        scope: Scope,
        id: DataId,
        value: T,
    ) -> GaResult<()> {
        let mut scopes = self.scopes.write().expect("data store poisoned");
        let ids = scopes.entry(scope).or_insert_with(IntMap::default);
        if ids.contains_key(&id) {
            return Err(GaError::Duplicate);
        }
        ids.insert(
            id,
            Entry {
                value: Arc::new(RwLock::new(value)),
                alive: Arc::new(AtomicBool::new(true)),
            },
        );
        Ok(())
    }

    /// Removes and destroys the value at `(scope, id)`. Any [`CachedHandle`] resolved against it
    /// observes [`GaError::NotFound`] from then on.
    pub fn remove(&self, scope: Scope, id: DataId) -> GaResult<()> {
        let mut scopes = self.scopes.write().expect("data store poisoned");
        let ids = scopes.get_mut(&scope).ok_or(GaError::NotFound)?;
        let entry = ids.remove(&id).ok_or(GaError::NotFound)?;
        entry.alive.store(false, Ordering::Release);
        Ok(())
    }

    /// Tears down an entire scope at once (used when a branch group disconnects).
    pub fn clear_scope(&self, scope: Scope) {
        let mut scopes = self.scopes.write().expect("data store poisoned");
        if let Some(ids) = scopes.remove(&scope) {
            for (_, entry) in ids {
                entry.alive.store(false, Ordering::Release);
            }
        }
    }

    /// Borrows the value at `(scope, id)` behind an `Arc<RwLock<T>>`, failing with
    /// [`GaError::NotFound`] or [`GaError::TypeMismatch`].
    pub fn get<T: Send + Sync + 'static>(
        &self,
        scope: Scope,
        id: DataId,
    ) -> GaResult<(Arc<RwLock<T>>, Arc<AtomicBool>)> {
        let scopes = self.scopes.read().expect("data store poisoned");
        let ids = scopes.get(&scope).ok_or(GaError::NotFound)?;
        let entry = ids.get(&id).ok_or(GaError::NotFound)?;
        let value = entry
            .value
            .clone()
            .downcast::<RwLock<T>>()
            .map_err(|_| GaError::TypeMismatch)?;
        Ok((value, entry.alive.clone()))
    }
}

/// A store reference + id pair that resolves to `&T`/`&mut T` (via the inner lock) at a single
/// lookup cost on first access, and direct access afterwards. Invalidated when the backing entry is
/// removed.
pub struct CachedHandle<T> {
    scope: Scope,
    id: DataId,
    resolved: OnceLock<(Arc<RwLock<T>>, Arc<AtomicBool>)>,
}

impl<T: Send + Sync + 'static> CachedHandle<T> {
    pub fn new(scope: Scope, id: DataId) -> Self {
        Self {
            scope,
            id,
            resolved: OnceLock::new(),
        }
    }

    /// Resolves the handle against `store`, reusing the cached lookup if already resolved and
    /// still alive.
    pub fn resolve(&self, store: &DataStore) -> GaResult<Arc<RwLock<T>>> {
        if let Some((value, alive)) = self.resolved.get() {
            if alive.load(Ordering::Acquire) {
                return Ok(value.clone());
            }
            return Err(GaError::NotFound);
        }
        let (value, alive) = store.get::<T>(self.scope, self.id)?;
        // Another caller may have raced us to populate the cell; either outcome is fine since both
        // refer to the same (scope, id) entry.
        let _ = self.resolved.set((value.clone(), alive));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_round_trips() {
        let store = DataStore::new();
        store.add(Scope::Workflow, 1, 42usize).unwrap();
        let (value, _) = store.get::<usize>(Scope::Workflow, 1).unwrap();
        assert_eq!(*value.read().unwrap(), 42);
    }

    #[test]
    fn duplicate_add_fails() {
        let store = DataStore::new();
        store.add(Scope::Workflow, 1, 1u32).unwrap();
        assert_eq!(store.add(Scope::Workflow, 1, 2u32), Err(GaError::Duplicate));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let store = DataStore::new();
        store.add(Scope::Workflow, 1, 1u32).unwrap();
        assert_eq!(
            store.get::<u64>(Scope::Workflow, 1).unwrap_err(),
            GaError::TypeMismatch
        );
    }

    #[test]
    fn cached_handle_is_invalidated_by_remove() {
        let store = DataStore::new();
        store.add(Scope::Workflow, 1, 7i32).unwrap();
        let handle = CachedHandle::<i32>::new(Scope::Workflow, 1);
        assert_eq!(*handle.resolve(&store).unwrap().read().unwrap(), 7);
        store.remove(Scope::Workflow, 1).unwrap();
        assert_eq!(handle.resolve(&store), Err(GaError::NotFound));
    }
}
