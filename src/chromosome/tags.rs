//! Per-chromosome tag schema (C2), a small auxiliary-slot mechanism set once per population.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Structural events the population dispatches tag updaters on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StructuralEvent {
    Inserted,
    Removed,
    Refitnessed,
}

/// A single per-chromosome auxiliary value. Implemented for any `Clone + Debug` payload via the
/// blanket impl below; callers never implement this by hand.
pub trait Tag: Any + Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn Tag>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> Tag for T
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn clone_box(&self) -> Box<dyn Tag> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Tag> {
    fn clone(&self) -> Self {
        self.as_ref().clone_box()
    }
}

/// Downcasts a tag slot, panicking (as a programmer error, not a runtime fault) on schema misuse.
pub fn downcast_tag<T: 'static>(tag: &dyn Tag) -> &T {
    tag.as_any()
        .downcast_ref::<T>()
        .expect("tag schema/type mismatch: population and caller disagree on tag type")
}

pub fn downcast_tag_mut<T: 'static>(tag: &mut dyn Tag) -> &mut T {
    tag.as_any_mut()
        .downcast_mut::<T>()
        .expect("tag schema/type mismatch: population and caller disagree on tag type")
}

type Updater = Arc<dyn Fn(&mut dyn Tag, StructuralEvent) + Send + Sync>;
type Factory = Arc<dyn Fn() -> Box<dyn Tag> + Send + Sync>;

#[derive(Clone)]
struct TagSlot {
    id: u32,
    factory: Factory,
    updater: Updater,
}

/// The id -> tag-type schema a [`Population`](crate::population::Population) applies to every
/// storage it creates. Registration must happen before the first storage is allocated (see
/// `register_tag`).
#[derive(Clone, Default)]
pub struct TagSchema {
    slots: Vec<TagSlot>,
}

impl TagSchema {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Registers a tag under `id` with a `default` factory and `updater` callback. Idempotent when
    /// called again with the same `id` (the later registration silently replaces the former, which
    /// is how the teacher's builders treat repeated `with_*` calls).
    pub fn register<T, D, U>(&mut self, id: u32, default: D, updater: U)
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
        D: Fn() -> T + Send + Sync + 'static,
        U: Fn(&mut T, StructuralEvent) + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Box::new(default()));
        let updater: Updater = Arc::new(move |tag, event| updater(downcast_tag_mut::<T>(tag), event));
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.factory = factory;
            slot.updater = updater;
        } else {
            self.slots.push(TagSlot { id, factory, updater });
        }
    }

    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocates a fresh tag array in schema order, for a newly created storage.
    pub fn new_tags(&self) -> Vec<Box<dyn Tag>> {
        self.slots.iter().map(|s| (s.factory)()).collect()
    }

    /// Dispatches `event` to every tag in `tags` (assumed to be schema-ordered).
    pub fn dispatch(&self, tags: &mut [Box<dyn Tag>], event: StructuralEvent) {
        for (slot, tag) in self.slots.iter().zip(tags.iter_mut()) {
            (slot.updater)(tag.as_mut(), event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_allocate_roundtrip() {
        let mut schema = TagSchema::new();
        schema.register::<u32, _, _>(1, || 0u32, |v, event| {
            if event == StructuralEvent::Inserted {
                *v += 1;
            }
        });
        let mut tags = schema.new_tags();
        assert_eq!(tags.len(), 1);
        schema.dispatch(&mut tags, StructuralEvent::Inserted);
        assert_eq!(*downcast_tag::<u32>(tags[0].as_ref()), 1);
    }
}
