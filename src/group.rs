//! C3: chromosome group — an ordered, optionally capacity-bounded collection of [`StorageId`]s
//! sharing membership/recycling policy.
//!
//! A group never owns the storages it lists; it borrows the arena (population object pool) any
//! method that compares or recycles storages needs. This is the "owner + non-owning back-reference"
//! split the spec calls for to avoid a group <-> population cycle, the same split the teacher keeps
//! between `Population` (owner of `Vec<Chromosome>`) and `HillClimbVariant`/`Select` (non-owning
//! borrowers that only ever see a `&mut Population` for the duration of a call).
use crate::chromosome::StorageId;
use crate::contract::{ChromosomeValue, SortCriteria};
use crate::error::{GaError, GaResult};
use crate::population::pool::Arena;

/// An ordered list of [`StorageId`]s (C3). `membership_bit`, when set, is flagged on every resident
/// storage's flag word so a chromosome can answer "am I a member of this group" in O(1); a second
/// `add` of an already-flagged storage is then a no-op.
pub struct ChromosomeGroup {
    sizable: bool,
    capacity: usize,
    membership_bit: Option<u32>,
    recycle_on_remove: bool,
    members: Vec<StorageId>,
    shuffle_backup: Option<Vec<StorageId>>,
}

impl ChromosomeGroup {
    pub fn new(capacity: usize, sizable: bool, recycle_on_remove: bool) -> Self {
        Self {
            sizable,
            capacity,
            membership_bit: None,
            recycle_on_remove,
            members: Vec::with_capacity(capacity),
            shuffle_backup: None,
        }
    }

    pub fn with_membership_bit(mut self, bit: u32) -> Self {
        self.membership_bit = Some(bit);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn members(&self) -> &[StorageId] {
        &self.members
    }

    fn discard_shuffle_backup(&mut self) {
        self.shuffle_backup = None;
    }

    fn flag_member<C: ChromosomeValue>(&self, arena: &mut Arena<C>, id: StorageId) {
        if let Some(bit) = self.membership_bit {
            if let Some(storage) = arena.get_mut(id) {
                storage.flag_set(bit);
            }
        }
    }

    fn unflag_member<C: ChromosomeValue>(&self, arena: &mut Arena<C>, id: StorageId) {
        if let Some(bit) = self.membership_bit {
            if let Some(storage) = arena.get_mut(id) {
                storage.flag_clear(bit);
            }
        }
    }

    fn already_member<C: ChromosomeValue>(&self, arena: &Arena<C>, id: StorageId) -> bool {
        match self.membership_bit {
            Some(bit) => arena.get(id).is_some_and(|s| s.flag_test(bit)),
            None => self.members.contains(&id),
        }
    }

    /// Appends `id`. Returns the new position, or `-1` if the membership flag is set and `id` is
    /// already a member (no-op), or `Full` if the group is at capacity and not sizable.
    pub fn add<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>, id: StorageId) -> GaResult<i64> {
        if self.already_member(arena, id) {
            return Ok(-1);
        }
        if self.members.len() >= self.capacity {
            if !self.sizable {
                return Err(GaError::Full);
            }
            self.capacity += 1;
        }
        self.discard_shuffle_backup();
        self.members.push(id);
        self.flag_member(arena, id);
        Ok((self.members.len() - 1) as i64)
    }

    /// Inserts `id` keeping `members` ordered best-first under `criteria`.
    ///
    /// When full and not sizable, `id` is compared against the current last element: if `id` is no
    /// better, it is rejected (no-op, returns `None`); otherwise the last element is evicted (its
    /// membership bit cleared, its slot recycled per policy) and `id` takes its sorted position.
    /// Positions `[0, top_limit)` are never evicted.
    pub fn add_sorted<C: ChromosomeValue, S: SortCriteria<C>>(
        &mut self,
        arena: &mut Arena<C>,
        id: StorageId,
        criteria: &S,
        top_limit: usize,
    ) -> GaResult<Option<usize>> {
        if self.already_member(arena, id) {
            return Ok(None);
        }
        let position = self.sorted_insert_position(arena, id, criteria);

        if self.members.len() >= self.capacity {
            if self.sizable {
                self.capacity += 1;
            } else {
                let last_index = self.members.len() - 1;
                if position > last_index || last_index < top_limit {
                    // either `id` is no better than the current last element, or the last element
                    // itself sits inside the protected prefix and cannot be evicted.
                    return Ok(None);
                }
                let evicted = self.members.pop().expect("non-empty: at capacity");
                self.unflag_member(arena, evicted);
                if self.recycle_on_remove {
                    arena.recycle(evicted);
                }
            }
        }
        self.discard_shuffle_backup();
        self.members.insert(position, id);
        self.flag_member(arena, id);
        Ok(Some(position))
    }

    fn sorted_insert_position<C: ChromosomeValue, S: SortCriteria<C>>(
        &self,
        arena: &Arena<C>,
        id: StorageId,
        criteria: &S,
    ) -> usize {
        let candidate = arena.get(id).expect("id must resolve in this arena");
        self.members.partition_point(|existing| {
            let existing = arena.get(*existing).expect("member must resolve in this arena");
            criteria.compare(existing, candidate) != std::cmp::Ordering::Greater
        })
    }

    /// Appends `id` without checking capacity. Caller guarantees no other group method runs
    /// concurrently; concurrent `add_atomic` calls from distinct branches race only each other and
    /// each returns a distinct position.
    pub fn add_atomic<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>, id: StorageId) -> usize {
        self.discard_shuffle_backup();
        self.members.push(id);
        self.flag_member(arena, id);
        self.members.len() - 1
    }

    /// Removes `id` if present (swap-remove, no order preservation beyond `sort`). `dont_recycle`
    /// overrides the group's recycle policy for this single call.
    pub fn remove<C: ChromosomeValue>(
        &mut self,
        arena: &mut Arena<C>,
        id: StorageId,
        dont_recycle: bool,
    ) -> bool {
        let Some(index) = self.members.iter().position(|m| *m == id) else {
            return false;
        };
        self.remove_at(arena, index, dont_recycle);
        true
    }

    pub fn remove_at<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>, index: usize, dont_recycle: bool) {
        self.discard_shuffle_backup();
        let removed = self.members.swap_remove(index);
        self.unflag_member(arena, removed);
        if self.recycle_on_remove && !dont_recycle {
            arena.recycle(removed);
        }
    }

    /// Truncates to the first `n` members, recycling (per policy) whatever is dropped.
    pub fn trim<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>, n: usize) {
        if n >= self.members.len() {
            return;
        }
        self.discard_shuffle_backup();
        for removed in self.members.split_off(n) {
            self.unflag_member(arena, removed);
            if self.recycle_on_remove {
                arena.recycle(removed);
            }
        }
    }

    /// Removes the last member without taking an index. Never recycles, regardless of the group's
    /// recycle policy — the one call-site this mirrors hands the storage off to the caller instead.
    pub fn pop_last<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>) -> Option<StorageId> {
        self.discard_shuffle_backup();
        let removed = self.members.pop()?;
        self.unflag_member(arena, removed);
        Some(removed)
    }

    pub fn clear<C: ChromosomeValue>(&mut self, arena: &mut Arena<C>) {
        self.discard_shuffle_backup();
        for removed in self.members.drain(..) {
            self.unflag_member(arena, removed);
            if self.recycle_on_remove {
                arena.recycle(removed);
            }
        }
    }

    /// Stable merge sort under `criteria`; any outstanding shuffle backup is invalidated.
    pub fn sort<C: ChromosomeValue, S: SortCriteria<C>>(&mut self, arena: &Arena<C>, criteria: &S) {
        self.discard_shuffle_backup();
        self.members.sort_by(|a, b| {
            let a = arena.get(*a).expect("member must resolve in this arena");
            let b = arena.get(*b).expect("member must resolve in this arena");
            criteria.compare(a, b)
        });
    }

    /// Fisher-Yates shuffle. When `backup` is true, the prior ordering is snapshotted so
    /// [`restore_shuffle`](Self::restore_shuffle) can undo it.
    pub fn shuffle(&mut self, backup: bool) {
        if backup {
            self.shuffle_backup = Some(self.members.clone());
        } else {
            self.shuffle_backup = None;
        }
        crate::random::shuffle(&mut self.members);
    }

    pub fn restore_shuffle(&mut self) -> GaResult<()> {
        match self.shuffle_backup.take() {
            Some(order) => {
                self.members = order;
                Ok(())
            }
            None => Err(GaError::InvalidOperation("no shuffle backup to restore")),
        }
    }
}
