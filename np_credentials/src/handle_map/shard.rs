// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An individual handle-map shard, which is ultimately
//! just a hash-map behind a lock.

use core::sync::atomic::{AtomicU32, Ordering};
use hashbrown::hash_map::EntryRef;
use spin::lock_api::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};

use super::{Handle, HandleNotPresentError, ObjectReadGuard, ObjectReadWriteGuard};

type ShardMapType<T> = hashbrown::HashMap<Handle, T>;
type ShardReadWriteGuard<'a, T> = RwLockWriteGuard<'a, ShardMapType<T>>;

/// Internal error enum for failed allocations into a given shard.
pub(super) enum ShardAllocationError<T, E, F: FnOnce() -> Result<T, E>> {
    /// The entry for the handle is occupied, so the object-provider
    /// is handed back to try again with a new handle-id.
    EntryOccupied(F),
    /// The allocation would exceed the maximum number of allocations.
    ExceedsAllocationLimit,
    /// The initial value-provider call failed.
    ValueProviderFailed(E),
}

pub(super) struct HandleMapShard<T: Send + Sync> {
    data: RwLock<ShardMapType<T>>,
}

impl<T: Send + Sync> Default for HandleMapShard<T> {
    fn default() -> Self {
        Self { data: RwLock::new(hashbrown::HashMap::new()) }
    }
}

impl<T: Send + Sync> HandleMapShard<T> {
    pub(super) fn get(&self, handle: Handle) -> Result<ObjectReadGuard<T>, HandleNotPresentError> {
        RwLockReadGuard::try_map(self.data.read(), |map| map.get(&handle))
            .map(|guard| ObjectReadGuard { guard })
            .map_err(|_| HandleNotPresentError)
    }

    /// Gets a write guard on the entire shard map if an entry for the given
    /// handle exists. The presence check happens under an upgradable read
    /// lock so that lookups of absent handles never block readers.
    fn get_read_write_guard_if_entry_exists(
        &self,
        handle: Handle,
    ) -> Result<ShardReadWriteGuard<T>, HandleNotPresentError> {
        let upgradable_guard = self.data.upgradable_read();
        if upgradable_guard.contains_key(&handle) {
            // Only one upgradable or write guard may be outstanding,
            // so the entry can't disappear before the upgrade completes.
            Ok(RwLockUpgradableReadGuard::upgrade(upgradable_guard))
        } else {
            Err(HandleNotPresentError)
        }
    }

    pub(super) fn get_mut(
        &self,
        handle: Handle,
    ) -> Result<ObjectReadWriteGuard<T>, HandleNotPresentError> {
        let map_guard = self.get_read_write_guard_if_entry_exists(handle)?;
        RwLockWriteGuard::try_map(map_guard, |map| map.get_mut(&handle))
            .map(|guard| ObjectReadWriteGuard { guard })
            .map_err(|_| HandleNotPresentError)
    }

    pub(super) fn deallocate(
        &self,
        handle: Handle,
        outstanding_allocations_counter: &AtomicU32,
    ) -> Result<T, HandleNotPresentError> {
        let mut map_guard = self.get_read_write_guard_if_entry_exists(handle)?;
        let removed_object = map_guard.remove(&handle).ok_or(HandleNotPresentError)?;
        // Release: clearing the entry must never be reordered after the decrement.
        let _ = outstanding_allocations_counter.fetch_sub(1, Ordering::Release);
        Ok(removed_object)
    }

    pub(super) fn try_allocate<E, F>(
        &self,
        handle: Handle,
        object_provider: F,
        outstanding_allocations_counter: &AtomicU32,
        max_active_handles: u32,
    ) -> Result<(), ShardAllocationError<T, E, F>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut map_guard = RwLockUpgradableReadGuard::upgrade(self.data.upgradable_read());
        match map_guard.entry_ref(&handle) {
            EntryRef::Occupied(_) => Err(ShardAllocationError::EntryOccupied(object_provider)),
            EntryRef::Vacant(vacant_entry) => {
                // Acquire on a successful bump: the provider must not run
                // before a slot is guaranteed.
                let bump = outstanding_allocations_counter.fetch_update(
                    Ordering::Acquire,
                    Ordering::Relaxed,
                    |old_total_allocations| {
                        if old_total_allocations >= max_active_handles {
                            None
                        } else {
                            Some(old_total_allocations + 1)
                        }
                    },
                );
                if bump.is_err() {
                    return Err(ShardAllocationError::ExceedsAllocationLimit);
                }
                match object_provider() {
                    Ok(object) => {
                        let _ = vacant_entry.insert(object);
                        Ok(())
                    }
                    Err(e) => {
                        let _ = outstanding_allocations_counter.fetch_sub(1, Ordering::Release);
                        Err(ShardAllocationError::ValueProviderFailed(e))
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.data.read().len()
    }
}
