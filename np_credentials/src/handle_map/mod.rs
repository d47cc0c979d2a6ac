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

//! A thread-safe map from opaque [`Handle`]s to the native-side objects
//! (credential slabs and books) which back this crate's owning wrappers.
//!
//! Handles are plain `u64` ids so that they can be passed across an FFI
//! boundary, but the objects they point to never leave the map except by
//! deallocation.

use core::fmt::Debug;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

mod shard;

#[cfg(test)]
mod tests;

use shard::{HandleMapShard, ShardAllocationError};

/// A RAII read lock guard for an object in a [`HandleMap`]
/// pointed-to by a given [`Handle`]. When this struct is
/// dropped, the underlying read lock on the associated
/// shard will be dropped.
pub struct ObjectReadGuard<'a, T> {
    guard: lock_api::MappedRwLockReadGuard<'a, spin::RwLock<()>, T>,
}

impl<'a, T> Deref for ObjectReadGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

/// A RAII read-write lock guard for an object in a [`HandleMap`]
/// pointed-to by a given [`Handle`].
pub struct ObjectReadWriteGuard<'a, T> {
    guard: lock_api::MappedRwLockWriteGuard<'a, spin::RwLock<()>, T>,
}

impl<'a, T> Deref for ObjectReadWriteGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl<'a, T> DerefMut for ObjectReadWriteGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

/// The dimensions (max # of allocatable slots, number of shards)
/// of a handle-map to be used upon initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleMapDimensions {
    /// The number of shards which are employed by the associated
    /// handle-map. Zero is treated as one.
    pub num_shards: u8,
    /// The maximum number of active handles which may be
    /// stored within the associated handle-map.
    pub max_active_handles: u32,
}

/// An individual handle to be given out by a [`HandleMap`].
///
/// This representation is untyped: it does not record which map
/// it came from, so presenting it to a different map simply
/// yields [`HandleNotPresentError`] (or, worse, someone else's object
/// of the same type). Owning wrappers such as
/// [`OwnedHandle`](crate::owned_handle::OwnedHandle) keep the map and the
/// handle together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    handle_id: u64,
}

impl From<&Handle> for Handle {
    fn from(handle: &Handle) -> Self {
        *handle
    }
}

impl Handle {
    /// Constructs a handle wrapping the given ID.
    ///
    /// No validity checks are done on the wrapped ID, so this
    /// is only useful for receiving handles from an FFI layer.
    pub fn from_id(handle_id: u64) -> Self {
        Self { handle_id }
    }

    /// Gets the ID for this handle, suitable for transmitting
    /// the handle across an FFI layer.
    pub fn get_id(&self) -> u64 {
        self.handle_id
    }

    fn get_shard_index(&self, num_shards: usize) -> usize {
        (self.handle_id % (num_shards as u64)) as usize
    }
}

/// Error raised when attempting to allocate into a full handle-map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no space left in the handle map")]
pub struct HandleMapFullError;

/// Error raised when the entry for a given [`Handle`] doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("handle is not present in the handle map")]
pub struct HandleNotPresentError;

/// Errors which may be raised while attempting to allocate
/// a handle from contents given by a (fallible) value-provider.
#[derive(Debug, PartialEq, Eq)]
pub enum HandleMapTryAllocateError<E: Debug> {
    /// The call to the value-provider for the allocation failed.
    /// No slot was consumed.
    ValueProviderFailed(E),
    /// We couldn't reserve a spot for the allocation, because
    /// the handle-map was full. The value-provider was not run.
    HandleMapFull,
}

/// A thread-safe mapping from handles to underlying objects,
/// supporting allocations, reads, writes, and deallocations.
pub struct HandleMap<T: Send + Sync> {
    dimensions: HandleMapDimensions,

    /// The individually-lockable "shards" of the handle-map,
    /// among which the keys will be roughly uniformly-distributed.
    handle_map_shards: Box<[HandleMapShard<T>]>,

    /// The next handle ID which allocations will attempt to use.
    new_handle_id_counter: AtomicU64,

    /// Number of currently-outstanding entries among all shards.
    outstanding_allocations_counter: AtomicU32,
}

impl<T: Send + Sync> HandleMap<T> {
    /// Creates a new handle-map with the given `HandleMapDimensions`.
    pub fn with_dimensions(dimensions: HandleMapDimensions) -> Self {
        let num_shards = dimensions.num_shards.max(1);
        let handle_map_shards =
            (0..num_shards).map(|_| HandleMapShard::default()).collect::<Vec<_>>();
        Self {
            dimensions: HandleMapDimensions { num_shards, ..dimensions },
            handle_map_shards: handle_map_shards.into_boxed_slice(),
            new_handle_id_counter: AtomicU64::new(0),
            outstanding_allocations_counter: AtomicU32::new(0),
        }
    }

    /// The dimensions this map was created with.
    pub fn dimensions(&self) -> HandleMapDimensions {
        self.dimensions
    }

    fn shard_for(&self, handle: Handle) -> Result<&HandleMapShard<T>, HandleNotPresentError> {
        self.handle_map_shards
            .get(handle.get_shard_index(self.handle_map_shards.len()))
            .ok_or(HandleNotPresentError)
    }

    /// Allocates a new object within the given handle-map, returning
    /// a handle to the location it was stored at. Fails with
    /// [`HandleMapFullError`] if `dimensions.max_active_handles`
    /// objects are already allocated.
    pub fn allocate(
        &self,
        initial_value_provider: impl FnOnce() -> T,
    ) -> Result<Handle, HandleMapFullError> {
        self.try_allocate::<core::convert::Infallible>(move || Ok(initial_value_provider()))
            .map_err(|e| match e {
                HandleMapTryAllocateError::ValueProviderFailed(never) => match never {},
                HandleMapTryAllocateError::HandleMapFull => HandleMapFullError,
            })
    }

    /// Attempts to allocate a new object produced by a fallible provider.
    ///
    /// A slot is reserved before the provider runs, so a full map never
    /// invokes it. If the provider fails the reservation is returned.
    pub fn try_allocate<E: Debug>(
        &self,
        initial_value_provider: impl FnOnce() -> Result<T, E>,
    ) -> Result<Handle, HandleMapTryAllocateError<E>> {
        let mut initial_value_provider = initial_value_provider;
        loop {
            // Relaxed: concurrently-running threads only need distinct ids.
            let new_handle_id = self.new_handle_id_counter.fetch_add(1, Ordering::Relaxed);
            let new_handle = Handle::from_id(new_handle_id);
            let shard = self
                .shard_for(new_handle)
                .map_err(|_| HandleMapTryAllocateError::HandleMapFull)?;
            match shard.try_allocate(
                new_handle,
                initial_value_provider,
                &self.outstanding_allocations_counter,
                self.dimensions.max_active_handles,
            ) {
                Ok(()) => return Ok(new_handle),
                Err(ShardAllocationError::ValueProviderFailed(e)) => {
                    return Err(HandleMapTryAllocateError::ValueProviderFailed(e))
                }
                Err(ShardAllocationError::ExceedsAllocationLimit) => {
                    return Err(HandleMapTryAllocateError::HandleMapFull)
                }
                Err(ShardAllocationError::EntryOccupied(thrown_back_provider)) => {
                    // The id counter wrapped onto a live entry; go again with a new id.
                    initial_value_provider = thrown_back_provider;
                }
            }
        }
    }

    /// Gets a read-only reference to an object within the given handle-map,
    /// if the given handle is present.
    pub fn get(&self, handle: Handle) -> Result<ObjectReadGuard<T>, HandleNotPresentError> {
        self.shard_for(handle)?.get(handle)
    }

    /// Gets a read+write reference to an object within the given handle-map,
    /// if the given handle is present.
    pub fn get_mut(
        &self,
        handle: Handle,
    ) -> Result<ObjectReadWriteGuard<T>, HandleNotPresentError> {
        self.shard_for(handle)?.get_mut(handle)
    }

    /// Removes the object pointed to by the given handle,
    /// returning the removed object if it exists.
    pub fn deallocate(&self, handle: Handle) -> Result<T, HandleNotPresentError> {
        self.shard_for(handle)?.deallocate(handle, &self.outstanding_allocations_counter)
    }

    /// Gets the number of objects currently stored in the map.
    pub fn get_current_allocation_count(&self) -> u32 {
        self.outstanding_allocations_counter.load(Ordering::Acquire)
    }

    /// Counts the entries of every shard. Only suitable for
    /// single-threaded sections of tests.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handle_map_shards.iter().map(|s| s.len()).sum()
    }

    /// Sets the new-handle-id counter to the given value.
    #[cfg(test)]
    pub(crate) fn set_new_handle_id_counter(&mut self, value: u64) {
        self.new_handle_id_counter = AtomicU64::new(value);
    }
}
