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

//! Single-owner wrapper around a handle in a [`HandleMap`].
//!
//! An [`OwnedHandle`] is the only thing which may release the native object
//! behind its handle. Release happens either explicitly through
//! [`OwnedHandle::release`] or when the wrapper is dropped. Ownership can be
//! handed to another owner with [`OwnedHandle::leak`], which disarms the
//! wrapper and yields the raw [`Handle`]; [`OwnedHandle::from_raw`] re-arms it.
//!
//! There is no fallback cleaner: a handle which is leaked and never re-armed
//! stays allocated until its map is dropped.

use core::fmt::Debug;
use std::sync::Arc;

use crate::error::{InvalidHandleError, NoSpaceLeftError};
use crate::handle_map::{
    Handle, HandleMap, HandleMapTryAllocateError, ObjectReadGuard, ObjectReadWriteGuard,
};

/// Lifecycle of an [`OwnedHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    /// The wrapper owns a live native object.
    Active,
    /// The native object was released through this wrapper.
    Released,
    /// Ownership moved elsewhere; this wrapper will never release.
    Leaked,
}

/// Owns the native object behind one handle of a [`HandleMap`].
pub struct OwnedHandle<T: Send + Sync> {
    map: Arc<HandleMap<T>>,
    handle: Handle,
    state: HandleState,
}

impl<T: Send + Sync> OwnedHandle<T> {
    /// Allocates a new object in `map` and takes ownership of it.
    pub fn allocate(
        map: &Arc<HandleMap<T>>,
        initial_value_provider: impl FnOnce() -> T,
    ) -> Result<Self, NoSpaceLeftError> {
        let handle = map.allocate(initial_value_provider)?;
        log::debug!("allocated {} handle {}", short_type_name::<T>(), handle.get_id());
        Ok(Self::from_raw(map, handle))
    }

    /// Allocates a new object from a fallible provider and takes ownership of it.
    pub fn try_allocate<E: Debug>(
        map: &Arc<HandleMap<T>>,
        initial_value_provider: impl FnOnce() -> Result<T, E>,
    ) -> Result<Self, HandleMapTryAllocateError<E>> {
        let handle = map.try_allocate(initial_value_provider)?;
        log::debug!("allocated {} handle {}", short_type_name::<T>(), handle.get_id());
        Ok(Self::from_raw(map, handle))
    }

    /// Takes ownership of a raw handle previously given up by [`Self::leak`].
    ///
    /// Nothing checks that the handle is live; if it isn't, reads fail with
    /// [`InvalidHandleError`] and release is a no-op.
    pub fn from_raw(map: &Arc<HandleMap<T>>, handle: Handle) -> Self {
        Self { map: map.clone(), handle, state: HandleState::Active }
    }

    /// The raw handle this wrapper owns.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The current lifecycle state.
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// The map this handle lives in.
    pub fn map(&self) -> &Arc<HandleMap<T>> {
        &self.map
    }

    /// Read access to the native object.
    pub fn get(&self) -> Result<ObjectReadGuard<T>, InvalidHandleError> {
        match self.state {
            HandleState::Active => Ok(self.map.get(self.handle)?),
            HandleState::Released | HandleState::Leaked => Err(InvalidHandleError),
        }
    }

    /// Write access to the native object.
    pub fn get_mut(&mut self) -> Result<ObjectReadWriteGuard<T>, InvalidHandleError> {
        match self.state {
            HandleState::Active => Ok(self.map.get_mut(self.handle)?),
            HandleState::Released | HandleState::Leaked => Err(InvalidHandleError),
        }
    }

    /// Releases the native object, returning it the first time this is called.
    ///
    /// Calling this again, or on a handle whose object is already gone,
    /// does nothing and returns `None`.
    pub fn release(&mut self) -> Option<T> {
        if self.state != HandleState::Active {
            return None;
        }
        self.state = HandleState::Released;
        match self.map.deallocate(self.handle) {
            Ok(object) => {
                log::debug!("released {} handle {}", short_type_name::<T>(), self.handle.get_id());
                Some(object)
            }
            Err(_) => {
                log::debug!(
                    "{} handle {} was already gone at release",
                    short_type_name::<T>(),
                    self.handle.get_id()
                );
                None
            }
        }
    }

    /// Gives up ownership without releasing, returning the raw handle.
    pub fn leak(mut self) -> Handle {
        self.state = HandleState::Leaked;
        self.handle
    }
}

impl<T: Send + Sync> Drop for OwnedHandle<T> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl<T: Send + Sync> Debug for OwnedHandle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("type", &short_type_name::<T>())
            .field("handle", &self.handle.get_id())
            .field("state", &self.state)
            .finish()
    }
}

fn short_type_name<T>() -> &'static str {
    let name = core::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}
