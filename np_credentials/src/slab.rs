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

//! Credential slabs: append-only native aggregates of discovery
//! credentials, which are sealed into a credential book once complete.

use std::sync::Arc;

use crate::book::CredentialBookInternals;
use crate::context::CredentialContext;
use crate::credential::{
    MatchableCredential, MatchedCredential, V0DiscoveryCredential, V1DiscoveryCredential,
};
use crate::error::{InvalidHandleError, NoSpaceLeftError};
use crate::handle_map::{Handle, HandleMap};
use crate::owned_handle::{HandleState, OwnedHandle};


/// Native side of a credential slab: the credentials added so far,
/// per advertisement version, in insertion order.
pub(crate) struct CredentialSlabInternals {
    pub(crate) v0_creds: Vec<MatchableCredential<V0DiscoveryCredential>>,
    pub(crate) v1_creds: Vec<MatchableCredential<V1DiscoveryCredential>>,
}

impl CredentialSlabInternals {
    fn new() -> Self {
        Self { v0_creds: Vec::new(), v1_creds: Vec::new() }
    }

    fn len(&self) -> usize {
        self.v0_creds.len() + self.v1_creds.len()
    }
}

/// Errors raised while adding a credential to a [`CredentialSlab`] or a
/// [`CredentialBookBuilder`](crate::book::CredentialBookBuilder).
/// When one is returned, nothing was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddCredentialError {
    /// The V1 credential's public key doesn't decode to an ed25519 point.
    #[error("the public key is not a valid ed25519 public key")]
    InvalidPublicKey,
    /// The slab's native object is gone.
    #[error("invalid credential slab handle")]
    InvalidHandle,
    /// The builder ran out of credential ids, which must fit in a `u32`.
    /// A slab never raises this, since its callers choose the ids.
    #[error("too many credentials")]
    TooManyCredentials,
}

impl From<InvalidHandleError> for AddCredentialError {
    fn from(_: InvalidHandleError) -> Self {
        AddCredentialError::InvalidHandle
    }
}

/// Owner of one native credential slab.
///
/// Each added credential is registered on the native side under a
/// caller-chosen id. [`CredentialBookBuilder`](crate::book::CredentialBookBuilder)
/// picks ids densely from zero; direct users of the slab are responsible
/// for doing the same if they index metadata by id.
pub struct CredentialSlab {
    /// Book map of the context this slab was allocated in, which is
    /// where the slab is sealed into a book.
    books: Arc<HandleMap<CredentialBookInternals>>,
    handle: OwnedHandle<CredentialSlabInternals>,
}

impl CredentialSlab {
    /// Allocates a new, empty slab in `context`.
    pub fn new(context: &CredentialContext) -> Result<Self, NoSpaceLeftError> {
        let handle = OwnedHandle::allocate(context.slabs(), CredentialSlabInternals::new)?;
        Ok(Self { books: context.books().clone(), handle })
    }

    /// Takes ownership of a slab handle previously given up by [`Self::into_raw`].
    pub fn from_raw(context: &CredentialContext, handle: Handle) -> Self {
        Self {
            books: context.books().clone(),
            handle: OwnedHandle::from_raw(context.slabs(), handle),
        }
    }

    /// Adds a V0 discovery credential, registering it under `cred_id`
    /// along with its encrypted metadata bytes.
    pub fn add_v0_discovery_credential(
        &mut self,
        discovery_credential: V0DiscoveryCredential,
        cred_id: u32,
        encrypted_metadata_bytes: &[u8],
    ) -> Result<(), AddCredentialError> {
        let match_data = MatchedCredential::new(cred_id, encrypted_metadata_bytes);
        self.handle
            .get_mut()?
            .v0_creds
            .push(MatchableCredential { discovery_credential, match_data });
        log::trace!("added v0 credential {} to slab {}", cred_id, self.handle().get_id());
        Ok(())
    }

    /// Adds a V1 discovery credential, registering it under `cred_id`
    /// along with its encrypted metadata bytes.
    ///
    /// Fails with [`AddCredentialError::InvalidPublicKey`] if the
    /// credential's public key is not a valid ed25519 public key.
    pub fn add_v1_discovery_credential(
        &mut self,
        discovery_credential: V1DiscoveryCredential,
        cred_id: u32,
        encrypted_metadata_bytes: &[u8],
    ) -> Result<(), AddCredentialError> {
        if ed25519_dalek::VerifyingKey::from_bytes(discovery_credential.pub_key()).is_err() {
            log::debug!("rejected v1 credential {}: invalid public key", cred_id);
            return Err(AddCredentialError::InvalidPublicKey);
        }
        let match_data = MatchedCredential::new(cred_id, encrypted_metadata_bytes);
        self.handle
            .get_mut()?
            .v1_creds
            .push(MatchableCredential { discovery_credential, match_data });
        log::trace!("added v1 credential {} to slab {}", cred_id, self.handle().get_id());
        Ok(())
    }

    /// The number of credentials (of both versions) in this slab.
    pub fn len(&self) -> Result<usize, InvalidHandleError> {
        Ok(self.handle.get()?.len())
    }

    /// Whether no credentials have been added yet.
    pub fn is_empty(&self) -> Result<bool, InvalidHandleError> {
        self.len().map(|len| len == 0)
    }

    /// The raw handle of this slab.
    pub fn handle(&self) -> Handle {
        self.handle.handle()
    }

    pub(crate) fn slab_map(&self) -> &Arc<HandleMap<CredentialSlabInternals>> {
        self.handle.map()
    }

    pub(crate) fn book_map(&self) -> &Arc<HandleMap<CredentialBookInternals>> {
        &self.books
    }

    /// Whether this slab still owns a live native object.
    pub fn is_active(&self) -> bool {
        self.handle.state() == HandleState::Active
    }

    /// Transfers ownership of the native slab to the caller, returning
    /// its raw handle. This wrapper will no longer release it.
    pub fn into_raw(self) -> Handle {
        self.handle.leak()
    }

    /// Releases the native slab. Further calls do nothing.
    pub fn release(&mut self) {
        let _ = self.handle.release();
    }
}

impl core::fmt::Debug for CredentialSlab {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialSlab").field("handle", &self.handle).finish()
    }
}
