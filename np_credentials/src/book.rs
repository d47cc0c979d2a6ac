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

//! Credential books: the sealed, queryable form of a credential slab,
//! plus the caller-side id to metadata mapping.
//!
//! A book is built through a [`CredentialBookBuilder`], which keeps the
//! native slab and the metadata list in lock-step so that a credential's
//! id is always the index of its metadata.

use core::fmt;

use crate::context::CredentialContext;
use crate::credential::{
    EmptyMetadata, MatchableCredential, MatchedCredential, MatchedMetadata,
    V0DiscoveryCredential, V1DiscoveryCredential,
};
use crate::error::{InvalidHandleError, NoSpaceLeftError};
use crate::handle_map::{Handle, HandleMapTryAllocateError};
use crate::owned_handle::{HandleState, OwnedHandle};
use crate::slab::{AddCredentialError, CredentialSlab, CredentialSlabInternals};


/// Internal, native-side implementation of a credential-book.
pub(crate) struct CredentialBookInternals {
    v0_creds: Box<[MatchableCredential<V0DiscoveryCredential>]>,
    v1_creds: Box<[MatchableCredential<V1DiscoveryCredential>]>,
}

impl CredentialBookInternals {
    fn create_from_slab(credential_slab: CredentialSlabInternals) -> Self {
        Self {
            v0_creds: credential_slab.v0_creds.into_boxed_slice(),
            v1_creds: credential_slab.v1_creds.into_boxed_slice(),
        }
    }

    fn find_match_data(&self, cred_id: u32) -> Option<&MatchedCredential> {
        self.v0_creds
            .iter()
            .map(|cred| &cred.match_data)
            .chain(self.v1_creds.iter().map(|cred| &cred.match_data))
            .find(|match_data| match_data.id() == cred_id)
    }
}

/// Errors raised when sealing a slab into a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// There was no space left to allocate the book. The slab was released.
    #[error("no space left to allocate a credential book")]
    NoSpaceLeft,
    /// The slab's native object was already gone.
    #[error("invalid credential slab handle")]
    InvalidSlabHandle,
}

impl From<NoSpaceLeftError> for BuildError {
    fn from(_: NoSpaceLeftError) -> Self {
        BuildError::NoSpaceLeft
    }
}

/// Owner of one native credential book, without any caller metadata.
///
/// This is what a matching engine works against: it can enumerate the
/// credentials and report which [`MatchedCredential`] matched.
#[derive(Debug)]
pub struct CredentialBookHandle {
    handle: OwnedHandle<CredentialBookInternals>,
}

impl CredentialBookHandle {
    /// Seals `slab` into a new native book, taking ownership of the slab.
    ///
    /// The book slot is reserved before the slab is consumed. If no slot
    /// is available the slab is released rather than handed back.
    pub fn from_slab(slab: CredentialSlab) -> Result<Self, BuildError> {
        let slabs = slab.slab_map().clone();
        let books = slab.book_map().clone();
        let slab_handle = slab.into_raw();
        let allocated = OwnedHandle::try_allocate(&books, || {
            slabs.deallocate(slab_handle).map(CredentialBookInternals::create_from_slab)
        });
        match allocated {
            Ok(handle) => {
                log::debug!(
                    "sealed slab {} into book {}",
                    slab_handle.get_id(),
                    handle.handle().get_id()
                );
                Ok(Self { handle })
            }
            Err(HandleMapTryAllocateError::ValueProviderFailed(_)) => {
                Err(BuildError::InvalidSlabHandle)
            }
            Err(HandleMapTryAllocateError::HandleMapFull) => {
                log::warn!("no space for a new book, releasing slab {}", slab_handle.get_id());
                // The slab was moved into this call, so it must not outlive it.
                let _ = slabs.deallocate(slab_handle);
                Err(BuildError::NoSpaceLeft)
            }
        }
    }

    /// Takes ownership of a book handle previously given up by [`Self::into_raw`].
    pub fn from_raw(context: &CredentialContext, handle: Handle) -> Self {
        Self { handle: OwnedHandle::from_raw(context.books(), handle) }
    }

    /// The raw handle of this book.
    pub fn handle(&self) -> Handle {
        self.handle.handle()
    }

    /// Whether this book still owns a live native object.
    pub fn is_active(&self) -> bool {
        self.handle.state() == HandleState::Active
    }

    /// The V0 credentials in this book, in insertion order.
    pub fn v0_credentials(
        &self,
    ) -> Result<Vec<MatchableCredential<V0DiscoveryCredential>>, InvalidHandleError> {
        Ok(self.handle.get()?.v0_creds.to_vec())
    }

    /// The V1 credentials in this book, in insertion order.
    pub fn v1_credentials(
        &self,
    ) -> Result<Vec<MatchableCredential<V1DiscoveryCredential>>, InvalidHandleError> {
        Ok(self.handle.get()?.v1_creds.to_vec())
    }

    /// The total number of credentials in this book.
    pub fn num_credentials(&self) -> Result<usize, InvalidHandleError> {
        let internals = self.handle.get()?;
        Ok(internals.v0_creds.len() + internals.v1_creds.len())
    }

    /// Looks up the match data registered under `cred_id`.
    pub fn match_data(&self, cred_id: u32) -> Result<Option<MatchedCredential>, InvalidHandleError> {
        Ok(self.handle.get()?.find_match_data(cred_id).cloned())
    }

    /// Transfers ownership of the native book to the caller.
    pub fn into_raw(self) -> Handle {
        self.handle.leak()
    }

    /// Releases the native book. Further calls do nothing.
    pub fn release(&mut self) {
        let _ = self.handle.release();
    }
}

/// A finished collection of discovery credentials and the caller
/// metadata for each of them, indexed by credential id.
///
/// Ids are assigned densely from zero in the order credentials were added,
/// across both advertisement versions.
pub struct CredentialBook<M> {
    native: CredentialBookHandle,
    metadata: Box<[M]>,
}

impl<M: MatchedMetadata> CredentialBook<M> {
    /// Starts building a book in the process-wide default context.
    pub fn builder() -> Result<CredentialBookBuilder<M>, NoSpaceLeftError> {
        CredentialBookBuilder::new()
    }
}

impl CredentialBook<EmptyMetadata> {
    /// A book with no credentials, in the process-wide default context.
    /// Useful when only public advertisements need to be deserialized.
    pub fn empty() -> Result<Self, BuildError> {
        Self::empty_in(CredentialContext::global())
    }

    /// A book with no credentials, in the given context.
    pub fn empty_in(context: &CredentialContext) -> Result<Self, BuildError> {
        CredentialBookBuilder::with_context(context)?.build()
    }
}

impl<M> CredentialBook<M> {
    /// Gets the metadata registered for credential `id`, or `None` if no
    /// credential has that id.
    pub fn get_matched_metadata(&self, id: i64) -> Option<&M> {
        usize::try_from(id).ok().and_then(|index| self.metadata.get(index))
    }

    /// Gets the metadata for a credential reported as matched by the
    /// native side.
    pub fn metadata_for(&self, match_data: &MatchedCredential) -> Option<&M> {
        self.get_matched_metadata(i64::from(match_data.id()))
    }

    /// All metadata, indexed by credential id.
    pub fn metadata(&self) -> &[M] {
        &self.metadata
    }

    /// The number of credentials in this book.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Whether this book has no credentials.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// The native side of this book.
    pub fn native(&self) -> &CredentialBookHandle {
        &self.native
    }

    /// Releases the native book. Metadata stays readable; further calls do nothing.
    pub fn release(&mut self) {
        self.native.release()
    }
}

impl<M> fmt::Debug for CredentialBook<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBook")
            .field("native", &self.native)
            .field("len", &self.metadata.len())
            .finish()
    }
}

/// Builds a [`CredentialBook`], assigning each added credential the next id.
///
/// A credential is either fully added (to both the native slab and the
/// metadata list) or, on error, not added at all, so the builder stays
/// usable after a rejected credential.
pub struct CredentialBookBuilder<M> {
    slab: CredentialSlab,
    metadata: Vec<M>,
}

impl<M: MatchedMetadata> CredentialBookBuilder<M> {
    /// Starts building a book in the process-wide default context.
    pub fn new() -> Result<Self, NoSpaceLeftError> {
        Self::with_context(CredentialContext::global())
    }

    /// Starts building a book in the given context.
    pub fn with_context(context: &CredentialContext) -> Result<Self, NoSpaceLeftError> {
        Ok(Self { slab: CredentialSlab::new(context)?, metadata: Vec::new() })
    }

    /// Adds a V0 discovery credential with the given metadata.
    pub fn add_v0_discovery_credential(
        &mut self,
        discovery_credential: V0DiscoveryCredential,
        metadata: M,
    ) -> Result<&mut Self, AddCredentialError> {
        let cred_id = self.next_id()?;
        self.slab.add_v0_discovery_credential(
            discovery_credential,
            cred_id,
            &metadata.encrypted_metadata_bytes(),
        )?;
        self.metadata.push(metadata);
        Ok(self)
    }

    /// Adds a V1 discovery credential with the given metadata.
    ///
    /// Fails with [`AddCredentialError::InvalidPublicKey`] if the
    /// credential's public key is not a valid ed25519 public key.
    pub fn add_v1_discovery_credential(
        &mut self,
        discovery_credential: V1DiscoveryCredential,
        metadata: M,
    ) -> Result<&mut Self, AddCredentialError> {
        let cred_id = self.next_id()?;
        self.slab.add_v1_discovery_credential(
            discovery_credential,
            cred_id,
            &metadata.encrypted_metadata_bytes(),
        )?;
        self.metadata.push(metadata);
        Ok(self)
    }

    /// The number of credentials added so far.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Whether no credentials have been added yet.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Seals the slab into a native book and freezes the metadata list.
    pub fn build(self) -> Result<CredentialBook<M>, BuildError> {
        let native = CredentialBookHandle::from_slab(self.slab)?;
        Ok(CredentialBook { native, metadata: self.metadata.into_boxed_slice() })
    }

    fn next_id(&self) -> Result<u32, AddCredentialError> {
        credential_id_for_index(self.metadata.len())
    }
}

/// The id of the credential added after `num_added` others.
fn credential_id_for_index(num_added: usize) -> Result<u32, AddCredentialError> {
    u32::try_from(num_added).map_err(|_| AddCredentialError::TooManyCredentials)
}

impl<M> fmt::Debug for CredentialBookBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBookBuilder")
            .field("slab", &self.slab)
            .field("len", &self.metadata.len())
            .finish()
    }
}
