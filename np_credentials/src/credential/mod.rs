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

//! Credential types: broadcast and discovery credentials for both
//! advertisement versions, and the match data attached to each
//! discovery credential.

use std::sync::Arc;

pub mod broadcast;
pub mod discovery;
pub mod metadata;


pub use broadcast::{V0BroadcastCredential, V1BroadcastCredential};
pub use discovery::{V0DiscoveryCredential, V1DiscoveryCredential};
pub use metadata::{EmptyMetadata, MatchedMetadata};

/// The match data stored alongside each discovery credential on the
/// native side of a slab or book.
///
/// Since the native side can't know what plaintext data the caller
/// keeps for a credential, it only records the credential id (which the
/// caller maps back to its own metadata) and the encrypted metadata
/// bytes, kept behind an `Arc` so that matches can hand them out cheaply.
#[derive(Debug, Clone)]
pub struct MatchedCredential {
    cred_id: u32,
    encrypted_metadata_bytes: Arc<[u8]>,
}

impl MatchedCredential {
    /// Constructs new match data from a credential id and encrypted
    /// metadata bytes copied from the given slice.
    pub fn new(cred_id: u32, encrypted_metadata_bytes: &[u8]) -> Self {
        Self::from_arc_bytes(cred_id, Arc::from(encrypted_metadata_bytes))
    }

    /// Constructs new match data which shares the given bytes.
    pub fn from_arc_bytes(cred_id: u32, encrypted_metadata_bytes: Arc<[u8]>) -> Self {
        Self { cred_id, encrypted_metadata_bytes }
    }

    /// The id of the credential, which is also its index in the
    /// owning book's metadata list.
    pub fn id(&self) -> u32 {
        self.cred_id
    }

    /// The encrypted metadata registered with the credential.
    pub fn encrypted_metadata_bytes(&self) -> Arc<[u8]> {
        self.encrypted_metadata_bytes.clone()
    }
}

impl PartialEq for MatchedCredential {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for MatchedCredential {}

/// A discovery credential together with the match data it was
/// registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchableCredential<C> {
    /// The credential used to try to match advertisements.
    pub discovery_credential: C,
    /// What to report when `discovery_credential` matches.
    pub match_data: MatchedCredential,
}
