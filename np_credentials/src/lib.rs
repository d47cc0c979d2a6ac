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

//! Credential storage for Nearby Presence advertisement deserialization.
//!
//! Callers collect discovery credentials, each paired with their own
//! metadata, into a [`CredentialBook`] through a [`CredentialBookBuilder`].
//! The native side of every slab and book lives in a sharded
//! [`HandleMap`](handle_map::HandleMap) owned by a [`CredentialContext`],
//! and is released exactly once by the [`OwnedHandle`](owned_handle::OwnedHandle)
//! that owns it.
//!
//! ```
//! use np_credentials::{CredentialBookBuilder, V0DiscoveryCredential};
//!
//! let mut builder = CredentialBookBuilder::new()?;
//! builder.add_v0_discovery_credential(
//!     V0DiscoveryCredential::new([1; 32], [2; 32]),
//!     "alice".to_string(),
//! )?;
//! let book = builder.build()?;
//! assert_eq!(Some(&"alice".to_string()), book.get_matched_metadata(0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod book;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod handle_map;
pub mod key_material;
pub mod owned_handle;
pub mod slab;

pub use book::{BuildError, CredentialBook, CredentialBookBuilder, CredentialBookHandle};
pub use config::CredentialsConfig;
pub use context::CredentialContext;
pub use credential::{
    EmptyMetadata, MatchableCredential, MatchedCredential, MatchedMetadata,
    V0BroadcastCredential, V0DiscoveryCredential, V1BroadcastCredential, V1DiscoveryCredential,
};
pub use error::{InvalidHandleError, NoSpaceLeftError};
pub use key_material::InvalidLengthError;
pub use slab::{AddCredentialError, CredentialSlab};
