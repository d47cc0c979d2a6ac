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

//! The handle-maps which credential slabs and books are allocated in.
//!
//! Every slab and book is created against an explicit [`CredentialContext`].
//! [`CredentialContext::global`] exists for the convenience constructors
//! at the API edge; nothing inside the crate reaches for it.

use std::sync::Arc;

use crate::book::CredentialBookInternals;
use crate::config::CredentialsConfig;
use crate::handle_map::HandleMap;
use crate::slab::CredentialSlabInternals;

lazy_static::lazy_static! {
    static ref GLOBAL_CONTEXT: CredentialContext = CredentialContext::default();
}

/// A pair of handle-maps holding the native side of credential slabs
/// and credential books. Cloning shares the maps.
#[derive(Clone)]
pub struct CredentialContext {
    slabs: Arc<HandleMap<CredentialSlabInternals>>,
    books: Arc<HandleMap<CredentialBookInternals>>,
}

impl Default for CredentialContext {
    fn default() -> Self {
        Self::new(&CredentialsConfig::default())
    }
}

impl CredentialContext {
    /// Creates a context whose maps are sized by `config`.
    pub fn new(config: &CredentialsConfig) -> Self {
        let slabs = HandleMap::with_dimensions(config.credential_slab_dimensions());
        let books = HandleMap::with_dimensions(config.credential_book_dimensions());
        log::debug!(
            "created credential context: {:?} slabs, {:?} books",
            slabs.dimensions(),
            books.dimensions()
        );
        Self { slabs: Arc::new(slabs), books: Arc::new(books) }
    }

    /// The process-wide default context, created on first use with
    /// [`CredentialsConfig::default`].
    pub fn global() -> &'static CredentialContext {
        &GLOBAL_CONTEXT
    }

    /// Number of credential slabs currently allocated in this context.
    pub fn num_active_slabs(&self) -> u32 {
        self.slabs.get_current_allocation_count()
    }

    /// Number of credential books currently allocated in this context.
    pub fn num_active_books(&self) -> u32 {
        self.books.get_current_allocation_count()
    }

    pub(crate) fn slabs(&self) -> &Arc<HandleMap<CredentialSlabInternals>> {
        &self.slabs
    }

    pub(crate) fn books(&self) -> &Arc<HandleMap<CredentialBookInternals>> {
        &self.books
    }
}

impl core::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialContext")
            .field("active_slabs", &self.num_active_slabs())
            .field("active_books", &self.num_active_books())
            .finish()
    }
}
