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

//! Sizing configuration for the handle-maps behind a [`CredentialContext`].
//!
//! [`CredentialContext`]: crate::context::CredentialContext

use crate::handle_map::HandleMapDimensions;

const DEFAULT_MAX_HANDLES: u32 = u32::MAX - 1;

const DEFAULT_NUM_SHARDS: u8 = 16;

/// Configuration for the handle-maps which hold credential slabs
/// and credential books.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// The number of shards to employ in each handle-map,
    /// or zero if we want to use the default, which is
    /// `min(16, std::thread::available_parallelism())`,
    /// falling back to 16 if parallelism can't be queried.
    num_shards: u8,

    /// The maximum number of credential slabs which may be
    /// active at any one time.
    max_num_credential_slabs: u32,

    /// The maximum number of credential books which may be
    /// active at any one time.
    max_num_credential_books: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialsConfig {
    /// The default configuration: automatic shard count and
    /// `u32::MAX - 1` handles of each kind.
    pub const fn new() -> Self {
        Self {
            num_shards: 0,
            max_num_credential_slabs: DEFAULT_MAX_HANDLES,
            max_num_credential_books: DEFAULT_MAX_HANDLES,
        }
    }

    /// The number of shards which will actually be used, resolving
    /// a zero override to the default.
    pub fn num_shards(&self) -> u8 {
        if self.num_shards != 0 {
            return self.num_shards;
        }
        match std::thread::available_parallelism() {
            Ok(parallelism) => {
                u8::try_from(parallelism.get()).map_or(DEFAULT_NUM_SHARDS, |p| p.min(DEFAULT_NUM_SHARDS))
            }
            Err(_) => DEFAULT_NUM_SHARDS,
        }
    }

    /// The maximum number of simultaneously active credential slabs.
    pub fn max_num_credential_slabs(&self) -> u32 {
        self.max_num_credential_slabs
    }

    /// The maximum number of simultaneously active credential books.
    pub fn max_num_credential_books(&self) -> u32 {
        self.max_num_credential_books
    }

    /// Sets the number of shards per handle-map. Zero selects the default.
    pub fn set_num_shards(&mut self, num_shards: u8) -> &mut Self {
        self.num_shards = num_shards;
        self
    }

    /// Sets the maximum number of active credential slabs.
    /// Max value: `u32::MAX - 1`.
    pub fn set_max_num_credential_slabs(&mut self, max_num_credential_slabs: u32) -> &mut Self {
        self.max_num_credential_slabs = DEFAULT_MAX_HANDLES.min(max_num_credential_slabs);
        self
    }

    /// Sets the maximum number of active credential books.
    /// Max value: `u32::MAX - 1`.
    pub fn set_max_num_credential_books(&mut self, max_num_credential_books: u32) -> &mut Self {
        self.max_num_credential_books = DEFAULT_MAX_HANDLES.min(max_num_credential_books);
        self
    }

    pub(crate) fn credential_slab_dimensions(&self) -> HandleMapDimensions {
        HandleMapDimensions {
            num_shards: self.num_shards(),
            max_active_handles: self.max_num_credential_slabs,
        }
    }

    pub(crate) fn credential_book_dimensions(&self) -> HandleMapDimensions {
        HandleMapDimensions {
            num_shards: self.num_shards(),
            max_active_handles: self.max_num_credential_books,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shards_are_bounded() {
        let shards = CredentialsConfig::default().num_shards();
        assert!((1..=DEFAULT_NUM_SHARDS).contains(&shards));
    }

    #[test]
    fn explicit_shard_override_is_used() {
        let mut config = CredentialsConfig::new();
        let _ = config.set_num_shards(3);
        assert_eq!(3, config.credential_slab_dimensions().num_shards);
        assert_eq!(3, config.credential_book_dimensions().num_shards);
    }

    #[test]
    fn handle_limits_are_clamped() {
        let mut config = CredentialsConfig::new();
        let _ = config.set_max_num_credential_slabs(u32::MAX).set_max_num_credential_books(5);
        assert_eq!(u32::MAX - 1, config.max_num_credential_slabs());
        assert_eq!(5, config.credential_book_dimensions().max_active_handles);
    }
}
