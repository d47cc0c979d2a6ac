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

//! Broadcast credentials: the key material an advertiser uses to
//! encrypt and (for V1) sign its advertisements.

use core::fmt;

use crate::key_material::{
    copy_exact, InvalidLengthError, KEY_SEED_LEN, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN,
    V0_IDENTITY_TOKEN_LEN, V1_IDENTITY_TOKEN_LEN,
};

/// Key material for broadcasting V0 (legacy) advertisements.
#[derive(Clone, PartialEq, Eq)]
pub struct V0BroadcastCredential {
    key_seed: [u8; KEY_SEED_LEN],
    identity_token: [u8; V0_IDENTITY_TOKEN_LEN],
}

impl V0BroadcastCredential {
    /// Constructs a V0 broadcast credential from already-sized key material.
    pub fn new(
        key_seed: [u8; KEY_SEED_LEN],
        identity_token: [u8; V0_IDENTITY_TOKEN_LEN],
    ) -> Self {
        Self { key_seed, identity_token }
    }

    /// Constructs a V0 broadcast credential, copying and length-checking
    /// the 32-byte key seed and the 14-byte identity token.
    pub fn from_slices(key_seed: &[u8], identity_token: &[u8]) -> Result<Self, InvalidLengthError> {
        Ok(Self::new(copy_exact(key_seed)?, copy_exact(identity_token)?))
    }

    /// The key seed.
    pub fn key_seed(&self) -> &[u8; KEY_SEED_LEN] {
        &self.key_seed
    }

    /// The identity token.
    pub fn identity_token(&self) -> &[u8; V0_IDENTITY_TOKEN_LEN] {
        &self.identity_token
    }
}

impl fmt::Debug for V0BroadcastCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V0BroadcastCredential").finish_non_exhaustive()
    }
}

/// Key material for broadcasting V1 (extended) advertisements.
#[derive(Clone, PartialEq, Eq)]
pub struct V1BroadcastCredential {
    key_seed: [u8; KEY_SEED_LEN],
    identity_token: [u8; V1_IDENTITY_TOKEN_LEN],
    private_key: [u8; PRIVATE_KEY_LEN],
}

impl V1BroadcastCredential {
    /// Constructs a V1 broadcast credential from already-sized key material.
    pub fn new(
        key_seed: [u8; KEY_SEED_LEN],
        identity_token: [u8; V1_IDENTITY_TOKEN_LEN],
        private_key: [u8; PRIVATE_KEY_LEN],
    ) -> Self {
        Self { key_seed, identity_token, private_key }
    }

    /// Constructs a V1 broadcast credential, copying and length-checking
    /// the 32-byte key seed, 16-byte identity token and 32-byte private key.
    pub fn from_slices(
        key_seed: &[u8],
        identity_token: &[u8],
        private_key: &[u8],
    ) -> Result<Self, InvalidLengthError> {
        Ok(Self::new(copy_exact(key_seed)?, copy_exact(identity_token)?, copy_exact(private_key)?))
    }

    /// The key seed.
    pub fn key_seed(&self) -> &[u8; KEY_SEED_LEN] {
        &self.key_seed
    }

    /// The identity token.
    pub fn identity_token(&self) -> &[u8; V1_IDENTITY_TOKEN_LEN] {
        &self.identity_token
    }

    /// The ed25519 private key used to sign sections.
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.private_key
    }

    /// The ed25519 public key matching [`Self::private_key`], as a
    /// discoverer would carry it in a
    /// [`V1DiscoveryCredential`](crate::credential::V1DiscoveryCredential).
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        ed25519_dalek::SigningKey::from_bytes(&self.private_key).verifying_key().to_bytes()
    }
}

impl fmt::Debug for V1BroadcastCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V1BroadcastCredential").finish_non_exhaustive()
    }
}
