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

//! Discovery credentials: the key material a scanner needs to match
//! and decrypt encrypted advertisements from one identity.

use core::fmt;

use crate::key_material::{
    copy_exact, InvalidLengthError, IDENTITY_TOKEN_HMAC_LEN, KEY_SEED_LEN, PUBLIC_KEY_LEN,
};

/// Cryptographic information about a particular V0 discovery credential
/// necessary to match and decrypt encrypted V0 advertisements.
#[derive(Clone, PartialEq, Eq)]
pub struct V0DiscoveryCredential {
    key_seed: [u8; KEY_SEED_LEN],
    identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
}

impl V0DiscoveryCredential {
    /// Constructs a new V0 discovery credential with the given 32-byte key-seed
    /// and the given 32-byte HMAC of the (14-byte) identity token.
    pub fn new(
        key_seed: [u8; KEY_SEED_LEN],
        identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
    ) -> Self {
        Self { key_seed, identity_token_hmac }
    }

    /// Like [`Self::new`], but copies and length-checks byte slices.
    pub fn from_slices(
        key_seed: &[u8],
        identity_token_hmac: &[u8],
    ) -> Result<Self, InvalidLengthError> {
        Ok(Self::new(copy_exact(key_seed)?, copy_exact(identity_token_hmac)?))
    }

    /// The key seed.
    pub fn key_seed(&self) -> &[u8; KEY_SEED_LEN] {
        &self.key_seed
    }

    /// The expected HMAC of the identity token.
    pub fn identity_token_hmac(&self) -> &[u8; IDENTITY_TOKEN_HMAC_LEN] {
        &self.identity_token_hmac
    }
}

impl fmt::Debug for V0DiscoveryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V0DiscoveryCredential").finish_non_exhaustive()
    }
}

/// Cryptographic information about a particular V1 discovery credential
/// necessary to match and decrypt encrypted V1 sections.
///
/// The public key is only length-checked here. Whether it decodes to an
/// ed25519 point is checked when the credential is added to a
/// [`CredentialSlab`](crate::slab::CredentialSlab).
#[derive(Clone, PartialEq, Eq)]
pub struct V1DiscoveryCredential {
    key_seed: [u8; KEY_SEED_LEN],
    expected_mic_short_salt_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
    expected_mic_extended_salt_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
    expected_signature_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
    pub_key: [u8; PUBLIC_KEY_LEN],
}

impl V1DiscoveryCredential {
    /// Constructs a V1 discovery credential from the provided identity data.
    pub fn new(
        key_seed: [u8; KEY_SEED_LEN],
        expected_mic_short_salt_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
        expected_mic_extended_salt_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
        expected_signature_identity_token_hmac: [u8; IDENTITY_TOKEN_HMAC_LEN],
        pub_key: [u8; PUBLIC_KEY_LEN],
    ) -> Self {
        Self {
            key_seed,
            expected_mic_short_salt_identity_token_hmac,
            expected_mic_extended_salt_identity_token_hmac,
            expected_signature_identity_token_hmac,
            pub_key,
        }
    }

    /// Like [`Self::new`], but copies and length-checks byte slices.
    pub fn from_slices(
        key_seed: &[u8],
        expected_mic_short_salt_identity_token_hmac: &[u8],
        expected_mic_extended_salt_identity_token_hmac: &[u8],
        expected_signature_identity_token_hmac: &[u8],
        pub_key: &[u8],
    ) -> Result<Self, InvalidLengthError> {
        Ok(Self::new(
            copy_exact(key_seed)?,
            copy_exact(expected_mic_short_salt_identity_token_hmac)?,
            copy_exact(expected_mic_extended_salt_identity_token_hmac)?,
            copy_exact(expected_signature_identity_token_hmac)?,
            copy_exact(pub_key)?,
        ))
    }

    /// The key seed.
    pub fn key_seed(&self) -> &[u8; KEY_SEED_LEN] {
        &self.key_seed
    }

    /// The expected identity token HMAC for MIC sections with a short salt.
    pub fn expected_mic_short_salt_identity_token_hmac(&self) -> &[u8; IDENTITY_TOKEN_HMAC_LEN] {
        &self.expected_mic_short_salt_identity_token_hmac
    }

    /// The expected identity token HMAC for MIC sections with an extended salt.
    pub fn expected_mic_extended_salt_identity_token_hmac(
        &self,
    ) -> &[u8; IDENTITY_TOKEN_HMAC_LEN] {
        &self.expected_mic_extended_salt_identity_token_hmac
    }

    /// The expected identity token HMAC for signed sections.
    pub fn expected_signature_identity_token_hmac(&self) -> &[u8; IDENTITY_TOKEN_HMAC_LEN] {
        &self.expected_signature_identity_token_hmac
    }

    /// The raw ed25519 public key used to verify signed sections.
    pub fn pub_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.pub_key
    }
}

impl fmt::Debug for V1DiscoveryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V1DiscoveryCredential").finish_non_exhaustive()
    }
}
