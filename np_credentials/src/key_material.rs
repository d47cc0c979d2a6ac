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

//! Fixed-length key material helpers shared by every credential type.

/// Length of a key seed, shared by both protocol versions.
pub const KEY_SEED_LEN: usize = 32;

/// Length of a V0 (legacy) identity token.
pub const V0_IDENTITY_TOKEN_LEN: usize = 14;

/// Length of a V1 (extended) identity token.
pub const V1_IDENTITY_TOKEN_LEN: usize = 16;

/// Length of an ed25519 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a raw ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of an HMAC over an identity token.
pub const IDENTITY_TOKEN_HMAC_LEN: usize = 32;

/// Raised when a key material buffer does not have the exact length
/// mandated by the protocol. Key material is never truncated or padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid key material length: expected {expected} bytes, got {actual}")]
pub struct InvalidLengthError {
    /// The length required by the protocol.
    pub expected: usize,
    /// The length of the buffer which was provided.
    pub actual: usize,
}

/// Copies `bytes` into a new `N`-byte array, failing if the
/// length of `bytes` is not exactly `N`.
pub fn copy_exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N], InvalidLengthError> {
    <[u8; N]>::try_from(bytes).map_err(|_| InvalidLengthError { expected: N, actual: bytes.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rstest::rstest;

    #[test]
    fn copy_exact_copies_matching_buffer() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..32 {
            let input: [u8; KEY_SEED_LEN] = rng.gen();
            let copied = copy_exact::<KEY_SEED_LEN>(&input).unwrap();
            assert_eq!(input, copied);
            assert_ne!(input.as_ptr(), copied.as_ptr());
        }
    }

    #[rstest]
    #[case::empty(0)]
    #[case::one_short(31)]
    #[case::one_long(33)]
    #[case::v1_token_length(V1_IDENTITY_TOKEN_LEN)]
    #[case::much_longer(255)]
    fn copy_exact_rejects_wrong_length(#[case] len: usize) {
        let input = vec![0xAB; len];
        assert_eq!(
            Err(InvalidLengthError { expected: KEY_SEED_LEN, actual: len }),
            copy_exact::<KEY_SEED_LEN>(&input)
        );
    }

    #[test]
    fn error_message_names_both_lengths() {
        let err = copy_exact::<V0_IDENTITY_TOKEN_LEN>(&[0; 16]).unwrap_err();
        assert_eq!("invalid key material length: expected 14 bytes, got 16", err.to_string());
    }
}
