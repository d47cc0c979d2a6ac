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

//! Caller-side metadata attached to each credential in a book.

use std::borrow::Cow;

/// Data that a caller associates with a discovery credential and gets
/// back when that credential matches an advertisement.
///
/// The only thing the book needs from it is the encrypted metadata
/// bytes to register on the native side, which may be empty.
pub trait MatchedMetadata {
    /// The encrypted metadata bytes for this credential.
    fn encrypted_metadata_bytes(&self) -> Cow<'_, [u8]>;
}

/// Metadata for books which carry none, e.g. books only used to
/// deserialize public advertisements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyMetadata;

impl MatchedMetadata for EmptyMetadata {
    fn encrypted_metadata_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&[])
    }
}

impl MatchedMetadata for Vec<u8> {
    fn encrypted_metadata_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl MatchedMetadata for String {
    fn encrypted_metadata_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl MatchedMetadata for &'static str {
    fn encrypted_metadata_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}
