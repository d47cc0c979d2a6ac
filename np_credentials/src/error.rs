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

//! Error types shared by the owning wrappers in this crate.

use crate::handle_map::{HandleMapFullError, HandleNotPresentError};

/// Raised when there is no handle slot left to allocate a new
/// credential slab or credential book. Retrying only helps once
/// other slabs or books have been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no space left to allocate a new handle")]
pub struct NoSpaceLeftError;

impl From<HandleMapFullError> for NoSpaceLeftError {
    fn from(_: HandleMapFullError) -> Self {
        NoSpaceLeftError
    }
}

/// Raised when an operation refers to a handle whose native object
/// has already been released or was never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid handle")]
pub struct InvalidHandleError;

impl From<HandleNotPresentError> for InvalidHandleError {
    fn from(_: HandleNotPresentError) -> Self {
        InvalidHandleError
    }
}
