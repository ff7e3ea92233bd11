// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors raised while building or running render passes.

use thiserror::Error;
use umbra_core::renderer::{RenderError, ResourceError};

/// An error raised by a render pass.
#[derive(Debug, Error)]
pub enum PassError {
    /// A backend resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A frame-level rendering operation failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The pass needs a target it was not given.
    #[error("Missing render target: {0}")]
    MissingTarget(&'static str),

    /// The pass needs a built-in material the context does not provide.
    #[error("Missing built-in material: {0}")]
    MissingMaterial(&'static str),
}

impl From<PassError> for RenderError {
    fn from(err: PassError) -> Self {
        match err {
            PassError::Resource(err) => RenderError::ResourceError(err),
            PassError::Render(err) => err,
            other => RenderError::RenderingFailed(other.to_string()),
        }
    }
}
