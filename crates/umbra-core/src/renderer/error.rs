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

//! Errors of the backend contract and the frame loop.
//!
//! [`FenceError`] nests in [`ResourceError`], which nests in [`RenderError`]; each
//! level converts from the one below so `?` works across layers.

use crate::math::FrustumError;
use crate::renderer::api::{BufferId, FenceId};
use std::fmt;

/// An error related to the fence signal/wait protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceError {
    /// The fence handle is not known to the backend (never created, or deleted).
    Unknown {
        /// The ID of the fence.
        id: FenceId,
    },
    /// A wait was issued on a fence that no queue has signaled yet.
    ///
    /// On a real GPU this stalls the consuming queue forever.
    WaitOnUnsignaled {
        /// The debug name of the fence.
        name: String,
    },
}

impl fmt::Display for FenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenceError::Unknown { id } => write!(f, "Unknown fence {}", id.0),
            FenceError::WaitOnUnsignaled { name } => {
                write!(f, "Wait on fence '{name}' which was never signaled")
            }
        }
    }
}

impl std::error::Error for FenceError {}

/// A backend call on a buffer, texture, target or fence failed.
#[derive(Debug)]
pub enum ResourceError {
    /// Fence protocol violation.
    Fence(FenceError),
    /// No live buffer has this id.
    BufferNotFound(BufferId),
    /// A texture or render target surface does not exist.
    NotFound,
    /// The handle exists but cannot be used for this call.
    InvalidHandle,
    /// The backend rejected the call; the message comes from the backend.
    BackendError(String),
    /// A byte range, layer or mip level lies outside the resource.
    OutOfBounds,
    /// A pass-scoped command was recorded outside of the matching pass.
    InvalidPassState(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Fence(err) => write!(f, "Fence: {err}"),
            ResourceError::BufferNotFound(id) => write!(f, "No buffer with id {}", id.0),
            ResourceError::NotFound => write!(f, "Texture or target not found"),
            ResourceError::InvalidHandle => write!(f, "Handle cannot be used here"),
            ResourceError::BackendError(msg) => write!(f, "Backend: {msg}"),
            ResourceError::OutOfBounds => write!(f, "Access outside the resource"),
            ResourceError::InvalidPassState(msg) => write!(f, "Pass state: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Fence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FenceError> for ResourceError {
    fn from(err: FenceError) -> Self {
        ResourceError::Fence(err)
    }
}

/// Failure of a frame, a pass or backend startup.
#[derive(Debug)]
pub enum RenderError {
    /// A frame call came before the backend was ready.
    NotInitialized,
    /// The backend could not start.
    InitializationFailed(String),
    /// A pass gave up on the frame.
    RenderingFailed(String),
    /// A backend resource call failed.
    ResourceError(ResourceError),
    /// A camera produced a matrix that cannot be culled against.
    Frustum(FrustumError),
    /// Broken internal invariant.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "Backend not initialized"),
            RenderError::InitializationFailed(msg) => write!(f, "Backend startup failed: {msg}"),
            RenderError::RenderingFailed(msg) => write!(f, "Frame failed: {msg}"),
            RenderError::ResourceError(err) => write!(f, "Resource error: {err}"),
            RenderError::Frustum(err) => write!(f, "Culling setup failed: {err}"),
            RenderError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            RenderError::Frustum(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<FenceError> for RenderError {
    fn from(err: FenceError) -> Self {
        RenderError::ResourceError(ResourceError::Fence(err))
    }
}

impl From<FrustumError> for RenderError {
    fn from(err: FrustumError) -> Self {
        RenderError::Frustum(err)
    }
}
