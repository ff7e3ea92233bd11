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

//! The render pass contract and the ordered list a frame runs.
//!
//! A frame calls [`RenderPass::prepare`] on every pass (CPU work: culling, sorting,
//! buffer uploads), then [`RenderPass::execute`] on every pass (GPU command
//! recording), both in ascending priority order.

use crate::renderer::error::RenderError;
use crate::renderer::resources::FrameResources;
use crate::renderer::scene::RenderContext;
use std::fmt;

/// Broad category of a pass, used for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Draws scene geometry into the color and depth targets.
    Scene,
    /// Renders light-space depth.
    Shadow,
    /// Moves data on the copy queue.
    Copy,
    /// Full-screen composite or blit.
    PostProcess,
    /// Editor-only overlay.
    Editor,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassKind::Scene => "Scene",
            PassKind::Shadow => "Shadow",
            PassKind::Copy => "Copy",
            PassKind::PostProcess => "PostProcess",
            PassKind::Editor => "Editor",
        };
        f.write_str(name)
    }
}

/// A unit of rendering work run once per frame.
///
/// Passes are not reentrant: a frame calls `prepare` then `execute` once each.
pub trait RenderPass: Send {
    /// Debug name, also used for the debug group around `execute`.
    fn name(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> i32;

    /// The pass category.
    fn kind(&self) -> PassKind;

    /// CPU-side work: build render queues and upload per-frame constants.
    fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError>;

    /// GPU-side work: bind targets, issue draws, signal fences.
    fn execute(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError>;
}

/// Passes kept sorted by priority; equal priorities keep insertion order.
#[derive(Default)]
pub struct RenderPassList {
    passes: Vec<Box<dyn RenderPass>>,
}

impl fmt::Debug for RenderPassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.passes.iter().map(|p| (p.priority(), p.name().to_string())))
            .finish()
    }
}

impl RenderPassList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pass after every pass of lower or equal priority.
    pub fn add(&mut self, pass: Box<dyn RenderPass>) {
        let priority = pass.priority();
        let index = self.passes.partition_point(|p| p.priority() <= priority);
        log::debug!(
            "RenderPassList: added '{}' ({}, priority {})",
            pass.name(),
            pass.kind(),
            priority
        );
        self.passes.insert(index, pass);
    }

    /// Removes and returns the first pass named `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn RenderPass>> {
        let index = self.passes.iter().position(|p| p.name() == name)?;
        Some(self.passes.remove(index))
    }

    /// Number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Pass names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs `prepare` on every pass in order. Stops at the first error.
    pub fn prepare_all(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        for pass in &mut self.passes {
            log::trace!("RenderPassList: prepare '{}'", pass.name());
            pass.prepare(context, frame)?;
        }
        Ok(())
    }

    /// Runs `execute` on every pass in order and counts them in `frame.counters.passes`.
    ///
    /// Returns the number of passes executed. Stops at the first error.
    pub fn execute_all(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<usize, RenderError> {
        for pass in &mut self.passes {
            log::trace!("RenderPassList: execute '{}'", pass.name());
            pass.execute(context, frame)?;
            frame.counters.passes += 1;
        }
        Ok(self.passes.len())
    }

    /// [`prepare_all`](Self::prepare_all), then [`execute_all`](Self::execute_all).
    pub fn run(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<usize, RenderError> {
        self.prepare_all(context, frame)?;
        self.execute_all(context, frame)
    }
}
