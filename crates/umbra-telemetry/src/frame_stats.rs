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

//! Per-frame render statistics.
//!
//! Passes fill [`FrameCounters`] on the frame resources; at the end of a frame
//! the counters and the measured phase timings become a [`FrameStats`] that
//! [`FrameTelemetry`] logs and keeps in a rolling window.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use umbra_core::renderer::FrameCounters;

/// Number of frames averaged by default.
pub const DEFAULT_WINDOW: usize = 120;

/// What one frame did and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameStats {
    /// Index of the frame, starting at 1.
    pub frame_index: u64,
    /// Draw calls issued, instanced or not.
    pub draw_calls: usize,
    /// Instanced draw calls issued.
    pub instanced_draw_calls: usize,
    /// Instances drawn.
    pub instances: usize,
    /// Renderables rejected by frustum culling.
    pub culled: usize,
    /// Passes executed.
    pub passes: usize,
    /// Time spent in `prepare`, in milliseconds.
    pub prepare_ms: f64,
    /// Time spent in `execute`, in milliseconds.
    pub execute_ms: f64,
}

impl FrameStats {
    /// Combines the counters of a frame with its phase timings.
    pub fn from_counters(
        frame_index: u64,
        counters: &FrameCounters,
        prepare: Duration,
        execute: Duration,
    ) -> Self {
        Self {
            frame_index,
            draw_calls: counters.draw_calls,
            instanced_draw_calls: counters.instanced_draw_calls,
            instances: counters.instances,
            culled: counters.culled,
            passes: counters.passes,
            prepare_ms: prepare.as_secs_f64() * 1000.0,
            execute_ms: execute.as_secs_f64() * 1000.0,
        }
    }

    /// Total CPU time of the frame in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.prepare_ms + self.execute_ms
    }
}

/// Rolling window of [`FrameStats`].
#[derive(Debug, Clone)]
pub struct FrameTelemetry {
    window: VecDeque<FrameStats>,
    capacity: usize,
    frames_recorded: u64,
}

impl FrameTelemetry {
    /// Keeps the last `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            frames_recorded: 0,
        }
    }

    /// Adds a frame and logs it at `debug`.
    pub fn record(&mut self, stats: FrameStats) {
        log::debug!(
            "Frame {}: {} passes, {} draw calls ({} instanced, {} instances), {} culled, prepare {:.3} ms, execute {:.3} ms",
            stats.frame_index,
            stats.passes,
            stats.draw_calls,
            stats.instanced_draw_calls,
            stats.instances,
            stats.culled,
            stats.prepare_ms,
            stats.execute_ms
        );
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(stats);
        self.frames_recorded += 1;
    }

    /// The most recent frame.
    pub fn last(&self) -> Option<&FrameStats> {
        self.window.back()
    }

    /// Frames recorded since creation, including those dropped from the window.
    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded
    }

    /// Frames currently in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no frame was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Mean CPU frame time over the window, in milliseconds.
    pub fn average_total_ms(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let sum: f64 = self.window.iter().map(FrameStats::total_ms).sum();
        Some(sum / self.window.len() as f64)
    }

    /// Mean draw calls per frame over the window.
    pub fn average_draw_calls(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let sum: usize = self.window.iter().map(|s| s.draw_calls).sum();
        Some(sum as f64 / self.window.len() as f64)
    }

    /// Logs the window averages at `info`.
    pub fn log_summary(&self) {
        match (self.average_total_ms(), self.average_draw_calls()) {
            (Some(ms), Some(draws)) => log::info!(
                "FrameTelemetry: {} frames, {:.3} ms CPU and {:.1} draw calls per frame over the last {}",
                self.frames_recorded,
                ms,
                draws,
                self.window.len()
            ),
            _ => log::info!("FrameTelemetry: no frame recorded"),
        }
    }

    /// Serializes the window as a JSON array.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(&self.window).context("Failed to serialize frame statistics")
    }
}

impl Default for FrameTelemetry {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
