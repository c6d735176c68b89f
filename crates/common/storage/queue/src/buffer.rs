// Copyright 2025 Crrow
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

//! Read/write buffering modes and ring buffer statistics reporting.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{Result, wire::parse_variant};

/// How reads or writes are staged before they reach storage.
///
/// Only [`BufferMode::None`] is realized by this crate. The other modes are
/// extension points for an engine that drives them from an
/// [`EventLoop`](crate::EventLoop), which is why selecting one requires an
/// event loop at build time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BufferMode {
    /// Direct access, no intermediate buffer.
    #[default]
    None,
    /// Data is copied through an intermediate ring buffer.
    Copy,
    /// Data is staged in a ring buffer and drained by the event loop.
    Asynchronous,
}

impl BufferMode {
    /// Parses a buffer mode name.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownVariant`](crate::QueueError) for an
    /// unrecognized name.
    pub fn from_name(name: &str) -> Result<Self> { parse_variant("buffer mode", name) }

    /// Returns `true` when this mode stages data through a ring buffer.
    #[must_use]
    pub const fn is_buffered(self) -> bool { !matches!(self, Self::None) }
}

impl TryFrom<String> for BufferMode {
    type Error = crate::QueueError;

    fn try_from(value: String) -> Result<Self> { Self::from_name(&value) }
}

/// Point-in-time statistics of a buffering ring buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingBufferStats {
    /// Total capacity of the ring in bytes.
    pub capacity:      u64,
    /// Lowest observed free space since the previous report.
    pub min_remaining: u64,
    /// Bytes written since the previous report.
    pub bytes_written: u64,
    /// Bytes drained since the previous report.
    pub bytes_read:    u64,
    /// Number of reader cursors attached to the ring.
    pub reader_count:  u32,
}

impl RingBufferStats {
    /// Fraction of the ring that was in use at the fullest point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn peak_utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.capacity.saturating_sub(self.min_remaining) as f64 / self.capacity as f64
    }
}

/// Callback invoked with ring buffer statistics.
#[derive(Clone)]
pub struct RingBufferStatsListener(Arc<dyn Fn(&RingBufferStats) + Send + Sync>);

impl RingBufferStatsListener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&RingBufferStats) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// A listener that discards every report.
    #[must_use]
    pub fn noop() -> Self { Self::new(|_| {}) }

    pub fn notify(&self, stats: &RingBufferStats) { (self.0)(stats); }
}

impl Default for RingBufferStatsListener {
    fn default() -> Self { Self::noop() }
}

impl fmt::Debug for RingBufferStatsListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBufferStatsListener").finish_non_exhaustive()
    }
}
