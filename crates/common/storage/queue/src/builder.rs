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

//! Fluent builder for [`Queue`].
//!
//! Setters never fail and never look at other fields. Everything is
//! checked once, in [`QueueBuilder::build`]:
//!
//! ```no_run
//! use rollq_storage_queue::{QueueBuilder, RollCycle};
//!
//! let mut builder = QueueBuilder::single("/var/lib/app/queue")
//!     .roll_cycle(RollCycle::Hourly)
//!     .index_spacing(16);
//! let queue = builder.build()?;
//! # Ok::<(), rollq_storage_queue::QueueError>(())
//! ```

use std::{path::PathBuf, sync::Arc};

use jiff::{civil::Time, tz::TimeZone};
use tracing::{info, warn};

use crate::{
    BufferMode, CycleCalculator, EventLoop, Queue, QueueConfig, QueueOptions, Result,
    RingBufferStats, RingBufferStatsListener, RollAnchor, RollCycle, RollTime, RollTimeOptions,
    StoreFileListener, WireStoreFactory, WireType, config::TEST_BLOCK_SIZE, path,
};

/// Whether a builder has produced a queue yet.
///
/// Building does not consume the builder: it can be adjusted and built
/// again, and queues built earlier keep their own snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BuilderState {
    Open,
    Built,
}

#[derive(Debug)]
pub struct QueueBuilder {
    config: QueueConfig,
    state:  BuilderState,
}

impl QueueBuilder {
    /// Builder for a binary queue at `base_path`.
    pub fn single<P: Into<PathBuf>>(base_path: P) -> Self { Self::binary(base_path) }

    pub fn binary<P: Into<PathBuf>>(base_path: P) -> Self {
        Self::new(base_path.into(), WireType::Binary)
    }

    /// Builder for a text queue at `base_path`.
    #[deprecated(note = "text queues are slow and lossy, use `single`")]
    pub fn single_text<P: Into<PathBuf>>(base_path: P) -> Self {
        let base_path = base_path.into();
        warn!(path = ?base_path, "`single_text` is deprecated, use `single`");
        Self::new(base_path, WireType::Text)
    }

    fn new(base_path: PathBuf, wire_type: WireType) -> Self {
        let mut config = QueueConfig::new(base_path);
        config.wire_type = wire_type;
        Self {
            config,
            state: BuilderState::Open,
        }
    }

    /// Builder seeded from declarative options.
    ///
    /// When options carry both `epoch` and `roll_time`, the roll time wins.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `path` is missing, or the roll time
    /// cannot be parsed or names an unknown zone.
    pub fn from_options(options: QueueOptions) -> Result<Self> {
        let base_path = options.required_path()?.to_path_buf();
        let roll_time = options
            .roll_time
            .as_ref()
            .map(RollTimeOptions::resolve)
            .transpose()?;
        if options.epoch.is_some() {
            warn!(epoch = options.epoch, "`epoch` option is deprecated, use `roll_time`");
        }

        let mut builder = Self::new(base_path, options.wire_type);
        let config = &mut builder.config;
        config.block_size = options.block_size;
        config.roll_cycle = options.roll_cycle;
        config.roll_anchor = RollAnchor::resolve(options.epoch, roll_time);
        config.buffer_capacity = options.buffer_capacity;
        config.write_buffer_mode = options.write_buffer_mode;
        config.read_buffer_mode = options.read_buffer_mode;
        config.index_count = options.index_count;
        config.index_spacing = options.index_spacing;
        config.read_only = options.read_only;
        config.strong_appenders = options.strong_appenders;
        Ok(builder)
    }

    /// Size of each memory mapping in bytes. The largest message should be
    /// no more than a quarter of this. Must be a multiple of
    /// [`MAPPING_GRANULARITY`](crate::MAPPING_GRANULARITY).
    #[must_use]
    pub fn block_size(mut self, block_size: u64) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Same as `block_size(65536)`.
    ///
    /// Test-only escape hatch: small mappings make roll-over paths cheap to
    /// exercise. It is not a tuning option and says nothing about
    /// correctness.
    #[must_use]
    pub fn test_block_size(self) -> Self { self.block_size(TEST_BLOCK_SIZE) }

    #[must_use]
    pub fn wire_type(mut self, wire_type: WireType) -> Self {
        self.config.wire_type = wire_type;
        self
    }

    #[must_use]
    pub fn roll_cycle(mut self, roll_cycle: RollCycle) -> Self {
        self.config.roll_cycle = roll_cycle;
        self
    }

    /// Anchors cycles at `epoch` milliseconds past midnight UTC.
    ///
    /// Overwrites any earlier `roll_time`. The value must lie within the
    /// representable timestamp range; this is checked at build.
    #[deprecated(note = "use `roll_time`")]
    #[must_use]
    pub fn epoch(mut self, epoch: i64) -> Self {
        warn!(epoch, "`epoch` is deprecated, use `roll_time`");
        self.config.roll_anchor = RollAnchor::Epoch { millis: epoch };
        self
    }

    /// Rolls cycles at `time` local to `zone`.
    ///
    /// Overwrites any earlier `epoch`.
    #[must_use]
    pub fn roll_time(mut self, time: Time, zone: TimeZone) -> Self {
        self.config.roll_anchor = RollAnchor::RollTime(RollTime::new(time, zone));
        self
    }

    #[must_use]
    pub fn roll_anchor(mut self, roll_anchor: RollAnchor) -> Self {
        self.config.roll_anchor = roll_anchor;
        self
    }

    /// `true` selects asynchronous writes, `false` unbuffered writes.
    #[deprecated(note = "use `write_buffer_mode`")]
    #[must_use]
    pub fn buffered(mut self, buffered: bool) -> Self {
        warn!(buffered, "`buffered` is deprecated, use `write_buffer_mode`");
        self.config.write_buffer_mode = if buffered {
            BufferMode::Asynchronous
        } else {
            BufferMode::None
        };
        self
    }

    /// Ring buffer size. Ignored unless a buffer mode other than
    /// [`BufferMode::None`] is selected.
    #[must_use]
    pub fn buffer_capacity(mut self, buffer_capacity: u64) -> Self {
        self.config.buffer_capacity = buffer_capacity;
        self
    }

    #[must_use]
    pub fn write_buffer_mode(mut self, mode: BufferMode) -> Self {
        self.config.write_buffer_mode = mode;
        self
    }

    #[must_use]
    pub fn read_buffer_mode(mut self, mode: BufferMode) -> Self {
        self.config.read_buffer_mode = mode;
        self
    }

    /// Event loop used by buffered modes. The caller keeps ownership; the
    /// queue never stops it.
    #[must_use]
    pub fn event_loop(mut self, event_loop: Arc<dyn EventLoop>) -> Self {
        self.config.event_loop = Some(event_loop);
        self
    }

    #[must_use]
    pub fn index_count(mut self, index_count: u32) -> Self {
        self.config.index_count = Some(index_count);
        self
    }

    /// Messages between index entries. Must be a power of two.
    #[must_use]
    pub fn index_spacing(mut self, index_spacing: u32) -> Self {
        self.config.index_spacing = Some(index_spacing);
        self
    }

    #[must_use]
    pub fn store_factory(mut self, store_factory: Arc<dyn WireStoreFactory>) -> Self {
        self.config.store_factory = store_factory;
        self
    }

    #[must_use]
    pub fn store_file_listener(mut self, listener: Arc<dyn StoreFileListener>) -> Self {
        self.config.store_file_listener = listener;
        self
    }

    #[must_use]
    pub fn cycle_calculator(mut self, cycle_calculator: Arc<dyn CycleCalculator>) -> Self {
        self.config.cycle_calculator = cycle_calculator;
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Whether the queue keeps appenders alive itself.
    #[must_use]
    pub fn strong_appenders(mut self, strong_appenders: bool) -> Self {
        self.config.strong_appenders = strong_appenders;
        self
    }

    #[must_use]
    pub fn on_ring_buffer_stats<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RingBufferStats) + Send + Sync + 'static,
    {
        self.config.on_ring_buffer_stats = RingBufferStatsListener::new(callback);
        self
    }

    /// Current option values, with defaults for anything unset.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    #[must_use]
    pub const fn state(&self) -> BuilderState { self.state }

    /// Independent copy of this builder, in the `Open` state.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            config: self.config.duplicate(),
            state:  BuilderState::Open,
        }
    }

    /// Validates the options, prepares the base directory and builds the
    /// queue.
    ///
    /// On failure the builder is left exactly as it was and can be fixed
    /// and built again.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid option values and a path
    /// error if the base directory cannot be used.
    pub fn build(&mut self) -> Result<Queue> {
        self.config.validate()?;
        path::ensure_base_dir(&self.config.base_path, self.config.read_only)?;

        if !self.config.wire_type.is_binary() {
            warn!(wire_type = %self.config.wire_type, "Non-binary wire types are deprecated for queues");
        }

        let queue = Queue::new(self.config.freeze());
        self.state = BuilderState::Built;

        info!(
            path = ?self.config.base_path,
            roll_cycle = %self.config.roll_cycle,
            block_size = self.config.block_size,
            wire_type = %self.config.wire_type,
            read_only = self.config.read_only,
            "Queue built"
        );
        Ok(queue)
    }
}
