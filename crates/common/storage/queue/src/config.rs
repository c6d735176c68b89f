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

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use jiff::Timestamp;
use snafu::ensure;

use crate::{
    AppenderOwnership, BufferMode, CycleCalculator, DefaultCycleCalculator, EventLoop,
    MappedStoreFactory, NoopStoreFileListener, Result, RingBufferStatsListener, RollAnchor,
    RollCycle, StoreFileListener, WireStoreFactory, WireType,
    error::{
        InvalidBlockSizeSnafu, InvalidEpochSnafu, InvalidIndexCountSnafu,
        InvalidIndexSpacingSnafu, MissingEventLoopSnafu,
    },
};

/// Default size of each memory mapping.
pub const DEFAULT_BLOCK_SIZE: u64 = 64 << 20;

/// Small block size for tests that want to cross block boundaries quickly.
pub const TEST_BLOCK_SIZE: u64 = 64 << 10;

/// Default ring buffer size for buffered modes.
pub const DEFAULT_BUFFER_CAPACITY: u64 = 2 << 20;

/// Unit the block size must be a multiple of on this target.
#[cfg(windows)]
pub const MAPPING_GRANULARITY: u64 = 64 << 10;
/// Unit the block size must be a multiple of on this target.
#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
pub const MAPPING_GRANULARITY: u64 = 16 << 10;
/// Unit the block size must be a multiple of on this target.
#[cfg(not(any(windows, all(target_os = "macos", target_arch = "aarch64"))))]
pub const MAPPING_GRANULARITY: u64 = 4 << 10;

/// Options a queue is built from.
///
/// Getters never validate and never mutate; unset optional values report
/// their documented default. Validation happens once, in
/// [`QueueBuilder::build`](crate::QueueBuilder::build).
#[derive(Debug)]
pub struct QueueConfig {
    pub(crate) base_path:            PathBuf,
    pub(crate) block_size:           u64,
    pub(crate) wire_type:            WireType,
    pub(crate) roll_cycle:           RollCycle,
    pub(crate) roll_anchor:          RollAnchor,
    pub(crate) buffer_capacity:      u64,
    pub(crate) write_buffer_mode:    BufferMode,
    pub(crate) read_buffer_mode:     BufferMode,
    pub(crate) event_loop:           Option<Arc<dyn EventLoop>>,
    pub(crate) index_count:          Option<u32>,
    pub(crate) index_spacing:        Option<u32>,
    pub(crate) store_factory:        Arc<dyn WireStoreFactory>,
    pub(crate) store_file_listener:  Arc<dyn StoreFileListener>,
    pub(crate) cycle_calculator:     Arc<dyn CycleCalculator>,
    pub(crate) read_only:            bool,
    pub(crate) strong_appenders:     bool,
    pub(crate) on_ring_buffer_stats: RingBufferStatsListener,
}

impl QueueConfig {
    pub(crate) fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            block_size: DEFAULT_BLOCK_SIZE,
            wire_type: WireType::default(),
            roll_cycle: RollCycle::default(),
            roll_anchor: RollAnchor::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            write_buffer_mode: BufferMode::None,
            read_buffer_mode: BufferMode::None,
            event_loop: None,
            index_count: None,
            index_spacing: None,
            store_factory: Arc::new(MappedStoreFactory),
            store_file_listener: Arc::new(NoopStoreFileListener),
            cycle_calculator: Arc::new(DefaultCycleCalculator),
            read_only: false,
            strong_appenders: false,
            on_ring_buffer_stats: RingBufferStatsListener::noop(),
        }
    }

    /// Copies every option into an independent config.
    ///
    /// Values are copied; collaborator handles (event loop, factories,
    /// listeners) keep pointing at the same caller-owned objects.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            base_path:            self.base_path.clone(),
            block_size:           self.block_size,
            wire_type:            self.wire_type,
            roll_cycle:           self.roll_cycle,
            roll_anchor:          self.roll_anchor.clone(),
            buffer_capacity:      self.buffer_capacity,
            write_buffer_mode:    self.write_buffer_mode,
            read_buffer_mode:     self.read_buffer_mode,
            event_loop:           self.event_loop.clone(),
            index_count:          self.index_count,
            index_spacing:        self.index_spacing,
            store_factory:        self.store_factory.clone(),
            store_file_listener:  self.store_file_listener.clone(),
            cycle_calculator:     self.cycle_calculator.clone(),
            read_only:            self.read_only,
            strong_appenders:     self.strong_appenders,
            on_ring_buffer_stats: self.on_ring_buffer_stats.clone(),
        }
    }

    /// Snapshot handed to the queue, with roll-cycle derived defaults made
    /// explicit.
    pub(crate) fn freeze(&self) -> Self {
        let mut frozen = self.duplicate();
        frozen.index_count = Some(self.index_count());
        frozen.index_spacing = Some(self.index_spacing());
        frozen
    }

    /// Checks every value-level constraint. Path checks are separate since
    /// they touch the filesystem.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.block_size > 0
                && self.block_size >= MAPPING_GRANULARITY
                && self.block_size % MAPPING_GRANULARITY == 0,
            InvalidBlockSizeSnafu {
                block_size:  self.block_size,
                granularity: MAPPING_GRANULARITY,
            }
        );

        let index_count = self.index_count();
        ensure!(index_count > 0, InvalidIndexCountSnafu { index_count });

        let index_spacing = self.index_spacing();
        ensure!(
            index_spacing.is_power_of_two(),
            InvalidIndexSpacingSnafu { index_spacing }
        );

        let (min, max) = (
            Timestamp::MIN.as_millisecond(),
            Timestamp::MAX.as_millisecond(),
        );
        let epoch = self.roll_anchor.epoch_millis();
        ensure!(
            (min..=max).contains(&epoch),
            InvalidEpochSnafu { epoch, min, max }
        );

        if self.event_loop.is_none() {
            ensure!(
                !self.write_buffer_mode.is_buffered(),
                MissingEventLoopSnafu {
                    direction: "write",
                    mode:      self.write_buffer_mode,
                }
            );
            ensure!(
                !self.read_buffer_mode.is_buffered(),
                MissingEventLoopSnafu {
                    direction: "read",
                    mode:      self.read_buffer_mode,
                }
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.base_path }

    /// Size of each memory mapping in bytes. The largest message should be
    /// no more than a quarter of this.
    #[must_use]
    pub const fn block_size(&self) -> u64 { self.block_size }

    /// Largest message the block size comfortably accommodates.
    #[must_use]
    pub const fn max_message_size(&self) -> u64 { self.block_size / 4 }

    #[must_use]
    pub const fn wire_type(&self) -> WireType { self.wire_type }

    #[must_use]
    pub const fn roll_cycle(&self) -> RollCycle { self.roll_cycle }

    #[must_use]
    pub const fn roll_anchor(&self) -> &RollAnchor { &self.roll_anchor }

    /// The roll anchor as a UTC millisecond offset from the UNIX epoch.
    #[must_use]
    pub fn epoch(&self) -> i64 { self.roll_anchor.epoch_millis() }

    #[must_use]
    pub const fn buffer_capacity(&self) -> u64 { self.buffer_capacity }

    /// The buffer capacity if any buffered mode will use it.
    #[must_use]
    pub const fn effective_buffer_capacity(&self) -> Option<u64> {
        if self.write_buffer_mode.is_buffered() || self.read_buffer_mode.is_buffered() {
            Some(self.buffer_capacity)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn write_buffer_mode(&self) -> BufferMode { self.write_buffer_mode }

    #[must_use]
    pub const fn read_buffer_mode(&self) -> BufferMode { self.read_buffer_mode }

    #[deprecated(note = "use `write_buffer_mode`")]
    #[must_use]
    pub const fn buffered(&self) -> bool {
        matches!(self.write_buffer_mode, BufferMode::Asynchronous)
    }

    #[must_use]
    pub const fn event_loop(&self) -> Option<&Arc<dyn EventLoop>> { self.event_loop.as_ref() }

    /// Configured index count, or the roll cycle's default.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
            .unwrap_or_else(|| self.roll_cycle.default_index_count())
    }

    /// Configured index spacing, or the roll cycle's default.
    #[must_use]
    pub fn index_spacing(&self) -> u32 {
        self.index_spacing
            .unwrap_or_else(|| self.roll_cycle.default_index_spacing())
    }

    #[must_use]
    pub fn store_factory(&self) -> &Arc<dyn WireStoreFactory> { &self.store_factory }

    #[must_use]
    pub fn store_file_listener(&self) -> &Arc<dyn StoreFileListener> { &self.store_file_listener }

    #[must_use]
    pub fn cycle_calculator(&self) -> &Arc<dyn CycleCalculator> { &self.cycle_calculator }

    #[must_use]
    pub const fn read_only(&self) -> bool { self.read_only }

    #[must_use]
    pub const fn strong_appenders(&self) -> bool { self.strong_appenders }

    #[must_use]
    pub const fn appender_ownership(&self) -> AppenderOwnership {
        AppenderOwnership::from_strong(self.strong_appenders)
    }

    #[must_use]
    pub const fn on_ring_buffer_stats(&self) -> &RingBufferStatsListener { &self.on_ring_buffer_stats }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn config() -> QueueConfig { QueueConfig::new(PathBuf::from("/tmp/queue")) }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.path(), Path::new("/tmp/queue"));
        assert_eq!(config.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(config.wire_type(), WireType::Binary);
        assert_eq!(config.roll_cycle(), RollCycle::Daily);
        assert_eq!(config.epoch(), 0);
        assert_eq!(config.buffer_capacity(), DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.write_buffer_mode(), BufferMode::None);
        assert_eq!(config.read_buffer_mode(), BufferMode::None);
        assert!(config.event_loop().is_none());
        assert_eq!(config.index_count(), RollCycle::Daily.default_index_count());
        assert_eq!(config.index_spacing(), RollCycle::Daily.default_index_spacing());
        assert!(!config.read_only());
        assert!(!config.strong_appenders());
        assert_eq!(config.appender_ownership(), AppenderOwnership::Borrowed);
        config.validate().unwrap();
    }

    #[test]
    fn test_index_defaults_follow_roll_cycle() {
        let mut config = config();
        config.roll_cycle = RollCycle::TestDaily;
        assert_eq!(config.index_count(), 8);
        assert_eq!(config.index_spacing(), 1);

        config.index_count = Some(128);
        assert_eq!(config.index_count(), 128);
    }

    #[test_case(0 ; "zero")]
    #[test_case(MAPPING_GRANULARITY - 1 ; "below granularity")]
    #[test_case(MAPPING_GRANULARITY + 1 ; "not a multiple")]
    fn test_invalid_block_size(block_size: u64) {
        let mut config = config();
        config.block_size = block_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, crate::QueueError::InvalidBlockSize { .. }));
    }

    #[test]
    fn test_granularity_sized_block_is_valid() {
        let mut config = config();
        config.block_size = MAPPING_GRANULARITY;
        config.validate().unwrap();
        config.block_size = TEST_BLOCK_SIZE;
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_index_count() {
        let mut config = config();
        config.index_count = Some(0);
        assert!(matches!(
            config.validate().unwrap_err(),
            crate::QueueError::InvalidIndexCount { index_count: 0, .. }
        ));
    }

    #[test_case(i64::MIN ; "min")]
    #[test_case(i64::MAX ; "max")]
    fn test_epoch_outside_timestamp_range(epoch: i64) {
        let mut config = config();
        config.roll_anchor = RollAnchor::Epoch { millis: epoch };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, crate::QueueError::InvalidEpoch { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_read_buffer_mode_needs_event_loop() {
        let mut config = config();
        config.read_buffer_mode = BufferMode::Copy;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "read buffer mode copy requires an event loop");
    }

    #[test]
    fn test_buffer_capacity_is_inert_without_buffering() {
        let mut config = config();
        config.buffer_capacity = 1 << 10;
        assert_eq!(config.effective_buffer_capacity(), None);
        config.validate().unwrap();

        config.write_buffer_mode = BufferMode::Asynchronous;
        assert_eq!(config.effective_buffer_capacity(), Some(1 << 10));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut original = config();
        original.block_size = TEST_BLOCK_SIZE;
        let mut copy = original.duplicate();
        copy.block_size = DEFAULT_BLOCK_SIZE;
        copy.base_path.push("other");

        assert_eq!(original.block_size(), TEST_BLOCK_SIZE);
        assert_eq!(original.path(), Path::new("/tmp/queue"));
        assert!(Arc::ptr_eq(original.store_factory(), copy.store_factory()));
    }

    #[test]
    fn test_freeze_resolves_index_defaults() {
        let frozen = config().freeze();
        assert_eq!(frozen.index_count, Some(RollCycle::Daily.default_index_count()));
        assert_eq!(frozen.index_spacing, Some(RollCycle::Daily.default_index_spacing()));
    }
}
