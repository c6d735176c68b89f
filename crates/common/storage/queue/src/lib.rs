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

//! Builder contract for persisted, append-only queues.
//!
//! [`QueueBuilder`] collects typed options, validates them once in
//! [`QueueBuilder::build`] and produces a [`Queue`] handle carrying a frozen
//! [`QueueConfig`]. The storage engine is reached through collaborator
//! traits ([`WireStoreFactory`], [`StoreFileListener`], [`EventLoop`],
//! [`CycleCalculator`]); [`MappedStoreFactory`] is the memory-mapped default.

pub mod appender;
pub mod buffer;
pub mod builder;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod options;
pub mod path;
pub mod queue;
pub mod roll;
pub mod store;
pub mod wire;

pub use appender::{Appender, AppenderOwnership};
pub use buffer::{BufferMode, RingBufferStats, RingBufferStatsListener};
pub use builder::{BuilderState, QueueBuilder};
pub use config::{
    DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_CAPACITY, MAPPING_GRANULARITY, QueueConfig, TEST_BLOCK_SIZE,
};
pub use error::{ErrorKind, QueueError, Result};
pub use event_loop::EventLoop;
pub use options::{QueueOptions, RollTimeOptions};
pub use path::{STORE_FILE_EXTENSION, store_file_name, store_file_path};
pub use queue::Queue;
pub use roll::{CycleCalculator, DefaultCycleCalculator, RollAnchor, RollCycle, RollTime, zone_named};
pub use store::{
    MappedStore, MappedStoreFactory, NoopStoreFileListener, StoreFileListener, StoreRequest,
    WireStore, WireStoreFactory,
};
pub use wire::WireType;
