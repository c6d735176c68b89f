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

//! Queue handle and lifecycle management.
//!
//! A [`Queue`] is what [`QueueBuilder::build`](crate::QueueBuilder::build)
//! produces. It owns a frozen copy of the options and is the entry point
//! the engine works through:
//! - Cycle arithmetic via the configured [`CycleCalculator`](crate::CycleCalculator)
//! - Per-cycle stores from the configured [`WireStoreFactory`](crate::WireStoreFactory)
//! - Per-thread [`Appender`] handles
//! - Ring buffer statistics forwarding
//!
//! ## Usage
//!
//! ```no_run
//! use rollq_storage_queue::QueueBuilder;
//!
//! let queue = QueueBuilder::single("/path/to/queue").build()?;
//!
//! let store = queue.acquire_store(queue.current_cycle())?;
//! let appender = queue.acquire_appender()?;
//!
//! queue.close();
//! # Ok::<(), rollq_storage_queue::QueueError>(())
//! ```

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use jiff::Timestamp;
use snafu::ensure;
use tracing::{debug, info, warn};

use crate::{
    Appender, QueueConfig, Result, RingBufferStats, WireStore,
    appender::AppenderRegistry,
    error::ClosedSnafu,
    store::StoreRequest,
};

/// A persisted append-only queue.
///
/// The handle is `Send + Sync`; stores and appenders can be acquired from
/// any thread.
pub struct Queue {
    /// Snapshot of the builder's options taken at build time.
    config:    QueueConfig,
    /// Stores acquired so far, keyed by cycle.
    stores:    Mutex<HashMap<i64, Arc<dyn WireStore>>>,
    /// Per-thread appenders, retained according to the ownership policy.
    appenders: AppenderRegistry,
    closed:    AtomicBool,
}

impl Queue {
    pub(crate) fn new(config: QueueConfig) -> Self {
        let appenders = AppenderRegistry::new(config.appender_ownership());

        debug!(
            path = ?config.base_path,
            index_count = config.index_count(),
            index_spacing = config.index_spacing(),
            epoch = config.epoch(),
            ownership = %config.appender_ownership(),
            "Queue initialized"
        );

        Self {
            config,
            stores: Mutex::new(HashMap::new()),
            appenders,
            closed: AtomicBool::new(false),
        }
    }

    /// Options this queue was built with, with every default resolved.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    #[must_use]
    pub fn path(&self) -> &Path { &self.config.base_path }

    /// Cycle containing `at`.
    #[must_use]
    pub fn cycle_at(&self, at: Timestamp) -> i64 {
        self.config
            .cycle_calculator
            .cycle_at(self.config.roll_cycle, &self.config.roll_anchor, at)
    }

    #[must_use]
    pub fn current_cycle(&self) -> i64 { self.cycle_at(Timestamp::now()) }

    /// Store holding `cycle`, acquired from the store factory on first use.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`](crate::QueueError::Closed) after
    /// [`close`](Self::close), or whatever the store factory fails with.
    pub fn acquire_store(&self, cycle: i64) -> Result<Arc<dyn WireStore>> {
        self.ensure_open()?;

        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(&cycle) {
            return Ok(store.clone());
        }

        let request = StoreRequest {
            base_path:  &self.config.base_path,
            roll_cycle: self.config.roll_cycle,
            cycle,
            block_size: self.config.block_size,
            wire_type:  self.config.wire_type,
            read_only:  self.config.read_only,
        };
        let store = self.config.store_factory.acquire(&request)?;
        self.config
            .store_file_listener
            .on_acquired(cycle, store.path());

        stores.insert(cycle, store.clone());
        Ok(store)
    }

    /// The calling thread's appender.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`](crate::QueueError::Closed) after
    /// [`close`](Self::close).
    pub fn acquire_appender(&self) -> Result<Arc<Appender>> {
        self.ensure_open()?;
        Ok(self.appenders.acquire())
    }

    /// Number of appenders still alive.
    #[must_use]
    pub fn live_appenders(&self) -> usize { self.appenders.live() }

    /// Forwards ring buffer statistics to the configured callback.
    pub fn report_ring_buffer_stats(&self, stats: &RingBufferStats) {
        self.config.on_ring_buffer_stats.notify(stats);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

    /// Releases every store and every appender the queue retains.
    ///
    /// Idempotent. The event loop, if any, is left running.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut released: Vec<_> = self
            .stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        released.sort_unstable_by_key(|(cycle, _)| *cycle);

        for (cycle, store) in &released {
            if let Err(e) = store.flush() {
                warn!(cycle, path = ?store.path(), error = %e, "Failed to flush store on close");
            }
            self.config
                .store_file_listener
                .on_released(*cycle, store.path());
        }
        self.appenders.clear();

        info!(
            path = ?self.config.base_path,
            stores = released.len(),
            "Queue closed"
        );
    }

    fn ensure_open(&self) -> Result<()> {
        ensure!(
            !self.is_closed(),
            ClosedSnafu {
                path: &self.config.base_path,
            }
        );
        Ok(())
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("path", &self.config.base_path)
            .field("roll_cycle", &self.config.roll_cycle)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for Queue {
    fn drop(&mut self) { self.close(); }
}
