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

//! Per-cycle storage collaborators.
//!
//! The queue never touches store bytes itself. It asks a
//! [`WireStoreFactory`] for the store of a cycle and reports the store's
//! lifecycle to a [`StoreFileListener`]. [`MappedStoreFactory`] is the
//! default factory: one memory-mapped `.cq4` file per cycle, sized to the
//! configured block size.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use mmap_io::MemoryMappedFile;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    Result, RollCycle, WireType,
    error::{MmapSnafu, StoreIoSnafu},
    path::store_file_path,
};

/// Everything a factory needs to know to produce the store of one cycle.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub base_path:  &'a Path,
    pub roll_cycle: RollCycle,
    pub cycle:      i64,
    pub block_size: u64,
    pub wire_type:  WireType,
    pub read_only:  bool,
}

/// Storage segment holding the documents of a single cycle.
pub trait WireStore: fmt::Debug + Send + Sync {
    fn cycle(&self) -> i64;

    fn path(&self) -> &Path;

    /// Mapped size in bytes.
    fn capacity(&self) -> u64;

    /// Flushes dirty pages to disk. A no-op for read-only stores.
    fn flush(&self) -> Result<()>;
}

/// Produces the [`WireStore`] for a cycle.
pub trait WireStoreFactory: fmt::Debug + Send + Sync {
    fn acquire(&self, request: &StoreRequest<'_>) -> Result<Arc<dyn WireStore>>;
}

/// Notified when a queue starts or stops using a store file.
pub trait StoreFileListener: fmt::Debug + Send + Sync {
    fn on_acquired(&self, _cycle: i64, _path: &Path) {}

    fn on_released(&self, _cycle: i64, _path: &Path) {}
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStoreFileListener;

impl StoreFileListener for NoopStoreFileListener {}

/// Default factory: one memory-mapped file per cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct MappedStoreFactory;

impl WireStoreFactory for MappedStoreFactory {
    fn acquire(&self, request: &StoreRequest<'_>) -> Result<Arc<dyn WireStore>> {
        let path = store_file_path(request.base_path, request.roll_cycle, request.cycle)?;

        let store = if request.read_only {
            MappedStore::open_ro(&path, request.cycle)?
        } else if path.exists() {
            MappedStore::open_rw(&path, request.cycle)?
        } else {
            MappedStore::create(&path, request.cycle, request.block_size)?
        };

        debug!(
            path = ?store.path,
            cycle = request.cycle,
            capacity = store.capacity,
            read_only = request.read_only,
            "Mapped store acquired"
        );
        Ok(Arc::new(store))
    }
}

/// Memory-mapped store file for one cycle.
pub struct MappedStore {
    mmap:      MemoryMappedFile,
    path:      PathBuf,
    cycle:     i64,
    capacity:  u64,
    read_only: bool,
}

impl MappedStore {
    /// Create a new store file with `size` bytes pre-allocated.
    pub fn create<P: AsRef<Path>>(path: P, cycle: i64, size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mmap = MemoryMappedFile::create_rw(&path, size).map_err(|e| {
            MmapSnafu {
                path:    &path,
                message: e.to_string(),
            }
            .build()
        })?;

        Ok(Self {
            mmap,
            path,
            cycle,
            capacity: size,
            read_only: false,
        })
    }

    /// Open an existing store file for writing.
    pub fn open_rw<P: AsRef<Path>>(path: P, cycle: i64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mmap = MemoryMappedFile::open_rw(&path).map_err(|e| {
            MmapSnafu {
                path:    &path,
                message: e.to_string(),
            }
            .build()
        })?;
        let capacity = mmap.len();

        Ok(Self {
            mmap,
            path,
            cycle,
            capacity,
            read_only: false,
        })
    }

    /// Open an existing store file in read-only mode.
    pub fn open_ro<P: AsRef<Path>>(path: P, cycle: i64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        std::fs::metadata(&path).context(StoreIoSnafu { path: &path })?;
        let mmap = MemoryMappedFile::open_ro(&path).map_err(|e| {
            MmapSnafu {
                path:    &path,
                message: e.to_string(),
            }
            .build()
        })?;
        let capacity = mmap.len();

        Ok(Self {
            mmap,
            path,
            cycle,
            capacity,
            read_only: true,
        })
    }

    pub const fn is_read_only(&self) -> bool { self.read_only }
}

impl WireStore for MappedStore {
    fn cycle(&self) -> i64 { self.cycle }

    fn path(&self) -> &Path { &self.path }

    fn capacity(&self) -> u64 { self.capacity }

    fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        self.mmap.flush().map_err(|e| {
            MmapSnafu {
                path:    &self.path,
                message: e.to_string(),
            }
            .build()
        })
    }
}

impl fmt::Debug for MappedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedStore")
            .field("path", &self.path)
            .field("cycle", &self.cycle)
            .field("capacity", &self.capacity)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}
