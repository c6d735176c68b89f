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

use std::path::PathBuf;

use snafu::Snafu;

/// Broad classification of a [`QueueError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An option holds a value the queue cannot be built with.
    Configuration,
    /// The base path is unusable for the requested access mode.
    Path,
    /// The storage collaborator failed to provide a cycle store.
    Store,
    /// The queue handle has been closed.
    Closed,
}

/// Queue builder and handle errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueueError {
    #[snafu(display(
        "Invalid block size {block_size}: must be a positive multiple of the {granularity} byte \
         mapping granularity"
    ))]
    InvalidBlockSize {
        block_size:  u64,
        granularity: u64,
        #[snafu(implicit)]
        loc:         snafu::Location,
    },

    #[snafu(display("Invalid index count {index_count}: must be greater than zero"))]
    InvalidIndexCount {
        index_count: u32,
        #[snafu(implicit)]
        loc:         snafu::Location,
    },

    #[snafu(display("Invalid index spacing {index_spacing}: must be a positive power of two"))]
    InvalidIndexSpacing {
        index_spacing: u32,
        #[snafu(implicit)]
        loc:           snafu::Location,
    },

    #[snafu(display("Invalid epoch {epoch}: must be within {min}..={max} milliseconds"))]
    InvalidEpoch {
        epoch: i64,
        min:   i64,
        max:   i64,
        #[snafu(implicit)]
        loc:   snafu::Location,
    },

    #[snafu(display("{direction} buffer mode {mode} requires an event loop"))]
    MissingEventLoop {
        direction: &'static str,
        mode:      crate::BufferMode,
        #[snafu(implicit)]
        loc:       snafu::Location,
    },

    #[snafu(display("Unknown {field} '{value}'"))]
    UnknownVariant {
        field:  &'static str,
        value:  String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Unknown time zone '{name}'"))]
    UnknownTimeZone {
        name:   String,
        source: jiff::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Invalid roll time '{value}'"))]
    InvalidRollTime {
        value:  String,
        source: jiff::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Missing required option '{field}'"))]
    MissingOption {
        field: &'static str,
        #[snafu(implicit)]
        loc:   snafu::Location,
    },

    #[snafu(display("Failed to parse queue options"))]
    InvalidOptions {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Queue path {} does not exist", path.display()))]
    PathNotFound {
        path: PathBuf,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("Queue path {} is not a directory", path.display()))]
    NotADirectory {
        path: PathBuf,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("Queue path {} is not writable", path.display()))]
    PathNotWritable {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Queue path {} is not readable", path.display()))]
    PathNotReadable {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Mmap operation failed on {}: {message}", path.display()))]
    Mmap {
        path:    PathBuf,
        message: String,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },

    #[snafu(display("Store file {} is unavailable", path.display()))]
    StoreIo {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Cycle {cycle} cannot be named by roll cycle {roll_cycle}"))]
    CycleOutOfRange {
        cycle:      i64,
        roll_cycle: crate::RollCycle,
        #[snafu(implicit)]
        loc:        snafu::Location,
    },

    #[snafu(display("Queue {} is closed", path.display()))]
    Closed {
        path: PathBuf,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },
}

impl QueueError {
    /// Returns the broad class this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBlockSize { .. }
            | Self::InvalidIndexCount { .. }
            | Self::InvalidIndexSpacing { .. }
            | Self::InvalidEpoch { .. }
            | Self::MissingEventLoop { .. }
            | Self::MissingOption { .. }
            | Self::UnknownVariant { .. }
            | Self::UnknownTimeZone { .. }
            | Self::InvalidRollTime { .. }
            | Self::InvalidOptions { .. } => ErrorKind::Configuration,
            Self::PathNotFound { .. }
            | Self::NotADirectory { .. }
            | Self::PathNotWritable { .. }
            | Self::PathNotReadable { .. } => ErrorKind::Path,
            Self::Mmap { .. } | Self::StoreIo { .. } | Self::CycleOutOfRange { .. } => {
                ErrorKind::Store
            }
            Self::Closed { .. } => ErrorKind::Closed,
        }
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool { matches!(self.kind(), ErrorKind::Configuration) }

    #[must_use]
    pub const fn is_path(&self) -> bool { matches!(self.kind(), ErrorKind::Path) }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
