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

//! Declarative queue options, loadable from configuration files.
//!
//! Only plain values live here. Collaborators such as event loops and
//! store factories are attached on the [`QueueBuilder`](crate::QueueBuilder)
//! afterwards.
//!
//! ```json
//! {
//!   "path": "/var/lib/app/queue",
//!   "roll_cycle": "hourly",
//!   "roll_time": { "time": "21:00:00", "zone": "Europe/London" },
//!   "index_spacing": 16
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::{OptionExt, ResultExt};

use crate::{
    BufferMode, Result, RollCycle, RollTime, WireType,
    config::{DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_CAPACITY},
    error::{InvalidOptionsSnafu, MissingOptionSnafu},
};

fn default_zone() -> String { "UTC".to_string() }

/// Roll time as written in configuration: `HH:MM:SS` plus an IANA zone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RollTimeOptions {
    pub time: String,
    #[serde(default = "default_zone")]
    pub zone: String,
}

impl RollTimeOptions {
    /// Parses the time of day and looks up the zone.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparsable time or an unknown
    /// zone.
    pub fn resolve(&self) -> Result<RollTime> { RollTime::parse(&self.time, &self.zone) }
}

/// Serializable subset of the queue configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct QueueOptions {
    /// Directory holding the queue's store files. Required.
    pub path: Option<PathBuf>,

    /// Size of each memory mapping in bytes.
    #[default(DEFAULT_BLOCK_SIZE)]
    pub block_size: u64,

    pub wire_type: WireType,

    pub roll_cycle: RollCycle,

    /// Legacy roll anchor in UTC milliseconds. Ignored when `roll_time` is
    /// also present.
    pub epoch: Option<i64>,

    pub roll_time: Option<RollTimeOptions>,

    /// Ring buffer size, only used by buffered modes.
    #[default(DEFAULT_BUFFER_CAPACITY)]
    pub buffer_capacity: u64,

    pub write_buffer_mode: BufferMode,

    pub read_buffer_mode: BufferMode,

    /// Falls back to the roll cycle's default when absent.
    pub index_count: Option<u32>,

    /// Falls back to the roll cycle's default when absent.
    pub index_spacing: Option<u32>,

    pub read_only: bool,

    pub strong_appenders: bool,
}

impl QueueOptions {
    /// Parses options from JSON, rejecting a missing `path`, unknown keys,
    /// unknown enum names and unusable roll times.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json).context(InvalidOptionsSnafu)?;
        options.required_path()?;
        if let Some(roll_time) = &options.roll_time {
            roll_time.resolve()?;
        }
        Ok(options)
    }

    /// The configured base path.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::MissingOption`](crate::QueueError::MissingOption)
    /// when no path was given.
    pub fn required_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .context(MissingOptionSnafu { field: "path" })
    }
}
