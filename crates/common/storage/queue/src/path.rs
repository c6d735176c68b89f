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
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use snafu::{OptionExt, ResultExt, ensure};

use crate::{
    Result, RollCycle,
    error::{
        CycleOutOfRangeSnafu, NotADirectorySnafu, PathNotFoundSnafu, PathNotReadableSnafu,
        PathNotWritableSnafu,
    },
};

static WRITE_CHECK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Extension of per-cycle store files.
pub const STORE_FILE_EXTENSION: &str = "cq4";

/// Generates a store file name: `<formatted cycle>.cq4`, e.g.
/// `20260114.cq4` for a daily cycle.
pub fn store_file_name(roll_cycle: RollCycle, cycle: i64) -> Result<String> {
    let name = roll_cycle
        .format_cycle(cycle)
        .context(CycleOutOfRangeSnafu { cycle, roll_cycle })?;
    Ok(format!("{name}.{STORE_FILE_EXTENSION}"))
}

/// Returns full path to the store file of `cycle`: `base/<name>.cq4`.
pub fn store_file_path<P: AsRef<Path>>(base: P, roll_cycle: RollCycle, cycle: i64) -> Result<PathBuf> {
    Ok(base.as_ref().join(store_file_name(roll_cycle, cycle)?))
}

/// Checks that `base` can host a queue in the requested access mode.
///
/// Read-only queues need an existing, listable directory. Writable queues
/// get the directory created on demand and must accept a new file.
pub(crate) fn ensure_base_dir(base: &Path, read_only: bool) -> Result<()> {
    if read_only {
        let metadata = match fs::metadata(base) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return PathNotFoundSnafu { path: base }.fail();
            }
            Err(e) => return Err(e).context(PathNotReadableSnafu { path: base }),
        };
        ensure!(metadata.is_dir(), NotADirectorySnafu { path: base });
        fs::read_dir(base).context(PathNotReadableSnafu { path: base })?;
        return Ok(());
    }

    ensure!(!base.exists() || base.is_dir(), NotADirectorySnafu { path: base });
    fs::create_dir_all(base).context(PathNotWritableSnafu { path: base })?;

    let seq = WRITE_CHECK_SEQ.fetch_add(1, Ordering::Relaxed);
    let check_file = base.join(format!(".write-check-{}-{seq}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&check_file)
        .context(PathNotWritableSnafu { path: base })?;
    fs::remove_file(&check_file).context(PathNotWritableSnafu { path: base })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_store_file_name() {
        assert_eq!(store_file_name(RollCycle::Daily, 20467).unwrap(), "20260114.cq4");
        assert_eq!(
            store_file_name(RollCycle::Hourly, 491_220).unwrap(),
            "20260114-12.cq4"
        );
    }

    #[test]
    fn test_store_file_name_out_of_range() {
        let err = store_file_name(RollCycle::Daily, i64::MIN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_full_path() {
        let path = store_file_path("/queue", RollCycle::Daily, 20467).unwrap();
        assert_eq!(path, PathBuf::from("/queue/20260114.cq4"));
    }

    #[test]
    fn test_writable_dir_is_created() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path().join("a").join("b");

        ensure_base_dir(&base, false).unwrap();
        assert!(base.is_dir());
        assert_eq!(fs::read_dir(&base).unwrap().count(), 0, "write check file must be removed");
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        fs::File::create(&file).unwrap();

        let err = ensure_base_dir(&file, false).unwrap_err();
        assert!(matches!(err, crate::QueueError::NotADirectory { .. }));

        let err = ensure_base_dir(&file, true).unwrap_err();
        assert!(matches!(err, crate::QueueError::NotADirectory { .. }));
    }

    #[test]
    fn test_read_only_requires_existing_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let err = ensure_base_dir(&missing, true).unwrap_err();
        assert!(matches!(err, crate::QueueError::PathNotFound { .. }));
        assert!(!missing.exists(), "read-only check must not create the directory");

        ensure_base_dir(temp_dir.path(), true).unwrap();
    }

    #[test]
    fn test_concurrent_checks_on_same_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let base = base.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        ensure_base_dir(&base, false).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fs::read_dir(&base).unwrap().count(), 0);
    }
}
