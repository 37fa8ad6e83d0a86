// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Sentinel file names, modes, and low-level file I/O.

use crate::{Error, Result};
use std::{
    io::Write,
    path::Path,
    time::Duration,
};

/// Counter file marking a database as countable; holds the last issued value.
pub const LAST_ID_FILE: &str = ".lastid";

/// Lock sentinel; holds the UNIX-seconds timestamp at which the lock was taken.
pub const LOCK_FILE: &str = ".locked";

/// Optional semaphore capacity override for an identifier directory.
pub const SEMAPHORE_FILE: &str = ".sema";

/// Identity sentinel; holds the rendered identifier of the enclosing directory.
pub const IDENTIFIER_FILE: &str = ".identifier";

/// Mode for identifier directories.
pub const DIR_MODE: u32 = 0o700;

/// Mode for sentinel and record files.
pub const FILE_MODE: u32 = 0o600;

/// Recursively creates a directory with [`DIR_MODE`].
pub fn create_dir_all(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(DIR_MODE)
            .create(path)
    }

    #[cfg(not(unix))]
    std::fs::create_dir_all(path)
}

/// Whether the path exists (probe failures count as absent).
#[must_use]
pub fn path_exists(path: &Path) -> bool {
    matches!(path.try_exists(), Ok(true))
}

/// Writes a file with [`FILE_MODE`], truncating any previous contents.
pub fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Reads a file holding a UTF-8 decimal integer.
///
/// # Errors
///
/// `Io` if the file cannot be read, `Parse` if the contents are not a
/// decimal integer.
pub fn read_integer(path: &Path) -> Result<u64> {
    let contents = std::fs::read_to_string(path)?;

    contents
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Parse(contents.trim().to_string()))
}

/// Writes a UTF-8 decimal integer with [`FILE_MODE`].
pub fn write_integer(path: &Path, value: u64) -> std::io::Result<()> {
    write_file(path, value.to_string().as_bytes())
}

/// Writes the current UNIX timestamp (seconds, UTC) with [`FILE_MODE`].
pub fn write_timestamp(path: &Path) -> std::io::Result<()> {
    write_integer(path, crate::time::unix_timestamp().as_secs())
}

/// Reads a UNIX-seconds timestamp file.
///
/// # Errors
///
/// Same as [`read_integer`].
pub fn read_timestamp(path: &Path) -> Result<Duration> {
    read_integer(path).map(Duration::from_secs)
}

/// Atomically rewrites a file.
pub fn rewrite_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let folder = path
        .parent()
        .ok_or_else(|| std::io::Error::other("path should have a parent directory"))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path)?;

    // TODO: not sure why it fails on Windows...
    #[cfg(not(target_os = "windows"))]
    {
        let file = std::fs::File::open(folder)?;
        debug_assert!(file.metadata()?.is_dir());
        file.sync_all()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn atomic_rewrite() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("test.txt");
        write_file(&path, b"asdasdasdasdasd")?;

        rewrite_atomic(&path, b"newcontent")?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!("newcontent", content);

        Ok(())
    }

    #[test]
    fn integer_round_trip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join(LAST_ID_FILE);
        write_integer(&path, 42)?;
        assert_eq!(42, read_integer(&path)?);

        Ok(())
    }

    #[test]
    fn integer_rejects_garbage() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join(LAST_ID_FILE);
        write_file(&path, b"not a number")?;
        assert!(matches!(read_integer(&path), Err(Error::Parse(_))));

        Ok(())
    }

    #[test]
    fn missing_file_is_io() {
        let result = read_integer(Path::new("/nonexistent/definitely/.lastid"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn sentinel_modes() -> crate::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;

        let folder = dir.path().join("2026/A/B");
        create_dir_all(&folder)?;
        assert_eq!(
            DIR_MODE,
            std::fs::metadata(&folder)?.permissions().mode() & 0o777,
        );

        let sentinel = folder.join(LOCK_FILE);
        write_timestamp(&sentinel)?;
        assert_eq!(
            FILE_MODE,
            std::fs::metadata(&sentinel)?.permissions().mode() & 0o777,
        );

        Ok(())
    }
}
