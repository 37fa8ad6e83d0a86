// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{file, Error, Fragment, Identifier, Result};
use std::path::Path;

/// Marks `root` as a countable database by seeding `.lastid` with `"1"`.
///
/// Not idempotent: calling twice rewinds the counter.
pub(crate) fn create(root: &Path) -> Result<()> {
    file::create_dir_all(root)?;
    file::write_file(&root.join(file::LAST_ID_FILE), b"1")?;
    Ok(())
}

/// Reads the last issued counter value.
pub(crate) fn read(root: &Path) -> Result<u64> {
    let path = root.join(file::LAST_ID_FILE);

    if !file::path_exists(&path) {
        return Err(Error::NoCounter);
    }

    file::read_integer(&path)
}

/// Persists a counter value using an atomic replace, so a torn write can
/// never rewind the counter.
pub(crate) fn write(root: &Path, value: u64) -> std::io::Result<()> {
    file::rewrite_atomic(&root.join(file::LAST_ID_FILE), value.to_string().as_bytes())
}

/// The identifier corresponding to the last issued counter value, using
/// the current year.
pub(crate) fn last_id(root: &Path) -> Result<Identifier> {
    Fragment::from_integer(read(root)?).to_identifier()
}

/// Whether `root` holds a readable counter.
pub(crate) fn is_countable(root: &Path) -> bool {
    last_id(root).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn fresh_database_counts_from_one() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        assert!(!is_countable(dir.path()));
        assert!(matches!(read(dir.path()), Err(Error::NoCounter)));

        create(dir.path())?;

        assert!(is_countable(dir.path()));
        assert_eq!(1, read(dir.path())?);
        assert_eq!("000001", last_id(dir.path())?.fragment().as_str());

        Ok(())
    }

    #[test]
    fn write_replaces_the_value() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        create(dir.path())?;
        write(dir.path(), 99)?;

        assert_eq!(99, read(dir.path())?);
        Ok(())
    }

    #[test]
    fn create_is_not_idempotent() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        create(dir.path())?;
        write(dir.path(), 17)?;
        create(dir.path())?;

        assert_eq!(1, read(dir.path())?);
        Ok(())
    }

    #[test]
    fn garbage_counter_is_a_parse_error() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        file::write_file(&dir.path().join(file::LAST_ID_FILE), b"banana")?;
        assert!(matches!(read(dir.path()), Err(Error::Parse(_))));
        assert!(!is_countable(dir.path()));

        Ok(())
    }
}
