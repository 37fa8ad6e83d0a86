// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    counter, file,
    sync::{RawRwLock, Semaphore},
    token, Error, Fragment, Identifier, Result, StopSignal,
};
use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
    time::{Duration, Instant},
};

/// Interval between probes of the `.locked` sentinel.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Probe budget before a held sentinel times the acquisition out (~900 ms).
const LOCK_ATTEMPTS: u32 = 30;

/// Interval between minting rounds in [`LockManager::new_identifier`].
const MINT_POLL_INTERVAL: Duration = Duration::from_millis(33);

/// Collision budget for the random generator.
const GENERATOR_BUDGET: usize = 17;

/// Fragment length used when minting falls back to the random engine.
const FALLBACK_FRAGMENT_LEN: usize = 6;

/// Timeout for fallback random minting.
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Rendered forms must exceed this length to leave the minting loop.
const MIN_RENDERED_LEN: usize = 6;

/// Rendered-length window accepted by the database rescan.
const SCAN_RENDERED_LEN: std::ops::RangeInclusive<usize> = 6..=29;

struct LockEntry {
    rwlock: RawRwLock,
    semaphore: Semaphore,
}

impl LockEntry {
    fn new(capacity: usize) -> Self {
        Self {
            rwlock: RawRwLock::new(),
            semaphore: Semaphore::new(capacity),
        }
    }
}

/// Coordinates readers and writers of one database root.
///
/// Every identifier gets a lazily created pair of a detached read/write
/// lock and a counting semaphore; the pair never leaves the manager.
/// On-disk state (the `.locked` sentinel) makes a held lock observable to
/// other processes and lets it survive restarts.
pub struct LockManager {
    root: PathBuf,
    entries: RwLock<FxHashMap<String, Arc<LockEntry>>>,

    // Serializes the .lastid read-modify-write across threads; the file
    // itself carries no cross-process protection.
    counter_lock: Mutex<()>,

    stop: StopSignal,
}

impl LockManager {
    pub(crate) fn new(root: impl Into<PathBuf>, stop: StopSignal) -> Self {
        Self {
            root: crate::path::absolute_path(root.into()),
            entries: RwLock::new(FxHashMap::default()),
            counter_lock: Mutex::new(()),
            stop,
        }
    }

    /// The database root this manager coordinates.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute directory of an identifier under this root.
    #[must_use]
    pub fn directory(&self, identifier: &Identifier) -> PathBuf {
        self.root.join(identifier.path())
    }

    /// Number of registered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock is poisoned").len()
    }

    /// Whether no identifiers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the identifier is registered (input is canonicalized first).
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        Identifier::parse(identifier)
            .is_ok_and(|id| self.entry(&id.to_string()).is_some())
    }

    fn entry(&self, rendered: &str) -> Option<Arc<LockEntry>> {
        self.entries
            .read()
            .expect("lock is poisoned")
            .get(rendered)
            .cloned()
    }

    fn ensure_entry(&self, identifier: &Identifier) -> Arc<LockEntry> {
        let rendered = identifier.to_string();

        if let Some(entry) = self.entry(&rendered) {
            return entry;
        }

        // capacity comes from the .sema sentinel when present and positive
        let capacity = file::read_integer(
            &self.directory(identifier).join(file::SEMAPHORE_FILE),
        )
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0)
        .unwrap_or(1);

        let mut entries = self.entries.write().expect("lock is poisoned");
        entries
            .entry(rendered)
            .or_insert_with(|| Arc::new(LockEntry::new(capacity)))
            .clone()
    }

    /// Registers the identifier's lock pair, creating it if absent.
    ///
    /// Idempotent; the semaphore capacity is taken from the `.sema`
    /// sentinel when present, else 1.
    ///
    /// # Errors
    ///
    /// Fails if the identifier does not parse.
    pub fn ensure_identifier(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        self.ensure_entry(&id);
        Ok(())
    }

    /// Registers the identifier and ensures its directory exists.
    ///
    /// # Errors
    ///
    /// Fails on a malformed identifier or when the directory cannot be
    /// created.
    pub fn ensure_identifier_directory(
        &self,
        identifier: &str,
    ) -> Result<(Identifier, PathBuf)> {
        let id = Identifier::parse(identifier)?;
        self.ensure_entry(&id);

        let dir = self.directory(&id);
        file::create_dir_all(&dir)?;

        Ok((id, dir))
    }

    /// Sizes the identifier's semaphore and records the capacity in `.sema`.
    ///
    /// The input must already be canonical. A capacity of 0 is promoted
    /// to 1. An already-created semaphore keeps its capacity; only the
    /// sentinel is updated.
    ///
    /// # Errors
    ///
    /// `Parse` on malformed or non-canonical input, `Io` when the sentinel
    /// cannot be written.
    pub fn set_capacity(&self, identifier: &str, limit: usize) -> Result<()> {
        let id = Identifier::parse(identifier)?;

        if id.to_string() != identifier {
            return Err(Error::Parse(identifier.to_string()));
        }

        let limit = limit.max(1);

        let dir = self.directory(&id);
        file::create_dir_all(&dir)?;
        file::write_integer(&dir.join(file::SEMAPHORE_FILE), limit as u64)?;

        self.ensure_entry(&id);
        Ok(())
    }

    /// Takes the identifier's lock: waits for the `.locked` sentinel to
    /// clear, acquires a semaphore permit and the exclusive lock, then
    /// writes the acquisition timestamp to `.locked`.
    ///
    /// # Errors
    ///
    /// `LockTimeout` when the sentinel stays held past the polling budget,
    /// `Cancelled` when the registry's stop signal fires, `Io` when the
    /// sentinel cannot be written.
    pub fn lock_identifier(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        let rendered = id.to_string();
        let entry = self.ensure_entry(&id);
        let lock_path = self.directory(&id).join(file::LOCK_FILE);

        let mut attempts = 0u32;

        loop {
            if self.stop.is_stopped() {
                return Err(Error::Cancelled);
            }

            // probe failures count as a released sentinel
            match file::read_integer(&lock_path) {
                Ok(value) if value > 0 => {
                    attempts += 1;

                    if attempts > LOCK_ATTEMPTS {
                        return Err(Error::LockTimeout(rendered));
                    }

                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                _ => break,
            }
        }

        entry.semaphore.acquire();
        entry.rwlock.lock_exclusive();

        if let Err(e) = file::write_timestamp(&lock_path) {
            entry.rwlock.unlock_exclusive();
            entry.semaphore.release();
            return Err(e.into());
        }

        log::trace!("locked {rendered}");
        Ok(())
    }

    /// Releases the identifier's lock and removes the `.locked` sentinel.
    ///
    /// Releases are unconditional; callers must pair this with a matching
    /// [`LockManager::lock_identifier`].
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier was never registered, `Io`
    /// when the sentinel cannot be removed.
    pub fn unlock_identifier(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        let rendered = id.to_string();

        let entry = self
            .entry(&rendered)
            .ok_or_else(|| Error::UnknownIdentifier(rendered.clone()))?;

        match std::fs::remove_file(self.directory(&id).join(file::LOCK_FILE)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        entry.rwlock.unlock_exclusive();
        entry.semaphore.release();

        log::trace!("unlocked {rendered}");
        Ok(())
    }

    /// Takes a semaphore permit for the identifier.
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier was never registered.
    pub fn acquire(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        let rendered = id.to_string();

        self.entry(&rendered)
            .ok_or(Error::UnknownIdentifier(rendered))?
            .semaphore
            .acquire();

        Ok(())
    }

    /// Returns a semaphore permit for the identifier.
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier was never registered.
    pub fn release(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        let rendered = id.to_string();

        self.entry(&rendered)
            .ok_or(Error::UnknownIdentifier(rendered))?
            .semaphore
            .release();

        Ok(())
    }

    /// Cycles the identifier's semaphore and read lock to verify both are
    /// functional after registration.
    pub(crate) fn flush_identifier(&self, identifier: &str) -> Result<()> {
        let id = Identifier::parse(identifier)?;
        let rendered = id.to_string();

        let entry = self
            .entry(&rendered)
            .ok_or(Error::UnknownIdentifier(rendered))?;

        entry.semaphore.acquire();
        entry.rwlock.lock_shared();
        entry.rwlock.unlock_shared();
        entry.semaphore.release();

        Ok(())
    }

    /// Writes a record file under the identifier's directory while holding
    /// its lock.
    ///
    /// # Errors
    ///
    /// Propagates locking errors and I/O errors from the write.
    pub fn write_record(&self, identifier: &str, name: &str, contents: &[u8]) -> Result<()> {
        self.lock_identifier(identifier)?;

        let result = self
            .ensure_identifier_directory(identifier)
            .and_then(|(_, dir)| Ok(file::write_file(&dir.join(name), contents)?));

        self.unlock_identifier(identifier)?;
        result
    }

    /// Reads a record file under the identifier's directory while holding
    /// a semaphore permit and the shared lock.
    ///
    /// # Errors
    ///
    /// Fails on a malformed identifier or when the file cannot be read.
    pub fn read_record(&self, identifier: &str, name: &str) -> Result<Vec<u8>> {
        let id = Identifier::parse(identifier)?;
        let entry = self.ensure_entry(&id);
        let path = self.directory(&id).join(name);

        entry.semaphore.acquire();
        entry.rwlock.lock_shared();

        let result = std::fs::read(&path);

        entry.rwlock.unlock_shared();
        entry.semaphore.release();

        Ok(result?)
    }

    /// Writes the `.identifier` identity sentinel into the identifier's
    /// directory.
    ///
    /// # Errors
    ///
    /// Fails on a malformed identifier or when the sentinel cannot be
    /// written.
    pub fn write_identity(&self, identifier: &str) -> Result<()> {
        let (id, dir) = self.ensure_identifier_directory(identifier)?;

        file::write_file(
            &dir.join(file::IDENTIFIER_FILE),
            id.to_string().as_bytes(),
        )?;

        Ok(())
    }

    /// Marks this database as countable, seeding the counter at 1.
    ///
    /// # Errors
    ///
    /// Fails when the root or counter file cannot be written.
    pub fn create_countable(&self) -> Result<()> {
        counter::create(&self.root)
    }

    /// Whether this database carries a readable counter.
    #[must_use]
    pub fn is_countable(&self) -> bool {
        counter::is_countable(&self.root)
    }

    /// The identifier of the last issued counter value.
    ///
    /// # Errors
    ///
    /// `NoCounter` when `.lastid` is missing, `Io`/`Parse` when it cannot
    /// be read.
    pub fn last_id(&self) -> Result<Identifier> {
        counter::last_id(&self.root)
    }

    /// Mints the next monotonic identifier.
    ///
    /// Bumps the counter, creates the identifier's directory, briefly takes
    /// its lock to write the `.identifier` sentinel, and returns it
    /// unlocked. Databases without a counter, unreadable counters, and
    /// lock failures fall back to the random engine.
    ///
    /// # Errors
    ///
    /// Propagates counter-write, directory, and fallback-minting errors.
    pub fn next_id(&self) -> Result<Identifier> {
        if !self.is_countable() {
            return self.new_identifier(
                FALLBACK_FRAGMENT_LEN,
                GENERATOR_BUDGET,
                FALLBACK_TIMEOUT,
            );
        }

        let minted = {
            let _guard = self.counter_lock.lock().expect("lock is poisoned");

            match counter::read(&self.root) {
                Ok(value) => {
                    counter::write(&self.root, value + 1)?;
                    Some(value + 1)
                }
                Err(e) => {
                    log::warn!(
                        "counter at {} is unreadable ({e:?}), falling back to random minting",
                        self.root.display(),
                    );
                    None
                }
            }
        };

        let Some(minted) = minted else {
            return self.new_identifier(
                FALLBACK_FRAGMENT_LEN,
                GENERATOR_BUDGET,
                FALLBACK_TIMEOUT,
            );
        };

        let id = Fragment::from_integer(minted).to_identifier()?;
        let rendered = id.to_string();

        file::create_dir_all(&self.directory(&id))?;

        if let Err(e) = self.lock_identifier(&rendered) {
            log::warn!("could not lock freshly minted {rendered} ({e:?}), falling back to random minting");
            return self.new_identifier(
                FALLBACK_FRAGMENT_LEN,
                GENERATOR_BUDGET,
                FALLBACK_TIMEOUT,
            );
        }

        let written = self.write_identity(&rendered);
        self.unlock_identifier(&rendered)?;
        written?;

        log::debug!("minted {rendered} from counter value {minted}");
        Ok(id)
    }

    /// Mints a random identifier, using directory existence as the
    /// uniqueness oracle.
    ///
    /// On success the directory exists (mode 0700) and the identifier is
    /// registered with a unit-capacity semaphore recorded in `.sema`.
    ///
    /// # Errors
    ///
    /// Token errors from [`crate::new_token`], `UniqueCollision` once the
    /// attempt budget is spent, `Io` when the directory cannot be created.
    pub fn generate_identifier(&self, length: usize, attempts: usize) -> Result<Identifier> {
        let mut attempts = attempts;

        loop {
            let candidate = token::new_token(length, attempts)?;
            let dir = self.directory(&candidate);

            if file::path_exists(&dir) {
                log::debug!("identifier already exists at {}, retrying", dir.display());
                attempts += 1;

                if attempts > GENERATOR_BUDGET {
                    return Err(Error::UniqueCollision);
                }

                continue;
            }

            file::create_dir_all(&dir)?;
            self.set_capacity(&candidate.to_string(), 1)?;

            return Ok(candidate);
        }
    }

    /// Repeatedly mints random identifiers until one of acceptable length
    /// is found or the deadline passes.
    ///
    /// # Errors
    ///
    /// `Timeout` on deadline expiry, `Cancelled` when the stop signal
    /// fires; generator errors are returned immediately.
    pub fn new_identifier(
        &self,
        length: usize,
        attempts: usize,
        timeout: Duration,
    ) -> Result<Identifier> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.stop.is_stopped() {
                return Err(Error::Cancelled);
            }

            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }

            std::thread::sleep(MINT_POLL_INTERVAL);

            let id = self.generate_identifier(length, attempts)?;

            if id.to_string().chars().count() > MIN_RENDERED_LEN {
                return Ok(id);
            }
        }
    }

    /// Rebuilds the in-memory state from the directory tree.
    ///
    /// Every directory whose separator-stripped relative path parses as an
    /// identifier of rendered length 6..=29 gets a fresh lock pair with a
    /// unit-capacity semaphore. Dot-directories and invalid names are
    /// skipped. Existing `.locked` sentinels are not honored here; callers
    /// that need that must follow up with explicit lock recovery.
    ///
    /// # Errors
    ///
    /// `Io` when the tree cannot be walked.
    pub fn load_database(&self) -> Result<()> {
        self.walk_directory(&self.root)
    }

    fn walk_directory(&self, dir: &Path) -> Result<()> {
        for dir_entry in std::fs::read_dir(dir)? {
            let dir_entry = dir_entry?;

            if !dir_entry.file_type()?.is_dir() {
                continue;
            }

            let path = dir_entry.path();
            self.register_scanned(&path);
            self.walk_directory(&path)?;
        }

        Ok(())
    }

    fn register_scanned(&self, path: &Path) {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return;
        };

        // skips dot directories like .git
        if rel.to_string_lossy().contains('.') {
            return;
        }

        let candidate: String = rel
            .iter()
            .filter_map(|component| component.to_str())
            .collect();

        if !SCAN_RENDERED_LEN.contains(&candidate.chars().count()) {
            return;
        }

        match Identifier::parse(&candidate) {
            Ok(id) => {
                let mut entries = self.entries.write().expect("lock is poisoned");
                entries.insert(id.to_string(), Arc::new(LockEntry::new(1)));
            }
            Err(e) => {
                log::debug!(
                    "skipping non-identifier directory {}: {e:?}",
                    path.display(),
                );
            }
        }
    }
}
