// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    manager::LockManager, sync::Semaphore, Error, Identifier, Result, StopSignal,
};
use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::Duration,
};

/// Maximum number of database rescans running at once.
const SCAN_LIMIT: usize = 3;

/// Attempt budget handed to the random engine by [`Registry::new_id`].
const MINT_ATTEMPTS: usize = 17;

/// Deadline handed to the random engine by [`Registry::new_id`].
const MINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns one [`LockManager`] per database root.
///
/// Managers are created lazily on first reference and never evicted. All
/// blocking loops below the registry honor the stop signal it was
/// constructed with.
pub struct Registry {
    databases: RwLock<FxHashMap<PathBuf, Arc<LockManager>>>,
    stop: StopSignal,
    scan_limit: usize,
}

impl Registry {
    /// Creates a registry seeded with a manager for `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_stop_signal(root, StopSignal::default())
    }

    /// Creates a registry whose polling loops honor `stop`.
    #[must_use]
    pub fn with_stop_signal(root: impl AsRef<Path>, stop: StopSignal) -> Self {
        let root = crate::path::absolute_path(root);

        let mut databases = FxHashMap::default();
        databases.insert(
            root.clone(),
            Arc::new(LockManager::new(root, stop.clone())),
        );

        Self {
            databases: RwLock::new(databases),
            stop,
            scan_limit: SCAN_LIMIT,
        }
    }

    /// A handle to the registry's cancellation signal.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// The manager for `root`, created on first use.
    #[must_use]
    pub fn database(&self, root: impl AsRef<Path>) -> Arc<LockManager> {
        let root = crate::path::absolute_path(root);

        {
            let databases = self.databases.read().expect("lock is poisoned");

            if let Some(manager) = databases.get(&root) {
                return manager.clone();
            }
        }

        let mut databases = self.databases.write().expect("lock is poisoned");
        databases
            .entry(root.clone())
            .or_insert_with(|| Arc::new(LockManager::new(root, self.stop.clone())))
            .clone()
    }

    /// Registers an identifier in `root`'s manager with a unit-capacity
    /// semaphore recorded in `.sema`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed identifier or when the sentinel cannot be
    /// written.
    pub fn register(&self, root: impl AsRef<Path>, identifier: &str) -> Result<Arc<LockManager>> {
        let id = Identifier::parse(identifier)?;

        let manager = self.database(root);
        manager.set_capacity(&id.to_string(), 1)?;

        Ok(manager)
    }

    /// Locks an already-registered identifier.
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier is not registered;
    /// otherwise as [`LockManager::lock_identifier`].
    pub fn lock(&self, root: impl AsRef<Path>, identifier: &str) -> Result<()> {
        let manager = self.database(root);

        if !manager.contains(identifier) {
            return Err(Error::UnknownIdentifier(identifier.to_string()));
        }

        manager.lock_identifier(identifier)
    }

    /// Unlocks an already-registered identifier.
    ///
    /// # Errors
    ///
    /// As [`LockManager::unlock_identifier`].
    pub fn unlock(&self, root: impl AsRef<Path>, identifier: &str) -> Result<()> {
        self.database(root).unlock_identifier(identifier)
    }

    /// Takes a semaphore permit for an already-registered identifier.
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier is not registered.
    pub fn acquire(&self, root: impl AsRef<Path>, identifier: &str) -> Result<()> {
        self.database(root).acquire(identifier)
    }

    /// Returns a semaphore permit for an already-registered identifier.
    ///
    /// # Errors
    ///
    /// `UnknownIdentifier` when the identifier is not registered.
    pub fn release(&self, root: impl AsRef<Path>, identifier: &str) -> Result<()> {
        self.database(root).release(identifier)
    }

    /// Marks `root` as a countable database.
    ///
    /// # Errors
    ///
    /// As [`LockManager::create_countable`].
    pub fn create_countable(&self, root: impl AsRef<Path>) -> Result<()> {
        self.database(root).create_countable()
    }

    /// Whether `root` carries a readable counter.
    #[must_use]
    pub fn is_countable(&self, root: impl AsRef<Path>) -> bool {
        self.database(root).is_countable()
    }

    /// The identifier of `root`'s last issued counter value.
    ///
    /// # Errors
    ///
    /// As [`LockManager::last_id`].
    pub fn last_id(&self, root: impl AsRef<Path>) -> Result<Identifier> {
        self.database(root).last_id()
    }

    /// Mints the next monotonic identifier for `root`.
    ///
    /// # Errors
    ///
    /// As [`LockManager::next_id`].
    pub fn next_id(&self, root: impl AsRef<Path>) -> Result<Identifier> {
        self.database(root).next_id()
    }

    /// Mints a random identifier of the given fragment length for `root`,
    /// then cycles its primitives to verify registration.
    ///
    /// # Errors
    ///
    /// As [`LockManager::new_identifier`].
    pub fn new_id(&self, root: impl AsRef<Path>, length: usize) -> Result<Identifier> {
        let manager = self.database(root);

        let id = manager.new_identifier(length, MINT_ATTEMPTS, MINT_TIMEOUT)?;
        manager.flush_identifier(&id.to_string())?;

        Ok(id)
    }

    /// Rescans every database, rebuilding the in-memory state from disk.
    ///
    /// At most 3 rescans run concurrently; the registry is closed for new
    /// managers while the scan runs, so only one scan runs at a time.
    pub fn scan(&self) {
        let databases = self.databases.write().expect("lock is poisoned");
        let semaphore = Semaphore::new(self.scan_limit);

        std::thread::scope(|s| {
            for manager in databases.values() {
                semaphore.acquire();

                let manager = manager.clone();
                let semaphore = &semaphore;

                s.spawn(move || {
                    if let Err(e) = manager.load_database() {
                        log::warn!(
                            "rescan of {} failed: {e:?}",
                            manager.root().display(),
                        );
                    }

                    semaphore.release();
                });
            }
        });
    }
}
