// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A filesystem-backed identifier registry.
//!
//! ##### About
//!
//! This crate mints unique, human-readable identifiers, maps each one
//! deterministically onto a directory path, and coordinates concurrent
//! readers and writers of those directories with per-identifier mutual
//! exclusion.
//!
//! An identifier is a 4-digit year followed by 1..=29 symbols from the
//! base-36 alphabet `0-9A-Z`. Its directory is derived by slicing the
//! fragment into Fibonacci-length segments, so `2023ABCDEFG` lives at
//! `2023/A/B/CD/EFG` and large databases fan out without overloading any
//! single directory.
//!
//! Identifiers come from two engines: a monotonic counter backed by a
//! `.lastid` file ("countable" databases), and a random generator that
//! uses directory existence as its uniqueness oracle. Locks combine an
//! in-memory read/write lock, a counting semaphore (capacity per
//! identifier via `.sema`), and an on-disk `.locked` sentinel that other
//! processes can observe and that survives restarts.
//!
//! # Example usage
//!
//! ```
//! use valet::Registry;
//! #
//! # let folder = tempfile::tempdir()?;
//! # let root = folder.path();
//!
//! // A registry owns one lock manager per database root
//! let registry = Registry::new(root);
//!
//! // Seed the counter, making this database countable
//! registry.create_countable(root)?;
//!
//! // Mint the next monotonic identifier; its directory now exists
//! let id = registry.next_id(root)?;
//! assert!(root.join(id.path()).is_dir());
//!
//! // Reserve the identifier while mutating its records
//! registry.lock(root, &id.to_string())?;
//! registry.unlock(root, &id.to_string())?;
//! #
//! # Ok::<(), valet::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

pub mod base36;

mod counter;
mod error;

#[doc(hidden)]
pub mod file;

mod fragment;
mod identifier;
mod manager;
mod path;

pub mod segmenter;

mod registry;
mod stop_signal;
mod sync;
mod time;
mod token;

pub use {
    error::{Error, Result},
    fragment::Fragment,
    identifier::{Identifier, MAX_FRAGMENT_LEN},
    manager::LockManager,
    registry::Registry,
    segmenter::segment_path,
    stop_signal::StopSignal,
    token::new_token,
};
