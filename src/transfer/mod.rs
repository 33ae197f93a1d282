//! The path materialization and idempotent transfer engine.
//!
//! This module carries the system's real invariants:
//!
//! - at most one remote folder creation per distinct (parent, name) observed
//!   during a run — the [`cache::DirectoryCache`] is consulted before any
//!   lookup, and the lookup before any creation;
//! - a file is created remotely at most once per (name, parent) per run —
//!   [`uploader::execute`] always checks existence first;
//! - directory segments materialize strictly left-to-right — segment *i*'s
//!   resolved id becomes the parent for segment *i+1*.
//!
//! Orchestration is single-threaded and sequential. The cache is plain
//! mutable state owned by one orchestrator run; concurrent materialization
//! calls are out of contract.

/// Per-run (parent, name) → folder id memoization
pub mod cache;

/// Path splitting and remote directory materialization
pub mod resolver;

/// Dedup upload executor and transfer records
pub mod uploader;

/// Directory upload orchestration and compression selection
pub mod orchestrator;
