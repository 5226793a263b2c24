//! Trait abstractions for branch state storage.
//!
//! This module defines the `BranchStore` trait which abstracts persistence
//! of tracked branches, enabling dependency injection and testability.

use serde::{Deserialize, Serialize};
use strata_git::Oid;

use crate::Result;
use crate::tx::BranchTx;

/// Persisted information about a tracked branch.
///
/// The branch head is deliberately absent: it always comes from git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    /// Branch this one is stacked on.
    pub base: String,

    /// Last known commit of `base`.
    pub base_hash: Oid,

    /// Name the branch was last pushed under.
    pub upstream_branch: Option<String>,

    /// Published change, if the branch was submitted to a forge.
    pub change: Option<ChangeRecord>,

    /// Branches that used to sit below this one and were merged into trunk.
    pub merged_downstack: Vec<String>,
}

impl BranchRecord {
    /// A record with only a base.
    #[must_use]
    pub fn new(base: impl Into<String>, base_hash: Oid) -> Self {
        Self {
            base: base.into(),
            base_hash,
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        }
    }
}

/// Serialized forge metadata tagged with the forge that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Forge ID, used to pick a deserializer.
    pub forge: String,
    /// Opaque forge-specific payload.
    pub metadata: serde_json::Value,
}

/// A batch of changes applied atomically by [`BranchStore::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    /// Branches to create or overwrite.
    pub sets: Vec<(String, BranchRecord)>,
    /// Branches to remove.
    pub deletes: Vec<String>,
    /// Description recorded in the state log.
    pub message: String,
}

impl UpdateRequest {
    /// Whether the request changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.deletes.is_empty()
    }
}

/// A command to re-run once an interrupted rebase is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Branch to check out before running the command.
    pub branch: String,
    /// Arguments to `strata`, without the program name.
    pub command: Vec<String>,
}

/// Trait for branch state storage.
///
/// This trait abstracts state persistence, allowing for:
/// - Dependency injection in the stack service
/// - An in-memory implementation for tests and scratch work
/// - The file-backed store under `.git/strata`
///
/// Reads are point lookups. All writes go through [`BranchStore::update`],
/// usually via a [`BranchTx`] which validates them first.
#[allow(clippy::missing_errors_doc)]
pub trait BranchStore {
    // === Branches ===

    /// Name of the trunk branch.
    fn trunk(&self) -> &str;

    /// Look up a tracked branch.
    ///
    /// Returns [`crate::Error::NotTracked`] if the branch is not tracked.
    fn lookup(&self, name: &str) -> Result<BranchRecord>;

    /// Names of all tracked branches, in no particular order.
    fn list(&self) -> Result<Vec<String>>;

    /// Apply a batch of sets and deletes atomically.
    fn update(&self, req: UpdateRequest) -> Result<()>;

    // === Rebase continuations ===

    /// Queue a command to run after the current rebase is resolved.
    fn append_continuation(&self, cont: Continuation) -> Result<()>;

    /// Remove and return the oldest queued continuation.
    fn take_continuation(&self) -> Result<Option<Continuation>>;

    /// Drop all queued continuations, returning how many there were.
    fn clear_continuations(&self) -> Result<usize>;

    // === Transactions ===

    /// Start a transaction against this store.
    fn begin(&self) -> BranchTx<'_, Self>
    where
        Self: Sized,
    {
        BranchTx::new(self)
    }
}
