//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts the commit-graph
//! queries and branch mutations the stack engine needs,
//! enabling dependency injection and testability.

use git2::Oid;

use crate::{Commits, CommitRange, LocalBranch, RebaseRequest, Result};

/// Trait for git repository operations.
///
/// This trait abstracts git operations, allowing for:
/// - Dependency injection in the stack service
/// - Mock implementations for testing
/// - Alternative implementations (e.g., dry-run mode)
///
/// Git operations are synchronous since git2 is a synchronous library.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the current branch name.
    ///
    /// Returns an error if HEAD is detached or not on a branch.
    fn current_branch(&self) -> Result<String>;

    /// Check if a local branch exists.
    fn branch_exists(&self, name: &str) -> bool;

    // === Commit Graph Queries ===

    /// Resolve a branch name or other revision to a commit.
    ///
    /// Fails with a not-found error (see [`crate::Error::is_not_found`])
    /// if the revision does not exist.
    fn peel_to_commit(&self, rev: &str) -> Result<Oid>;

    /// Report whether `ancestor` is reachable from `descendant`.
    ///
    /// A commit is considered its own ancestor.
    /// Lookup failures are reported as `false`.
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> bool;

    /// Find the merge base of two revisions.
    fn merge_base(&self, one: &str, two: &str) -> Result<Oid>;

    /// Find the commit at which `branch` forked from `base`,
    /// taking the reflog of `base` into account.
    fn fork_point(&self, base: &str, branch: &str) -> Result<Oid>;

    /// Lazily list the commits in the given range, newest first.
    fn list_commits(&self, range: &CommitRange) -> Result<Commits<'_>>;

    /// List all local branches with the commits they point to.
    fn local_branches(&self) -> Result<Vec<LocalBranch>>;

    // === Mutations ===

    /// Rebase a branch.
    ///
    /// Returns [`crate::Error::RebaseInterrupted`] if the rebase stopped
    /// and must be resolved by the user before it can continue.
    fn rebase(&self, req: &RebaseRequest) -> Result<()>;

    /// Check out a local branch.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Rename a local branch. Fails if `new` already exists.
    fn rename_branch(&self, old: &str, new: &str) -> Result<()>;

    /// Delete a local branch.
    fn delete_branch(&self, name: &str) -> Result<()>;
}
