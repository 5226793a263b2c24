//! Commit ranges and lazy commit iteration.

use git2::Oid;

use crate::error::Result;

/// A range of commits reachable from `start`,
/// optionally excluding everything reachable from `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRange {
    /// Commit the walk starts at (inclusive).
    pub start: Oid,
    /// Commit whose history is excluded from the walk.
    pub stop: Option<Oid>,
}

impl CommitRange {
    /// Range of all commits reachable from `start`.
    #[must_use]
    pub const fn starting_at(start: Oid) -> Self {
        Self { start, stop: None }
    }

    /// Exclude commits reachable from `stop`.
    #[must_use]
    pub const fn excluding(mut self, stop: Oid) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// A forward-only sequence of commit IDs produced on demand.
///
/// Walks can be long, and callers often stop at the first interesting
/// commit, so nothing is collected up front.
pub struct Commits<'a> {
    inner: Box<dyn Iterator<Item = Result<Oid>> + 'a>,
}

impl<'a> Commits<'a> {
    /// Wrap an iterator of commit IDs.
    pub fn new(iter: impl Iterator<Item = Result<Oid>> + 'a) -> Self {
        Self {
            inner: Box::new(iter),
        }
    }
}

impl Iterator for Commits<'_> {
    type Item = Result<Oid>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl std::fmt::Debug for Commits<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commits").finish_non_exhaustive()
    }
}

/// A local branch and the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBranch {
    /// Short branch name, e.g. `feature/auth`.
    pub name: String,
    /// Commit at the tip of the branch.
    pub head: Oid,
}

/// Abbreviate a commit ID for display.
#[must_use]
pub fn short(oid: Oid) -> String {
    let mut s = oid.to_string();
    s.truncate(8);
    s
}
