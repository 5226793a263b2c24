//! Error types for strata-git.

use crate::rebase::RebaseInterrupt;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Reference or revision could not be resolved to a commit.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Branch already exists.
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// A rebase stopped and needs the user to intervene.
    #[error("{0}")]
    RebaseInterrupted(RebaseInterrupt),

    /// Rebase failed without leaving a rebase in progress.
    #[error("rebase failed: {0}")]
    RebaseFailed(String),

    /// A `git` subprocess exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    CommandFailed {
        /// Subcommand that was run.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Could not spawn or talk to a `git` subprocess.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Whether this error means the requested branch or revision does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::BranchNotFound(_) | Self::RefNotFound(_))
    }

    /// The interruption details, if a rebase stopped midway.
    #[must_use]
    pub const fn rebase_interrupt(&self) -> Option<&RebaseInterrupt> {
        match self {
            Self::RebaseInterrupted(interrupt) => Some(interrupt),
            _ => None,
        }
    }
}
