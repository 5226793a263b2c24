//! Error types for strata-core.

use std::path::PathBuf;

use strata_git::{Oid, short};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn abbrev(oid: &Oid) -> String {
    short(*oid)
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in strata-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The .git/strata directory doesn't exist (not initialized).
    #[error("strata not initialized in this repository - run `strata init` first")]
    NotInitialized,

    /// Branch exists but is not tracked.
    #[error("branch '{0}' is not tracked")]
    NotTracked(String),

    /// Branch is tracked but its ref was deleted without going through strata.
    #[error("tracked branch '{name}' was deleted out of band")]
    DeletedOutOfBand {
        /// Name of the deleted branch.
        name: String,
        /// Base it was tracked with.
        base: String,
        /// Last known commit of that base.
        base_hash: Oid,
    },

    /// A stack could not be flattened into a single chain.
    #[error("{branch} has {} branches above it", .aboves.len())]
    NonLinearStack {
        /// Branch with more than one child.
        branch: String,
        /// Its children.
        aboves: Vec<String>,
    },

    /// Target branch name is already taken.
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// Operation is not allowed on the trunk branch.
    #[error("operation not allowed on trunk")]
    Trunk,

    /// Base of a tracked branch no longer resolves.
    #[error("base branch '{base}' of '{branch}' does not exist")]
    BaseNotFound {
        /// Branch whose base is missing.
        branch: String,
        /// The missing base.
        base: String,
    },

    /// Base of a branch must be trunk or another tracked branch.
    #[error("base branch '{0}' is not tracked")]
    BaseNotTracked(String),

    /// A new branch was staged without a base.
    #[error("new branch '{0}' must have a base")]
    MissingBase(String),

    /// An operation was handed an empty branch name.
    #[error("branch name is required")]
    EmptyBranchName,

    /// Trunk does not exist as a local branch.
    #[error("trunk branch '{0}' does not exist")]
    TrunkMissing(String),

    /// Changing a base would make the branch graph cyclic.
    #[error("branch cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// A branch cannot be removed while others are based on it.
    #[error("branch '{branch}' is needed by {}", .aboves.join(", "))]
    BranchNeeded {
        /// Branch that was to be removed.
        branch: String,
        /// Branches based on it.
        aboves: Vec<String>,
    },

    /// Several branches point at a commit and none can be picked automatically.
    #[error("{branch}: multiple branches found at commit {}: {}", abbrev(.commit), .candidates.join(", "))]
    AmbiguousBase {
        /// Branch looking for a base.
        branch: String,
        /// Commit the candidates point at.
        commit: Oid,
        /// Candidate base branches.
        candidates: Vec<String>,
    },

    /// The stack edit was cancelled by emptying the branch list.
    #[error("stack edit aborted")]
    StackEditAborted,

    /// The edited stack contains names that were not offered.
    #[error("invalid stack edit: {0}")]
    InvalidStackEdit(String),

    /// State file parsing error.
    #[error("failed to parse {file}: {message}")]
    StateParseError { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error(transparent)]
    Git(#[from] strata_git::Error),

    /// Forge metadata error.
    #[error("forge error: {0}")]
    Forge(#[from] strata_forge::Error),
}

impl Error {
    /// Whether this error means the branch does not exist in git.
    #[must_use]
    pub const fn is_branch_missing(&self) -> bool {
        matches!(self, Self::Git(e) if e.is_not_found())
    }

    /// The interruption details, if a rebase stopped midway.
    #[must_use]
    pub const fn rebase_interrupt(&self) -> Option<&strata_git::RebaseInterrupt> {
        match self {
            Self::Git(e) => e.rebase_interrupt(),
            _ => None,
        }
    }
}
