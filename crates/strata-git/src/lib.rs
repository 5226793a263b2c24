//! # strata-git
//!
//! Git operations abstraction layer for Strata, built on git2-rs.
//! Provides the commit-graph queries and branch mutations the
//! stack engine relies on, plus rebase handling.

mod commits;
mod error;
mod rebase;
mod repository;
pub mod traits;

pub use commits::{CommitRange, Commits, LocalBranch, short};
pub use error::{Error, Result};
pub use git2::Oid;
pub use rebase::{InterruptKind, RebaseInterrupt, RebaseRequest};
pub use repository::Repository;
pub use traits::GitOps;
