//! # strata-forge
//!
//! Forge integration points for Strata.
//!
//! Branches submitted as pull or merge requests carry forge-specific
//! metadata. Each forge knows how to serialize its own metadata,
//! and a [`Registry`] picks the right forge from the ID stored alongside it.

mod error;
mod forge;
pub mod github;
pub mod gitlab;

pub use error::{Error, Result};
pub use forge::{ChangeMetadata, Forge, Registry};
pub use github::{GitHub, PullRequestMetadata};
pub use gitlab::{GitLab, MergeRequestMetadata};
