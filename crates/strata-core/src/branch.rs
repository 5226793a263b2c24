//! Tracked branch views combining store state with live git state.

use std::sync::Arc;

use strata_forge::ChangeMetadata;
use strata_git::Oid;

/// A tracked branch as returned by [`crate::StackService::lookup_branch`].
#[derive(Debug, Clone)]
pub struct LookupBranch {
    /// Branch this one is stacked on.
    pub base: String,
    /// Last known commit of `base`. May be stale.
    pub base_hash: Oid,
    /// Current commit of the branch, read from git.
    pub head: Oid,
    /// Name the branch was last pushed under.
    pub upstream_branch: Option<String>,
    /// Published change, if the branch was submitted and the metadata is readable.
    pub change: Option<Arc<dyn ChangeMetadata>>,
    /// Merged branches that used to sit below this one.
    pub merged_downstack: Vec<String>,
}

/// A tracked branch as returned by [`crate::StackService::load_branches`].
#[derive(Debug, Clone)]
pub struct LoadBranchItem {
    /// Branch name.
    pub name: String,
    /// Current commit of the branch.
    pub head: Oid,
    /// Branch this one is stacked on.
    pub base: String,
    /// Last known commit of `base`.
    pub base_hash: Oid,
    /// Name the branch was last pushed under.
    pub upstream_branch: Option<String>,
    /// Published change, if any.
    pub change: Option<Arc<dyn ChangeMetadata>>,
    /// Merged branches that used to sit below this one.
    pub merged_downstack: Vec<String>,
}

impl LoadBranchItem {
    pub(crate) fn from_lookup(name: String, b: LookupBranch) -> Self {
        Self {
            name,
            head: b.head,
            base: b.base,
            base_hash: b.base_hash,
            upstream_branch: b.upstream_branch,
            change: b.change,
            merged_downstack: b.merged_downstack,
        }
    }
}
