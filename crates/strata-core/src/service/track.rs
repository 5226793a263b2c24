//! Starting to track branches.

use std::collections::{HashMap, HashSet};

use strata_git::{CommitRange, GitOps};

use super::{RestackStatus, StackService};
use crate::discovery::{BaseSelector, BranchToTrack, DownstackDiscoverer};
use crate::error::{Error, Result};
use crate::traits::BranchStore;
use crate::tx::UpsertRequest;

/// Result of [`StackService::track_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedBranch {
    /// Base the branch was tracked with.
    pub base: String,
    /// Whether the branch is behind its base.
    pub needs_restack: bool,
}

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Track `name` on `base`, or on a guessed base.
    ///
    /// Without an explicit base, the nearest tracked branch found in the
    /// history of `name` is used, falling back to trunk. The base hash is
    /// the merge base of the two branches, so a branch that is already
    /// behind its base restacks cleanly.
    ///
    /// # Errors
    /// Returns [`Error::Trunk`] for trunk, a git error if either branch
    /// does not exist, or a store error if the base is not tracked.
    pub fn track_branch(&self, name: &str, base: Option<&str>) -> Result<TrackedBranch> {
        let trunk = self.store.trunk();
        if name == trunk {
            return Err(Error::Trunk);
        }

        let base = match base {
            Some(base) => base.to_string(),
            None => {
                tracing::debug!(branch = name, "looking for base branch");
                self.guess_base(name).unwrap_or_else(|e| {
                    tracing::warn!(branch = name, error = %e, "could not guess base branch, using trunk");
                    trunk.to_string()
                })
            }
        };

        let base_hash = self.repo.merge_base(&base, name)?;
        let mut tx = self.store.begin();
        tx.upsert(
            UpsertRequest::new(name)
                .with_base(&base)
                .with_base_hash(base_hash),
        )?;
        tx.commit(format!("track {name} with base {base}"))?;
        tracing::info!(branch = name, base = %base, "tracking branch");

        let needs_restack = match self.verify_restacked(name) {
            Ok(RestackStatus::UpToDate) => false,
            Ok(RestackStatus::NeedsRestack { .. }) => true,
            Err(e) => {
                tracing::warn!(branch = name, error = %e, "could not verify stack state");
                false
            }
        };

        Ok(TrackedBranch {
            base,
            needs_restack,
        })
    }

    /// Track `branch` along with every untracked branch below it.
    ///
    /// Branches are discovered by walking the history of `branch`, with
    /// `selector` resolving commits that several branches point at.
    /// Everything found is tracked in one transaction.
    ///
    /// Returns what was tracked, bottom first; empty if `branch` was
    /// already tracked.
    ///
    /// # Errors
    /// Returns [`Error::Trunk`] for trunk, or whatever discovery fails with.
    pub fn track_downstack(
        &self,
        branch: &str,
        selector: &mut dyn BaseSelector,
    ) -> Result<Vec<BranchToTrack>> {
        let trunk = self.store.trunk();
        if branch == trunk {
            return Err(Error::Trunk);
        }

        let tracked: HashSet<String> = self.store.list()?.into_iter().collect();
        if tracked.contains(branch) {
            tracing::info!(branch, "branch is already tracked");
            return Ok(Vec::new());
        }

        let mut discoverer = DownstackDiscoverer::new(self.repo, trunk, tracked, selector)?;
        let mut found = discoverer.discover(branch)?;
        found.reverse();

        let mut tx = self.store.begin();
        for b in &found {
            tx.upsert(
                UpsertRequest::new(&b.name)
                    .with_base(&b.base)
                    .with_base_hash(b.base_hash),
            )?;
            tracing::info!(branch = %b.name, base = %b.base, "tracking branch");
        }
        tx.commit(format!(
            "track downstack from {branch} ({} branches)",
            found.len()
        ))?;

        Ok(found)
    }

    /// Nearest tracked branch whose head is in the history of `name`.
    fn guess_base(&self, name: &str) -> Result<String> {
        let trunk = self.store.trunk();

        let mut heads: HashMap<_, Vec<String>> = HashMap::new();
        for tracked in self.store.list()? {
            if tracked == name {
                continue;
            }
            match self.repo.peel_to_commit(&tracked) {
                Ok(head) => {
                    heads.entry(head).or_default().push(tracked);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        if heads.is_empty() {
            return Ok(trunk.to_string());
        }

        let start = self.repo.peel_to_commit(name)?;
        let stop = self.repo.peel_to_commit(trunk)?;
        for commit in self
            .repo
            .list_commits(&CommitRange::starting_at(start).excluding(stop))?
        {
            if let Some(first) = heads.get(&commit?).and_then(|c| c.iter().min()) {
                return Ok(first.clone());
            }
        }

        Ok(trunk.to_string())
    }
}
