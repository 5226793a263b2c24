//! Restacking branches on top of their bases.

use strata_git::{GitOps, Oid};

use super::StackService;
use crate::error::{Error, Result};
use crate::traits::BranchStore;
use crate::tx::UpsertRequest;

/// Whether a branch sits on the current head of its base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestackStatus {
    /// The base head is an ancestor of the branch.
    UpToDate,
    /// The base moved on; the branch must be rebased onto `base_hash`.
    NeedsRestack {
        /// Base branch name.
        base: String,
        /// Live commit of the base, not the recorded one.
        base_hash: Oid,
    },
}

/// What [`StackService::restack`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestackOutcome {
    /// Nothing to do.
    AlreadyRestacked,
    /// The branch was rebased onto `base`.
    Restacked {
        /// Base the branch now sits on.
        base: String,
    },
}

/// Result of [`StackService::restack_upstack`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstackRestack {
    /// Branches that were rebased, in order.
    pub restacked: Vec<String>,
    /// Branches that were already up to date.
    pub skipped: Vec<String>,
}

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Check whether a branch is on top of its base.
    ///
    /// If the branch is up to date but the recorded base hash is stale,
    /// the record is refreshed. That refresh is best effort.
    ///
    /// # Errors
    /// Returns [`Error::BaseNotFound`] if the base branch is gone,
    /// or a lookup error for the branch itself.
    pub fn verify_restacked(&self, name: &str) -> Result<RestackStatus> {
        let branch = self.lookup_branch(name)?;

        let base_hash = match self.repo.peel_to_commit(&branch.base) {
            Ok(hash) => hash,
            Err(e) if e.is_not_found() => {
                return Err(Error::BaseNotFound {
                    branch: name.to_string(),
                    base: branch.base,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !self.repo.is_ancestor(base_hash, branch.head) {
            return Ok(RestackStatus::NeedsRestack {
                base: branch.base,
                base_hash,
            });
        }

        if branch.base_hash != base_hash {
            tracing::debug!(branch = name, base = %branch.base, "updating recorded base hash");

            let mut tx = self.store.begin();
            match tx.upsert(UpsertRequest::new(name).with_base_hash(base_hash)) {
                Ok(()) => {
                    if let Err(e) = tx.commit(format!("{name}: branch was restacked externally")) {
                        tracing::warn!(branch = name, error = %e, "failed to update state");
                    }
                }
                Err(e) => {
                    tracing::warn!(branch = name, error = %e, "failed to update recorded base hash");
                }
            }
        }

        Ok(RestackStatus::UpToDate)
    }

    /// Rebase a branch onto the current head of its base.
    ///
    /// The commits moved are those above the recorded base hash. When that
    /// hash is no longer in the branch's history, because the base was
    /// rewritten, the fork point of the branch off its base is used instead.
    ///
    /// # Errors
    /// Returns the rebase error unchanged if the rebase stops or fails.
    pub fn restack(&self, name: &str) -> Result<RestackOutcome> {
        let branch = self.lookup_branch(name)?;

        let RestackStatus::NeedsRestack { base, base_hash } = self.verify_restacked(name)? else {
            return Ok(RestackOutcome::AlreadyRestacked);
        };

        let mut upstream = branch.base_hash;
        if !self.repo.is_ancestor(upstream, branch.head) {
            if let Ok(fork_point) = self.repo.fork_point(&base, name) {
                tracing::debug!(
                    branch = name,
                    base = %base,
                    fork_point = %fork_point,
                    "recorded base hash is out of date, restacking from fork point"
                );
                upstream = fork_point;
            }
        }

        self.repo.rebase(&self.rebase_request(
            name,
            upstream.to_string(),
            base_hash.to_string(),
        ))?;

        let mut tx = self.store.begin();
        tx.upsert(UpsertRequest::new(name).with_base_hash(base_hash))?;
        tx.commit(format!("{name}: restacked on {base}"))?;

        Ok(RestackOutcome::Restacked { base })
    }

    /// Restack `name` and every branch above it, base before children.
    ///
    /// Trunk is skipped, so passing trunk restacks every tracked branch.
    /// The branch checked out beforehand is checked out again on success.
    /// An interrupted rebase stops the walk and queues a continuation
    /// that resumes from the interrupted branch.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub fn restack_upstack(&self, name: &str) -> Result<UpstackRestack> {
        let original = self.repo.current_branch().ok();
        let graph = self.branch_graph()?;
        let trunk = self.store.trunk();

        let mut report = UpstackRestack::default();
        for branch in graph.upstack(name) {
            if branch == trunk {
                continue;
            }

            match self.restack(branch) {
                Ok(RestackOutcome::AlreadyRestacked) => {
                    tracing::info!(branch, "branch does not need to be restacked");
                    report.skipped.push(branch.to_string());
                }
                Ok(RestackOutcome::Restacked { base }) => {
                    tracing::info!(branch, base = %base, "restacked");
                    report.restacked.push(branch.to_string());
                }
                Err(e) => {
                    return Err(self.rescue(e, branch, &["restack", "--upstack", branch]));
                }
            }
        }

        if let Some(original) = original {
            self.repo.checkout(&original)?;
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::test_mocks::{FlakyStore, MockGitOps, linear_stack, track};

    #[test]
    fn test_verify_up_to_date() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);
        assert_eq!(svc.verify_restacked("b").unwrap(), RestackStatus::UpToDate);
    }

    #[test]
    fn test_verify_needs_restack() {
        let (repo, store) = linear_stack();
        let moved = repo.commit("a");
        let svc = StackService::new(&repo, &store);

        assert_eq!(
            svc.verify_restacked("b").unwrap(),
            RestackStatus::NeedsRestack {
                base: "a".into(),
                base_hash: moved,
            }
        );
    }

    #[test]
    fn test_verify_refreshes_stale_hash() {
        let (repo, store) = linear_stack();
        // b was rebased by hand onto a newer a.
        let newer = repo.commit("a");
        repo.branch_from("b", "a");
        let svc = StackService::new(&repo, &store);

        assert_eq!(svc.verify_restacked("b").unwrap(), RestackStatus::UpToDate);
        assert_eq!(store.lookup("b").unwrap().base_hash, newer);
        assert_eq!(
            store.log().last().unwrap(),
            "b: branch was restacked externally"
        );
    }

    #[test]
    fn test_verify_survives_failed_refresh() {
        let (repo, store) = linear_stack();
        let recorded = store.lookup("b").unwrap().base_hash;
        repo.commit("a");
        repo.branch_from("b", "a");
        let store = FlakyStore::new(store);
        store.fail_updates.set(true);
        let svc = StackService::new(&repo, &store);

        assert_eq!(svc.verify_restacked("b").unwrap(), RestackStatus::UpToDate);
        assert_eq!(store.lookup("b").unwrap().base_hash, recorded);
    }

    #[test]
    fn test_verify_missing_base() {
        let (repo, store) = linear_stack();
        repo.remove_branch("a");
        let svc = StackService::new(&repo, &store);

        assert!(matches!(
            svc.verify_restacked("b"),
            Err(Error::BaseNotFound { base, .. }) if base == "a"
        ));
    }

    #[test]
    fn test_restack_twice() {
        let (repo, store) = linear_stack();
        repo.commit("a");
        let svc = StackService::new(&repo, &store);

        assert_eq!(
            svc.restack("b").unwrap(),
            RestackOutcome::Restacked { base: "a".into() }
        );
        assert!(repo.is_ancestor(repo.head("a"), repo.head("b")));
        assert_eq!(store.lookup("b").unwrap().base_hash, repo.head("a"));
        assert_eq!(store.log().last().unwrap(), "b: restacked on a");

        assert_eq!(svc.restack("b").unwrap(), RestackOutcome::AlreadyRestacked);
    }

    #[test]
    fn test_restack_uses_fork_point_for_rewritten_base() {
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        repo.branch_from("a", "main");
        track(&repo, &store, "a", "main");
        repo.branch_from("b", "a");
        track(&repo, &store, "b", "a");

        // Record a base hash that b never contained, as if a was amended
        // after b was tracked.
        let stray = repo.branch_from("stray", "main");
        let mut tx = store.begin();
        tx.upsert(UpsertRequest::new("b").with_base_hash(stray)).unwrap();
        tx.commit("corrupt").unwrap();

        let fork = repo.head("a");
        repo.fork_points
            .borrow_mut()
            .insert(("a".into(), "b".into()), fork);
        repo.commit("a");

        let svc = StackService::new(&repo, &store);
        svc.restack("b").unwrap();

        let req = repo.rebases.borrow().last().cloned().unwrap();
        assert_eq!(req.upstream, fork.to_string());
        assert_ne!(req.upstream, stray.to_string());
        assert!(repo.is_ancestor(repo.head("a"), repo.head("b")));
    }

    #[test]
    fn test_restack_interrupted_keeps_state() {
        let (repo, store) = linear_stack();
        let repo = repo.with_conflict("b");
        let before = store.lookup("b").unwrap();
        repo.commit("a");
        let svc = StackService::new(&repo, &store);

        let err = svc.restack("b").unwrap_err();
        assert!(err.rebase_interrupt().is_some());
        assert_eq!(store.lookup("b").unwrap(), before);
    }

    #[test]
    fn test_restack_upstack() {
        let (repo, store) = linear_stack();
        repo.commit("a");
        *repo.current_branch.borrow_mut() = "c".into();
        let svc = StackService::new(&repo, &store);

        let report = svc.restack_upstack("a").unwrap();
        assert_eq!(report.skipped, ["a"]);
        assert_eq!(report.restacked, ["b", "c"]);
        assert!(repo.is_ancestor(repo.head("b"), repo.head("c")));
        assert_eq!(repo.current_branch().unwrap(), "c");
    }

    #[test]
    fn test_restack_upstack_records_continuation() {
        let (repo, store) = linear_stack();
        let repo = repo.with_conflict("c");
        repo.commit("a");
        let svc = StackService::new(&repo, &store);

        let err = svc.restack_upstack("main").unwrap_err();
        assert!(err.rebase_interrupt().is_some());

        let cont = store.take_continuation().unwrap().unwrap();
        assert_eq!(cont.branch, "c");
        assert_eq!(cont.command, ["restack", "--upstack", "c"]);
    }
}
