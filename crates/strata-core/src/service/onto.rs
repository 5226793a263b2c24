//! Moving a single branch onto a new base.

use strata_git::{GitOps, short};

use super::StackService;
use crate::error::{Error, Result};
use crate::traits::BranchStore;
use crate::tx::UpsertRequest;

/// A request to move a branch onto another branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOntoRequest {
    /// Branch to move. Never trunk.
    pub branch: String,
    /// New base. May be trunk.
    pub onto: String,
    /// Replacement merged-downstack history for `branch`, if it changes.
    pub merged_downstack: Option<Vec<String>>,
}

impl BranchOntoRequest {
    #[must_use]
    pub fn new(branch: impl Into<String>, onto: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            onto: onto.into(),
            merged_downstack: None,
        }
    }
}

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Move the commits of a branch onto a different base.
    ///
    /// Branches above `branch` are left where they are. The new base is
    /// recorded only once the rebase completes, so an interrupted move can
    /// be resumed by running it again.
    ///
    /// # Errors
    /// Returns [`Error::Trunk`] when asked to move trunk, a lookup error if
    /// either branch is unusable, and the rebase error unchanged if the
    /// rebase stops or fails.
    pub fn branch_onto(&self, req: &BranchOntoRequest) -> Result<()> {
        let trunk = self.store.trunk();
        if req.branch == trunk {
            return Err(Error::Trunk);
        }

        let branch = self.lookup_branch(&req.branch)?;
        let onto_hash = if req.onto == trunk {
            self.repo.peel_to_commit(trunk)?
        } else {
            self.lookup_branch(&req.onto)?.head
        };

        // A resumed move may already have the commits of the old base
        // under onto; replaying from onto keeps the rebase a no-op then.
        let from_hash = if self.repo.is_ancestor(branch.base_hash, onto_hash) {
            onto_hash
        } else {
            branch.base_hash
        };

        tracing::debug!(
            branch = %req.branch,
            old_base = %branch.base,
            new_base = %req.onto,
            commits = %format_args!("{}..{}", short(from_hash), short(branch.head)),
            "moving commits onto new base"
        );

        let mut upsert = UpsertRequest::new(&req.branch)
            .with_base(&req.onto)
            .with_base_hash(onto_hash);
        if let Some(merged) = &req.merged_downstack {
            upsert = upsert.with_merged_downstack(merged.clone());
        }

        let mut tx = self.store.begin();
        tx.upsert(upsert)?;

        self.repo.rebase(&self.rebase_request(
            &req.branch,
            from_hash.to_string(),
            onto_hash.to_string(),
        ))?;

        tx.commit(format!("{}: onto {}", req.branch, req.onto))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::test_mocks::{MockGitOps, linear_stack, track};

    #[test]
    fn test_onto_trunk() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);

        svc.branch_onto(&BranchOntoRequest::new("c", "main")).unwrap();

        let record = store.lookup("c").unwrap();
        assert_eq!(record.base, "main");
        assert_eq!(record.base_hash, repo.head("main"));
        assert!(repo.is_ancestor(repo.head("main"), repo.head("c")));
        assert!(!repo.is_ancestor(repo.head("b"), repo.head("c")));
        assert_eq!(store.log().last().unwrap(), "c: onto main");
    }

    #[test]
    fn test_onto_leaves_upstack_alone() {
        let (repo, store) = linear_stack();
        let b_head = repo.head("b");
        let svc = StackService::new(&repo, &store);

        svc.branch_onto(&BranchOntoRequest::new("b", "main")).unwrap();

        assert_eq!(store.lookup("c").unwrap().base, "b");
        assert!(repo.is_ancestor(b_head, repo.head("c")));
    }

    #[test]
    fn test_onto_refuses_trunk() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);
        assert!(matches!(
            svc.branch_onto(&BranchOntoRequest::new("main", "a")),
            Err(Error::Trunk)
        ));
    }

    #[test]
    fn test_onto_requires_tracked_target() {
        let (repo, store) = linear_stack();
        repo.branch_from("loose", "main");
        let svc = StackService::new(&repo, &store);

        let err = svc
            .branch_onto(&BranchOntoRequest::new("c", "loose"))
            .unwrap_err();
        assert!(matches!(err, Error::NotTracked(name) if name == "loose"));
        assert!(repo.rebases.borrow().is_empty());
    }

    #[test]
    fn test_onto_is_idempotent() {
        // main -> x, main -> y; move y onto x twice.
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        repo.branch_from("x", "main");
        repo.branch_from("y", "main");
        track(&repo, &store, "x", "main");
        track(&repo, &store, "y", "main");
        let svc = StackService::new(&repo, &store);

        svc.branch_onto(&BranchOntoRequest::new("y", "x")).unwrap();
        let first = repo.head("y");

        svc.branch_onto(&BranchOntoRequest::new("y", "x")).unwrap();
        let second = repo.rebases.borrow().last().cloned().unwrap();

        // The second run replays nothing.
        assert_eq!(second.upstream, repo.head("x").to_string());
        assert_eq!(repo.head("y"), first);
        assert_eq!(store.lookup("y").unwrap().base, "x");
    }

    #[test]
    fn test_onto_after_manual_rebase() {
        // y was rebased onto x by hand; the store still has it on main.
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        repo.branch_from("x", "main");
        repo.branch_from("y", "main");
        track(&repo, &store, "x", "main");
        track(&repo, &store, "y", "main");
        let rebuilt = repo.branch_from("y", "x");
        let svc = StackService::new(&repo, &store);

        svc.branch_onto(&BranchOntoRequest::new("y", "x")).unwrap();

        let req = repo.rebases.borrow().last().cloned().unwrap();
        assert_eq!(req.upstream, repo.head("x").to_string());
        assert_eq!(req.onto, repo.head("x").to_string());
        assert_eq!(repo.head("y"), rebuilt);

        let record = store.lookup("y").unwrap();
        assert_eq!(record.base, "x");
        assert_eq!(record.base_hash, repo.head("x"));
    }

    #[test]
    fn test_onto_resumes_after_conflict() {
        let repo = MockGitOps::new().with_conflict("y");
        let store = MemoryStore::new("main");
        repo.branch_from("x", "main");
        repo.branch_from("y", "main");
        track(&repo, &store, "x", "main");
        track(&repo, &store, "y", "main");
        let svc = StackService::new(&repo, &store);

        let err = svc.branch_onto(&BranchOntoRequest::new("y", "x")).unwrap_err();
        assert!(err.rebase_interrupt().is_some());
        // Nothing recorded until the rebase completes.
        assert_eq!(store.lookup("y").unwrap().base, "main");

        svc.branch_onto(&BranchOntoRequest::new("y", "x")).unwrap();
        assert_eq!(store.lookup("y").unwrap().base, "x");
        assert!(repo.is_ancestor(repo.head("x"), repo.head("y")));
    }

    #[test]
    fn test_onto_sets_merged_downstack() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);

        let mut req = BranchOntoRequest::new("b", "main");
        req.merged_downstack = Some(vec!["#12".into()]);
        svc.branch_onto(&req).unwrap();

        assert_eq!(store.lookup("b").unwrap().merged_downstack, ["#12"]);
    }
}
