//! Untracking and renaming branches.

use strata_git::GitOps;

use super::StackService;
use crate::error::{Error, Result};
use crate::traits::{BranchStore, ChangeRecord};
use crate::tx::UpsertRequest;

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Stop tracking a branch.
    ///
    /// Branches based on it are moved onto its base. The git branch itself
    /// is not touched and does not need to exist. Forgetting an untracked
    /// branch does nothing.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or written.
    pub fn forget_branch(&self, name: &str) -> Result<()> {
        let record = match self.store.lookup(name) {
            Ok(record) => record,
            Err(Error::NotTracked(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut tx = self.store.begin();
        for candidate in self.store.list()? {
            if candidate == name || self.store.lookup(&candidate)?.base != name {
                continue;
            }
            tx.upsert(
                UpsertRequest::new(candidate)
                    .with_base(&record.base)
                    .with_base_hash(record.base_hash),
            )?;
        }

        tx.delete(name)?;
        tx.commit(format!("untrack branch {name}"))
    }

    /// Rename a tracked branch in git and in the store.
    ///
    /// Everything recorded for the branch carries over, and branches based
    /// on it are re-pointed at the new name.
    ///
    /// # Errors
    /// Returns [`Error::BranchExists`] if `new` already names a revision.
    pub fn rename_branch(&self, old: &str, new: &str) -> Result<()> {
        let branch = self.lookup_branch(old)?;

        if self.repo.peel_to_commit(new).is_ok() {
            return Err(Error::BranchExists(new.to_string()));
        }

        let aboves = self.list_above(old)?;

        // Metadata that could not be decoded is carried over as stored.
        let stored = self.store.lookup(old)?.change;
        let change = match &branch.change {
            Some(md) => match self.forges.lookup(md.forge_id()) {
                Some(forge) => Some(ChangeRecord {
                    forge: forge.id().to_string(),
                    metadata: forge.marshal_change_metadata(md.as_ref())?,
                }),
                None => stored,
            },
            None => stored,
        };

        let mut tx = self.store.begin();
        tx.upsert(
            UpsertRequest::new(new)
                .with_base(&branch.base)
                .with_base_hash(branch.base_hash)
                .with_change(change)
                .with_upstream_branch(branch.upstream_branch.clone())
                .with_merged_downstack(branch.merged_downstack.clone()),
        )?;
        for above in &aboves {
            tx.upsert(UpsertRequest::new(above).with_base(new))?;
        }
        tx.delete(old)?;

        self.repo.rename_branch(old, new)?;
        tx.commit(format!("rename {old} to {new}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::test_mocks::{MockGitOps, linear_stack, track};
    use serde_json::json;

    #[test]
    fn test_forget_reparents_children() {
        let (repo, store) = linear_stack();
        let b = store.lookup("b").unwrap();
        let svc = StackService::new(&repo, &store);

        svc.forget_branch("b").unwrap();

        assert!(matches!(store.lookup("b"), Err(Error::NotTracked(_))));
        let c = store.lookup("c").unwrap();
        assert_eq!(c.base, "a");
        assert_eq!(c.base_hash, b.base_hash);
        assert!(repo.branch_exists("b"));
        assert_eq!(store.log().last().unwrap(), "untrack branch b");
    }

    #[test]
    fn test_forget_untracked_is_noop() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);
        let before = store.log().len();

        svc.forget_branch("nope").unwrap();
        assert_eq!(store.log().len(), before);
    }

    #[test]
    fn test_forget_deleted_branch() {
        let (repo, store) = linear_stack();
        repo.remove_branch("c");
        let svc = StackService::new(&repo, &store);

        svc.forget_branch("c").unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_rename() {
        let (repo, store) = linear_stack();
        let b_head = repo.head("b");
        let mut tx = store.begin();
        tx.upsert(
            UpsertRequest::new("b")
                .with_upstream_branch(Some("b".into()))
                .with_merged_downstack(vec!["#3".into()])
                .with_change(Some(ChangeRecord {
                    forge: "github".into(),
                    metadata: json!({"number": 7, "url": "https://example.com/7"}),
                })),
        )
        .unwrap();
        tx.commit("submit").unwrap();
        let svc = StackService::new(&repo, &store);

        svc.rename_branch("b", "bee").unwrap();

        assert!(!repo.branch_exists("b"));
        assert_eq!(repo.head("bee"), b_head);
        assert!(matches!(store.lookup("b"), Err(Error::NotTracked(_))));

        let bee = store.lookup("bee").unwrap();
        assert_eq!(bee.base, "a");
        assert_eq!(bee.upstream_branch.as_deref(), Some("b"));
        assert_eq!(bee.merged_downstack, ["#3"]);
        let change = bee.change.unwrap();
        assert_eq!(change.forge, "github");
        assert_eq!(change.metadata["number"], 7);

        assert_eq!(store.lookup("c").unwrap().base, "bee");
        assert_eq!(store.log().last().unwrap(), "rename b to bee");
    }

    #[test]
    fn test_rename_onto_existing() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);

        let err = svc.rename_branch("b", "c").unwrap_err();
        assert!(matches!(err, Error::BranchExists(name) if name == "c"));
        assert!(repo.branch_exists("b"));
    }

    #[test]
    fn test_rename_git_failure_keeps_store() {
        let (repo, store) = linear_stack();
        repo.fail_rename.set(true);
        let before = store.log().len();
        let svc = StackService::new(&repo, &store);

        let err = svc.rename_branch("b", "bee").unwrap_err();
        assert!(matches!(
            err,
            Error::Git(strata_git::Error::CommandFailed { .. })
        ));

        assert_eq!(store.lookup("b").unwrap().base, "a");
        assert!(matches!(store.lookup("bee"), Err(Error::NotTracked(_))));
        assert_eq!(store.lookup("c").unwrap().base, "b");
        assert_eq!(store.log().len(), before);
        assert!(repo.branch_exists("b"));
    }

    #[test]
    fn test_rename_untracked() {
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        repo.branch_from("loose", "main");
        repo.branch_from("other", "main");
        track(&repo, &store, "other", "main");
        let svc = StackService::new(&repo, &store);

        assert!(matches!(
            svc.rename_branch("loose", "tight"),
            Err(Error::NotTracked(_))
        ));
    }
}
