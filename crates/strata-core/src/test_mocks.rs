//! Mock implementations for testing services.
//!
//! `MockGitOps` keeps a tiny commit graph in memory so the stack engine
//! can be exercised without a real repository. Rebases replay commits
//! as fresh IDs, the way git does.

#![allow(clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use strata_git::{
    CommitRange, Commits, Error as GitError, GitOps, InterruptKind, LocalBranch, Oid,
    RebaseInterrupt, RebaseRequest, Result as GitResult,
};

use crate::error::{Error, Result};
use crate::memory::MemoryStore;
use crate::traits::{BranchRecord, BranchStore, Continuation, UpdateRequest};
use crate::tx::UpsertRequest;

/// Mock implementation of `GitOps` for testing.
pub struct MockGitOps {
    pub parents: RefCell<HashMap<Oid, Vec<Oid>>>,
    pub branches: RefCell<BTreeMap<String, Oid>>,
    pub current_branch: RefCell<String>,
    /// Branches whose next rebase stops on a conflict.
    pub conflicts: RefCell<HashSet<String>>,
    /// Forced fork points, keyed by `(base, branch)`.
    pub fork_points: RefCell<HashMap<(String, String), Oid>>,
    /// Every rebase that was requested, in order.
    pub rebases: RefCell<Vec<RebaseRequest>>,
    /// Fail every branch rename, as a locked ref would.
    pub fail_rename: Cell<bool>,
    next_id: Cell<u32>,
}

impl MockGitOps {
    /// A repository with a single commit on `main`.
    pub fn new() -> Self {
        let mock = Self {
            parents: RefCell::new(HashMap::new()),
            branches: RefCell::new(BTreeMap::new()),
            current_branch: RefCell::new("main".to_string()),
            conflicts: RefCell::new(HashSet::new()),
            fork_points: RefCell::new(HashMap::new()),
            rebases: RefCell::new(Vec::new()),
            fail_rename: Cell::new(false),
            next_id: Cell::new(1),
        };
        let root = mock.new_commit(&[]);
        mock.branches.borrow_mut().insert("main".to_string(), root);
        mock
    }

    fn new_commit(&self, parents: &[Oid]) -> Oid {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut bytes = [0xab; 20];
        bytes[..4].copy_from_slice(&id.to_be_bytes());
        let oid = Oid::from_bytes(&bytes).unwrap();
        self.parents.borrow_mut().insert(oid, parents.to_vec());
        oid
    }

    /// Current head of a branch.
    pub fn head(&self, branch: &str) -> Oid {
        self.branches.borrow()[branch]
    }

    /// Add a commit on top of `branch` and advance it.
    pub fn commit(&self, branch: &str) -> Oid {
        let parent = self.head(branch);
        let oid = self.new_commit(&[parent]);
        self.branches.borrow_mut().insert(branch.to_string(), oid);
        oid
    }

    /// Create `name` from the head of `from` with one commit of its own.
    pub fn branch_from(&self, name: &str, from: &str) -> Oid {
        let start = self.head(from);
        self.branches.borrow_mut().insert(name.to_string(), start);
        self.commit(name)
    }

    /// Point `name` at an existing commit.
    pub fn set_branch(&self, name: &str, oid: Oid) {
        self.branches.borrow_mut().insert(name.to_string(), oid);
    }

    /// Remove a branch without going through `GitOps`.
    pub fn remove_branch(&self, name: &str) {
        self.branches.borrow_mut().remove(name);
    }

    pub fn with_conflict(self, branch: &str) -> Self {
        self.conflicts.borrow_mut().insert(branch.to_string());
        self
    }

    fn ancestors(&self, start: Oid) -> HashSet<Oid> {
        let parents = self.parents.borrow();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(oid) = queue.pop_front() {
            if seen.insert(oid) {
                queue.extend(parents.get(&oid).into_iter().flatten().copied());
            }
        }
        seen
    }

    /// Commits reachable from `start` but not from `stop`, newest first.
    fn walk(&self, start: Oid, stop: Option<Oid>) -> Vec<Oid> {
        let excluded = stop.map(|s| self.ancestors(s)).unwrap_or_default();
        let parents = self.parents.borrow();
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(oid) = queue.pop_front() {
            if excluded.contains(&oid) || !seen.insert(oid) {
                continue;
            }
            out.push(oid);
            queue.extend(parents.get(&oid).into_iter().flatten().copied());
        }
        out
    }
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl GitOps for MockGitOps {
    fn current_branch(&self) -> GitResult<String> {
        Ok(self.current_branch.borrow().clone())
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.branches.borrow().contains_key(name)
    }

    fn peel_to_commit(&self, rev: &str) -> GitResult<Oid> {
        if let Some(oid) = self.branches.borrow().get(rev) {
            return Ok(*oid);
        }
        match Oid::from_str(rev) {
            Ok(oid) if self.parents.borrow().contains_key(&oid) => Ok(oid),
            _ => Err(GitError::RefNotFound(rev.to_string())),
        }
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> bool {
        self.ancestors(descendant).contains(&ancestor)
    }

    fn merge_base(&self, one: &str, two: &str) -> GitResult<Oid> {
        let one = self.ancestors(self.peel_to_commit(one)?);
        self.walk(self.peel_to_commit(two)?, None)
            .into_iter()
            .find(|oid| one.contains(oid))
            .ok_or_else(|| GitError::RefNotFound("merge base".into()))
    }

    fn fork_point(&self, base: &str, branch: &str) -> GitResult<Oid> {
        let forced = self
            .fork_points
            .borrow()
            .get(&(base.to_string(), branch.to_string()))
            .copied();
        match forced {
            Some(oid) => Ok(oid),
            None => self.merge_base(base, branch),
        }
    }

    fn list_commits(&self, range: &CommitRange) -> GitResult<Commits<'_>> {
        let commits = self.walk(range.start, range.stop);
        Ok(Commits::new(commits.into_iter().map(Ok)))
    }

    fn local_branches(&self) -> GitResult<Vec<LocalBranch>> {
        Ok(self
            .branches
            .borrow()
            .iter()
            .map(|(name, head)| LocalBranch {
                name: name.clone(),
                head: *head,
            })
            .collect())
    }

    fn rebase(&self, req: &RebaseRequest) -> GitResult<()> {
        self.rebases.borrow_mut().push(req.clone());
        *self.current_branch.borrow_mut() = req.branch.clone();

        if self.conflicts.borrow_mut().remove(&req.branch) {
            return Err(GitError::RebaseInterrupted(RebaseInterrupt {
                branch: req.branch.clone(),
                kind: InterruptKind::Conflict,
            }));
        }

        let head = self
            .peel_to_commit(&req.branch)
            .map_err(|_| GitError::BranchNotFound(req.branch.clone()))?;
        let upstream = self.peel_to_commit(&req.upstream)?;
        let onto = self.peel_to_commit(&req.onto)?;

        // Already sitting on onto: git leaves the branch untouched.
        if self.is_ancestor(onto, head) && self.is_ancestor(upstream, onto) {
            return Ok(());
        }

        let mut tip = onto;
        for _ in self.walk(head, Some(upstream)).into_iter().rev() {
            tip = self.new_commit(&[tip]);
        }
        self.set_branch(&req.branch, tip);
        Ok(())
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        if !self.branch_exists(branch) {
            return Err(GitError::BranchNotFound(branch.to_string()));
        }
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn rename_branch(&self, old: &str, new: &str) -> GitResult<()> {
        if self.fail_rename.get() {
            return Err(GitError::CommandFailed {
                command: "branch -m".to_string(),
                stderr: format!("cannot lock ref 'refs/heads/{new}'"),
            });
        }
        let mut branches = self.branches.borrow_mut();
        if branches.contains_key(new) {
            return Err(GitError::BranchExists(new.to_string()));
        }
        let oid = branches
            .remove(old)
            .ok_or_else(|| GitError::BranchNotFound(old.to_string()))?;
        branches.insert(new.to_string(), oid);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        self.branches
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GitError::BranchNotFound(name.to_string()))
    }
}

/// Record `name` as tracked on `base`, using the current head of `base` as the base hash.
pub fn track(repo: &MockGitOps, store: &MemoryStore, name: &str, base: &str) {
    let mut tx = store.begin();
    tx.upsert(
        UpsertRequest::new(name)
            .with_base(base)
            .with_base_hash(repo.head(base)),
    )
    .unwrap();
    tx.commit(format!("track {name}")).unwrap();
}

/// A repository and store holding the stack `main -> a -> b -> c`.
pub fn linear_stack() -> (MockGitOps, MemoryStore) {
    let repo = MockGitOps::new();
    let store = MemoryStore::new("main");
    for (name, base) in [("a", "main"), ("b", "a"), ("c", "b")] {
        repo.branch_from(name, base);
        track(&repo, &store, name, base);
    }
    (repo, store)
}

/// A [`MemoryStore`] whose writes can be made to fail.
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Reject every update while set.
    pub fail_updates: Cell<bool>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_updates: Cell::new(false),
        }
    }
}

impl BranchStore for FlakyStore {
    fn trunk(&self) -> &str {
        self.inner.trunk()
    }

    fn lookup(&self, name: &str) -> Result<BranchRecord> {
        self.inner.lookup(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        self.inner.list()
    }

    fn update(&self, req: UpdateRequest) -> Result<()> {
        if self.fail_updates.get() {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.update(req)
    }

    fn append_continuation(&self, cont: Continuation) -> Result<()> {
        self.inner.append_continuation(cont)
    }

    fn take_continuation(&self) -> Result<Option<Continuation>> {
        self.inner.take_continuation()
    }

    fn clear_continuations(&self) -> Result<usize> {
        self.inner.clear_continuations()
    }
}
