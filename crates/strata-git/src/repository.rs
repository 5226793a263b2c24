//! Repository wrapper providing high-level git operations.

use std::path::{Path, PathBuf};

use git2::{BranchType, ErrorCode, Oid, RepositoryState, Sort};

use crate::commits::{CommitRange, Commits, LocalBranch};
use crate::error::{Error, Result};
use crate::rebase::RebaseRequest;
use crate::traits::GitOps;

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<PathBuf> {
        self.inner.workdir().map(Path::to_path_buf)
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> PathBuf {
        self.inner.path().to_path_buf()
    }

    /// Check if there's a rebase in progress.
    #[must_use]
    pub fn is_rebasing(&self) -> bool {
        matches!(
            self.inner.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
        )
    }

    // === Branch operations ===

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    /// Check if a branch exists.
    #[must_use]
    pub fn branch_exists(&self, name: &str) -> bool {
        self.inner.find_branch(name, BranchType::Local).is_ok()
    }

    /// List all local branches with their head commits.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn local_branches(&self) -> Result<Vec<LocalBranch>> {
        let mut out = Vec::new();
        for entry in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(String::from) else {
                continue;
            };
            let Some(head) = branch.get().target() else {
                continue;
            };
            out.push(LocalBranch { name, head });
        }
        Ok(out)
    }

    /// Checkout a branch.
    ///
    /// # Errors
    /// Returns error if checkout fails.
    pub fn checkout(&self, branch_name: &str) -> Result<()> {
        let branch = self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

        let object = branch.get().peel(git2::ObjectType::Commit)?;
        self.inner.checkout_tree(&object, None)?;
        self.inner.set_head(&format!("refs/heads/{branch_name}"))?;
        Ok(())
    }

    /// Rename a local branch.
    ///
    /// # Errors
    /// Returns [`Error::BranchExists`] if `new` is taken,
    /// [`Error::BranchNotFound`] if `old` does not exist.
    pub fn rename_branch(&self, old: &str, new: &str) -> Result<()> {
        let mut branch = self
            .inner
            .find_branch(old, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(old.into()))?;

        branch.rename(new, false).map_err(|e| {
            if e.code() == ErrorCode::Exists {
                Error::BranchExists(new.into())
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(())
    }

    /// Delete a local branch.
    ///
    /// # Errors
    /// Returns error if the branch does not exist or is checked out.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .inner
            .find_branch(name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(name.into()))?;
        branch.delete()?;
        Ok(())
    }

    // === Commit graph ===

    /// Resolve a revision to the commit it names.
    ///
    /// # Errors
    /// Returns [`Error::RefNotFound`] if the revision does not resolve.
    pub fn peel_to_commit(&self, rev: &str) -> Result<Oid> {
        let object = self.inner.revparse_single(rev).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::RefNotFound(rev.into())
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(object.peel_to_commit()?.id())
    }

    /// Whether `ancestor` is reachable from `descendant`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> bool {
        ancestor == descendant
            || self
                .inner
                .graph_descendant_of(descendant, ancestor)
                .unwrap_or(false)
    }

    /// Get the merge base of two revisions.
    ///
    /// # Errors
    /// Returns error if either revision is missing or the histories are unrelated.
    pub fn merge_base(&self, one: &str, two: &str) -> Result<Oid> {
        let one = self.peel_to_commit(one)?;
        let two = self.peel_to_commit(two)?;
        Ok(self.inner.merge_base(one, two)?)
    }

    /// Find where `branch` forked from `base`, consulting the reflog of `base`.
    ///
    /// git2 does not implement `--fork-point`, so this runs `git merge-base`.
    ///
    /// # Errors
    /// Returns error if git could not determine a fork point.
    pub fn fork_point(&self, base: &str, branch: &str) -> Result<Oid> {
        let output = self.git(&["merge-base", "--fork-point", base, branch])?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: "merge-base --fork-point".into(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Oid::from_str(stdout.trim())?)
    }

    /// Walk commits in `range`, newest first.
    ///
    /// # Errors
    /// Returns error if the walk cannot be set up.
    pub fn list_commits(&self, range: &CommitRange) -> Result<Commits<'_>> {
        let mut walk = self.inner.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        walk.push(range.start)?;
        if let Some(stop) = range.stop {
            walk.hide(stop)?;
        }
        Ok(Commits::new(walk.map(|oid| oid.map_err(Error::from))))
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.inner.path())
            .finish()
    }
}

impl GitOps for Repository {
    fn current_branch(&self) -> Result<String> {
        Self::current_branch(self)
    }

    fn branch_exists(&self, name: &str) -> bool {
        Self::branch_exists(self, name)
    }

    fn peel_to_commit(&self, rev: &str) -> Result<Oid> {
        Self::peel_to_commit(self, rev)
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> bool {
        Self::is_ancestor(self, ancestor, descendant)
    }

    fn merge_base(&self, one: &str, two: &str) -> Result<Oid> {
        Self::merge_base(self, one, two)
    }

    fn fork_point(&self, base: &str, branch: &str) -> Result<Oid> {
        Self::fork_point(self, base, branch)
    }

    fn list_commits(&self, range: &CommitRange) -> Result<Commits<'_>> {
        Self::list_commits(self, range)
    }

    fn local_branches(&self) -> Result<Vec<LocalBranch>> {
        Self::local_branches(self)
    }

    fn rebase(&self, req: &RebaseRequest) -> Result<()> {
        Self::rebase(self, req)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        Self::checkout(self, branch)
    }

    fn rename_branch(&self, old: &str, new: &str) -> Result<()> {
        Self::rename_branch(self, old, new)
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        Self::delete_branch(self, name)
    }
}
