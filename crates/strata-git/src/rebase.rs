//! Rebase operations.
//!
//! git2 has no equivalent of `git rebase --onto --autostash`,
//! so rebases shell out to the `git` binary and inspect the repository
//! afterwards to tell a conflict apart from an outright failure.

use std::fmt;
use std::fs;
use std::process::{Command, Output};

use crate::Repository;
use crate::error::{Error, Result};

/// A request to rebase a branch.
///
/// Commits in `upstream..branch` are replayed on top of `onto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseRequest {
    /// Branch to rebase.
    pub branch: String,
    /// Lower bound of the commits to move (exclusive).
    pub upstream: String,
    /// Commit to replay the commits onto.
    pub onto: String,
    /// Stash uncommitted changes before the rebase and restore them after.
    pub autostash: bool,
    /// Suppress git's progress output.
    pub quiet: bool,
}

/// Why a rebase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    /// A commit could not be applied cleanly.
    Conflict,
    /// The rebase paused on an `edit` or `break` instruction.
    Deliberate,
}

/// A rebase that stopped midway and is waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseInterrupt {
    /// Branch being rebased.
    pub branch: String,
    /// Why the rebase stopped.
    pub kind: InterruptKind,
}

impl fmt::Display for RebaseInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InterruptKind::Conflict => write!(f, "rebase of '{}' stopped on a conflict", self.branch),
            InterruptKind::Deliberate => write!(f, "rebase of '{}' paused", self.branch),
        }
    }
}

impl Repository {
    /// Run `git rebase --onto <onto> <upstream> <branch>`.
    ///
    /// # Errors
    /// Returns [`Error::RebaseInterrupted`] if the rebase stopped and left
    /// a rebase in progress, [`Error::RebaseFailed`] if it failed outright.
    pub fn rebase(&self, req: &RebaseRequest) -> Result<()> {
        let mut args = vec!["rebase", "--onto", req.onto.as_str()];
        if req.autostash {
            args.push("--autostash");
        }
        if req.quiet {
            args.push("--quiet");
        }
        args.push(req.upstream.as_str());
        args.push(req.branch.as_str());

        tracing::debug!(
            branch = %req.branch,
            upstream = %req.upstream,
            onto = %req.onto,
            "running git rebase"
        );
        let output = self.git(&args)?;
        self.finish_rebase(&req.branch, &output)
    }

    /// Continue a rebase after the user resolved conflicts.
    ///
    /// # Errors
    /// Returns [`Error::RebaseInterrupted`] if the rebase stopped again.
    pub fn rebase_continue(&self) -> Result<()> {
        let branch = self.rebase_head_name().unwrap_or_default();
        let output = self.git(&["rebase", "--continue"])?;
        self.finish_rebase(&branch, &output)
    }

    /// Abort a rebase in progress.
    ///
    /// # Errors
    /// Returns error if git refuses to abort.
    pub fn rebase_abort(&self) -> Result<()> {
        let output = self.git(&["rebase", "--abort"])?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: "rebase --abort".into(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn finish_rebase(&self, branch: &str, output: &Output) -> Result<()> {
        let rebasing = self.is_rebasing();
        let branch = self
            .rebase_head_name()
            .unwrap_or_else(|| branch.to_string());

        if output.status.success() {
            if rebasing {
                return Err(Error::RebaseInterrupted(RebaseInterrupt {
                    branch,
                    kind: InterruptKind::Deliberate,
                }));
            }
            return Ok(());
        }

        if rebasing {
            return Err(Error::RebaseInterrupted(RebaseInterrupt {
                branch,
                kind: InterruptKind::Conflict,
            }));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(Error::RebaseFailed(stderr))
    }

    /// Name of the branch being rebased, read from the rebase state directory.
    ///
    /// There is no porcelain command for this; both the merge and apply
    /// backends record it in a `head-name` file.
    fn rebase_head_name(&self) -> Option<String> {
        ["rebase-merge", "rebase-apply"].iter().find_map(|dir| {
            let head = fs::read_to_string(self.git_dir().join(dir).join("head-name")).ok()?;
            let head = head.trim();
            Some(head.strip_prefix("refs/heads/").unwrap_or(head).to_string())
        })
    }

    /// Run a git subprocess in this repository.
    pub(crate) fn git(&self, args: &[&str]) -> Result<Output> {
        let dir = self.workdir().unwrap_or_else(|| self.git_dir());
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_EDITOR", "true")
            .output()?;
        Ok(output)
    }
}
