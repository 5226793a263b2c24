//! Stack operations over a repository and a branch store.
//!
//! [`StackService`] ties together the three collaborators of the engine:
//! git for commit-graph queries and rebases, a [`BranchStore`] for the
//! persisted base relationships, and a forge [`Registry`] for decoding
//! published change metadata. Every operation that changes state goes
//! through a single [`crate::BranchTx`].

mod edit;
mod lookup;
mod onto;
mod rename;
mod restack;
mod track;

pub use edit::{StackEditRequest, parse_stack_edit, render_stack_edit};
pub use onto::BranchOntoRequest;
pub use restack::{RestackOutcome, RestackStatus, UpstackRestack};
pub use track::TrackedBranch;

use strata_forge::Registry;
use strata_git::{GitOps, RebaseRequest};

use crate::config::{Config, RebaseConfig};
use crate::error::Error;
use crate::traits::{BranchStore, Continuation};

/// Service for stack operations with trait-based dependencies.
pub struct StackService<'a, G: GitOps, S: BranchStore> {
    repo: &'a G,
    store: &'a S,
    forges: Registry,
    rebase: RebaseConfig,
}

impl<'a, G: GitOps, S: BranchStore> StackService<'a, G, S> {
    /// Create a service using the built-in forges and default rebase flags.
    #[must_use]
    pub fn new(repo: &'a G, store: &'a S) -> Self {
        Self {
            repo,
            store,
            forges: Registry::builtin(),
            rebase: RebaseConfig::default(),
        }
    }

    /// Take rebase flags from the loaded configuration.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.rebase = config.rebase;
        self
    }

    /// Replace the forge registry used to decode change metadata.
    #[must_use]
    pub fn with_forges(mut self, forges: Registry) -> Self {
        self.forges = forges;
        self
    }

    #[must_use]
    pub const fn repo(&self) -> &'a G {
        self.repo
    }

    #[must_use]
    pub const fn store(&self) -> &'a S {
        self.store
    }

    /// Name of the trunk branch.
    #[must_use]
    pub fn trunk(&self) -> &str {
        self.store.trunk()
    }

    /// Record how to resume `command` if `err` is an interrupted rebase.
    ///
    /// The error is handed back either way so callers can still report it.
    /// Once the user resolves the rebase, the queued continuation re-runs
    /// `command` from `branch`.
    pub fn rescue(&self, err: Error, branch: &str, command: &[&str]) -> Error {
        let Some(interrupt) = err.rebase_interrupt() else {
            return err;
        };

        tracing::info!(
            branch = %interrupt.branch,
            "resolve the conflict and run `strata continue`, or `git rebase --abort` to give up"
        );

        let cont = Continuation {
            branch: branch.to_string(),
            command: command.iter().map(ToString::to_string).collect(),
        };
        if let Err(e) = self.store.append_continuation(cont) {
            tracing::warn!(error = %e, "failed to record rebase continuation");
        }
        err
    }

    fn rebase_request(&self, branch: &str, upstream: String, onto: String) -> RebaseRequest {
        RebaseRequest {
            branch: branch.to_string(),
            upstream,
            onto,
            autostash: self.rebase.autostash,
            quiet: self.rebase.quiet,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::test_mocks::MockGitOps;
    use strata_git::{InterruptKind, RebaseInterrupt};

    #[test]
    fn test_rescue_records_continuation() {
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        let svc = StackService::new(&repo, &store);

        let err = Error::Git(strata_git::Error::RebaseInterrupted(RebaseInterrupt {
            branch: "feat".into(),
            kind: InterruptKind::Conflict,
        }));
        let err = svc.rescue(err, "feat", &["restack", "feat"]);
        assert!(err.rebase_interrupt().is_some());

        let cont = store.take_continuation().unwrap().unwrap();
        assert_eq!(cont.branch, "feat");
        assert_eq!(cont.command, vec!["restack", "feat"]);
    }

    #[test]
    fn test_rescue_ignores_other_errors() {
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        let svc = StackService::new(&repo, &store);

        let err = svc.rescue(Error::Trunk, "feat", &["restack"]);
        assert!(matches!(err, Error::Trunk));
        assert!(store.take_continuation().unwrap().is_none());
    }

    #[test]
    fn test_rebase_flags_follow_config() {
        let repo = MockGitOps::new();
        let store = MemoryStore::new("main");
        let mut config = Config::default();
        config.rebase.autostash = false;

        let svc = StackService::new(&repo, &store).with_config(&config);
        let req = svc.rebase_request("a", "x".into(), "y".into());
        assert!(!req.autostash);
        assert!(req.quiet);
    }
}
