use anyhow::{Context, Result, bail};
use strata_core::{BranchStore, Config, StackService, State};
use strata_git::Repository;

use crate::output;

/// An opened repository with its strata state and configuration.
pub struct Workspace {
    pub repo: Repository,
    pub state: State,
    pub config: Config,
}

impl Workspace {
    /// Open the repository containing the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::open_current().context("Not inside a git repository")?;
        let state = State::open(repo.git_dir())?;
        let config = Config::load(state.config_path()).context("Failed to load config")?;

        Ok(Self {
            repo,
            state,
            config,
        })
    }

    /// A stack service over this workspace.
    pub fn service(&self) -> StackService<'_, Repository, State> {
        StackService::new(&self.repo, &self.state).with_config(&self.config)
    }

    /// `branch`, or the checked-out branch when `None`.
    pub fn branch_or_current(&self, branch: Option<&str>) -> Result<String> {
        match branch {
            Some(b) => Ok(b.to_string()),
            None => current_branch(&self.repo),
        }
    }

    pub fn trunk(&self) -> &str {
        self.state.trunk()
    }
}

/// Name of the checked-out branch.
/// If HEAD is detached, prints guidance and returns an error.
pub fn current_branch(repo: &Repository) -> Result<String> {
    match repo.current_branch() {
        Ok(name) => Ok(name),
        Err(strata_git::Error::DetachedHead) => {
            output::error_detached_head();
            bail!("");
        }
        Err(e) => Err(e.into()),
    }
}

/// Turn a core error into a CLI error, printing recovery steps for rebase
/// interruptions first.
pub fn report(err: strata_core::Error) -> anyhow::Error {
    if let Some(interrupt) = err.rebase_interrupt() {
        output::rebase_interrupted(interrupt);
    }
    err.into()
}
