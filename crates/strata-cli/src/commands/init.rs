//! `strata init` command - Initialize strata in the current repository.

use anyhow::{Context, Result, bail};
use strata_core::State;
use strata_git::Repository;

use super::utils;
use crate::output;

/// Run the init command.
pub fn run(trunk: Option<&str>, remote: Option<&str>) -> Result<()> {
    let repo = Repository::open_current().context("Not inside a git repository")?;

    let trunk = match trunk {
        Some(t) => t.to_string(),
        None => utils::current_branch(&repo)?,
    };
    if !repo.branch_exists(&trunk) {
        bail!("Trunk branch '{trunk}' does not exist");
    }

    let reinit = State::open(repo.git_dir()).is_ok();
    let state = State::init(repo.git_dir(), &trunk, remote)?;

    if reinit {
        output::success(&format!("Reinitialized strata with trunk '{trunk}'"));
    } else {
        output::success(&format!("Initialized strata with trunk '{trunk}'"));
    }
    output::info(&format!("State stored in: {}", state.strata_dir().display()));

    Ok(())
}
