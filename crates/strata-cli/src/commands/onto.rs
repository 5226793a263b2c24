//! `strata onto` command - Move a single branch onto a new base.

use anyhow::Result;
use strata_core::BranchOntoRequest;

use super::utils::{self, Workspace};
use crate::output;

/// Run the onto command.
///
/// Branches above the moved branch are not touched. They still sit on
/// its old commits until they are restacked.
pub fn run(onto: &str, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open()?;
    let svc = ws.service();
    let branch = ws.branch_or_current(branch)?;

    let aboves = svc.list_above(&branch)?;

    svc.branch_onto(&BranchOntoRequest::new(&branch, onto))
        .map_err(|e| svc.rescue(e, &branch, &["onto", "--branch", &branch, onto]))
        .map_err(utils::report)?;

    output::success(&format!("Moved '{branch}' onto '{onto}'"));
    if !aboves.is_empty() {
        output::detail(&format!(
            "  Left in place: {}. Run `strata restack --upstack {branch}` to follow it",
            aboves.join(", ")
        ));
    }
    Ok(())
}
