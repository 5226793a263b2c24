//! `strata rename` command.

use anyhow::Result;

use super::utils::Workspace;
use crate::output;

/// Rename `old` (or the current branch) to `new`.
pub fn run(old: Option<&str>, new: &str) -> Result<()> {
    let ws = Workspace::open()?;
    let old = ws.branch_or_current(old)?;

    ws.service().rename_branch(&old, new)?;
    output::success(&format!("Renamed '{old}' to '{new}'"));
    Ok(())
}
