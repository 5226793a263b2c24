//! `strata track` and `strata untrack` commands.

use anyhow::Result;

use super::utils::Workspace;
use crate::{output, prompt};

/// Options for the track command.
#[derive(Debug)]
pub struct TrackOptions<'a> {
    pub branch: Option<&'a str>,
    pub base: Option<&'a str>,
    pub downstack: bool,
    pub no_prompt: bool,
}

/// Run the track command.
pub fn run(opts: &TrackOptions<'_>) -> Result<()> {
    let ws = Workspace::open()?;
    let svc = ws.service();
    let branch = ws.branch_or_current(opts.branch)?;

    if opts.downstack {
        let mut selector = prompt::selector(ws.config.track.interactive && !opts.no_prompt);
        let tracked = svc.track_downstack(&branch, selector.as_mut())?;
        if tracked.is_empty() {
            output::info(&format!("'{branch}' is already tracked"));
        }
        for b in &tracked {
            output::success(&format!("Tracking '{}' on '{}'", b.name, b.base));
        }
        return Ok(());
    }

    let tracked = svc.track_branch(&branch, opts.base)?;
    output::success(&format!("Tracking '{branch}' on '{}'", tracked.base));
    if tracked.needs_restack {
        output::warn(&format!("'{branch}' is behind '{}'", tracked.base));
        output::detail(&format!("  Run `strata restack {branch}` to bring it up to date"));
    }

    Ok(())
}

/// Run the untrack command.
pub fn run_untrack(branch: &str) -> Result<()> {
    let ws = Workspace::open()?;
    ws.service().forget_branch(branch)?;
    output::success(&format!("Stopped tracking '{branch}'"));
    Ok(())
}
