//! `strata continue` and `strata abort` - resolve operations interrupted
//! by a rebase.
//!
//! Commands that stop on a conflict queue what is left of their work as
//! continuations. `continue` finishes the git rebase and replays the
//! queue in order; `abort` drops it.

use anyhow::{Context, Result, bail};
use clap::Parser;
use strata_core::{BranchStore, Continuation};

use super::Cli;
use super::utils::{self, Workspace};
use crate::output;

/// Run the continue command.
pub fn run_continue() -> Result<()> {
    let ws = Workspace::open()?;

    if ws.repo.is_rebasing() {
        ws.repo
            .rebase_continue()
            .map_err(|e| utils::report(e.into()))?;
    }

    // Take the whole queue up front. A continuation that is interrupted
    // again queues its own remainder, and the rest goes in behind it.
    let mut queued: Vec<Continuation> = Vec::new();
    while let Some(cont) = ws.state.take_continuation()? {
        queued.push(cont);
    }

    if queued.is_empty() {
        if ws.repo.is_rebasing() {
            bail!("Rebase is still in progress");
        }
        output::success("Nothing left to continue");
        return Ok(());
    }

    for (idx, cont) in queued.iter().enumerate() {
        tracing::debug!(branch = %cont.branch, command = ?cont.command, "running rebase continuation");
        output::info(&format!("Resuming `strata {}`", cont.command.join(" ")));

        if let Err(e) = replay(&ws, cont) {
            for rest in &queued[idx + 1..] {
                ws.state.append_continuation(rest.clone())?;
            }
            return Err(e);
        }
    }

    output::success("All interrupted operations completed");
    Ok(())
}

/// Run the abort command.
pub fn run_abort() -> Result<()> {
    let ws = Workspace::open()?;

    let dropped = ws.state.clear_continuations()?;

    if ws.repo.is_rebasing() {
        ws.repo.rebase_abort()?;
        output::success("Aborted the rebase in progress");
    } else if dropped == 0 {
        output::info("Nothing to abort");
        return Ok(());
    }

    if dropped > 0 {
        output::detail(&format!("  Dropped {dropped} queued operation(s)"));
    }
    Ok(())
}

fn replay(ws: &Workspace, cont: &Continuation) -> Result<()> {
    ws.repo
        .checkout(&cont.branch)
        .with_context(|| format!("Failed to check out '{}'", cont.branch))?;

    let args = std::iter::once("strata").chain(cont.command.iter().map(String::as_str));
    let cli = Cli::try_parse_from(args)
        .with_context(|| format!("Corrupt rebase continuation: {:?}", cont.command))?;
    super::run(cli.command)
}
