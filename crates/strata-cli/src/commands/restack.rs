//! `strata restack` command - Rebase branches onto their bases.
//!
//! Without `--upstack` only the named branch moves. With it, the branch
//! and every branch above it are restacked bottom-up. A conflict stops
//! the run and queues a continuation for `strata continue`.

use anyhow::Result;
use serde::Serialize;
use strata_core::RestackOutcome;

use super::utils::{self, Workspace};
use crate::output;

/// JSON output for restack command.
#[derive(Debug, Serialize)]
struct RestackOutput {
    branch: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    restacked: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

/// Run the restack command.
pub fn run(branch: Option<&str>, upstack: bool, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let svc = ws.service();
    let branch = ws.branch_or_current(branch)?;

    let out = if upstack {
        let result = svc.restack_upstack(&branch).map_err(utils::report)?;
        RestackOutput {
            branch: branch.clone(),
            restacked: result.restacked,
            skipped: result.skipped,
        }
    } else {
        let original = ws.repo.current_branch().ok();
        let outcome = svc
            .restack(&branch)
            .map_err(|e| svc.rescue(e, &branch, &["restack", &branch]))
            .map_err(utils::report)?;
        // The rebase leaves the restacked branch checked out.
        if let Some(original) = original.filter(|o| *o != branch) {
            ws.repo.checkout(&original)?;
        }
        match outcome {
            RestackOutcome::Restacked { .. } => RestackOutput {
                branch: branch.clone(),
                restacked: vec![branch.clone()],
                skipped: Vec::new(),
            },
            RestackOutcome::AlreadyRestacked => RestackOutput {
                branch: branch.clone(),
                restacked: Vec::new(),
                skipped: vec![branch.clone()],
            },
        }
    };

    if json {
        output::essential(&serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for name in &out.restacked {
        output::success(&format!("Restacked '{name}'"));
    }
    for name in &out.skipped {
        output::info(&format!("'{name}' is already up to date"));
    }

    Ok(())
}
