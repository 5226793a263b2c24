//! `strata stack edit` command - Reorder a stack in an editor.

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use strata_core::{Error, StackEditRequest, parse_stack_edit, render_stack_edit};

use super::utils::{self, Workspace};
use crate::output;

const EDIT_FILE: &str = "STACK_EDIT";

/// Run the stack edit command.
pub fn run_edit(editor: Option<&str>) -> Result<()> {
    let ws = Workspace::open()?;
    let svc = ws.service();

    let current = utils::current_branch(&ws.repo)?;
    if current == ws.trunk() {
        bail!("Check out a branch of the stack to edit; trunk has no stack of its own");
    }

    let stack = svc.list_stack_linear(&current)?;
    if stack.len() < 2 {
        output::info("Nothing to reorder: the stack has a single branch");
        return Ok(());
    }

    let editor = resolve_editor(editor);
    let path = ws.state.strata_dir().join(EDIT_FILE);
    fs::write(&path, render_stack_edit(&stack))?;
    let edited = run_editor(&editor, &path).and_then(|()| {
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    });
    if let Err(e) = fs::remove_file(&path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove stack edit file");
    }

    let order = match parse_stack_edit(&edited?, &stack) {
        Ok(order) => order,
        Err(Error::StackEditAborted) => {
            output::warn("Stack edit aborted");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if order == stack {
        output::info("Stack order unchanged");
        return Ok(());
    }

    svc.edit_stack(&StackEditRequest {
        stack,
        order: order.clone(),
    })
    .map_err(utils::report)?;
    ws.repo.checkout(&current)?;

    output::success("Reordered stack");
    for branch in order.iter().rev() {
        output::detail(&format!("  {branch}"));
    }
    Ok(())
}

/// Pick the editor the way git does: explicit choice, then the environment.
fn resolve_editor(explicit: Option<&str>) -> String {
    explicit
        .map(String::from)
        .or_else(|| {
            ["GIT_EDITOR", "VISUAL", "EDITOR"]
                .iter()
                .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
        })
        .unwrap_or_else(|| "vi".to_string())
}

/// Run `editor` on `path` through the shell so editors with arguments work.
fn run_editor(editor: &str, path: &Path) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} \"$@\""))
        .arg(editor)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to start editor '{editor}'"))?;

    if !status.success() {
        bail!("Editor '{editor}' exited with {status}");
    }
    Ok(())
}
