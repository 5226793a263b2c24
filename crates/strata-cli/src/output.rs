//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use strata_git::{InterruptKind, RebaseInterrupt};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print the detached HEAD error message with guidance (always to stderr).
pub fn error_detached_head() {
    error("Cannot run this command in detached HEAD state.");
    eprintln!();
    eprintln!("You are not on any branch. Either check out a branch:");
    eprintln!("  git checkout <branch-name>");
    eprintln!("or name the branch explicitly, e.g. `strata restack <branch-name>`.");
}

/// Print what to do after a rebase stopped (always to stderr).
pub fn rebase_interrupted(interrupt: &RebaseInterrupt) {
    warn(&interrupt.to_string());
    eprintln!();
    match interrupt.kind {
        InterruptKind::Conflict => {
            eprintln!("Resolve the conflicts and stage the files, then run:");
        }
        InterruptKind::Deliberate => {
            eprintln!("When you are done with the paused commit, run:");
        }
    }
    eprintln!("  strata continue");
    eprintln!("To give up on the remaining operations, run:");
    eprintln!("  strata abort");
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
///
/// Use for indented detail lines that accompany info or warn messages.
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like JSON.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Get a colored branch name with current indicator.
#[must_use]
pub fn branch_name(name: &str, is_current: bool) -> String {
    if is_current {
        format!("{} {}", "▶".cyan(), name.cyan().bold())
    } else {
        format!("  {name}")
    }
}

/// Format a published change reference such as `#12` or `!7`.
#[must_use]
pub fn change_ref(change_id: Option<&str>) -> String {
    change_id.map_or_else(String::new, |id| id.dimmed().to_string())
}

/// Marker shown next to branches that are behind their base.
#[must_use]
pub fn restack_marker(needs_restack: bool) -> String {
    if needs_restack {
        "(needs restack)".yellow().to_string()
    } else {
        String::new()
    }
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}
