//! Interactive base selection during downstack discovery.

use std::io::{self, IsTerminal};

use inquire::{InquireError, Select};
use strata_core::{BaseSelector, NonInteractiveSelector};
use strata_git::{Oid, short};

const NONE_OF_THESE: &str = "None of these";

/// Asks the user which branch a branch is stacked on.
///
/// Every candidate is offered alongside "None of these", even a lone one,
/// so a stale branch pointing into the history can be skipped.
#[derive(Debug, Default)]
pub struct PromptSelector;

impl BaseSelector for PromptSelector {
    fn select_base(
        &mut self,
        branch: &str,
        commit: Oid,
        candidates: &[String],
        selected: &[String],
    ) -> strata_core::Result<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let (options, help) = prompt_options(commit, candidates, selected);
        let choice = Select::new(&format!("Select a base for {branch}:"), options)
            .with_help_message(&help)
            .with_page_size(10)
            .prompt()
            .map_err(prompt_error)?;

        Ok(chosen_base(choice))
    }
}

/// Options for the base prompt and its help line.
fn prompt_options(
    commit: Oid,
    candidates: &[String],
    selected: &[String],
) -> (Vec<String>, String) {
    let mut options = candidates.to_vec();
    options.push(NONE_OF_THESE.to_string());

    let mut help = if let [only] = candidates {
        format!("{only} points at {}; track it as the base or skip it", short(commit))
    } else {
        format!("{} branches point at {}", candidates.len(), short(commit))
    };
    if !selected.is_empty() {
        help.push_str(&format!("; already stacked here: {}", selected.join(", ")));
    }
    (options, help)
}

fn chosen_base(choice: String) -> Option<String> {
    (choice != NONE_OF_THESE).then_some(choice)
}

/// Pick a selector: prompt only when allowed and a terminal is attached.
pub fn selector(interactive: bool) -> Box<dyn BaseSelector> {
    if interactive && io::stdin().is_terminal() {
        Box::new(PromptSelector)
    } else {
        Box::new(NonInteractiveSelector)
    }
}

fn prompt_error(err: InquireError) -> strata_core::Error {
    let kind = match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            io::ErrorKind::Interrupted
        }
        _ => io::ErrorKind::Other,
    };
    strata_core::Error::Io(io::Error::new(kind, format!("prompt failed: {err}")))
}
