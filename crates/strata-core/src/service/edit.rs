//! Reordering the branches of a linear stack.

use std::collections::HashSet;

use strata_git::GitOps;

use super::{BranchOntoRequest, StackService};
use crate::error::{Error, Result};
use crate::traits::{BranchStore, Continuation};

const EDIT_FOOTER: &str = "
# Edit the order of branches by modifying the list above.
# The branch at the bottom of the list will be merged into trunk first.
# Branches above that will be stacked on top of it in the order they appear.
# Branches deleted from the list will not be modified.
#
# Save and quit the editor to apply the changes.
# Delete all lines in the editor to abort the operation.
";

/// A request to reorder a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEditRequest {
    /// Current stack, branch closest to trunk first.
    pub stack: Vec<String>,
    /// Requested order, branch closest to trunk first.
    /// May leave out branches of `stack`, which are then not moved.
    pub order: Vec<String>,
}

/// Render the editor file for a stack given bottom first.
///
/// Branches are listed top first so the file reads like the stack looks.
#[must_use]
pub fn render_stack_edit(stack: &[String]) -> String {
    let mut out = String::new();
    for branch in stack.iter().rev() {
        out.push_str(branch);
        out.push('\n');
    }
    out.push_str(EDIT_FOOTER);
    out
}

/// Parse an edited stack file back into a bottom-first order.
///
/// Blank lines and lines starting with `#` are ignored.
///
/// # Errors
/// Returns [`Error::InvalidStackEdit`] for names not in `originals` or
/// listed twice, and [`Error::StackEditAborted`] if no branches remain.
pub fn parse_stack_edit(text: &str, originals: &[String]) -> Result<Vec<String>> {
    let mut remaining: HashSet<&str> = originals.iter().map(String::as_str).collect();
    let mut order = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !remaining.remove(line) {
            return Err(Error::InvalidStackEdit(format!(
                "branch '{line}' not in the original list, or is duplicated"
            )));
        }
        order.push(line.to_string());
    }

    if order.is_empty() {
        return Err(Error::StackEditAborted);
    }
    order.reverse();
    Ok(order)
}

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Move the branches of a stack into a new order.
    ///
    /// The first branch of `order` goes onto the base of the current
    /// bottom, each following branch onto the one before it. When the
    /// bottom changes, the merged-downstack history of the old bottom
    /// moves to the new one.
    ///
    /// If a rebase stops, the interrupted move and every move after it
    /// are queued as continuations.
    ///
    /// # Errors
    /// Returns [`Error::Trunk`] if the stack contains trunk,
    /// [`Error::StackEditAborted`] for an empty order, and
    /// [`Error::InvalidStackEdit`] for names outside the stack.
    pub fn edit_stack(&self, req: &StackEditRequest) -> Result<()> {
        let Some(bottom_name) = req.stack.first() else {
            return Err(Error::InvalidStackEdit("stack is empty".into()));
        };
        if req.stack.iter().any(|b| b == self.store.trunk()) {
            return Err(Error::Trunk);
        }
        validate_order(&req.stack, &req.order)?;

        let bottom = self.lookup_branch(bottom_name)?;

        let mut base = bottom.base.clone();
        for (idx, branch) in req.order.iter().enumerate() {
            let mut onto = BranchOntoRequest::new(branch, &base);
            if !bottom.merged_downstack.is_empty() {
                if idx == 0 && branch != bottom_name {
                    onto.merged_downstack = Some(bottom.merged_downstack.clone());
                }
                if idx > 0 && branch == bottom_name {
                    onto.merged_downstack = Some(Vec::new());
                }
            }

            if let Err(e) = self.branch_onto(&onto) {
                if e.rebase_interrupt().is_some() {
                    self.queue_moves(&base, &req.order[idx..]);
                }
                return Err(e);
            }
            base.clone_from(branch);
        }

        Ok(())
    }

    /// Queue `onto` continuations stacking `branches` in order on `base`.
    fn queue_moves(&self, base: &str, branches: &[String]) {
        let mut base = base;
        for branch in branches {
            let cont = Continuation {
                branch: branch.clone(),
                command: vec![
                    "onto".into(),
                    "--branch".into(),
                    branch.clone(),
                    base.to_string(),
                ],
            };
            if let Err(e) = self.store.append_continuation(cont) {
                tracing::warn!(branch = %branch, error = %e, "failed to record rebase continuation");
            }
            base = branch;
        }
    }
}

fn validate_order(stack: &[String], order: &[String]) -> Result<()> {
    if order.is_empty() {
        return Err(Error::StackEditAborted);
    }

    let mut remaining: HashSet<&str> = stack.iter().map(String::as_str).collect();
    for branch in order {
        if !remaining.remove(branch.as_str()) {
            return Err(Error::InvalidStackEdit(format!(
                "branch '{branch}' not in the stack, or is duplicated"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::linear_stack;
    use crate::tx::UpsertRequest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_render_top_first() {
        let text = render_stack_edit(&names(&["a", "b", "c"]));
        assert!(text.starts_with("c\nb\na\n"));
        assert!(text.contains("# Delete all lines"));
    }

    #[test]
    fn test_parse_reverses_and_skips_comments() {
        let originals = names(&["a", "b", "c"]);
        let order = parse_stack_edit("  b\n\n# note\na\nc\n", &originals).unwrap();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn test_parse_rejects_unknown_and_duplicates() {
        let originals = names(&["a", "b"]);
        assert!(matches!(
            parse_stack_edit("a\nz\n", &originals),
            Err(Error::InvalidStackEdit(_))
        ));
        assert!(matches!(
            parse_stack_edit("a\na\n", &originals),
            Err(Error::InvalidStackEdit(_))
        ));
    }

    #[test]
    fn test_parse_empty_aborts() {
        let originals = names(&["a"]);
        let text = render_stack_edit(&originals);
        let emptied: String = text.lines().filter(|l| l.starts_with('#')).collect();
        assert!(matches!(
            parse_stack_edit(&emptied, &originals),
            Err(Error::StackEditAborted)
        ));
    }

    #[test]
    fn test_edit_reorders() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);

        svc.edit_stack(&StackEditRequest {
            stack: names(&["a", "b", "c"]),
            order: names(&["c", "a", "b"]),
        })
        .unwrap();

        assert_eq!(store.lookup("c").unwrap().base, "main");
        assert_eq!(store.lookup("a").unwrap().base, "c");
        assert_eq!(store.lookup("b").unwrap().base, "a");
        assert!(repo.is_ancestor(repo.head("c"), repo.head("a")));
        assert!(repo.is_ancestor(repo.head("a"), repo.head("b")));
    }

    #[test]
    fn test_edit_moves_merged_downstack() {
        let (repo, store) = linear_stack();
        let mut tx = store.begin();
        tx.upsert(UpsertRequest::new("a").with_merged_downstack(names(&["#1"])))
            .unwrap();
        tx.commit("merged").unwrap();
        let svc = StackService::new(&repo, &store);

        svc.edit_stack(&StackEditRequest {
            stack: names(&["a", "b", "c"]),
            order: names(&["b", "a", "c"]),
        })
        .unwrap();

        assert_eq!(store.lookup("b").unwrap().merged_downstack, ["#1"]);
        assert!(store.lookup("a").unwrap().merged_downstack.is_empty());
    }

    #[test]
    fn test_edit_rejects_trunk_and_strangers() {
        let (repo, store) = linear_stack();
        let svc = StackService::new(&repo, &store);

        assert!(matches!(
            svc.edit_stack(&StackEditRequest {
                stack: names(&["main", "a"]),
                order: names(&["a"]),
            }),
            Err(Error::Trunk)
        ));
        assert!(matches!(
            svc.edit_stack(&StackEditRequest {
                stack: names(&["a", "b"]),
                order: names(&["b", "x"]),
            }),
            Err(Error::InvalidStackEdit(_))
        ));
        assert!(matches!(
            svc.edit_stack(&StackEditRequest {
                stack: names(&["a", "b"]),
                order: Vec::new(),
            }),
            Err(Error::StackEditAborted)
        ));
    }

    #[test]
    fn test_edit_interrupted_queues_remaining_moves() {
        let (repo, store) = linear_stack();
        let repo = repo.with_conflict("a");
        let svc = StackService::new(&repo, &store);

        let err = svc
            .edit_stack(&StackEditRequest {
                stack: names(&["a", "b", "c"]),
                order: names(&["c", "a", "b"]),
            })
            .unwrap_err();
        assert!(err.rebase_interrupt().is_some());

        let first = store.take_continuation().unwrap().unwrap();
        assert_eq!(first.command, ["onto", "--branch", "a", "c"]);
        let second = store.take_continuation().unwrap().unwrap();
        assert_eq!(second.command, ["onto", "--branch", "b", "a"]);
        assert!(store.take_continuation().unwrap().is_none());
    }
}
