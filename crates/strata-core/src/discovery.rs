//! Finding the untracked branches below a branch.
//!
//! Discovery walks the history of a branch down towards trunk. Whenever
//! the walk passes a commit that other local branches point at, a
//! [`BaseSelector`] decides which of them, if any, becomes the base of
//! the branch being resolved. A chosen untracked branch then needs a base
//! of its own, so the walk continues with it. The walk ends at a tracked
//! branch, at trunk, or when history runs out; in the last case the
//! remaining branch is based on trunk.

use std::collections::{HashMap, HashSet};

use strata_git::{CommitRange, GitOps, Oid};

use crate::error::{Error, Result};

/// Picks a base for a branch among the branches at a commit.
#[allow(clippy::missing_errors_doc)]
pub trait BaseSelector {
    /// Choose the base of `branch` from `candidates`, all pointing at `commit`.
    ///
    /// `selected` lists what was already chosen at this commit, nearest
    /// to `branch` first. Returning `None` skips the commit.
    fn select_base(
        &mut self,
        branch: &str,
        commit: Oid,
        candidates: &[String],
        selected: &[String],
    ) -> Result<Option<String>>;
}

/// Selector for runs without a terminal.
///
/// A lone candidate is picked. Several candidates are an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractiveSelector;

impl BaseSelector for NonInteractiveSelector {
    fn select_base(
        &mut self,
        branch: &str,
        commit: Oid,
        candidates: &[String],
        _selected: &[String],
    ) -> Result<Option<String>> {
        match candidates {
            [] => Ok(None),
            [only] => Ok(Some(only.clone())),
            _ => Err(Error::AmbiguousBase {
                branch: branch.to_string(),
                commit,
                candidates: candidates.to_vec(),
            }),
        }
    }
}

/// A branch found by discovery, with the base it should be tracked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchToTrack {
    pub name: String,
    pub base: String,
    pub base_hash: Oid,
}

/// Walks history below a branch to find the branches it is stacked on.
pub struct DownstackDiscoverer<'a, G: GitOps> {
    repo: &'a G,
    selector: &'a mut dyn BaseSelector,
    trunk: String,
    trunk_hash: Oid,
    by_hash: HashMap<Oid, Vec<String>>,
    heads: HashMap<String, Oid>,
    tracked: HashSet<String>,
}

impl<'a, G: GitOps> DownstackDiscoverer<'a, G> {
    /// Index the local branches of `repo`.
    ///
    /// `tracked` holds the branches that already have a base; discovery
    /// stops when it reaches one of them.
    ///
    /// # Errors
    /// Returns [`Error::TrunkMissing`] if trunk is not a local branch.
    pub fn new(
        repo: &'a G,
        trunk: impl Into<String>,
        tracked: HashSet<String>,
        selector: &'a mut dyn BaseSelector,
    ) -> Result<Self> {
        let trunk = trunk.into();
        let mut by_hash: HashMap<Oid, Vec<String>> = HashMap::new();
        let mut heads = HashMap::new();
        for branch in repo.local_branches()? {
            by_hash.entry(branch.head).or_default().push(branch.name.clone());
            heads.insert(branch.name, branch.head);
        }

        let Some(&trunk_hash) = heads.get(&trunk) else {
            return Err(Error::TrunkMissing(trunk));
        };

        Ok(Self {
            repo,
            selector,
            trunk,
            trunk_hash,
            by_hash,
            heads,
            tracked,
        })
    }

    /// Discover `branch` and the untracked branches below it.
    ///
    /// The result is top-down: `branch` first, and last the branch whose
    /// base is trunk or an already tracked branch.
    ///
    /// # Errors
    /// Returns error if `branch` does not exist, history cannot be read,
    /// or the selector fails.
    pub fn discover(&mut self, branch: &str) -> Result<Vec<BranchToTrack>> {
        let Some(&start) = self.heads.get(branch) else {
            return Err(strata_git::Error::BranchNotFound(branch.to_string()).into());
        };

        let mut result = Vec::new();
        let mut planned = HashSet::new();
        let mut next = branch.to_string();

        let repo = self.repo;
        let range = CommitRange::starting_at(start).excluding(self.trunk_hash);
        for commit in repo.list_commits(&range)? {
            let commit = commit?;

            let mut here: Vec<String> = self
                .by_hash
                .get(&commit)
                .into_iter()
                .flatten()
                .filter(|name| **name != next)
                .cloned()
                .collect();
            if here.is_empty() {
                continue;
            }
            here.sort();

            for base in self.select_bases(&next, commit, here)? {
                tracing::debug!(branch = %next, base = %base, "adding branch to track");
                result.push(BranchToTrack {
                    name: next.clone(),
                    base: base.clone(),
                    base_hash: commit,
                });
                planned.insert(next.clone());

                if self.is_terminal(&base) {
                    return Ok(result);
                }
                next = base;
            }
        }

        // History ran out before a base was found for the last branch.
        if !planned.contains(&next) {
            result.push(BranchToTrack {
                name: next,
                base: self.trunk.clone(),
                base_hash: self.trunk_hash,
            });
        }

        Ok(result)
    }

    /// Ask the selector for a chain of bases among the branches at `commit`.
    ///
    /// The first entry is the base of `branch`, the next the base of that,
    /// and so on.
    fn select_bases(
        &mut self,
        branch: &str,
        commit: Oid,
        mut remaining: Vec<String>,
    ) -> Result<Vec<String>> {
        let mut head = branch.to_string();
        let mut ordered = Vec::new();

        while !remaining.is_empty() {
            let Some(selected) = self
                .selector
                .select_base(&head, commit, &remaining, &ordered)?
            else {
                break;
            };

            remaining.retain(|b| *b != selected);
            ordered.push(selected.clone());
            if self.is_terminal(&selected) {
                break;
            }
            head = selected;
        }

        Ok(ordered)
    }

    fn is_terminal(&self, branch: &str) -> bool {
        branch == self.trunk || self.tracked.contains(branch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::MockGitOps;

    /// Replays scripted answers and records every question.
    #[derive(Default)]
    struct ScriptedSelector {
        answers: Vec<Option<&'static str>>,
        asked: Vec<(String, Vec<String>, Vec<String>)>,
    }

    impl BaseSelector for ScriptedSelector {
        fn select_base(
            &mut self,
            branch: &str,
            _commit: Oid,
            candidates: &[String],
            selected: &[String],
        ) -> Result<Option<String>> {
            self.asked
                .push((branch.to_string(), candidates.to_vec(), selected.to_vec()));
            Ok(self.answers.remove(0).map(String::from))
        }
    }

    fn names(result: &[BranchToTrack]) -> Vec<(&str, &str)> {
        result
            .iter()
            .map(|b| (b.name.as_str(), b.base.as_str()))
            .collect()
    }

    #[test]
    fn test_discovers_chain() {
        // main -> a -> b -> c -> d, nothing tracked.
        let repo = MockGitOps::new();
        repo.branch_from("a", "main");
        repo.branch_from("b", "a");
        repo.branch_from("c", "b");
        repo.branch_from("d", "c");

        let mut selector = NonInteractiveSelector;
        let mut discoverer =
            DownstackDiscoverer::new(&repo, "main", HashSet::new(), &mut selector).unwrap();
        let result = discoverer.discover("d").unwrap();

        assert_eq!(
            names(&result),
            [("d", "c"), ("c", "b"), ("b", "a"), ("a", "main")]
        );
        assert_eq!(result[0].base_hash, repo.head("c"));
        assert_eq!(result[3].base_hash, repo.head("main"));
    }

    #[test]
    fn test_stops_at_tracked_branch() {
        let repo = MockGitOps::new();
        repo.branch_from("a", "main");
        repo.branch_from("b", "a");
        repo.branch_from("c", "b");

        let tracked = HashSet::from(["a".to_string()]);
        let mut selector = NonInteractiveSelector;
        let mut discoverer = DownstackDiscoverer::new(&repo, "main", tracked, &mut selector).unwrap();

        assert_eq!(
            names(&discoverer.discover("c").unwrap()),
            [("c", "b"), ("b", "a")]
        );
    }

    #[test]
    fn test_lone_branch_goes_on_trunk() {
        let repo = MockGitOps::new();
        repo.branch_from("solo", "main");
        repo.commit("solo");

        let mut selector = NonInteractiveSelector;
        let mut discoverer =
            DownstackDiscoverer::new(&repo, "main", HashSet::new(), &mut selector).unwrap();

        assert_eq!(names(&discoverer.discover("solo").unwrap()), [("solo", "main")]);
    }

    #[test]
    fn test_ambiguous_without_prompt() {
        let repo = MockGitOps::new();
        let x = repo.branch_from("x", "main");
        repo.set_branch("y", x);
        repo.branch_from("top", "x");

        let mut selector = NonInteractiveSelector;
        let mut discoverer =
            DownstackDiscoverer::new(&repo, "main", HashSet::new(), &mut selector).unwrap();

        let err = discoverer.discover("top").unwrap_err();
        match err {
            Error::AmbiguousBase {
                branch,
                commit,
                candidates,
            } => {
                assert_eq!(branch, "top");
                assert_eq!(commit, x);
                assert_eq!(candidates, ["x", "y"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_chain_at_one_commit() {
        // x and y share a commit; the user stacks top on y and y on x.
        let repo = MockGitOps::new();
        let x = repo.branch_from("x", "main");
        repo.set_branch("y", x);
        repo.branch_from("top", "x");

        let mut selector = ScriptedSelector {
            answers: vec![Some("y"), Some("x")],
            ..ScriptedSelector::default()
        };
        let mut discoverer =
            DownstackDiscoverer::new(&repo, "main", HashSet::new(), &mut selector).unwrap();
        let result = discoverer.discover("top").unwrap();

        assert_eq!(
            names(&result),
            [("top", "y"), ("y", "x"), ("x", "main")]
        );
        assert_eq!(result[1].base_hash, x);

        assert_eq!(selector.asked[0].0, "top");
        assert_eq!(selector.asked[1], ("y".into(), vec!["x".into()], vec!["y".into()]));
    }

    #[test]
    fn test_skip_continues_downstack() {
        let repo = MockGitOps::new();
        repo.branch_from("a", "main");
        repo.branch_from("b", "a");

        let mut selector = ScriptedSelector {
            answers: vec![None],
            ..ScriptedSelector::default()
        };
        let mut discoverer =
            DownstackDiscoverer::new(&repo, "main", HashSet::new(), &mut selector).unwrap();

        assert_eq!(names(&discoverer.discover("b").unwrap()), [("b", "main")]);
    }

    #[test]
    fn test_trunk_missing() {
        let repo = MockGitOps::new();
        let mut selector = NonInteractiveSelector;
        assert!(matches!(
            DownstackDiscoverer::new(&repo, "trunk", HashSet::new(), &mut selector),
            Err(Error::TrunkMissing(name)) if name == "trunk"
        ));
    }
}
