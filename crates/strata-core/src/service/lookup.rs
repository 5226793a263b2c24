//! Reading tracked branches back out of the store.

use std::collections::HashMap;
use std::sync::Arc;

use strata_forge::ChangeMetadata;
use strata_git::{GitOps, Oid};

use super::StackService;
use crate::branch::{LoadBranchItem, LookupBranch};
use crate::error::{Error, Result};
use crate::graph::{BranchGraph, BranchLoader};
use crate::traits::{BranchStore, ChangeRecord};
use crate::tx::UpsertRequest;

impl<G: GitOps, S: BranchStore> StackService<'_, G, S> {
    /// Look up a tracked branch along with its current head.
    ///
    /// # Errors
    /// - [`Error::DeletedOutOfBand`] if the branch is tracked but gone from git
    /// - [`Error::NotTracked`] if the branch exists but is not tracked
    /// - a git not-found error if the branch exists in neither
    pub fn lookup_branch(&self, name: &str) -> Result<LookupBranch> {
        let record = match self.store.lookup(name) {
            Ok(record) => record,
            Err(Error::NotTracked(_)) => {
                if self.repo.branch_exists(name) {
                    return Err(Error::NotTracked(name.to_string()));
                }
                return Err(strata_git::Error::BranchNotFound(name.to_string()).into());
            }
            Err(e) => return Err(e),
        };

        let head = match self.repo.peel_to_commit(name) {
            Ok(head) => head,
            Err(e) if e.is_not_found() => {
                return Err(Error::DeletedOutOfBand {
                    name: name.to_string(),
                    base: record.base,
                    base_hash: record.base_hash,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let change = self.decode_change(name, record.change.as_ref());
        Ok(LookupBranch {
            base: record.base,
            base_hash: record.base_hash,
            head,
            upstream_branch: record.upstream_branch,
            change,
            merged_downstack: record.merged_downstack,
        })
    }

    /// Load every tracked branch, sorted by name.
    ///
    /// Branches deleted outside strata are dropped from the result and
    /// untracked. Anything based on them is moved down to the nearest
    /// surviving base. Failing to persist that cleanup is logged, not returned.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or a lookup fails for
    /// any other reason.
    pub fn load_branches(&self) -> Result<Vec<LoadBranchItem>> {
        let mut names = self.store.list()?;
        names.sort();

        let mut items = Vec::with_capacity(names.len());
        let mut deleted: HashMap<String, (String, Oid)> = HashMap::new();
        for name in names {
            match self.lookup_branch(&name) {
                Ok(branch) => items.push(LoadBranchItem::from_lookup(name, branch)),
                Err(Error::DeletedOutOfBand {
                    name,
                    base,
                    base_hash,
                }) => {
                    tracing::info!(branch = %name, "branch was deleted outside strata, untracking");
                    deleted.insert(name, (base, base_hash));
                }
                Err(e) => return Err(e),
            }
        }

        if deleted.is_empty() {
            return Ok(items);
        }

        let mut tx = self.store.begin();
        for item in &mut items {
            let mut new_base: Option<(&String, Oid)> = None;
            // Bounded so that a corrupted store cannot loop forever.
            for _ in 0..deleted.len() {
                let current = new_base.map_or(&item.base, |(base, _)| base);
                let Some((base, base_hash)) = deleted.get(current) else {
                    break;
                };
                new_base = Some((base, *base_hash));
            }
            let Some((base, base_hash)) = new_base else {
                continue;
            };

            let req = UpsertRequest::new(&item.name)
                .with_base(base)
                .with_base_hash(base_hash);
            match tx.upsert(req) {
                Ok(()) => {
                    item.base.clone_from(base);
                    item.base_hash = base_hash;
                }
                Err(e) => {
                    tracing::warn!(branch = %item.name, base = %base, error = %e, "failed to move branch");
                }
            }
        }

        // Deleted branches can be stacked on each other, so keep deleting
        // the ones nothing depends on until no more progress is made.
        let mut pending: Vec<String> = deleted.into_keys().collect();
        pending.sort();
        loop {
            let before = pending.len();
            pending.retain(|name| tx.delete(name).is_err());
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for name in &pending {
            tracing::warn!(branch = %name, "could not untrack deleted branch");
        }

        if let Err(e) = tx.commit("clean up deleted branches") {
            tracing::warn!(error = %e, "failed to untrack deleted branches");
        }

        Ok(items)
    }

    /// Snapshot of every tracked branch.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn branch_graph(&self) -> Result<BranchGraph> {
        BranchGraph::new(self)
    }

    /// Branches directly on top of `name`.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn list_above(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.aboves(name).map(String::from).collect())
    }

    /// `name` and everything above it.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn list_upstack(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.upstack(name).map(String::from).collect())
    }

    /// `name` and its bases down to trunk, top first.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn list_downstack(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.downstack(name).map(String::from).collect())
    }

    /// Branches at the top of `name`'s upstack.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn find_top(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.tops(name).map(String::from).collect())
    }

    /// Branch of `name`'s stack that sits on trunk.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn find_bottom(&self, name: &str) -> Result<Option<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.bottom(name).map(String::from))
    }

    /// Every branch in `name`'s stack, bottom first.
    ///
    /// # Errors
    /// Returns error if branches cannot be loaded.
    pub fn list_stack(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        Ok(graph.stack(name).into_iter().map(String::from).collect())
    }

    /// `name`'s stack, bottom first, when it forms a single chain.
    ///
    /// # Errors
    /// Returns [`Error::NonLinearStack`] if the stack forks above `name`.
    pub fn list_stack_linear(&self, name: &str) -> Result<Vec<String>> {
        let graph = self.branch_graph()?;
        let stack = graph.stack_linear(name)?;
        Ok(stack.into_iter().map(String::from).collect())
    }

    fn decode_change(
        &self,
        branch: &str,
        change: Option<&ChangeRecord>,
    ) -> Option<Arc<dyn ChangeMetadata>> {
        let change = change?;
        let Some(forge) = self.forges.lookup(&change.forge) else {
            tracing::warn!(branch, forge = %change.forge, "unknown forge, ignoring change metadata");
            return None;
        };

        match forge.unmarshal_change_metadata(&change.metadata) {
            Ok(md) => Some(md),
            Err(e) => {
                tracing::warn!(branch, forge = %change.forge, error = %e, "corrupt change metadata");
                None
            }
        }
    }
}

impl<G: GitOps, S: BranchStore> BranchLoader for StackService<'_, G, S> {
    fn trunk(&self) -> &str {
        self.store.trunk()
    }

    fn load_branches(&self) -> Result<Vec<LoadBranchItem>> {
        Self::load_branches(self)
    }
}
