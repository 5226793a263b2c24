//! Validated, batched updates to a [`BranchStore`].

use std::collections::{BTreeSet, HashMap, HashSet};

use strata_git::Oid;

use crate::error::{Error, Result};
use crate::traits::{BranchRecord, BranchStore, ChangeRecord, UpdateRequest};

/// A request to add or update a tracked branch.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertRequest {
    /// Branch to update.
    pub name: String,
    /// New base. Required when the branch is not tracked yet.
    pub base: Option<String>,
    /// New last-known base commit.
    pub base_hash: Option<Oid>,
    /// New change metadata. `Some(None)` clears it.
    pub change: Option<Option<ChangeRecord>>,
    /// New upstream branch. `Some(None)` clears it.
    pub upstream_branch: Option<Option<String>>,
    /// Replacement merged-downstack history.
    pub merged_downstack: Option<Vec<String>>,
}

impl UpsertRequest {
    /// An upsert that changes nothing yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub const fn with_base_hash(mut self, hash: Oid) -> Self {
        self.base_hash = Some(hash);
        self
    }

    #[must_use]
    pub fn with_change(mut self, change: Option<ChangeRecord>) -> Self {
        self.change = Some(change);
        self
    }

    #[must_use]
    pub fn with_upstream_branch(mut self, upstream: Option<String>) -> Self {
        self.upstream_branch = Some(upstream);
        self
    }

    #[must_use]
    pub fn with_merged_downstack(mut self, merged: Vec<String>) -> Self {
        self.merged_downstack = Some(merged);
        self
    }
}

/// A transaction against a [`BranchStore`].
///
/// Upserts and deletes are validated as they are staged, against the store
/// plus everything staged so far. Nothing is written until [`BranchTx::commit`].
///
/// Validation rules:
/// - the trunk is never stored
/// - new branches need a base
/// - a base is either trunk or a tracked branch
/// - a base change may not introduce a cycle
/// - a branch cannot be deleted while another branch is based on it
pub struct BranchTx<'a, S: BranchStore + ?Sized> {
    store: &'a S,
    states: HashMap<String, BranchRecord>,
    sets: BTreeSet<String>,
    dels: BTreeSet<String>,
}

impl<'a, S: BranchStore + ?Sized> BranchTx<'a, S> {
    /// Start an empty transaction.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            states: HashMap::new(),
            sets: BTreeSet::new(),
            dels: BTreeSet::new(),
        }
    }

    /// Whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.dels.is_empty()
    }

    /// Stage adding or updating a branch.
    ///
    /// # Errors
    /// Returns an error if the request violates a store invariant.
    /// Nothing is staged in that case.
    pub fn upsert(&mut self, req: UpsertRequest) -> Result<()> {
        if req.name.is_empty() {
            return Err(Error::EmptyBranchName);
        }
        let trunk = self.store.trunk().to_string();
        if req.name == trunk {
            return Err(Error::Trunk);
        }

        let base = req.base.filter(|b| !b.is_empty());
        let mut record = match self.state(&req.name) {
            Ok(record) => record,
            Err(Error::NotTracked(_)) => {
                let Some(base) = base.clone() else {
                    return Err(Error::MissingBase(req.name));
                };
                BranchRecord::new(base, Oid::zero())
            }
            Err(e) => return Err(e),
        };

        if let Some(base) = base {
            if base != trunk {
                match self.state(&base) {
                    Ok(_) => {}
                    Err(Error::NotTracked(_)) => return Err(Error::BaseNotTracked(base)),
                    Err(e) => return Err(e),
                }

                // name -> base is only safe if base cannot already reach name.
                let path = self.path(&base, &req.name)?;
                if !path.is_empty() {
                    return Err(Error::Cycle(path));
                }
            }
            record.base = base;
        }

        if let Some(hash) = req.base_hash {
            record.base_hash = hash;
        }
        if let Some(change) = req.change {
            record.change = change;
        }
        if let Some(upstream) = req.upstream_branch {
            record.upstream_branch = upstream.filter(|u| !u.is_empty());
        }
        if let Some(merged) = req.merged_downstack {
            record.merged_downstack = merged;
        }

        self.dels.remove(&req.name);
        self.sets.insert(req.name.clone());
        self.states.insert(req.name, record);
        Ok(())
    }

    /// Stage removing a branch.
    ///
    /// # Errors
    /// Returns [`Error::NotTracked`] if the branch is not tracked and
    /// [`Error::BranchNeeded`] if other branches are still based on it.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyBranchName);
        }
        if name == self.store.trunk() {
            return Err(Error::Trunk);
        }

        self.state(name)?;

        let aboves = self.aboves(name)?;
        if !aboves.is_empty() {
            return Err(Error::BranchNeeded {
                branch: name.to_string(),
                aboves,
            });
        }

        self.sets.remove(name);
        self.states.remove(name);
        self.dels.insert(name.to_string());
        Ok(())
    }

    /// Persist everything staged. A transaction with no changes is a no-op.
    ///
    /// # Errors
    /// Returns error if the store cannot be written.
    pub fn commit(mut self, message: impl Into<String>) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut sets = Vec::with_capacity(self.sets.len());
        for name in std::mem::take(&mut self.sets) {
            if let Some(record) = self.states.remove(&name) {
                sets.push((name, record));
            }
        }

        self.store.update(UpdateRequest {
            sets,
            deletes: std::mem::take(&mut self.dels).into_iter().collect(),
            message: message.into(),
        })
    }

    /// Current view of a branch: staged state first, then the store.
    fn state(&mut self, name: &str) -> Result<BranchRecord> {
        if self.dels.contains(name) {
            return Err(Error::NotTracked(name.to_string()));
        }
        if let Some(record) = self.states.get(name) {
            return Ok(record.clone());
        }

        let record = self.store.lookup(name)?;
        self.states.insert(name.to_string(), record.clone());
        Ok(record)
    }

    /// Tracked branches as seen through this transaction.
    fn list(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.sets.iter().cloned().collect();
        names.extend(self.store.list()?);
        Ok(names
            .into_iter()
            .filter(|name| !self.dels.contains(name))
            .collect())
    }

    fn aboves(&mut self, name: &str) -> Result<Vec<String>> {
        let mut aboves = Vec::new();
        for branch in self.list()? {
            if self.state(&branch)?.base == name {
                aboves.push(branch);
            }
        }
        Ok(aboves)
    }

    /// Base chain leading from `from` to `to`, or empty if `from` never reaches `to`.
    fn path(&mut self, from: &str, to: &str) -> Result<Vec<String>> {
        let trunk = self.store.trunk().to_string();
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        let mut current = from.to_string();

        while current != to {
            if current == trunk {
                return Ok(Vec::new());
            }
            if !seen.insert(current.clone()) {
                // Already cyclic; the store was corrupted outside a transaction.
                path.push(current);
                return Err(Error::Cycle(path));
            }

            let record = match self.state(&current) {
                Ok(record) => record,
                Err(Error::NotTracked(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };
            path.push(current);
            current = record.base;
        }

        path.push(to.to_string());
        Ok(path)
    }
}
