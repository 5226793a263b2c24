//! In-memory branch store.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use crate::error::{Error, Result};
use crate::traits::{BranchRecord, BranchStore, Continuation, UpdateRequest};

/// A [`BranchStore`] that keeps everything in memory.
///
/// Used by tests and by callers that need a throwaway view of the state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    trunk: String,
    branches: RefCell<BTreeMap<String, BranchRecord>>,
    continuations: RefCell<VecDeque<Continuation>>,
    log: RefCell<Vec<String>>,
}

impl MemoryStore {
    /// An empty store with the given trunk.
    #[must_use]
    pub fn new(trunk: impl Into<String>) -> Self {
        Self {
            trunk: trunk.into(),
            ..Self::default()
        }
    }

    /// Messages of every committed update, oldest first.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl BranchStore for MemoryStore {
    fn trunk(&self) -> &str {
        &self.trunk
    }

    fn lookup(&self, name: &str) -> Result<BranchRecord> {
        self.branches
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotTracked(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.branches.borrow().keys().cloned().collect())
    }

    fn update(&self, req: UpdateRequest) -> Result<()> {
        if req.is_empty() {
            return Ok(());
        }

        let mut branches = self.branches.borrow_mut();
        for (name, record) in req.sets {
            branches.insert(name, record);
        }
        for name in &req.deletes {
            branches.remove(name);
        }
        self.log.borrow_mut().push(req.message);
        Ok(())
    }

    fn append_continuation(&self, cont: Continuation) -> Result<()> {
        self.continuations.borrow_mut().push_back(cont);
        Ok(())
    }

    fn take_continuation(&self) -> Result<Option<Continuation>> {
        Ok(self.continuations.borrow_mut().pop_front())
    }

    fn clear_continuations(&self) -> Result<usize> {
        Ok(self.continuations.borrow_mut().drain(..).count())
    }
}
