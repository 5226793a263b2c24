//! Read-only snapshot of all tracked branches as a forest rooted at trunk.
//!
//! The graph is built once from a [`BranchLoader`] and never mutated.
//! Operations that change branch relationships load a fresh graph
//! afterwards instead of patching an existing one.

use std::collections::{HashMap, VecDeque};
use std::slice;

use crate::branch::LoadBranchItem;
use crate::error::{Error, Result};

/// Source of the branches a [`BranchGraph`] is built from.
#[allow(clippy::missing_errors_doc)]
pub trait BranchLoader {
    /// Name of the trunk branch.
    fn trunk(&self) -> &str;

    /// All tracked branches.
    fn load_branches(&self) -> Result<Vec<LoadBranchItem>>;
}

/// Forest of tracked branches, indexed by name and by base.
#[derive(Debug, Clone)]
pub struct BranchGraph {
    trunk: String,
    branches: Vec<LoadBranchItem>,
    by_name: HashMap<String, usize>,
    by_base: HashMap<String, Vec<usize>>,
}

impl BranchGraph {
    /// Load all branches from `loader` and index them.
    ///
    /// # Errors
    /// Returns error if the loader fails.
    pub fn new<L: BranchLoader + ?Sized>(loader: &L) -> Result<Self> {
        let branches = loader.load_branches()?;
        Ok(Self::from_items(loader.trunk(), branches))
    }

    /// Index an already loaded set of branches.
    ///
    /// Children are listed in the order the branches are given.
    #[must_use]
    pub fn from_items(trunk: impl Into<String>, branches: Vec<LoadBranchItem>) -> Self {
        let mut by_name = HashMap::with_capacity(branches.len());
        let mut by_base: HashMap<String, Vec<usize>> = HashMap::with_capacity(branches.len());
        for (idx, branch) in branches.iter().enumerate() {
            by_name.insert(branch.name.clone(), idx);
            by_base.entry(branch.base.clone()).or_default().push(idx);
        }

        Self {
            trunk: trunk.into(),
            branches,
            by_name,
            by_base,
        }
    }

    /// Name of the trunk branch.
    #[must_use]
    pub fn trunk(&self) -> &str {
        &self.trunk
    }

    /// Number of tracked branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// All tracked branches, in load order.
    pub fn iter(&self) -> slice::Iter<'_, LoadBranchItem> {
        self.branches.iter()
    }

    /// Look up a tracked branch.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&LoadBranchItem> {
        self.by_name.get(name).map(|&idx| &self.branches[idx])
    }

    /// Branches directly on top of `branch`.
    #[must_use]
    pub fn aboves(&self, branch: &str) -> Aboves<'_> {
        Aboves {
            graph: self,
            indices: self.by_base.get(branch).map_or(&[][..], Vec::as_slice).iter(),
        }
    }

    /// `branch` followed by everything above it, breadth first.
    ///
    /// For trunk this covers every tracked branch.
    #[must_use]
    pub fn upstack<'a>(&'a self, branch: &'a str) -> Upstack<'a> {
        Upstack {
            graph: self,
            queue: VecDeque::from([branch]),
        }
    }

    /// Branches above `branch` that nothing is based on.
    ///
    /// This is `branch` itself if it has no children.
    #[must_use]
    pub fn tops<'a>(&'a self, branch: &'a str) -> Tops<'a> {
        Tops {
            graph: self,
            queue: VecDeque::from([branch]),
        }
    }

    /// `branch` followed by its bases down to, but excluding, trunk.
    ///
    /// Stops early at a base that is not tracked.
    #[must_use]
    pub fn downstack<'a>(&'a self, branch: &'a str) -> Downstack<'a> {
        Downstack {
            graph: self,
            current: Some(branch),
        }
    }

    /// The branch in `branch`'s stack sitting directly on trunk.
    ///
    /// `None` for trunk and for branches whose base chain is broken.
    #[must_use]
    pub fn bottom(&self, branch: &str) -> Option<&str> {
        let mut current = self.lookup(branch)?;
        loop {
            if current.base == self.trunk {
                return Some(&current.name);
            }
            current = self.lookup(&current.base)?;
        }
    }

    /// Every branch connected to `branch` through bases and children,
    /// from the bottom up.
    #[must_use]
    pub fn stack<'a>(&'a self, branch: &'a str) -> Vec<&'a str> {
        let mut stack = self.downstack_below(branch);
        stack.extend(self.upstack(branch));
        stack
    }

    /// Like [`BranchGraph::stack`], but requires a single chain.
    ///
    /// # Errors
    /// Returns [`Error::NonLinearStack`] if `branch` or a branch above it
    /// has more than one child.
    pub fn stack_linear<'a>(&'a self, branch: &'a str) -> Result<Vec<&'a str>> {
        let mut stack = self.downstack_below(branch);
        stack.push(branch);

        let mut current = branch;
        loop {
            let aboves: Vec<&str> = self.aboves(current).collect();
            match aboves.as_slice() {
                [] => return Ok(stack),
                [above] => {
                    stack.push(above);
                    current = above;
                }
                _ => {
                    return Err(Error::NonLinearStack {
                        branch: current.to_string(),
                        aboves: aboves.into_iter().map(String::from).collect(),
                    });
                }
            }
        }
    }

    /// Downstack of `branch` without `branch` itself, bottom first.
    fn downstack_below<'a>(&'a self, branch: &'a str) -> Vec<&'a str> {
        let mut below: Vec<&str> = self.downstack(branch).skip(1).collect();
        below.reverse();
        below
    }
}

impl<'a> IntoIterator for &'a BranchGraph {
    type Item = &'a LoadBranchItem;
    type IntoIter = slice::Iter<'a, LoadBranchItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`BranchGraph::aboves`].
#[derive(Debug, Clone)]
pub struct Aboves<'a> {
    graph: &'a BranchGraph,
    indices: slice::Iter<'a, usize>,
}

impl<'a> Iterator for Aboves<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.indices
            .next()
            .map(|&idx| self.graph.branches[idx].name.as_str())
    }
}

/// Iterator returned by [`BranchGraph::upstack`].
#[derive(Debug, Clone)]
pub struct Upstack<'a> {
    graph: &'a BranchGraph,
    queue: VecDeque<&'a str>,
}

impl<'a> Iterator for Upstack<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.queue.pop_front()?;
        self.queue.extend(self.graph.aboves(current));
        Some(current)
    }
}

/// Iterator returned by [`BranchGraph::tops`].
#[derive(Debug, Clone)]
pub struct Tops<'a> {
    graph: &'a BranchGraph,
    queue: VecDeque<&'a str>,
}

impl<'a> Iterator for Tops<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.queue.pop_front()?;
            let before = self.queue.len();
            self.queue.extend(self.graph.aboves(current));
            if self.queue.len() == before {
                return Some(current);
            }
        }
    }
}

/// Iterator returned by [`BranchGraph::downstack`].
#[derive(Debug, Clone)]
pub struct Downstack<'a> {
    graph: &'a BranchGraph,
    current: Option<&'a str>,
}

impl<'a> Iterator for Downstack<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        if current == self.graph.trunk {
            return None;
        }
        let item = self.graph.lookup(current)?;
        self.current = Some(item.base.as_str());
        Some(current)
    }
}
