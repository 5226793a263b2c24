//! # strata-core
//!
//! Core library for Strata: the stack engine.
//! Tracks which branch each branch is stacked on, keeps that state in a
//! [`BranchStore`], and rebases, reorders, renames and discovers branches
//! through [`StackService`].

mod branch;
pub mod config;
mod discovery;
mod error;
mod graph;
mod memory;
mod service;
pub mod state;
pub mod traits;
mod tx;

#[cfg(test)]
mod test_mocks;

pub use branch::{LoadBranchItem, LookupBranch};
pub use config::Config;
pub use discovery::{BaseSelector, BranchToTrack, DownstackDiscoverer, NonInteractiveSelector};
pub use error::{Error, Result};
pub use graph::{Aboves, BranchGraph, BranchLoader, Downstack, Tops, Upstack};
pub use memory::MemoryStore;
pub use service::{
    BranchOntoRequest, RestackOutcome, RestackStatus, StackEditRequest, StackService,
    TrackedBranch, UpstackRestack, parse_stack_edit, render_stack_edit,
};
pub use state::{LogEntry, State};
pub use traits::{BranchRecord, BranchStore, ChangeRecord, Continuation, UpdateRequest};
pub use tx::{BranchTx, UpsertRequest};
