//! Forge capability traits and the registry that selects them by ID.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::github::GitHub;
use crate::gitlab::GitLab;

/// Metadata about a change (pull request, merge request) published to a forge.
///
/// The stack engine treats this as opaque: it only stores it, carries it
/// across renames, and hands it back to the forge that produced it.
pub trait ChangeMetadata: fmt::Debug + Send + Sync {
    /// ID of the forge that owns this metadata.
    fn forge_id(&self) -> &'static str;

    /// Human-readable identifier for the change, e.g. `#42` or `!7`.
    fn change_id(&self) -> String;

    /// Access the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A forge that can persist and restore its change metadata.
#[allow(clippy::missing_errors_doc)]
pub trait Forge: Send + Sync {
    /// Unique, stable ID stored next to serialized metadata.
    fn id(&self) -> &'static str;

    /// Serialize metadata owned by this forge.
    fn marshal_change_metadata(&self, md: &dyn ChangeMetadata) -> Result<Value>;

    /// Restore metadata previously produced by [`Forge::marshal_change_metadata`].
    fn unmarshal_change_metadata(&self, raw: &Value) -> Result<Arc<dyn ChangeMetadata>>;
}

/// Set of known forges, keyed by ID.
#[derive(Clone, Default)]
pub struct Registry {
    forges: BTreeMap<&'static str, Arc<dyn Forge>>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every forge shipped in this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GitHub));
        registry.register(Arc::new(GitLab));
        registry
    }

    /// Register a forge, replacing any previous forge with the same ID.
    pub fn register(&mut self, forge: Arc<dyn Forge>) {
        self.forges.insert(forge.id(), forge);
    }

    /// Look up a forge by ID.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Forge>> {
        self.forges.get(id).cloned()
    }

    /// Registered forge IDs in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.forges.keys().copied().collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("forges", &self.ids()).finish()
    }
}
