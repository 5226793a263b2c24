//! GitLab merge request metadata.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::forge::{ChangeMetadata, Forge};

/// Forge ID for GitLab.
pub const ID: &str = "gitlab";

/// The GitLab forge.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitLab;

/// A merge request submitted for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestMetadata {
    /// Project-scoped MR number.
    pub iid: u64,

    /// MR URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChangeMetadata for MergeRequestMetadata {
    fn forge_id(&self) -> &'static str {
        ID
    }

    fn change_id(&self) -> String {
        format!("!{}", self.iid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Forge for GitLab {
    fn id(&self) -> &'static str {
        ID
    }

    fn marshal_change_metadata(&self, md: &dyn ChangeMetadata) -> Result<Value> {
        let mr = md
            .as_any()
            .downcast_ref::<MergeRequestMetadata>()
            .ok_or(Error::ForgeMismatch {
                expected: ID,
                actual: md.forge_id(),
            })?;
        Ok(serde_json::to_value(mr)?)
    }

    fn unmarshal_change_metadata(&self, raw: &Value) -> Result<Arc<dyn ChangeMetadata>> {
        let mr: MergeRequestMetadata = serde_json::from_value(raw.clone())?;
        Ok(Arc::new(mr))
    }
}
