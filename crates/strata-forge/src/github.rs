//! GitHub pull request metadata.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::forge::{ChangeMetadata, Forge};

/// Forge ID for GitHub.
pub const ID: &str = "github";

/// The GitHub forge.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHub;

/// A pull request submitted for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMetadata {
    /// PR number.
    pub number: u64,

    /// PR URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// ID of the stack navigation comment posted on the PR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<u64>,
}

impl ChangeMetadata for PullRequestMetadata {
    fn forge_id(&self) -> &'static str {
        ID
    }

    fn change_id(&self) -> String {
        format!("#{}", self.number)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Forge for GitHub {
    fn id(&self) -> &'static str {
        ID
    }

    fn marshal_change_metadata(&self, md: &dyn ChangeMetadata) -> Result<Value> {
        let pr = md
            .as_any()
            .downcast_ref::<PullRequestMetadata>()
            .ok_or(Error::ForgeMismatch {
                expected: ID,
                actual: md.forge_id(),
            })?;
        Ok(serde_json::to_value(pr)?)
    }

    fn unmarshal_change_metadata(&self, raw: &Value) -> Result<Arc<dyn ChangeMetadata>> {
        let pr: PullRequestMetadata = serde_json::from_value(raw.clone())?;
        Ok(Arc::new(pr))
    }
}
