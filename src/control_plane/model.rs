//! Resource snapshots returned by the control plane

use crate::errors::{LoadError, Result};
use serde::{Deserialize, Serialize};

/// Object metadata; only the fields the pollers read are modelled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

/// Status written by the control plane once it has reconciled an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_server_name: Option<String>,
}

/// JSON representation of a fleet or allocation at one poll instant.
///
/// `status` is absent until the control plane has processed the object at
/// least once; such a snapshot is never terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

impl ResourceSnapshot {
    /// Handle used to re-fetch this resource
    pub fn self_link(&self) -> Result<&str> {
        self.metadata
            .self_link
            .as_deref()
            .ok_or(LoadError::MissingField("metadata.selfLink"))
    }

    /// Ready replica count, if the status carries one
    pub fn ready_replicas(&self) -> Option<u64> {
        self.status.as_ref().and_then(|s| s.ready_replicas)
    }

    /// Allocation state, if the status carries one
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.state.as_deref())
    }
}
