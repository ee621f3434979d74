//! Control plane access
//!
//! The pollers only see the [`ResourceClient`] trait; the reqwest-backed
//! implementation lives in [`http`], request bodies in [`manifests`].

pub mod http;
pub mod manifests;
pub mod model;

pub use http::HttpResourceClient;
pub use model::ResourceSnapshot;

use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

/// REST access to fleet and allocation resources.
///
/// Paths are relative to the control plane base URL; a snapshot's self-link
/// is a valid path.
#[async_trait]
pub trait ResourceClient: Send + Sync + std::fmt::Debug {
    /// Fetch the current snapshot of a resource
    async fn get(&self, path: &str) -> Result<ResourceSnapshot>;

    /// Create a resource and return the control plane's first snapshot of it
    async fn post(&self, path: &str, body: &Value) -> Result<ResourceSnapshot>;

    /// Delete a resource; deleting something already gone succeeds
    async fn delete(&self, path: &str) -> Result<()>;
}
