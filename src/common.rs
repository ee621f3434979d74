//! Types shared by every virtual user

use crate::config::Config;
use crate::metrics::StatsSink;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Type-safe wrapper for virtual user ID to prevent confusion with other numeric types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UserId(pub u32);

impl From<u32> for UserId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State every virtual user carries
#[derive(Debug)]
pub struct UserCore {
    pub user_id: UserId,
    pub config: Config,
    pub stats: Arc<StatsSink>,
    pub shutdown_rx: broadcast::Receiver<()>,
}

impl UserCore {
    /// Create a new user core with the given parameters
    pub fn new(
        user_id: UserId,
        config: Config,
        stats: Arc<StatsSink>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            user_id,
            config,
            stats,
            shutdown_rx,
        }
    }
}
