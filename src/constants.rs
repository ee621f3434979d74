//! Application-wide constants and configuration values

use std::time::Duration;

// Virtual user constants
pub const MAX_USERS_LIMIT: u32 = 10_000;
pub const USER_START_DELAY_MS: u64 = 10;

// Control plane resource layout
pub const API_GROUP_VERSION: &str = "stable.agones.dev/v1alpha1";
pub const FLEET_LABEL_KEY: &str = "stable.agones.dev/fleet";
pub const ALLOCATION_GENERATE_NAME: &str = "gs-allocation-";

// Measured event labels
pub const READY_REPLICAS_LABEL: &str = "ReadyReplicas";

// Default configuration values
pub const EXTRA_CLEANUP_TIME_SECONDS: u64 = 30;

// Progress indication
pub const PROGRESS_DOT_INTERVAL_MS: u64 = 500;
pub const SCALE_PROGRESS_LOG_INTERVAL: u64 = 50;

// Timeout for the orderly close of a metrics connection
pub const FORWARDER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
