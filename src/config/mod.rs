//! Configuration management for the fleet load driver
//!
//! This module provides a clean, layered approach to configuration:
//! - Core structures
//! - CLI argument parsing
//! - Configuration validation
//! - Default value management

pub mod defaults;
pub mod parser;
pub mod validation;

use crate::common::UserId;
use crate::constants::API_GROUP_VERSION;
use crate::errors::{LoadError, Result};
use std::time::Duration;

/// Control plane target configuration
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub insecure: bool,
    pub headers: Vec<String>,
    pub timeout: Duration,
}

/// Fleet that allocations are drawn from
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub name: String,
    pub size: u32,
    pub namespace: String,
    pub image: String,
    pub container_port: u16,
    /// Create the fleet and wait for it to scale before any user starts
    pub setup: bool,
    /// Delete the fleet once all users have finished
    pub delete_on_exit: bool,
}

/// Virtual user configuration
#[derive(Debug, Clone)]
pub struct UserConfig {
    pub count: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

/// Test execution configuration
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub duration: Option<Duration>,
    pub total_iterations: Option<u64>,
}

/// Poller deadlines and pacing
#[derive(Debug, Clone, Default)]
pub struct PollingConfig {
    /// `None` (only when asked for with `none`) polls an allocation until
    /// it reaches a terminal state
    pub allocation_deadline: Option<Duration>,
    /// `None` waits for fleet readiness without bound
    pub scale_deadline: Option<Duration>,
    pub poll_interval: Duration,
}

/// Metrics forwarding configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Collector address; `None` disables forwarding
    pub collector: Option<String>,
    pub namespace: String,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub verbose: bool,
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub target: TargetConfig,
    pub fleet: FleetConfig,
    pub users: UserConfig,
    pub test: TestConfig,
    pub polling: PollingConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Parse and validate configuration from command line arguments
    pub fn from_args() -> Result<Self> {
        let raw_config = parser::RawConfig::parse_from_args()?;
        let config = raw_config.try_into()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Collection path for fleets in the configured namespace
    pub fn fleets_path(&self) -> String {
        format!(
            "/apis/{}/namespaces/{}/fleets",
            API_GROUP_VERSION, self.fleet.namespace
        )
    }

    /// Self-link of the configured fleet
    pub fn fleet_path(&self) -> String {
        format!("{}/{}", self.fleets_path(), self.fleet.name)
    }

    /// Collection path for allocation requests in the configured namespace
    pub fn allocations_path(&self) -> String {
        format!(
            "/apis/{}/namespaces/{}/gameserverallocations",
            API_GROUP_VERSION, self.fleet.namespace
        )
    }

    /// Get custom headers as key-value pairs
    pub fn custom_headers(&self) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        for header in &self.target.headers {
            if let Some((key, value)) = header.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            } else {
                return Err(LoadError::config(format!(
                    "Invalid header format '{}'. Use 'Key: Value' format",
                    header
                )));
            }
        }
        Ok(headers)
    }

    /// Get the test duration as Duration
    pub fn test_duration(&self) -> Option<Duration> {
        self.test.duration
    }

    /// Iteration budget of one user. The remainder of an uneven split goes
    /// one apiece to the lowest user ids, so the budgets add up to the total.
    pub fn iterations_for_user(&self, user_id: UserId) -> Option<u64> {
        let users = u64::from(self.users.count);
        self.test.total_iterations.map(|total| {
            let takes_remainder = u64::from(user_id.0) < total % users;
            total / users + u64::from(takes_remainder)
        })
    }

    /// Per-user share of the iteration budget for summaries, e.g. `2-3`
    pub fn per_user_iterations(&self) -> Option<String> {
        let users = u64::from(self.users.count);
        self.test.total_iterations.map(|total| {
            let base = total / users;
            if total % users == 0 {
                base.to_string()
            } else {
                format!("{}-{}", base, base + 1)
            }
        })
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("🎮 Fleet Allocation Load Test Configuration:");
        println!("   Control Plane:    {}", self.target.url);
        println!(
            "   Fleet:            {}/{} ({} replicas)",
            self.fleet.namespace, self.fleet.name, self.fleet.size
        );
        println!("   Users:            {}", self.users.count);

        match (self.test.duration, self.test.total_iterations) {
            (Some(duration), None) => {
                println!("   Duration:         {}s", duration.as_secs());
            }
            (None, Some(total)) => {
                let per_user = self.per_user_iterations().unwrap_or_default();
                println!("   Iterations:       {}", total);
                println!("   Per User:         {} allocations", per_user);
            }
            _ => {}
        }

        println!(
            "   Think Time:       {}ms - {}ms",
            self.users.min_wait.as_millis(),
            self.users.max_wait.as_millis()
        );

        match self.polling.allocation_deadline {
            Some(deadline) => println!("   Alloc Deadline:   {}ms", deadline.as_millis()),
            None => println!("   Alloc Deadline:   none"),
        }

        match &self.metrics.collector {
            Some(addr) => println!(
                "   Metrics:          {} (namespace '{}')",
                addr, self.metrics.namespace
            ),
            None => println!("   Metrics:          forwarding disabled"),
        }

        if !self.fleet.setup {
            println!("   Fleet Setup:      skipped");
        }

        if !self.target.headers.is_empty() {
            println!("   Custom Headers:   {}", self.target.headers.len());
        }

        if self.target.insecure {
            println!("   Security:         ⚠️  Insecure mode enabled");
        }

        println!();
    }
}
