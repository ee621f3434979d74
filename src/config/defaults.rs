//! Default values and configuration presets

#[cfg(test)]
use super::{
    Config, FleetConfig, MetricsConfig, OutputConfig, PollingConfig, TargetConfig, TestConfig,
    UserConfig, parser::RawConfig,
};
#[cfg(test)]
use std::time::Duration;

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const USER_COUNT: u32 = 10;
    pub const FLEET_NAME: &'static str = "scale-test-fleet";
    pub const FLEET_SIZE: u32 = 100;
    pub const NAMESPACE: &'static str = "default";
    pub const IMAGE: &'static str = "gcr.io/agones-images/udp-server:0.5";
    pub const CONTAINER_PORT: u16 = 26000;
    pub const MIN_WAIT: &'static str = "500ms";
    pub const MAX_WAIT: &'static str = "900ms";
    pub const TIMEOUT_SECONDS: u64 = 30;
    pub const METRICS_ADDR: &'static str = "localhost:2003";
    pub const METRICS_NAMESPACE: &'static str = "performance";
    pub const ALLOCATION_DEADLINE: &'static str = "60s";
    pub const SCALE_DEADLINE: &'static str = "10m";
}

#[cfg(test)]
impl Config {
    /// Configuration with every default applied, pointed at `target_url`
    pub fn with_defaults(target_url: String) -> Self {
        let duration = |value| RawConfig::parse_duration(value).expect("valid default duration");
        let deadline = |value| RawConfig::parse_deadline(value).expect("valid default deadline");

        Self {
            target: TargetConfig {
                url: target_url,
                insecure: false,
                headers: vec![],
                timeout: Duration::from_secs(Defaults::TIMEOUT_SECONDS),
            },
            fleet: FleetConfig {
                name: Defaults::FLEET_NAME.to_string(),
                size: Defaults::FLEET_SIZE,
                namespace: Defaults::NAMESPACE.to_string(),
                image: Defaults::IMAGE.to_string(),
                container_port: Defaults::CONTAINER_PORT,
                setup: true,
                delete_on_exit: false,
            },
            users: UserConfig {
                count: Defaults::USER_COUNT,
                min_wait: duration(Defaults::MIN_WAIT),
                max_wait: duration(Defaults::MAX_WAIT),
            },
            test: TestConfig {
                duration: None,
                total_iterations: None,
            },
            polling: PollingConfig {
                allocation_deadline: deadline(Defaults::ALLOCATION_DEADLINE),
                scale_deadline: deadline(Defaults::SCALE_DEADLINE),
                poll_interval: Duration::ZERO,
            },
            metrics: MetricsConfig {
                collector: Some(Defaults::METRICS_ADDR.to_string()),
                namespace: Defaults::METRICS_NAMESPACE.to_string(),
            },
            output: OutputConfig { verbose: false },
        }
    }
}
