//! Command-line argument parsing for load driver configuration

use clap::Parser;
use std::time::Duration;

use super::defaults::Defaults;
use super::{
    Config, FleetConfig, MetricsConfig, OutputConfig, PollingConfig, TargetConfig, TestConfig,
    UserConfig,
};
use crate::errors::{LoadError, Result};

/// Raw configuration from command line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fleet-load",
    version,
    about = "Drives concurrent game server allocations against a fleet control plane and measures allocation latency",
    long_about = None
)]
pub struct RawConfig {
    /// Control plane base URL
    #[arg(
        short = 't',
        long = "host",
        value_name = "URL",
        help = "Control plane base URL (http or https), e.g. http://localhost:8001"
    )]
    pub host: String,

    /// Number of concurrent virtual users
    #[arg(
        short = 'u',
        long = "users",
        value_name = "COUNT",
        default_value_t = Defaults::USER_COUNT,
        help = "Number of concurrent virtual users to spawn"
    )]
    pub users: u32,

    /// Duration of the load test
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "DURATION",
        help = "Duration of the test (e.g., '30s', '5m', '2h')",
        conflicts_with = "iterations"
    )]
    pub duration: Option<String>,

    /// Total number of allocation attempts
    #[arg(
        short = 'n',
        long = "iterations",
        value_name = "COUNT",
        help = "Total number of allocation attempts across all users",
        conflicts_with = "duration"
    )]
    pub iterations: Option<u64>,

    #[arg(long = "fleet-name", value_name = "NAME", default_value = Defaults::FLEET_NAME)]
    pub fleet_name: String,

    #[arg(long = "fleet-size", value_name = "REPLICAS", default_value_t = Defaults::FLEET_SIZE)]
    pub fleet_size: u32,

    #[arg(long = "namespace", value_name = "NAMESPACE", default_value = Defaults::NAMESPACE)]
    pub namespace: String,

    #[arg(
        long = "image",
        value_name = "IMAGE",
        default_value = Defaults::IMAGE,
        help = "Game server container image used when creating the fleet"
    )]
    pub image: String,

    #[arg(
        long = "container-port",
        value_name = "PORT",
        default_value_t = Defaults::CONTAINER_PORT
    )]
    pub container_port: u16,

    #[arg(
        long = "skip-fleet-setup",
        help = "Use an existing fleet instead of creating one and waiting for it to scale"
    )]
    pub skip_fleet_setup: bool,

    #[arg(long = "delete-fleet", help = "Delete the fleet after the test completes")]
    pub delete_fleet: bool,

    #[arg(
        long = "min-wait",
        value_name = "DURATION",
        default_value = Defaults::MIN_WAIT,
        help = "Minimum think time between allocation attempts"
    )]
    pub min_wait: String,

    #[arg(
        long = "max-wait",
        value_name = "DURATION",
        default_value = Defaults::MAX_WAIT,
        help = "Maximum think time between allocation attempts"
    )]
    pub max_wait: String,

    #[arg(
        long = "allocation-deadline",
        value_name = "DURATION",
        default_value = Defaults::ALLOCATION_DEADLINE,
        help = "Give up polling an allocation after this long and report it as timed out ('none' polls forever)"
    )]
    pub allocation_deadline: String,

    #[arg(
        long = "scale-deadline",
        value_name = "DURATION",
        default_value = Defaults::SCALE_DEADLINE,
        help = "Fail setup if the fleet has not scaled within this long ('none' waits forever)"
    )]
    pub scale_deadline: String,

    #[arg(
        long = "poll-interval",
        value_name = "DURATION",
        default_value = "0ms",
        help = "Delay between successive polls of the same resource"
    )]
    pub poll_interval: String,

    /// HTTP request timeout in seconds
    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        default_value_t = Defaults::TIMEOUT_SECONDS,
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        long = "metrics-addr",
        value_name = "HOST:PORT",
        default_value = Defaults::METRICS_ADDR,
        help = "Plaintext metrics collector to forward measurements to"
    )]
    pub metrics_addr: String,

    #[arg(
        long = "metrics-namespace",
        value_name = "PREFIX",
        default_value = Defaults::METRICS_NAMESPACE
    )]
    pub metrics_namespace: String,

    #[arg(long = "no-forward", help = "Do not forward measurements to a metrics collector")]
    pub no_forward: bool,

    /// Custom headers
    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        action = clap::ArgAction::Append,
        help = "Custom headers in 'Key: Value' format (can be used multiple times)"
    )]
    pub headers: Vec<String>,

    /// Allow insecure connections
    #[arg(
        long = "insecure",
        help = "Allow insecure TLS connections (skip certificate verification)"
    )]
    pub insecure: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl RawConfig {
    /// Parse from command line arguments
    pub fn parse_from_args() -> Result<Self> {
        Ok(Self::parse())
    }

    /// Parse duration string with time suffixes (ms/s/m/h)
    pub fn parse_duration(duration_str: &str) -> Result<Duration> {
        let duration_str = duration_str.trim();

        if duration_str.is_empty() {
            return Err(LoadError::config("Duration cannot be empty"));
        }

        let (number_part, unit_ms) = if let Some(n) = duration_str.strip_suffix("ms") {
            (n, 1)
        } else if let Some(n) = duration_str.strip_suffix(['s', 'S']) {
            (n, 1_000)
        } else if let Some(n) = duration_str.strip_suffix(['m', 'M']) {
            (n, 60_000)
        } else if let Some(n) = duration_str.strip_suffix(['h', 'H']) {
            (n, 3_600_000)
        } else {
            // No suffix, assume seconds
            (duration_str, 1_000)
        };

        let value = number_part.trim().parse::<u64>().map_err(|_| {
            LoadError::config(format!(
                "Invalid duration format: '{}' - expected a number with an optional ms/s/m/h suffix",
                duration_str
            ))
        })?;

        Ok(Duration::from_millis(value.saturating_mul(unit_ms)))
    }

    fn parse_optional_duration(value: Option<&str>) -> Result<Option<Duration>> {
        value.map(Self::parse_duration).transpose()
    }

    /// Parse a poller deadline; `none` disables it
    pub fn parse_deadline(value: &str) -> Result<Option<Duration>> {
        if value.trim().eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Self::parse_duration(value).map(Some)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = LoadError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let duration = RawConfig::parse_optional_duration(raw.duration.as_deref())?;
        let allocation_deadline = RawConfig::parse_deadline(&raw.allocation_deadline)?;
        let scale_deadline = RawConfig::parse_deadline(&raw.scale_deadline)?;

        let collector = if raw.no_forward {
            None
        } else {
            Some(raw.metrics_addr)
        };

        Ok(Config {
            target: TargetConfig {
                url: raw.host,
                insecure: raw.insecure,
                headers: raw.headers,
                timeout: Duration::from_secs(raw.timeout),
            },
            fleet: FleetConfig {
                name: raw.fleet_name,
                size: raw.fleet_size,
                namespace: raw.namespace,
                image: raw.image,
                container_port: raw.container_port,
                setup: !raw.skip_fleet_setup,
                delete_on_exit: raw.delete_fleet,
            },
            users: UserConfig {
                count: raw.users,
                min_wait: RawConfig::parse_duration(&raw.min_wait)?,
                max_wait: RawConfig::parse_duration(&raw.max_wait)?,
            },
            test: TestConfig {
                duration,
                total_iterations: raw.iterations,
            },
            polling: PollingConfig {
                allocation_deadline,
                scale_deadline,
                poll_interval: RawConfig::parse_duration(&raw.poll_interval)?,
            },
            metrics: MetricsConfig {
                collector,
                namespace: raw.metrics_namespace,
            },
            output: OutputConfig {
                verbose: raw.verbose,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["fleet-load"];
        argv.extend_from_slice(args);
        RawConfig::try_parse_from(argv)
            .expect("arguments should parse")
            .try_into()
            .expect("conversion should succeed")
    }

    #[test]
    fn test_parse_duration_suffixes() {
        assert_eq!(
            RawConfig::parse_duration("250ms").unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(RawConfig::parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(RawConfig::parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(RawConfig::parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(RawConfig::parse_duration("12").unwrap(), Duration::from_secs(12));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(RawConfig::parse_duration("").is_err());
        assert!(RawConfig::parse_duration("fast").is_err());
        assert!(RawConfig::parse_duration("1.5s").is_err());
    }

    #[test]
    fn test_cli_defaults_match_preset() {
        let config = parse(&["--host", "http://localhost:8001", "-n", "20"]);
        let preset = Config::with_defaults("http://localhost:8001".to_string());
        assert_eq!(config.users.min_wait, preset.users.min_wait);
        assert_eq!(config.users.max_wait, preset.users.max_wait);
        assert_eq!(
            config.polling.allocation_deadline,
            preset.polling.allocation_deadline
        );
        assert_eq!(config.polling.scale_deadline, preset.polling.scale_deadline);
    }

    #[test]
    fn test_defaults_from_cli() {
        let config = parse(&["--host", "http://localhost:8001", "-n", "20"]);
        assert_eq!(config.users.count, 10);
        assert_eq!(config.fleet.name, "scale-test-fleet");
        assert_eq!(config.users.min_wait, Duration::from_millis(500));
        assert_eq!(config.metrics.collector.as_deref(), Some("localhost:2003"));
        assert_eq!(config.metrics.namespace, "performance");
        assert!(config.fleet.setup);
        assert_eq!(
            config.polling.allocation_deadline,
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.polling.scale_deadline, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_deadlines_can_be_disabled() {
        let config = parse(&[
            "--host",
            "http://localhost:8001",
            "-n",
            "20",
            "--allocation-deadline",
            "none",
            "--scale-deadline",
            "NONE",
        ]);
        assert!(config.polling.allocation_deadline.is_none());
        assert!(config.polling.scale_deadline.is_none());
    }

    #[test]
    fn test_no_forward_disables_collector() {
        let config = parse(&["--host", "http://localhost:8001", "-n", "20", "--no-forward"]);
        assert!(config.metrics.collector.is_none());
    }

    #[test]
    fn test_deadlines_are_parsed() {
        let config = parse(&[
            "--host",
            "http://localhost:8001",
            "-d",
            "1m",
            "--allocation-deadline",
            "10s",
            "--scale-deadline",
            "5m",
        ]);
        assert_eq!(config.test.duration, Some(Duration::from_secs(60)));
        assert_eq!(
            config.polling.allocation_deadline,
            Some(Duration::from_secs(10))
        );
        assert_eq!(config.polling.scale_deadline, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_duration_conflicts_with_iterations() {
        let result = RawConfig::try_parse_from([
            "fleet-load",
            "--host",
            "http://localhost:8001",
            "-d",
            "10s",
            "-n",
            "5",
        ]);
        assert!(result.is_err());
    }
}
