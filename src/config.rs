use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::model::TruckSpec;
use crate::optimizer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "TRUCK_PACKER_API_HOST";
    const PORT_VAR: &'static str = "TRUCK_PACKER_API_PORT";

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Truck type and packing tolerances for every run of this process.
#[derive(Clone, Debug, Default)]
pub struct OptimizerConfig {
    truck: TruckSpec,
    packing: PackingConfig,
}

impl OptimizerConfig {
    const TRUCK_LENGTH_VAR: &'static str = "TRUCK_PACKER_TRUCK_LENGTH";
    const TRUCK_WIDTH_VAR: &'static str = "TRUCK_PACKER_TRUCK_WIDTH";
    const TRUCK_HEIGHT_VAR: &'static str = "TRUCK_PACKER_TRUCK_HEIGHT";
    const TRUCK_MAX_WEIGHT_VAR: &'static str = "TRUCK_PACKER_TRUCK_MAX_WEIGHT";
    const OVERLAP_EPSILON_VAR: &'static str = "TRUCK_PACKER_OVERLAP_EPSILON";
    const SUPPORT_HEIGHT_EPSILON_VAR: &'static str = "TRUCK_PACKER_SUPPORT_HEIGHT_EPSILON";
    const SUPPORT_RATIO_VAR: &'static str = "TRUCK_PACKER_MIN_SUPPORT_RATIO";
    const STACK_LEVELS_VAR: &'static str = "TRUCK_PACKER_DEFAULT_MAX_STACK_LEVELS";

    fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    /// Builds the configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dimension = |var: &str, default: f64| {
            parse_f64_value(
                var,
                lookup(var),
                default,
                |value| value > 0.0,
                "must be greater than 0",
                "Custom truck dimension",
            )
        };

        let length = dimension(Self::TRUCK_LENGTH_VAR, TruckSpec::DEFAULT_LENGTH);
        let width = dimension(Self::TRUCK_WIDTH_VAR, TruckSpec::DEFAULT_WIDTH);
        let height = dimension(Self::TRUCK_HEIGHT_VAR, TruckSpec::DEFAULT_HEIGHT);
        let max_weight = parse_f64_value(
            Self::TRUCK_MAX_WEIGHT_VAR,
            lookup(Self::TRUCK_MAX_WEIGHT_VAR),
            TruckSpec::DEFAULT_MAX_WEIGHT,
            |value| value > 0.0,
            "must be greater than 0",
            "Custom truck weight limit",
        );

        let truck = match TruckSpec::new((length, width, height), max_weight) {
            Ok(spec) => spec,
            Err(err) => {
                warn!("Invalid truck configuration: {}. Using defaults.", err);
                TruckSpec::default()
            }
        };

        let overlap_epsilon = parse_f64_value(
            Self::OVERLAP_EPSILON_VAR,
            lookup(Self::OVERLAP_EPSILON_VAR),
            PackingConfig::DEFAULT_OVERLAP_EPSILON,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted overlap tolerance may let items interpenetrate",
        );

        let support_height_epsilon = parse_f64_value(
            Self::SUPPORT_HEIGHT_EPSILON_VAR,
            lookup(Self::SUPPORT_HEIGHT_EPSILON_VAR),
            PackingConfig::DEFAULT_SUPPORT_HEIGHT_EPSILON,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted height tolerance may cause unexpected placements",
        );

        let min_support_ratio = parse_f64_value(
            Self::SUPPORT_RATIO_VAR,
            lookup(Self::SUPPORT_RATIO_VAR),
            PackingConfig::DEFAULT_MIN_SUPPORT_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted minimum support may lead to unstable stacks",
        );

        let default_max_stack_levels = parse_u32_value(
            Self::STACK_LEVELS_VAR,
            lookup(Self::STACK_LEVELS_VAR),
            PackingConfig::DEFAULT_MAX_STACK_LEVELS,
            |value| value >= 1,
            "must be at least 1",
        );

        let packing = PackingConfig::builder()
            .overlap_epsilon(overlap_epsilon)
            .support_height_epsilon(support_height_epsilon)
            .min_support_ratio(min_support_ratio)
            .default_max_stack_levels(default_max_stack_levels)
            .build();

        Self { truck, packing }
    }

    /// Returns the configured truck type.
    pub fn truck_spec(&self) -> TruckSpec {
        self.truck
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_f64_value(
    var_name: &str,
    raw: Option<String>,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("{} ({} = {}).", notice, var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn parse_u32_value(
    var_name: &str,
    raw: Option<String>,
    default: u32,
    validator: impl Fn(u32) -> bool,
    invalid_hint: &str,
) -> u32 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u32>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as integer: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
