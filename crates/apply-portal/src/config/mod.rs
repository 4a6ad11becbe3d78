use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::NaiveDate;

use crate::workflows::applications::CycleTimetable;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cycle: CycleConfig,
    pub features: FeatureFlags,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let current_year = env::var("APPLY_CYCLE_YEAR")
            .unwrap_or_else(|_| "2024".to_string())
            .parse::<i32>()
            .map_err(|_| ConfigError::InvalidCycleYear)?;
        let apply_opens = date_var("APPLY_OPENS_ON", "2023-10-10")?;
        let apply_deadline = date_var("APPLY_DEADLINE", "2024-09-17")?;
        if apply_deadline < apply_opens {
            return Err(ConfigError::InvertedCycleWindow {
                opens: apply_opens,
                deadline: apply_deadline,
            });
        }

        let reject_by_default_warning_days = env::var("APPLY_RBD_WARNING_DAYS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidWarningDays)?;

        let features = FeatureFlags::parse(&env::var("APPLY_FEATURE_FLAGS").unwrap_or_default());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            cycle: CycleConfig {
                current_year,
                apply_opens,
                apply_deadline,
                reject_by_default_warning_days,
            },
            features,
        })
    }
}

fn date_var(name: &'static str, default: &str) -> Result<NaiveDate, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|source| ConfigError::InvalidDate { name, source })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Recruitment cycle settings shared by the submission and task-view rules.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub current_year: i32,
    pub apply_opens: NaiveDate,
    pub apply_deadline: NaiveDate,
    pub reject_by_default_warning_days: u32,
}

impl CycleConfig {
    pub fn timetable(&self) -> CycleTimetable {
        CycleTimetable {
            apply_opens: self.apply_opens,
            apply_deadline: self.apply_deadline,
        }
    }
}

/// Named switches handed to the wizards that branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    SkeOffers,
    StructuredRejectionReasons,
}

impl Feature {
    pub const fn key(self) -> &'static str {
        match self {
            Feature::SkeOffers => "ske_offers",
            Feature::StructuredRejectionReasons => "structured_rejection_reasons",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "ske_offers" => Some(Feature::SkeOffers),
            "structured_rejection_reasons" => Some(Feature::StructuredRejectionReasons),
            _ => None,
        }
    }
}

/// Immutable set of enabled features, passed explicitly into wizard contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    enabled: BTreeSet<Feature>,
}

impl FeatureFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: Feature) -> Self {
        self.enabled.insert(feature);
        self
    }

    pub fn is_active(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    /// Unknown names are ignored so stale deploy config cannot stop the service.
    pub fn parse(raw: &str) -> Self {
        let enabled = raw
            .split(',')
            .map(|key| key.trim().to_ascii_lowercase())
            .filter(|key| !key.is_empty())
            .filter_map(|key| {
                let feature = Feature::from_key(&key);
                if feature.is_none() {
                    tracing::warn!(flag = %key, "ignoring unknown feature flag");
                }
                feature
            })
            .collect();
        Self { enabled }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidCycleYear,
    InvalidWarningDays,
    InvalidDate {
        name: &'static str,
        source: chrono::ParseError,
    },
    InvertedCycleWindow {
        opens: NaiveDate,
        deadline: NaiveDate,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCycleYear => write!(f, "APPLY_CYCLE_YEAR must be a year"),
            ConfigError::InvalidWarningDays => {
                write!(f, "APPLY_RBD_WARNING_DAYS must be a non-negative integer")
            }
            ConfigError::InvalidDate { name, .. } => write!(f, "{name} must be YYYY-MM-DD"),
            ConfigError::InvertedCycleWindow { opens, deadline } => write!(
                f,
                "APPLY_DEADLINE ({deadline}) must not precede APPLY_OPENS_ON ({opens})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidDate { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCycleYear
            | ConfigError::InvalidWarningDays
            | ConfigError::InvertedCycleWindow { .. } => None,
        }
    }
}
