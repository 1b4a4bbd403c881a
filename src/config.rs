// Run configuration and trip file loading

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dispatcher::{DispatchConfig, DEFAULT_REQUESTS_PER_SECOND};
use crate::provider::DEFAULT_ENDPOINT;
use crate::ranking::DEFAULT_PREFERRED_CARRIER;
use crate::trip_spec::TripSpec;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "QPX_API_KEY";

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Could not parse trip file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub dry_run: bool,
    pub cache_enabled: bool,
    // Override whatever the trip file says when set
    pub min_trip_length_days: Option<u32>,
    pub max_trip_length_days: Option<u32>,
    pub requests_per_second: f64,
    pub preferred_carrier: String,
    pub cache_dir: PathBuf,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            cache_enabled: true,
            min_trip_length_days: None,
            max_trip_length_days: None,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            preferred_carrier: DEFAULT_PREFERRED_CARRIER.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            ..Default::default()
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            dry_run: self.dry_run,
            cache_enabled: self.cache_enabled,
            requests_per_second: self.requests_per_second,
        }
    }

    /// Copies the trip length overrides onto the spec.
    pub fn apply_trip_bounds(&self, spec: &mut TripSpec) {
        if let Some(min) = self.min_trip_length_days {
            spec.min_trip_length_days = Some(min);
        }
        if let Some(max) = self.max_trip_length_days {
            spec.max_trip_length_days = Some(max);
        }
    }

    pub fn validate(&self, spec: &TripSpec) -> Result<(), ConfigError> {
        self.dispatch_config()
            .launch_interval()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let (Some(min), Some(max)) = (spec.min_trip_length_days, spec.max_trip_length_days) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "minimum trip length {min} exceeds maximum {max}"
                )));
            }
        }

        if !self.dry_run && self.api_key.is_none() {
            tracing::warn!("No {API_KEY_ENV} set, requests go out unauthenticated");
        }

        Ok(())
    }
}

/// Run flags a trip file may carry next to the trip itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunFlags {
    pub dry_run: Option<bool>,
    #[serde(alias = "cacheOK")]
    pub cache_ok: Option<bool>,
    pub requests_per_second: Option<f64>,
    pub preferred_carrier: Option<String>,
}

/// A trip spec on disk. Trip fields and run flags share one JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripFile {
    pub trip: TripSpec,
    pub flags: RunFlags,
}

impl TripFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Ok(Self {
            trip: TripSpec::deserialize(&value)?,
            flags: RunFlags::deserialize(&value)?,
        })
    }

    /// Splits into the trip spec and `base` updated with the file's flags.
    pub fn into_parts(self, mut base: SearchConfig) -> (TripSpec, SearchConfig) {
        let flags = self.flags;
        if let Some(dry_run) = flags.dry_run {
            base.dry_run = dry_run;
        }
        if let Some(cache_ok) = flags.cache_ok {
            base.cache_enabled = cache_ok;
        }
        if let Some(rate) = flags.requests_per_second {
            base.requests_per_second = rate;
        }
        if let Some(carrier) = flags.preferred_carrier {
            base.preferred_carrier = carrier;
        }
        (self.trip, base)
    }
}
