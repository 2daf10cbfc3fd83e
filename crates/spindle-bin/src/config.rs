// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Link profile loading.
//!
//! A link profile stores the serial settings for one drive so they need not
//! be typed on every invocation:
//!
//! ```yaml
//! port: /dev/ttyUSB0
//! baud_rate: 38400
//! parity: even
//! stop_bits: 1
//! slave_id: 1
//! read_timeout: 500ms
//! ```
//!
//! # Precedence
//!
//! Command-line flags, then `SPINDLE_*` environment variables, then the
//! profile file, then built-in defaults (38400 8E1, slave 1, 500ms).
//!
//! | Variable               | Field          |
//! |------------------------|----------------|
//! | `SPINDLE_PORT`         | `port`         |
//! | `SPINDLE_BAUD_RATE`    | `baud_rate`    |
//! | `SPINDLE_PARITY`       | `parity`       |
//! | `SPINDLE_STOP_BITS`    | `stop_bits`    |
//! | `SPINDLE_SLAVE_ID`     | `slave_id`     |
//! | `SPINDLE_READ_TIMEOUT` | `read_timeout` |

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spindle_modbus::{LinkConfig, Parity, SlaveId, StopBits};
use tracing::{debug, info};

use crate::cli::LinkArgs;
use crate::error::{BinError, BinResult};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "SPINDLE";

// =============================================================================
// LinkProfile
// =============================================================================

/// Serial settings as written in a profile file. Every field is optional.
///
/// Line settings are kept as text here and parsed when the profile is
/// turned into a [`LinkConfig`], so "E", "even" and "Even" all work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkProfile {
    /// Serial port.
    pub port: Option<String>,
    /// Baud rate.
    pub baud_rate: Option<u32>,
    /// Parity.
    #[serde(deserialize_with = "text::deserialize")]
    pub parity: Option<String>,
    /// Stop bits.
    #[serde(deserialize_with = "text::deserialize")]
    pub stop_bits: Option<String>,
    /// Slave address.
    pub slave_id: Option<u8>,
    /// Response timeout, e.g. "500ms".
    #[serde(deserialize_with = "text::deserialize")]
    pub read_timeout: Option<String>,
    /// Inter-frame delay, e.g. "5ms".
    #[serde(deserialize_with = "text::deserialize")]
    pub inter_frame_delay: Option<String>,
}

/// Accepts a bare number where text is expected (`stop_bits = 2`).
mod text {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        Float(f64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Text>::deserialize(deserializer)?.map(|text| match text {
            Text::Str(s) => s,
            Text::Int(n) => n.to_string(),
            Text::Float(n) => n.to_string(),
        }))
    }
}

impl LinkProfile {
    /// Overlays command-line flags on this profile.
    pub fn apply_args(&mut self, args: &LinkArgs) {
        if let Some(port) = &args.port {
            self.port = Some(port.clone());
        }
        if let Some(baud) = args.baud {
            self.baud_rate = Some(baud);
        }
        if let Some(parity) = args.parity {
            self.parity = Some(parity_name(parity).to_string());
        }
        if let Some(stop_bits) = args.stop_bits {
            self.stop_bits = Some(stop_bits.to_string());
        }
        if let Some(slave) = args.slave {
            self.slave_id = Some(slave);
        }
        if let Some(timeout) = args.timeout {
            self.read_timeout = Some(timeout.to_string());
        }
    }

    /// Returns the addressed slave, defaulting to 1. No port is needed.
    pub fn to_slave_id(&self) -> BinResult<SlaveId> {
        Ok(SlaveId::new(self.slave_id.unwrap_or(SlaveId::MIN))?)
    }

    /// Builds a validated link configuration, filling in defaults.
    pub fn to_link_config(&self) -> BinResult<LinkConfig> {
        let port = self.port.as_deref().ok_or_else(|| {
            BinError::config("no serial port given; use --port, SPINDLE_PORT or a profile")
        })?;

        let mut builder = LinkConfig::builder().port(port);
        if let Some(baud) = self.baud_rate {
            builder = builder.baud_rate(baud);
        }
        if let Some(parity) = &self.parity {
            builder = builder.parity(parity.parse::<Parity>()?);
        }
        if let Some(stop_bits) = &self.stop_bits {
            builder = builder.stop_bits(stop_bits.parse::<StopBits>()?);
        }
        if let Some(slave) = self.slave_id {
            builder = builder.slave_id(slave);
        }
        if let Some(timeout) = &self.read_timeout {
            builder = builder.read_timeout(parse_duration("read_timeout", timeout)?);
        }
        if let Some(delay) = &self.inter_frame_delay {
            builder = builder.inter_frame_delay(parse_duration("inter_frame_delay", delay)?);
        }

        Ok(builder.build()?)
    }
}

fn parity_name(parity: Parity) -> &'static str {
    match parity {
        Parity::None => "none",
        Parity::Even => "even",
        Parity::Odd => "odd",
        Parity::Mark => "mark",
        Parity::Space => "space",
    }
}

fn parse_duration(field: &str, value: &str) -> BinResult<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| BinError::config(format!("invalid {} '{}': {}", field, value, e)))
}

// =============================================================================
// ProfileFormat
// =============================================================================

/// Supported profile file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ProfileFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> BinResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(BinError::config(format!(
                "unsupported profile format: .{}",
                other
            ))),
            None => Err(BinError::config(
                "unsupported profile format: (no extension)",
            )),
        }
    }
}

// =============================================================================
// ProfileLoader
// =============================================================================

/// Loads link profiles and applies environment overrides.
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl Default for ProfileLoader {
    fn default() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }
}

impl ProfileLoader {
    /// Creates a loader with the default `SPINDLE` prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads a profile from `path`, or starts from an empty profile.
    pub fn load(&self, path: Option<&Path>) -> BinResult<LinkProfile> {
        let mut profile = match path {
            Some(path) => {
                info!("Loading link profile from: {}", path.display());
                let format = ProfileFormat::from_path(path)?;
                let content = fs::read_to_string(path).map_err(|e| {
                    BinError::config(format!("cannot read profile {}: {}", path.display(), e))
                })?;
                self.parse_str(&content, format)
                    .map_err(|e| e.with_context(format!("profile {}", path.display())))?
            }
            None => LinkProfile::default(),
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut profile)?;
        }

        debug!(?profile, "Link profile resolved");
        Ok(profile)
    }

    /// Parses a profile from a string.
    pub fn parse_str(&self, content: &str, format: ProfileFormat) -> BinResult<LinkProfile> {
        match format {
            ProfileFormat::Yaml => parse_yaml(content),
            ProfileFormat::Toml => {
                toml::from_str(content).map_err(|e| BinError::config(e.to_string()))
            }
            ProfileFormat::Json => {
                serde_json::from_str(content).map_err(|e| BinError::config(e.to_string()))
            }
        }
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, profile: &mut LinkProfile) -> BinResult<()> {
        let var = |name: &str| env::var(format!("{}_{}", self.env_prefix, name)).ok();

        if let Some(value) = var("PORT") {
            profile.port = Some(value);
        }
        if let Some(value) = var("BAUD_RATE") {
            profile.baud_rate = Some(value.parse().map_err(|_| {
                BinError::config(format!(
                    "{}_BAUD_RATE: expected a number, got '{}'",
                    self.env_prefix, value
                ))
            })?);
        }
        if let Some(value) = var("PARITY") {
            profile.parity = Some(value);
        }
        if let Some(value) = var("STOP_BITS") {
            profile.stop_bits = Some(value);
        }
        if let Some(value) = var("SLAVE_ID") {
            profile.slave_id = Some(value.parse().map_err(|_| {
                BinError::config(format!(
                    "{}_SLAVE_ID: expected a number 1-247, got '{}'",
                    self.env_prefix, value
                ))
            })?);
        }
        if let Some(value) = var("READ_TIMEOUT") {
            profile.read_timeout = Some(value);
        }

        Ok(())
    }
}

/// YAML goes through the config crate.
fn parse_yaml(content: &str) -> BinResult<LinkProfile> {
    let parsed = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| BinError::config(e.to_string()))?;

    parsed
        .try_deserialize()
        .map_err(|e| BinError::config(e.to_string()))
}

/// Resolves the link configuration for a command: profile, then
/// environment, then flags.
pub fn resolve_link_config(config_path: Option<&Path>, args: &LinkArgs) -> BinResult<LinkConfig> {
    let mut profile = ProfileLoader::new().load(config_path)?;
    profile.apply_args(args);
    profile.to_link_config()
}

/// Resolves only the slave address, with the same precedence as
/// [`resolve_link_config`]. For commands that never open a port.
pub fn resolve_slave_id(config_path: Option<&Path>, args: &LinkArgs) -> BinResult<SlaveId> {
    let mut profile = ProfileLoader::new().load(config_path)?;
    profile.apply_args(args);
    profile.to_slave_id()
}

// =============================================================================
// Tests
// =============================================================================
