//! Configuration system
//!
//! Provides layered configuration management with:
//! - Runtime defaults
//! - Config file loading (TOML)
//! - Environment variable overrides
//! - Validation before any parser is built
//!
//! The `[site]` section has no defaults: a parser cannot be set up until both names are known.

use crate::checkpoint::SqliteStore;
use crate::error::ParseError;
use crate::models::{FormatVersion, RecordKind};
use crate::parser::{
    ParserSettings, DEFAULT_INFRASTRUCTURE, DEFAULT_LOCAL_USER_ID, DEFAULT_PREFIX, DEFAULT_VO,
};
use crate::validity::ValidityWindow;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub boinc: BoincConfig,
    pub validity: ValidityWindow,
    pub db: DbConfig,
    pub logging: LoggingConfig,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_name: Option<String>,
    pub machine_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoincConfig {
    pub local_user_id: String,
    pub infrastructure: String,
    #[serde(deserialize_with = "integer_option")]
    pub processors: u32,
    #[serde(deserialize_with = "integer_option")]
    pub node_count: u32,
    pub vo: String,
    pub prefix: String,
    /// Short hostname of the ingesting node; resolved from the system when unset.
    pub hostname: Option<String>,
    pub format_version: FormatVersion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQLite file holding `EventRecords` and `BlahdRecords`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub directory: PathBuf,
}

impl Default for BoincConfig {
    fn default() -> Self {
        Self {
            local_user_id: DEFAULT_LOCAL_USER_ID.to_string(),
            infrastructure: DEFAULT_INFRASTRUCTURE.to_string(),
            processors: 1,
            node_count: 1,
            vo: DEFAULT_VO.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            hostname: None,
            format_version: FormatVersion::Current,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from file (explicit path first), environment and defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::discover()?,
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn discover() -> Result<Self> {
        let config_paths = [
            PathBuf::from("apel-boinc.toml"),
            PathBuf::from(".apel-boinc.toml"),
            dirs::config_dir()
                .map(|d| d.join("apel-boinc").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Site overrides
        if let Ok(val) = env::var("APEL_BOINC_SITE_NAME") {
            self.site.site_name = Some(val);
        }
        if let Ok(val) = env::var("APEL_BOINC_MACHINE_NAME") {
            self.site.machine_name = Some(val);
        }

        // Parser overrides
        if let Ok(val) = env::var("APEL_BOINC_HOSTNAME") {
            self.boinc.hostname = Some(val);
        }
        if let Ok(val) = env::var("APEL_BOINC_PROCESSORS") {
            self.boinc.processors = val
                .trim()
                .parse()
                .context("Invalid APEL_BOINC_PROCESSORS")?;
        }
        if let Ok(val) = env::var("APEL_BOINC_VO") {
            self.boinc.vo = val;
        }
        if let Ok(val) = env::var("APEL_BOINC_FORMAT_VERSION") {
            self.boinc.format_version = val
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid APEL_BOINC_FORMAT_VERSION")?;
        }

        // Store override
        if let Ok(val) = env::var("APEL_BOINC_DB_PATH") {
            self.db.path = Some(PathBuf::from(val));
        }

        Ok(())
    }

    /// Validate values that do not depend on the record kind
    pub fn validate(&self) -> Result<()> {
        if self.boinc.processors == 0 {
            return Err(anyhow::anyhow!("Processors must be at least 1"));
        }

        if self.boinc.node_count == 0 {
            return Err(anyhow::anyhow!("Node count must be at least 1"));
        }

        if !self.validity.is_valid() {
            return Err(anyhow::anyhow!(
                "Validity offsets cannot be negative, got {} and {} days",
                self.validity.valid_from_days,
                self.validity.valid_until_days
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            warn!(format = %self.logging.format, "Unknown log format, falling back to pretty");
        }

        Ok(())
    }

    /// Resolve parser settings for `kind`, logging each option as it is chosen.
    pub fn parser_settings(&self, kind: RecordKind) -> std::result::Result<ParserSettings, ParseError> {
        let site_name = required("site", "site_name", self.site.site_name.as_deref())?;
        let machine_name = required("site", "machine_name", self.site.machine_name.as_deref())?;
        let hostname = match &self.boinc.hostname {
            Some(name) => name.clone(),
            None => short_hostname()?,
        };

        log_option("hostname", &hostname);
        log_option("prefix", &self.boinc.prefix);
        log_option("format_version", &self.boinc.format_version.to_string());

        let mut settings = ParserSettings::new(site_name, machine_name, hostname);
        settings.prefix = self.boinc.prefix.clone();
        settings.version = self.boinc.format_version;
        settings.validity = self.validity;
        settings.node_count = self.boinc.node_count;

        match kind {
            RecordKind::Batch => {
                log_option("local_user_id", &self.boinc.local_user_id);
                log_option("infrastructure", &self.boinc.infrastructure);
                log_option("processors", &self.boinc.processors.to_string());
                settings.local_user_id = self.boinc.local_user_id.clone();
                settings.infrastructure = self.boinc.infrastructure.clone();
                settings.processors = self.boinc.processors;
            }
            RecordKind::Blah => {
                log_option("vo", &self.boinc.vo);
                settings.vo = self.boinc.vo.clone();
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checkpoint store named by `[db] path`.
    pub fn store(&self) -> std::result::Result<SqliteStore, ParseError> {
        let path = required_path(self.db.path.as_deref())?;
        Ok(SqliteStore::new(path))
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

fn required<'a>(
    section: &str,
    name: &str,
    value: Option<&'a str>,
) -> std::result::Result<&'a str, ParseError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ParseError::Configuration(format!("[{}] {} is required", section, name)))
}

fn required_path(value: Option<&Path>) -> std::result::Result<&Path, ParseError> {
    value.ok_or_else(|| ParseError::Configuration("[db] path is required".to_string()))
}

/// Numeric options accept `4` as well as `"4"`; string values are coerced here and nowhere else.
fn integer_option<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not an integer", text))),
    }
}

fn log_option(name: &str, value: &str) {
    info!("[boinc/{}] = {}", name, value);
}

/// First label of the system hostname.
pub fn short_hostname() -> std::result::Result<String, ParseError> {
    let full = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ParseError::Configuration("cannot determine hostname, set [boinc] hostname".to_string())
        })?;

    Ok(full.split('.').next().unwrap_or(&full).to_string())
}
