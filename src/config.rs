use crate::errors::{AppError, AppResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "CRM_CONFIG";
const DEFAULT_JOIN_LINK_BASE: &str = "https://meet.google.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitGrouping {
    /// `2,50,000`
    Indian,
    /// `250,000`
    Western,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencyConfig {
    pub symbol: String,
    pub grouping: DigitGrouping,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: "₹".to_string(),
            grouping: DigitGrouping::Indian,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingConfig {
    pub join_link_base: String,
    pub allowed_durations: Vec<u32>,
    pub default_duration: u32,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            join_link_base: DEFAULT_JOIN_LINK_BASE.to_string(),
            allowed_durations: vec![15, 30, 60, 90, 120],
            default_duration: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub recent_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_limit: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmConfig {
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_filter: String,
    pub organization_id: String,
    pub meetings: MeetingConfig,
    pub currency: CurrencyConfig,
    pub dashboard: DashboardConfig,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("crm.sqlite"),
            log_dir: PathBuf::from("logs"),
            log_filter: "info".to_string(),
            organization_id: "default".to_string(),
            meetings: MeetingConfig::default(),
            currency: CurrencyConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl CrmConfig {
    /// Loads from `CRM_CONFIG` when set, otherwise returns defaults.
    pub fn from_env() -> AppResult<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Reads a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let config = read_yaml(path).map_err(|error| AppError::Config(format!("{error:#}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.organization_id.trim().is_empty() {
            return Err(AppError::Config("organizationId cannot be empty".to_string()));
        }
        if self.meetings.join_link_base.trim().is_empty() {
            return Err(AppError::Config("meetings.joinLinkBase cannot be empty".to_string()));
        }
        if self.meetings.default_duration == 0 || self.meetings.allowed_durations.contains(&0) {
            return Err(AppError::Config("meeting durations must be positive".to_string()));
        }
        if !self.meetings.allowed_durations.is_empty()
            && !self
                .meetings
                .allowed_durations
                .contains(&self.meetings.default_duration)
        {
            return Err(AppError::Config(format!(
                "meetings.defaultDuration {} is not an allowed duration",
                self.meetings.default_duration
            )));
        }
        Ok(())
    }
}

fn read_yaml(path: &Path) -> anyhow::Result<CrmConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}
