use std::{
  env,
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::BracketOptions;

pub const CONFIG_FILE_NAME: &str = "bracket.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
  pub eliminations: u8,
  pub grand_final_reset: bool,
  /// Cap on pairings per generated round (free courts or servers).
  pub places: Option<usize>,
  pub log_filter: String,
  /// Daily rolling log files go here when set; stderr otherwise.
  pub log_dir: Option<PathBuf>,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    SchedulerConfig {
      eliminations: 1,
      grand_final_reset: true,
      places: None,
      log_filter: "info".to_string(),
      log_dir: None,
    }
  }
}

impl SchedulerConfig {
  pub fn bracket_options(&self) -> BracketOptions {
    BracketOptions {
      eliminations: self.eliminations,
      grand_final_reset: self.grand_final_reset,
    }
  }
}

pub fn default_config_path() -> PathBuf {
  PathBuf::from(CONFIG_FILE_NAME)
}

/// Trimmed, non-empty value of `key` as seen through `lookup`.
pub fn env_default<F>(lookup: &F, key: &str) -> Option<String>
where
  F: Fn(&str) -> Option<String>,
{
  lookup(key)
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn parse_flag(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}

pub fn apply_env_overrides<F>(mut config: SchedulerConfig, lookup: F) -> Result<SchedulerConfig>
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(value) = env_default(&lookup, "BRACKET_ELIMINATIONS") {
    config.eliminations = value
      .parse()
      .with_context(|| format!("BRACKET_ELIMINATIONS must be a small number, got {value:?}"))?;
  }
  if let Some(value) = env_default(&lookup, "BRACKET_GRAND_FINAL_RESET") {
    config.grand_final_reset = parse_flag(&value)
      .with_context(|| format!("BRACKET_GRAND_FINAL_RESET must be a flag, got {value:?}"))?;
  }
  if let Some(value) = env_default(&lookup, "BRACKET_PLACES") {
    let places = value
      .parse()
      .with_context(|| format!("BRACKET_PLACES must be a number, got {value:?}"))?;
    config.places = Some(places);
  }
  if let Some(value) = env_default(&lookup, "BRACKET_LOG_DIR") {
    config.log_dir = Some(PathBuf::from(value));
  }
  if let Some(value) = env_default(&lookup, "BRACKET_LOG_FILTER") {
    config.log_filter = value;
  }
  Ok(config)
}

/// Reads `path` (a missing file means defaults) and applies the process
/// environment on top.
pub fn load_config(path: &Path) -> Result<SchedulerConfig> {
  let config = read_config_file(path)?;
  apply_env_overrides(config, |key| env::var(key).ok())
}

pub fn read_config_file(path: &Path) -> Result<SchedulerConfig> {
  if !path.is_file() {
    return Ok(SchedulerConfig::default());
  }
  let data = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
  serde_json::from_str::<SchedulerConfig>(&data)
    .with_context(|| format!("parse config {}", path.display()))
}
