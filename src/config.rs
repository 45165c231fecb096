use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub tagger: TaggerOptions,
}

/// Settings applied to every tagging session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaggerOptions {
    /// ID3 version written by MP3 sessions.
    pub id3_version: Id3Version,
    /// Description stored with every cover picture.
    pub cover_description: String,
}

impl Default for TaggerOptions {
    fn default() -> Self {
        Self {
            id3_version: Id3Version::default(),
            cover_description: "Front cover".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Id3Version {
    #[serde(rename = "2.3")]
    V23,
    #[default]
    #[serde(rename = "2.4")]
    V24,
}

impl From<Id3Version> for id3::Version {
    fn from(version: Id3Version) -> Self {
        match version {
            Id3Version::V23 => id3::Version::Id3v23,
            Id3Version::V24 => id3::Version::Id3v24,
        }
    }
}

impl FromStr for Id3Version {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim_start_matches(['v', 'V']) {
            "2.3" | "3" => Ok(Id3Version::V23),
            "2.4" | "4" => Ok(Id3Version::V24),
            _ => Err(format!("unsupported ID3 version: {} (use 2.3 or 2.4)", s)),
        }
    }
}

impl fmt::Display for Id3Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id3Version::V23 => f.write_str("2.3"),
            Id3Version::V24 => f.write_str("2.4"),
        }
    }
}

pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("tagfill")
        .join("config.toml")
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

/// Missing or unreadable files fall back to the defaults.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
