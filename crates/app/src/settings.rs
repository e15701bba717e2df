use std::{
    fs,
    path::{Path, PathBuf},
};

use atlas_domain::OwnerID;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::log::LevelFilterDef;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "atlas.db";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    /// Owner of imported workout sets and of program days addressed on the command line.
    pub owner_id: OwnerID,
    #[serde(with = "LevelFilterDef")]
    pub log_level: LevelFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: data_dir().join(DATABASE_FILE),
            owner_id: OwnerID::nil(),
            log_level: LevelFilter::Warn,
        }
    }
}

impl Settings {
    /// Reads the settings from a TOML file. A missing file yields the default settings.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            log::debug!("no configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to access configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "atlas")
}

#[must_use]
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[must_use]
pub fn config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE)
}
