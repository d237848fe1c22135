use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::parser::ParseOptions;
use crate::resolver::DEFAULT_PASSES;

/// Settings read from `mplsview.toml`. Every field has a default, so a
/// partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MplsviewConfig {
    /// Directory holding the transcripts
    pub path: Option<String>,
    pub extension: String,
    pub database: String,
    /// Write an SQL dump here after each ingest
    pub dump: Option<String>,
    pub resolution_passes: usize,
    pub log_ignored_lines: bool,
}

impl Default for MplsviewConfig {
    fn default() -> Self {
        Self {
            path: None,
            extension: ".log".to_string(),
            database: "mplsview.db".to_string(),
            dump: None,
            resolution_passes: DEFAULT_PASSES,
            log_ignored_lines: false,
        }
    }
}

impl MplsviewConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            log_ignored_lines: self.log_ignored_lines,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("mplsview.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MplsviewConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MplsviewConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MplsviewConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
