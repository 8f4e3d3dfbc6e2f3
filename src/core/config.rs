//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

/// Passporter configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Password-store program to shell out to
    pub pass_cmd: Option<String>,

    /// Aliases file consulted before prompting
    pub aliases_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/passporter/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Ok(contents) = std::fs::read_to_string(&global_path) {
                    if let Ok(global) = serde_yml::from_str::<Config>(&contents) {
                        config.merge(global);
                    }
                }
            }
        }

        // 3. Environment variables
        if let Ok(pass_cmd) = std::env::var("PASSPORTER_PASS_CMD") {
            config.pass_cmd = Some(pass_cmd);
        }
        if let Ok(aliases) = std::env::var("PASSPORTER_ALIASES") {
            config.aliases_file = Some(PathBuf::from(aliases));
        }

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "passporter")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.pass_cmd.is_some() {
            self.pass_cmd = other.pass_cmd;
        }
        if other.aliases_file.is_some() {
            self.aliases_file = other.aliases_file;
        }
    }

    /// Password-store program, `pass` unless overridden
    pub fn pass_cmd(&self) -> String {
        self.pass_cmd.clone().unwrap_or_else(|| "pass".to_string())
    }

    /// Aliases file to preseed interactive resolution with, if configured
    pub fn aliases_file(&self) -> Option<PathBuf> {
        self.aliases_file.clone()
    }
}
