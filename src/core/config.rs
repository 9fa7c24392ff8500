//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::logging::LogFormat;
use crate::schema::ValidationLevel;

/// Directory holding workspace-local state
pub const WORKSPACE_DIR: &str = ".rtt";

/// Store location relative to the workspace when nothing else is configured
pub const DEFAULT_STORE: &str = ".rtt/templates";

/// RTT configuration with layered hierarchy
///
/// Sources, lowest priority first: built-in defaults, the global user config,
/// the workspace config (`.rtt/config.yaml`), then `RTT_*` environment
/// variables. Command-line flags are applied on top by the CLI.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the template store
    pub store: Option<PathBuf>,

    /// Default author for new and imported templates
    pub author: Option<String>,

    /// Validation strictness
    pub validation: Option<ValidationLevel>,

    /// Log output format
    pub log_format: Option<LogFormat>,

    /// Problems found while loading, reported once logging is up
    #[serde(skip)]
    pub issues: Vec<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&workspace, |key| std::env::var(key).ok())
    }

    /// Load configuration for a workspace with a custom environment lookup
    pub fn load_from(workspace: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/rtt/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path);
        }

        // 3. Workspace config (.rtt/config.yaml)
        config.merge_file(&workspace.join(WORKSPACE_DIR).join("config.yaml"));

        // 4. Environment variables
        config.apply_env(env);

        // Relative store paths are anchored at the workspace
        if let Some(store) = &config.store {
            if store.is_relative() {
                config.store = Some(workspace.join(store));
            }
        } else {
            config.store = Some(workspace.join(DEFAULT_STORE));
        }

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rtt")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yml::from_str::<Config>(&contents) {
                Ok(other) => self.merge(other),
                Err(e) => self
                    .issues
                    .push(format!("ignoring {}: {}", path.display(), e)),
            },
            Err(e) => self
                .issues
                .push(format!("cannot read {}: {}", path.display(), e)),
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(store) = env("RTT_STORE") {
            self.store = Some(PathBuf::from(store));
        }
        if let Some(author) = env("RTT_AUTHOR") {
            self.author = Some(author);
        }
        if let Some(level) = env("RTT_VALIDATION") {
            match level.parse() {
                Ok(level) => self.validation = Some(level),
                Err(e) => self.issues.push(format!("RTT_VALIDATION: {}", e)),
            }
        }
        if let Some(format) = env("RTT_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.log_format = Some(format),
                Err(e) => self.issues.push(format!("RTT_LOG_FORMAT: {}", e)),
            }
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.validation.is_some() {
            self.validation = other.validation;
        }
        if other.log_format.is_some() {
            self.log_format = other.log_format;
        }
    }

    /// Store root
    pub fn store(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE))
    }

    pub fn validation(&self) -> ValidationLevel {
        self.validation.unwrap_or_default()
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_default()
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
