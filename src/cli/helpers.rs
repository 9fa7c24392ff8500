//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::core::{Config, TemplateMetadata, TemplateStorage};
use crate::render::TemplateEngine;
use crate::schema::{TemplateValidator, ValidationLevel, ValidationResult};

/// Configuration and store resolved for one command
pub struct Workspace {
    pub config: Config,
    pub storage: TemplateStorage,
}

impl Workspace {
    /// Load config, apply command-line overrides and open the store
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let mut config = Config::load();
        if let Some(store) = &global.store {
            config.store = Some(store.clone());
        }
        if let Some(level) = global.validation {
            config.validation = Some(level);
        }

        let root = config.store();
        debug!(store = %root.display(), validation = %config.validation(), "opening store");
        let storage = TemplateStorage::open(&root).map_err(|e| miette::miette!("{}", e))?;
        Ok(Self { config, storage })
    }

    pub fn validation(&self) -> ValidationLevel {
        self.config.validation()
    }

    pub fn validator(&self) -> TemplateValidator {
        TemplateValidator::new(self.validation())
    }

    pub fn engine(&self) -> TemplateEngine {
        TemplateEngine::new().with_validator(self.validator())
    }
}

/// Read and parse a JSON file
pub fn read_json_file(path: &Path) -> Result<JsonValue> {
    let text = fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| miette::miette!("Invalid JSON in {}: {}", path.display(), e))
}

/// Pretty JSON, newline-terminated
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value).into_diagnostic()?;
    text.push('\n');
    Ok(text)
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print!("{}", to_pretty_json(value)?);
    Ok(())
}

/// Write pretty JSON to `output`, or print it when no path is given
pub fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).into_diagnostic()?;
            }
            fs::write(path, to_pretty_json(value)?)
                .map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))
        }
        None => print_json(value),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Markdown table of template metadata
pub fn metadata_table(templates: &[TemplateMetadata]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "TYPE", "NAME", "VERSION", "UPDATED", "TAGS"]);
    for meta in templates {
        let tags: Vec<&str> = meta.tags.iter().map(String::as_str).collect();
        builder.push_record([
            meta.template_id.clone(),
            meta.template_type.to_string(),
            truncate_str(&meta.name, 40),
            meta.version.clone(),
            meta.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            truncate_str(&tags.join(","), 30),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Print validation findings grouped by severity
pub fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        println!("  {} {}", style("✗").red(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }
    for suggestion in &result.suggestions {
        println!("  {} {}", style("→").cyan(), suggestion);
    }
}

/// Parse a `key=value` assignment
///
/// The value is read as JSON when it parses, otherwise as a plain string.
pub fn parse_assignment(s: &str) -> Result<(String, JsonValue)> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| miette::miette!("Expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(miette::miette!("Empty variable name in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TemplateType;
    use serde_json::json;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("振动分析报告模板", 6), "振动分...");
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("rms=4.5").unwrap(), ("rms".to_string(), json!(4.5)));
        assert_eq!(
            parse_assignment("site=North Ridge").unwrap(),
            ("site".to_string(), json!("North Ridge"))
        );
        assert_eq!(
            parse_assignment("stats={\"peak\":2}").unwrap(),
            ("stats".to_string(), json!({"peak": 2}))
        );
        assert_eq!(parse_assignment("empty=").unwrap().1, json!(""));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_metadata_table_has_header_and_rows() {
        let meta = TemplateMetadata::new("Monthly", TemplateType::Maintenance).with_tags(["ops"]);
        let table = metadata_table(&[meta.clone()]);
        assert!(table.contains("NAME"));
        assert!(table.contains(&meta.template_id));
        assert!(table.contains("maintenance"));
    }
}
