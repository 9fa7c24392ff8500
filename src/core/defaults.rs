//! Built-in default templates shipped inside the binary

use rust_embed::Embed;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::core::identity::TemplateType;
use crate::core::metadata::TemplateMetadata;
use crate::core::storage::{StorageError, TemplateStorage};
use crate::schema::get_template_variables;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// A default template as compiled into the binary
#[derive(Debug, Clone)]
pub struct DefaultTemplate {
    pub template_id: &'static str,
    pub template_type: TemplateType,
    pub file: &'static str,
    pub tags: &'static [&'static str],
}

/// Every shipped default
pub const DEFAULT_TEMPLATES: [DefaultTemplate; 3] = [
    DefaultTemplate {
        template_id: "default-vibration-analysis",
        template_type: TemplateType::VibrationAnalysis,
        file: "vibration_analysis.json",
        tags: &["default", "vibration", "wind-turbine"],
    },
    DefaultTemplate {
        template_id: "default-fault-diagnosis",
        template_type: TemplateType::FaultDiagnosis,
        file: "fault_diagnosis.json",
        tags: &["default", "fault", "alarm"],
    },
    DefaultTemplate {
        template_id: "default-maintenance",
        template_type: TemplateType::Maintenance,
        file: "maintenance.json",
        tags: &["default", "maintenance"],
    },
];

impl DefaultTemplate {
    /// Parsed content tree
    pub fn content(&self) -> Result<JsonValue, StorageError> {
        let file = EmbeddedTemplates::get(self.file).ok_or_else(|| StorageError::Json {
            path: self.file.into(),
            message: "embedded template missing".to_string(),
        })?;
        serde_json::from_slice(&file.data).map_err(|e| StorageError::Json {
            path: self.file.into(),
            message: e.to_string(),
        })
    }

    /// Metadata for a freshly seeded copy
    pub fn metadata(&self, content: &JsonValue, author: &str) -> TemplateMetadata {
        let info = |key: &str| {
            content
                .get("template_info")
                .and_then(|i| i.get(key))
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut metadata = TemplateMetadata::placeholder(self.template_id, self.template_type)
            .with_description(info("description"))
            .with_author(author)
            .with_version(info("version"))
            .with_tags(self.tags.iter().copied());
        metadata.name = info("name");
        metadata.sections = section_ids(content);
        metadata.required_fields = get_template_variables(content);
        metadata
            .config
            .insert("is_default".to_string(), JsonValue::Bool(true));
        metadata
    }
}

/// Ids of the sections in a content tree, in order
pub fn section_ids(content: &JsonValue) -> Vec<String> {
    content
        .get("sections")
        .and_then(JsonValue::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(|s| s.get("id").and_then(JsonValue::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Save every default template that is not stored yet
///
/// Returns the ids that were created.
pub fn seed_defaults(storage: &TemplateStorage, author: &str) -> Result<Vec<String>, StorageError> {
    let mut created = Vec::new();
    for default in &DEFAULT_TEMPLATES {
        if storage.exists(default.template_id, default.template_type) {
            debug!(template_id = default.template_id, "default template already present");
            continue;
        }
        let content = default.content()?;
        let mut metadata = default.metadata(&content, author);
        let id = storage.save(&content, &mut metadata)?;
        info!(template_id = %id, template_type = %default.template_type, "seeded default template");
        created.push(id);
    }
    Ok(created)
}
