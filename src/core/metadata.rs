//! Template metadata record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::core::identity::{new_template_id, TemplateType};

/// Languages a template supports unless told otherwise
pub const DEFAULT_LANGUAGES: [&str; 2] = ["zh-CN", "en-US"];

/// Descriptive and versioning record attached to one template
///
/// `template_id` together with `template_type` addresses exactly one stored
/// template. An empty `template_id` means "not assigned yet"; storage fills
/// it in on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    #[serde(default)]
    pub template_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub template_type: TemplateType,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "Utc::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub author: String,

    /// Tags are a set; order carries no meaning
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Section ids, in template order (informational)
    #[serde(default)]
    pub sections: Vec<String>,

    #[serde(default)]
    pub required_fields: Vec<String>,

    #[serde(default)]
    pub optional_fields: Vec<String>,

    #[serde(default = "default_languages")]
    pub supported_languages: Vec<String>,

    /// Free-form, type-specific options
    #[serde(default)]
    pub config: Map<String, JsonValue>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

impl Default for TemplateMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            template_id: String::new(),
            name: String::new(),
            description: String::new(),
            template_type: TemplateType::default(),
            version: default_version(),
            created_at: now,
            updated_at: now,
            author: String::new(),
            tags: BTreeSet::new(),
            sections: Vec::new(),
            required_fields: Vec::new(),
            optional_fields: Vec::new(),
            supported_languages: default_languages(),
            config: Map::new(),
        }
    }
}

impl TemplateMetadata {
    /// Create metadata with a freshly generated id
    pub fn new(name: impl Into<String>, template_type: TemplateType) -> Self {
        Self {
            template_id: new_template_id(),
            name: name.into(),
            template_type,
            ..Self::default()
        }
    }

    /// Metadata synthesized for a template whose metadata record is unusable
    pub fn placeholder(template_id: &str, template_type: TemplateType) -> Self {
        Self {
            template_id: template_id.to_string(),
            template_type,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Whether an id has been assigned
    pub fn has_id(&self) -> bool {
        !self.template_id.trim().is_empty()
    }

    /// Mark the record as modified now
    ///
    /// `updated_at` never moves backwards and never precedes `created_at`,
    /// even if the wall clock does.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    /// Serialize to a JSON value (the on-disk record shape)
    pub fn to_value(&self) -> Result<JsonValue, MetadataError> {
        serde_json::to_value(self).map_err(|e| MetadataError::Encode(e.to_string()))
    }

    /// Deserialize from a JSON value, filling absent fields with defaults
    pub fn from_value(value: JsonValue) -> Result<Self, MetadataError> {
        if !value.is_object() {
            return Err(MetadataError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| MetadataError::Decode(e.to_string()))
    }

    /// Serialize to pretty JSON text
    pub fn to_json(&self) -> Result<String, MetadataError> {
        serde_json::to_string_pretty(self).map_err(|e| MetadataError::Encode(e.to_string()))
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| MetadataError::Decode(e.to_string()))?;
        Self::from_value(value)
    }
}

/// Errors converting metadata to or from its record form
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata record is not a JSON object")]
    NotAnObject,

    #[error("invalid metadata record: {0}")]
    Decode(String),

    #[error("failed to encode metadata: {0}")]
    Encode(String),
}

/// ISO-8601 timestamps on the wire
///
/// Writes RFC 3339 in UTC. Reads RFC 3339 with any offset, and also accepts
/// offset-less timestamps (taken as UTC) so older records still load.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: '{}'", s)))
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
