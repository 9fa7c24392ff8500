//! File-backed template storage
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<template_type>/<template_id>.json           content record
//! <root>/<template_type>/<template_id>.metadata.json  metadata record
//! <root>/.versions/<template_type>/<template_id>/     snapshots (see versions.rs)
//! ```
//!
//! Each record is replaced atomically, but the content/metadata pair is not
//! written as a unit: a concurrent reader may see new content next to old
//! metadata.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::core::identity::{is_valid_template_id, new_template_id, TemplateType};
use crate::core::metadata::{MetadataError, TemplateMetadata};

const CONTENT_SUFFIX: &str = ".json";
const METADATA_SUFFIX: &str = ".metadata.json";

/// Directory (under the root) holding version snapshots
pub(crate) const VERSIONS_DIR: &str = ".versions";

/// State of a template's metadata record as found on disk
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataRecord {
    Present(TemplateMetadata),
    Missing,
    Corrupt(String),
}

/// A template as loaded from storage, before any repair
#[derive(Debug, Clone)]
pub struct StoredTemplate {
    pub content: JsonValue,
    pub metadata: MetadataRecord,
}

/// Summary of everything in a store
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub total_templates: usize,
    pub by_type: BTreeMap<String, usize>,
    pub total_versions: usize,
    pub recent: Vec<RecentTemplate>,
}

/// One entry of the "recently updated" list in [`StorageStats`]
#[derive(Debug, Clone, Serialize)]
pub struct RecentTemplate {
    pub template_id: String,
    pub name: String,
    pub template_type: TemplateType,
    pub updated_at: String,
}

/// Durable CRUD and discovery over templates, partitioned by type
#[derive(Debug, Clone)]
pub struct TemplateStorage {
    root: PathBuf,
}

impl TemplateStorage {
    /// Open a store rooted at `root`, creating one partition per template type
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = Self { root: root.into() };
        for template_type in TemplateType::all() {
            let dir = storage.partition_dir(*template_type);
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(storage)
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every record of one template type
    pub fn partition_dir(&self, template_type: TemplateType) -> PathBuf {
        self.root.join(template_type.as_str())
    }

    fn content_path(&self, template_id: &str, template_type: TemplateType) -> PathBuf {
        self.partition_dir(template_type)
            .join(format!("{}{}", template_id, CONTENT_SUFFIX))
    }

    fn metadata_path(&self, template_id: &str, template_type: TemplateType) -> PathBuf {
        self.partition_dir(template_type)
            .join(format!("{}{}", template_id, METADATA_SUFFIX))
    }

    /// Whether a content record exists for the given key
    pub fn exists(&self, template_id: &str, template_type: TemplateType) -> bool {
        is_valid_template_id(template_id)
            && self.content_path(template_id, template_type).is_file()
    }

    /// Persist a content tree and its metadata
    ///
    /// Assigns an id if the metadata has none and refreshes `updated_at`.
    /// An existing template with the same id is overwritten unconditionally.
    /// Returns the template id.
    pub fn save(
        &self,
        content: &JsonValue,
        metadata: &mut TemplateMetadata,
    ) -> Result<String, StorageError> {
        if !metadata.has_id() {
            metadata.template_id = new_template_id();
        }
        ensure_valid_id(&metadata.template_id)?;
        metadata.touch();

        let template_type = metadata.template_type;
        let content_path = self.content_path(&metadata.template_id, template_type);
        let metadata_path = self.metadata_path(&metadata.template_id, template_type);

        write_json_atomic(&content_path, content)?;
        write_json_atomic(&metadata_path, &metadata.to_value()?)?;

        info!(
            template_id = %metadata.template_id,
            template_type = %template_type,
            name = %metadata.name,
            "saved template"
        );
        Ok(metadata.template_id.clone())
    }

    /// Load a template without repairing its metadata
    ///
    /// A missing or unreadable content record is an error; the metadata
    /// record's state is reported as found.
    pub fn load(
        &self,
        template_id: &str,
        template_type: TemplateType,
    ) -> Result<StoredTemplate, StorageError> {
        ensure_valid_id(template_id)?;

        let content_path = self.content_path(template_id, template_type);
        if !content_path.is_file() {
            return Err(StorageError::NotFound {
                template_id: template_id.to_string(),
                template_type,
            });
        }
        let content = read_json(&content_path)?;

        let metadata_path = self.metadata_path(template_id, template_type);
        let metadata = if !metadata_path.is_file() {
            MetadataRecord::Missing
        } else {
            match read_metadata_for(&metadata_path, template_id, template_type) {
                Ok(meta) => MetadataRecord::Present(meta),
                Err(reason) => MetadataRecord::Corrupt(reason),
            }
        };

        Ok(StoredTemplate { content, metadata })
    }

    /// Load a template, synthesizing default metadata if its record is
    /// missing or unreadable
    pub fn get(
        &self,
        template_id: &str,
        template_type: TemplateType,
    ) -> Result<(JsonValue, TemplateMetadata), StorageError> {
        let stored = self.load(template_id, template_type)?;
        let metadata = match stored.metadata {
            MetadataRecord::Present(meta) => meta,
            MetadataRecord::Missing => {
                warn!(
                    template_id,
                    template_type = %template_type,
                    "metadata record missing, using defaults"
                );
                TemplateMetadata::placeholder(template_id, template_type)
            }
            MetadataRecord::Corrupt(reason) => {
                warn!(
                    template_id,
                    template_type = %template_type,
                    %reason,
                    "metadata record unreadable, using defaults"
                );
                TemplateMetadata::placeholder(template_id, template_type)
            }
        };
        Ok((stored.content, metadata))
    }

    /// List metadata of stored templates, most recently updated first
    ///
    /// Scans one partition, or all of them when `template_type` is `None`.
    /// Records that fail to parse are logged and skipped.
    pub fn list(&self, template_type: Option<TemplateType>) -> Vec<TemplateMetadata> {
        let types: Vec<TemplateType> = match template_type {
            Some(t) => vec![t],
            None => TemplateType::all().to_vec(),
        };

        let mut result = Vec::new();
        for t in types {
            let dir = self.partition_dir(t);
            if !dir.is_dir() {
                continue;
            }
            debug!(partition = %dir.display(), "scanning partition");

            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(partition = %dir.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy();
                let Some(template_id) = file_name.strip_suffix(METADATA_SUFFIX) else {
                    continue;
                };
                match read_metadata_for(path, template_id, t) {
                    Ok(meta) => result.push(meta),
                    Err(reason) => {
                        warn!(path = %path.display(), %reason, "skipping corrupt metadata record");
                    }
                }
            }
        }

        result.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.template_id.cmp(&b.template_id))
        });
        result
    }

    /// Remove a template's content and metadata records
    ///
    /// Best effort: a failure removing one record does not restore the
    /// other. Returns false if any removal failed.
    pub fn delete(&self, template_id: &str, template_type: TemplateType) -> bool {
        if !is_valid_template_id(template_id) {
            warn!(template_id, "refusing to delete invalid template id");
            return false;
        }

        let mut success = true;
        for path in [
            self.content_path(template_id, template_type),
            self.metadata_path(template_id, template_type),
        ] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    error!(path = %path.display(), error = %e, "failed to remove record");
                    success = false;
                }
            }
        }

        let versions = self.versions_dir(template_id, template_type);
        if versions.exists() {
            if let Err(e) = fs::remove_dir_all(&versions) {
                error!(path = %versions.display(), error = %e, "failed to remove snapshots");
                success = false;
            }
        }

        info!(template_id, template_type = %template_type, success, "deleted template");
        success
    }

    /// Case-insensitive substring search over name, description and tags
    ///
    /// Results keep the ordering of [`TemplateStorage::list`].
    pub fn search(&self, query: &str, template_type: Option<TemplateType>) -> Vec<TemplateMetadata> {
        let query = query.to_lowercase();
        self.list(template_type)
            .into_iter()
            .filter(|meta| {
                meta.name.to_lowercase().contains(&query)
                    || meta.description.to_lowercase().contains(&query)
                    || meta.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Counts per type, snapshot totals and the most recently updated templates
    pub fn statistics(&self) -> StorageStats {
        let all = self.list(None);
        let mut stats = StorageStats {
            total_templates: all.len(),
            ..StorageStats::default()
        };

        for t in TemplateType::all() {
            stats.by_type.insert(t.as_str().to_string(), 0);
        }
        for meta in &all {
            *stats
                .by_type
                .entry(meta.template_type.as_str().to_string())
                .or_insert(0) += 1;
            stats.total_versions += self.version_count(&meta.template_id, meta.template_type);
        }

        stats.recent = all
            .iter()
            .take(5)
            .map(|meta| RecentTemplate {
                template_id: meta.template_id.clone(),
                name: meta.name.clone(),
                template_type: meta.template_type,
                updated_at: meta.updated_at.to_rfc3339(),
            })
            .collect();
        stats
    }

    /// Directory holding one template's snapshots
    pub(crate) fn versions_dir(&self, template_id: &str, template_type: TemplateType) -> PathBuf {
        self.root
            .join(VERSIONS_DIR)
            .join(template_type.as_str())
            .join(template_id)
    }
}

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("template not found: {template_id} ({template_type})")]
    NotFound {
        template_id: String,
        template_type: TemplateType,
    },

    #[error("template already exists: {template_id} ({template_type})")]
    AlreadyExists {
        template_id: String,
        template_type: TemplateType,
    },

    #[error("invalid template id: '{0}'")]
    InvalidId(String),

    #[error("version not found: {version_id} (template {template_id})")]
    VersionNotFound {
        template_id: String,
        version_id: String,
    },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {message}", path.display())]
    Json { path: PathBuf, message: String },

    #[error("invalid bundle: {0}")]
    Bundle(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn ensure_valid_id(template_id: &str) -> Result<(), StorageError> {
    if is_valid_template_id(template_id) {
        Ok(())
    } else {
        Err(StorageError::InvalidId(template_id.to_string()))
    }
}

pub(crate) fn read_json(path: &Path) -> Result<JsonValue, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| StorageError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read the metadata record stored at `path` for the given address
///
/// A record that names another id or type is rejected.
fn read_metadata_for(
    path: &Path,
    template_id: &str,
    template_type: TemplateType,
) -> Result<TemplateMetadata, String> {
    if !is_valid_template_id(template_id) {
        return Err(format!("invalid template id '{}'", template_id));
    }
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let meta = TemplateMetadata::from_json(&text).map_err(|e| e.to_string())?;
    if meta.template_id != template_id {
        return Err(format!("record names template '{}'", meta.template_id));
    }
    if meta.template_type != template_type {
        return Err(format!("record names type '{}'", meta.template_type));
    }
    Ok(meta)
}

/// Write pretty JSON to `path` via a temporary file in the same directory
///
/// The rename makes the replacement atomic: readers see either the old
/// record or the new one.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let mut text = serde_json::to_string_pretty(value).map_err(|e| StorageError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    text.push('\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}
