//! Export and import of self-contained template bundles
//!
//! A bundle is one JSON file carrying a template's metadata, its content and
//! optionally its snapshots, so templates can move between stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::info;

use crate::core::identity::{is_valid_template_id, TemplateType};
use crate::core::metadata::TemplateMetadata;
use crate::core::storage::{read_json, write_json_atomic, StorageError, TemplateStorage};
use crate::core::versions::VersionSnapshot;

/// Bundle format understood by this build
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// On-disk shape of an exported template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateBundle {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub metadata: TemplateMetadata,
    pub content: JsonValue,
    #[serde(default)]
    pub versions: Vec<VersionSnapshot>,
}

impl TemplateStorage {
    /// Write a template (and optionally its snapshots) to a bundle file
    pub fn export(
        &self,
        template_id: &str,
        template_type: TemplateType,
        path: &Path,
        include_versions: bool,
    ) -> Result<TemplateBundle, StorageError> {
        let (content, metadata) = self.get(template_id, template_type)?;

        let mut versions = Vec::new();
        if include_versions {
            for info in self.list_versions(template_id, template_type)? {
                versions.push(self.get_version(template_id, template_type, &info.version_id)?);
            }
        }

        let bundle = TemplateBundle {
            format_version: BUNDLE_FORMAT_VERSION,
            exported_at: Utc::now(),
            metadata,
            content,
            versions,
        };
        write_json_atomic(path, &bundle)?;

        info!(
            template_id,
            template_type = %template_type,
            path = %path.display(),
            versions = bundle.versions.len(),
            "exported template"
        );
        Ok(bundle)
    }

    /// Import a bundle file, returning the template id
    ///
    /// Fails with [`StorageError::AlreadyExists`] if the bundle's template is
    /// already stored and `overwrite` is false. Bundled snapshots are added to
    /// the template's snapshot history, subject to the usual retention.
    pub fn import(&self, path: &Path, overwrite: bool) -> Result<String, StorageError> {
        let value = read_json(path)?;
        let bundle: TemplateBundle =
            serde_json::from_value(value).map_err(|e| StorageError::Bundle(e.to_string()))?;

        if bundle.format_version > BUNDLE_FORMAT_VERSION {
            return Err(StorageError::Bundle(format!(
                "unsupported bundle format {} (newest supported: {})",
                bundle.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        if let Some(bad) = bundle
            .versions
            .iter()
            .map(|snapshot| &snapshot.info.version_id)
            .find(|id| !is_valid_template_id(id))
        {
            return Err(StorageError::Bundle(format!("invalid version id: '{}'", bad)));
        }

        let mut metadata = bundle.metadata;
        if !overwrite
            && metadata.has_id()
            && self.exists(&metadata.template_id, metadata.template_type)
        {
            return Err(StorageError::AlreadyExists {
                template_id: metadata.template_id,
                template_type: metadata.template_type,
            });
        }

        let template_id = self.save(&bundle.content, &mut metadata)?;
        for snapshot in &bundle.versions {
            self.store_snapshot(&template_id, metadata.template_type, snapshot)?;
        }

        info!(
            template_id = %template_id,
            template_type = %metadata.template_type,
            path = %path.display(),
            versions = bundle.versions.len(),
            "imported template"
        );
        Ok(template_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn content() -> JsonValue {
        json!({
            "template_info": {"name": "Bundle", "version": "1.2", "description": "d"},
            "sections": [],
            "format_config": {}
        })
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let tmp = tempdir().unwrap();
        let source = TemplateStorage::open(tmp.path().join("a")).unwrap();
        let target = TemplateStorage::open(tmp.path().join("b")).unwrap();

        let mut meta = TemplateMetadata::new("Bundle", TemplateType::TrendAnalysis)
            .with_tags(["exported"]);
        let id = source.save(&content(), &mut meta).unwrap();
        source.create_version(&id, TemplateType::TrendAnalysis, "snap").unwrap();

        let file = tmp.path().join("out/bundle.json");
        let bundle = source
            .export(&id, TemplateType::TrendAnalysis, &file, true)
            .unwrap();
        assert_eq!(bundle.versions.len(), 1);
        assert!(file.is_file());

        let imported = target.import(&file, false).unwrap();
        assert_eq!(imported, id);

        let (loaded, loaded_meta) = target.get(&id, TemplateType::TrendAnalysis).unwrap();
        assert_eq!(loaded, content());
        assert!(loaded_meta.tags.contains("exported"));
        assert_eq!(target.version_count(&id, TemplateType::TrendAnalysis), 1);
    }

    #[test]
    fn test_import_refuses_to_overwrite_by_default() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path().join("store")).unwrap();

        let mut meta = TemplateMetadata::new("Bundle", TemplateType::Custom);
        let id = storage.save(&content(), &mut meta).unwrap();
        let file = tmp.path().join("bundle.json");
        storage.export(&id, TemplateType::Custom, &file, false).unwrap();

        let err = storage.import(&file, false).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        assert_eq!(storage.import(&file, true).unwrap(), id);
    }

    #[test]
    fn test_import_rejects_malformed_bundle() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path().join("store")).unwrap();
        let file = tmp.path().join("bundle.json");
        std::fs::write(&file, r#"{"content": {}}"#).unwrap();

        let err = storage.import(&file, false).unwrap_err();
        assert!(matches!(err, StorageError::Bundle(_)));
    }

    #[test]
    fn test_import_rejects_snapshot_ids_that_leave_the_store() {
        let tmp = tempdir().unwrap();
        let source = TemplateStorage::open(tmp.path().join("a")).unwrap();
        let target = TemplateStorage::open(tmp.path().join("b")).unwrap();

        let mut meta = TemplateMetadata::new("Bundle", TemplateType::Custom);
        let id = source.save(&content(), &mut meta).unwrap();
        source.create_version(&id, TemplateType::Custom, "snap").unwrap();
        let file = tmp.path().join("bundle.json");
        source.export(&id, TemplateType::Custom, &file, true).unwrap();

        let mut value: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        value["versions"][0]["version_id"] = json!("../../../../escaped");
        std::fs::write(&file, value.to_string()).unwrap();

        let err = target.import(&file, false).unwrap_err();
        assert!(matches!(err, StorageError::Bundle(_)), "{err}");
        assert!(!target.exists(&id, TemplateType::Custom));
        assert!(!tmp.path().join("escaped.json").exists());
        assert!(!tmp.path().join("b").join("escaped.json").exists());
    }
}
