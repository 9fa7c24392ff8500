//! Version snapshots of template content
//!
//! A snapshot freezes a template's content record so it can be restored
//! later. Each template keeps at most [`MAX_VERSIONS`] snapshots; the oldest
//! are pruned first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::identity::{is_valid_template_id, TemplateType};
use crate::core::storage::{read_json, write_json_atomic, StorageError, TemplateStorage};

/// Snapshots kept per template
pub const MAX_VERSIONS: usize = 10;

/// Snapshot description, without the frozen content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comment: String,
    pub content_hash: String,
    /// `template_info.version` of the frozen content, if it had one
    #[serde(default)]
    pub template_version: Option<String>,
}

/// A snapshot record as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSnapshot {
    #[serde(flatten)]
    pub info: VersionInfo,
    pub content: JsonValue,
}

impl VersionSnapshot {
    fn new(content: JsonValue, comment: &str, created_at: DateTime<Utc>) -> Self {
        let content_hash = content_hash(&content);
        let version_id = format!(
            "{}-{}",
            created_at.format("%Y%m%dT%H%M%S%3f"),
            &content_hash[..8]
        );
        let template_version = content
            .get("template_info")
            .and_then(|info| info.get("version"))
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        Self {
            info: VersionInfo {
                version_id,
                created_at,
                comment: comment.to_string(),
                content_hash,
                template_version,
            },
            content,
        }
    }
}

/// SHA-256 of the compact JSON encoding, as lowercase hex
pub fn content_hash(content: &JsonValue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl TemplateStorage {
    /// Snapshot the current content of a template
    pub fn create_version(
        &self,
        template_id: &str,
        template_type: TemplateType,
        comment: &str,
    ) -> Result<VersionInfo, StorageError> {
        let stored = self.load(template_id, template_type)?;
        let snapshot = VersionSnapshot::new(stored.content, comment, Utc::now());
        self.store_snapshot(template_id, template_type, &snapshot)?;

        info!(
            template_id,
            template_type = %template_type,
            version_id = %snapshot.info.version_id,
            "created version"
        );
        Ok(snapshot.info)
    }

    /// Snapshots of a template, oldest first
    pub fn list_versions(
        &self,
        template_id: &str,
        template_type: TemplateType,
    ) -> Result<Vec<VersionInfo>, StorageError> {
        Ok(self
            .read_snapshots(template_id, template_type)?
            .into_iter()
            .map(|(_, snapshot)| snapshot.info)
            .collect())
    }

    /// Load one snapshot including its content
    pub fn get_version(
        &self,
        template_id: &str,
        template_type: TemplateType,
        version_id: &str,
    ) -> Result<VersionSnapshot, StorageError> {
        self.read_snapshots(template_id, template_type)?
            .into_iter()
            .map(|(_, snapshot)| snapshot)
            .find(|snapshot| snapshot.info.version_id == version_id)
            .ok_or_else(|| StorageError::VersionNotFound {
                template_id: template_id.to_string(),
                version_id: version_id.to_string(),
            })
    }

    /// Restore a template's content from a snapshot
    ///
    /// The current content is snapshotted first, so a restore can itself be
    /// undone. Metadata is kept, with `updated_at` refreshed and
    /// `config.restored_from` recording the source snapshot. Returns the
    /// backup snapshot taken before restoring.
    pub fn restore_version(
        &self,
        template_id: &str,
        template_type: TemplateType,
        version_id: &str,
    ) -> Result<VersionInfo, StorageError> {
        let snapshot = self.get_version(template_id, template_type, version_id)?;
        let (_, mut metadata) = self.get(template_id, template_type)?;

        let backup = self.create_version(
            template_id,
            template_type,
            &format!("backup before restore of {}", version_id),
        )?;

        metadata
            .config
            .insert("restored_from".to_string(), JsonValue::from(version_id));
        if let Some(version) = &snapshot.info.template_version {
            metadata.version = version.clone();
        }
        self.save(&snapshot.content, &mut metadata)?;

        info!(template_id, template_type = %template_type, version_id, "restored version");
        Ok(backup)
    }

    /// Number of snapshots stored for a template
    pub fn version_count(&self, template_id: &str, template_type: TemplateType) -> usize {
        snapshot_files(&self.versions_dir(template_id, template_type)).len()
    }

    /// Store a snapshot and prune the oldest beyond [`MAX_VERSIONS`]
    pub(crate) fn store_snapshot(
        &self,
        template_id: &str,
        template_type: TemplateType,
        snapshot: &VersionSnapshot,
    ) -> Result<(), StorageError> {
        let version_id = &snapshot.info.version_id;
        if !is_valid_template_id(version_id) {
            return Err(StorageError::InvalidId(version_id.clone()));
        }
        let dir = self.versions_dir(template_id, template_type);
        let path = dir.join(format!("{}.json", version_id));
        write_json_atomic(&path, snapshot)?;
        self.prune_versions(template_id, template_type)
    }

    fn prune_versions(
        &self,
        template_id: &str,
        template_type: TemplateType,
    ) -> Result<(), StorageError> {
        let snapshots = self.read_snapshots(template_id, template_type)?;
        if snapshots.len() <= MAX_VERSIONS {
            return Ok(());
        }
        let excess = snapshots.len() - MAX_VERSIONS;
        for (path, snapshot) in snapshots.into_iter().take(excess) {
            fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
            info!(
                template_id,
                version_id = %snapshot.info.version_id,
                "pruned old version"
            );
        }
        Ok(())
    }

    /// Read every snapshot of a template, oldest first
    ///
    /// Unreadable snapshot files are logged and skipped.
    fn read_snapshots(
        &self,
        template_id: &str,
        template_type: TemplateType,
    ) -> Result<Vec<(PathBuf, VersionSnapshot)>, StorageError> {
        if !self.exists(template_id, template_type) {
            return Err(StorageError::NotFound {
                template_id: template_id.to_string(),
                template_type,
            });
        }

        let mut snapshots = Vec::new();
        for path in snapshot_files(&self.versions_dir(template_id, template_type)) {
            let parsed = read_json(&path).and_then(|value| {
                serde_json::from_value::<VersionSnapshot>(value).map_err(|e| StorageError::Json {
                    path: path.clone(),
                    message: e.to_string(),
                })
            });
            match parsed {
                Ok(snapshot) => snapshots.push((path, snapshot)),
                Err(e) => warn!(error = %e, "skipping unreadable snapshot"),
            }
        }

        snapshots.sort_by(|(_, a), (_, b)| {
            a.info
                .created_at
                .cmp(&b.info.created_at)
                .then_with(|| a.info.version_id.cmp(&b.info.version_id))
        });
        Ok(snapshots)
    }
}

fn snapshot_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::TemplateMetadata;
    use serde_json::json;
    use tempfile::tempdir;

    fn content(version: &str) -> JsonValue {
        json!({
            "template_info": {"name": "Report", "version": version, "description": "d"},
            "sections": [],
            "format_config": {}
        })
    }

    fn saved(storage: &TemplateStorage) -> String {
        let mut meta = TemplateMetadata::new("Report", TemplateType::Custom);
        storage.save(&content("1.0"), &mut meta).unwrap()
    }

    #[test]
    fn test_create_and_list_versions() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let id = saved(&storage);

        let info = storage.create_version(&id, TemplateType::Custom, "initial").unwrap();
        assert_eq!(info.comment, "initial");
        assert_eq!(info.template_version.as_deref(), Some("1.0"));
        assert_eq!(info.content_hash, content_hash(&content("1.0")));
        assert!(info.version_id.ends_with(&info.content_hash[..8]));

        let versions = storage.list_versions(&id, TemplateType::Custom).unwrap();
        assert_eq!(versions, vec![info]);
        assert_eq!(storage.version_count(&id, TemplateType::Custom), 1);
    }

    #[test]
    fn test_create_version_for_missing_template_fails() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let err = storage.create_version("ghost", TemplateType::Custom, "").unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_retention_keeps_newest_snapshots() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let id = saved(&storage);

        let base = Utc::now();
        for i in 0..(MAX_VERSIONS + 3) {
            let snapshot = VersionSnapshot::new(
                content(&format!("1.{}", i)),
                &format!("v{}", i),
                base + chrono::Duration::seconds(i as i64),
            );
            storage.store_snapshot(&id, TemplateType::Custom, &snapshot).unwrap();
        }

        let versions = storage.list_versions(&id, TemplateType::Custom).unwrap();
        assert_eq!(versions.len(), MAX_VERSIONS);
        assert_eq!(versions[0].comment, "v3");
        assert_eq!(versions[MAX_VERSIONS - 1].comment, format!("v{}", MAX_VERSIONS + 2));
    }

    #[test]
    fn test_restore_version_replaces_content_and_keeps_backup() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let id = saved(&storage);

        let v1 = storage.create_version(&id, TemplateType::Custom, "first").unwrap();

        let (_, mut meta) = storage.get(&id, TemplateType::Custom).unwrap();
        storage.save(&content("2.0"), &mut meta).unwrap();

        storage
            .restore_version(&id, TemplateType::Custom, &v1.version_id)
            .unwrap();

        let (restored, meta) = storage.get(&id, TemplateType::Custom).unwrap();
        assert_eq!(restored, content("1.0"));
        assert_eq!(meta.version, "1.0");
        assert_eq!(meta.config["restored_from"], json!(v1.version_id));

        let versions = storage.list_versions(&id, TemplateType::Custom).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].template_version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_restore_unknown_version_fails() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let id = saved(&storage);

        let err = storage
            .restore_version(&id, TemplateType::Custom, "nope")
            .unwrap_err();
        assert!(matches!(err, StorageError::VersionNotFound { .. }));
    }

    #[test]
    fn test_delete_removes_snapshots() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path()).unwrap();
        let id = saved(&storage);
        storage.create_version(&id, TemplateType::Custom, "").unwrap();

        assert!(storage.delete(&id, TemplateType::Custom));
        assert!(!storage.versions_dir(&id, TemplateType::Custom).exists());
    }

    #[test]
    fn test_store_snapshot_rejects_unsafe_version_id() {
        let tmp = tempdir().unwrap();
        let storage = TemplateStorage::open(tmp.path().join("store")).unwrap();
        let id = saved(&storage);

        let mut snapshot = VersionSnapshot::new(content("1.0"), "", Utc::now());
        snapshot.info.version_id = "../../escaped".to_string();
        let err = storage
            .store_snapshot(&id, TemplateType::Custom, &snapshot)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidId(_)));
        assert_eq!(storage.version_count(&id, TemplateType::Custom), 0);
    }
}
