//! Core module - template identity, metadata and storage

pub mod bundle;
pub mod config;
pub mod defaults;
pub mod identity;
pub mod logging;
pub mod metadata;
pub mod storage;
pub mod versions;

pub use bundle::{TemplateBundle, BUNDLE_FORMAT_VERSION};
pub use config::Config;
pub use defaults::{seed_defaults, DefaultTemplate, DEFAULT_TEMPLATES};
pub use identity::{TemplateType, TemplateTypeError};
pub use metadata::{MetadataError, TemplateMetadata};
pub use storage::{
    MetadataRecord, RecentTemplate, StorageError, StorageStats, StoredTemplate, TemplateStorage,
};
pub use versions::{VersionInfo, VersionSnapshot, MAX_VERSIONS};
