//! Template identity: the template type enum and opaque template ids

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Report template types
///
/// Each type owns one storage partition and selects the whole-template
/// validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum TemplateType {
    /// Vibration analysis report
    #[default]
    VibrationAnalysis,
    /// Fault diagnosis report
    FaultDiagnosis,
    /// Trend analysis report
    TrendAnalysis,
    /// Maintenance recommendation report
    Maintenance,
    /// Comprehensive analysis report
    Comprehensive,
    /// User-defined report
    Custom,
}

impl TemplateType {
    /// Get the wire / directory name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::VibrationAnalysis => "vibration_analysis",
            TemplateType::FaultDiagnosis => "fault_diagnosis",
            TemplateType::TrendAnalysis => "trend_analysis",
            TemplateType::Maintenance => "maintenance",
            TemplateType::Comprehensive => "comprehensive",
            TemplateType::Custom => "custom",
        }
    }

    /// Get all template types, in partition order
    pub fn all() -> &'static [TemplateType] {
        &[
            TemplateType::VibrationAnalysis,
            TemplateType::FaultDiagnosis,
            TemplateType::TrendAnalysis,
            TemplateType::Maintenance,
            TemplateType::Comprehensive,
            TemplateType::Custom,
        ]
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = TemplateTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "vibration_analysis" => Ok(TemplateType::VibrationAnalysis),
            "fault_diagnosis" => Ok(TemplateType::FaultDiagnosis),
            "trend_analysis" => Ok(TemplateType::TrendAnalysis),
            "maintenance" => Ok(TemplateType::Maintenance),
            "comprehensive" => Ok(TemplateType::Comprehensive),
            "custom" => Ok(TemplateType::Custom),
            _ => Err(TemplateTypeError::Unknown(s.to_string())),
        }
    }
}

/// Error for template type strings that name no known type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateTypeError {
    #[error("unsupported template type: '{0}' (valid: vibration_analysis, fault_diagnosis, trend_analysis, maintenance, comprehensive, custom)")]
    Unknown(String),
}

/// Generate a fresh template id
///
/// Ids are ULIDs, so ids generated later sort later.
pub fn new_template_id() -> String {
    Ulid::new().to_string()
}

/// Check that a template id can be used as a record key
///
/// Ids are opaque, but they address files inside a partition, so they must
/// be non-empty and free of path separators and leading dots. An id may not
/// end in `.metadata`, which would make its content record look like the
/// metadata record of another id.
pub fn is_valid_template_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.to_ascii_lowercase().ends_with(".metadata")
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}
