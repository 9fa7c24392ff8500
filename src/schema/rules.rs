//! Validation rules and their severities per strictness level

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How strictly templates are validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Recommendations become errors
    Strict,
    /// Standard severities
    #[default]
    Warn,
    /// Only structural problems are errors
    None,
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Strict => write!(f, "strict"),
            ValidationLevel::Warn => write!(f, "warn"),
            ValidationLevel::None => write!(f, "none"),
        }
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidationLevel::Strict),
            "warn" | "normal" => Ok(ValidationLevel::Warn),
            "none" | "loose" => Ok(ValidationLevel::None),
            _ => Err(format!("Unknown validation level: {} (valid: strict, warn, none)", s)),
        }
    }
}

/// Where a finding is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

/// Every rule the validator evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Content root is not a map
    ContentNotMap,
    /// `template_info`, `sections` or `format_config` absent
    MissingTopLevelKey,
    /// Top-level key present with the wrong shape
    MistypedTopLevelKey,
    /// `template_info` lacks name, version or description
    MissingTemplateInfoField,
    /// `template_info.version` is not `x.y` or `x.y.z`
    InvalidVersion,
    /// `sections` is empty
    EmptySections,
    /// A section entry is not a map
    SectionNotMap,
    /// A section lacks id, name, type or content
    MissingSectionField,
    /// Two sections share an id
    DuplicateSectionId,
    /// Section type outside the supported set
    UnsupportedSectionType,
    /// image_text_pair without image_placeholder / text_template
    ImageTextPairField,
    /// analysis_conclusion without conclusion_template
    MissingConclusionTemplate,
    /// analysis_conclusion without polish_config
    MissingPolishConfig,
    /// chart without chart_type
    MissingChartType,
    /// Page size outside the known paper sizes
    UnusualPageSize,
    /// No CJK-capable font in `styles.font_family`
    MissingCjkFont,
    /// vibration_analysis template without an analysis_conclusion section
    VibrationConclusionExpected,
    /// vibration_analysis template without a chart section
    VibrationChartExpected,
    /// fault_diagnosis template without an analysis_conclusion section
    FaultDiagnosisConclusionRequired,
    /// Variable name does not follow identifier syntax
    InvalidVariableName,
    /// Variable name looks temporary (`temp_`, `tmp_`)
    TemporaryVariableName,
    /// A `{{ }}` tag that is not a valid expression
    MalformedExpression,
}

impl Rule {
    /// Every rule, in evaluation order
    pub fn all() -> &'static [Rule] {
        &[
            Rule::ContentNotMap,
            Rule::MissingTopLevelKey,
            Rule::MistypedTopLevelKey,
            Rule::MissingTemplateInfoField,
            Rule::InvalidVersion,
            Rule::EmptySections,
            Rule::SectionNotMap,
            Rule::MissingSectionField,
            Rule::DuplicateSectionId,
            Rule::UnsupportedSectionType,
            Rule::ImageTextPairField,
            Rule::MissingConclusionTemplate,
            Rule::MissingPolishConfig,
            Rule::MissingChartType,
            Rule::UnusualPageSize,
            Rule::MissingCjkFont,
            Rule::VibrationConclusionExpected,
            Rule::VibrationChartExpected,
            Rule::FaultDiagnosisConclusionRequired,
            Rule::InvalidVariableName,
            Rule::TemporaryVariableName,
            Rule::MalformedExpression,
        ]
    }

    /// Severity at [`ValidationLevel::Warn`]
    pub fn base_severity(&self) -> Severity {
        match self {
            Rule::ContentNotMap
            | Rule::MissingTopLevelKey
            | Rule::MistypedTopLevelKey
            | Rule::MissingTemplateInfoField
            | Rule::InvalidVersion
            | Rule::SectionNotMap
            | Rule::MissingSectionField
            | Rule::DuplicateSectionId
            | Rule::UnsupportedSectionType
            | Rule::ImageTextPairField
            | Rule::MissingConclusionTemplate
            | Rule::FaultDiagnosisConclusionRequired
            | Rule::InvalidVariableName => Severity::Error,

            Rule::EmptySections
            | Rule::MissingPolishConfig
            | Rule::MissingChartType
            | Rule::UnusualPageSize
            | Rule::VibrationConclusionExpected
            | Rule::VibrationChartExpected
            | Rule::MalformedExpression => Severity::Warning,

            Rule::MissingCjkFont | Rule::TemporaryVariableName => Severity::Suggestion,
        }
    }

    /// Rules whose violation leaves a tree nothing can interpret
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Rule::ContentNotMap | Rule::MissingTopLevelKey | Rule::MistypedTopLevelKey
        )
    }
}

/// Severity assigned to each rule
///
/// Built from a [`ValidationLevel`]; individual rules can be overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSeverities {
    table: HashMap<Rule, Severity>,
}

impl RuleSeverities {
    /// Severity table for a strictness level
    ///
    /// - `warn`: each rule's base severity
    /// - `strict`: warnings become errors
    /// - `none`: errors become warnings, except structural rules
    pub fn for_level(level: ValidationLevel) -> Self {
        let table = Rule::all()
            .iter()
            .map(|rule| {
                let base = rule.base_severity();
                let severity = match (level, base) {
                    (ValidationLevel::Strict, Severity::Warning) => Severity::Error,
                    (ValidationLevel::None, Severity::Error) if !rule.is_structural() => {
                        Severity::Warning
                    }
                    _ => base,
                };
                (*rule, severity)
            })
            .collect();
        Self { table }
    }

    /// Severity of a rule
    pub fn get(&self, rule: Rule) -> Severity {
        self.table
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.base_severity())
    }

    /// Override the severity of one rule
    pub fn set(&mut self, rule: Rule, severity: Severity) {
        self.table.insert(rule, severity);
    }

    pub fn with(mut self, rule: Rule, severity: Severity) -> Self {
        self.set(rule, severity);
        self
    }
}

impl Default for RuleSeverities {
    fn default() -> Self {
        Self::for_level(ValidationLevel::default())
    }
}
