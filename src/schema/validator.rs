//! Rule-based validation of template content trees

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashSet};

use crate::core::TemplateType;
use crate::schema::rules::{Rule, RuleSeverities, Severity, ValidationLevel};
use crate::schema::syntax::{is_identifier, parse_expr, scan, Segment};

/// Keys every template content tree must carry
pub const REQUIRED_TOP_LEVEL: [&str; 3] = ["template_info", "sections", "format_config"];

/// Keys `template_info` must carry
pub const REQUIRED_TEMPLATE_INFO: [&str; 3] = ["name", "version", "description"];

/// Keys every section must carry
pub const REQUIRED_SECTION_FIELDS: [&str; 4] = ["id", "name", "type", "content"];

/// Section kinds the renderer understands
pub const SUPPORTED_SECTION_TYPES: [&str; 6] = [
    "text",
    "image",
    "chart",
    "table",
    "image_text_pair",
    "analysis_conclusion",
];

/// Paper sizes the document emitter knows
pub const KNOWN_PAGE_SIZES: [&str; 5] = ["A3", "A4", "A5", "Letter", "Legal"];

/// Font families able to render Chinese text
pub const CJK_FONTS: [&str; 6] = [
    "SimHei",
    "Microsoft YaHei",
    "SimSun",
    "KaiTi",
    "Noto Sans CJK",
    "Source Han",
];

/// Outcome of validating one content tree
///
/// `is_valid` is false exactly when `errors` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_suggestion(&mut self, message: impl Into<String>) {
        self.suggestions.push(message.into());
    }

    fn add(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => self.add_error(message),
            Severity::Warning => self.add_warning(message),
            Severity::Suggestion => self.add_suggestion(message),
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

/// Structural and semantic checks over a template content tree
///
/// Every rule group runs on every call; nothing short-circuits. The
/// severity of each finding comes from the validator's [`RuleSeverities`].
#[derive(Debug, Clone)]
pub struct TemplateValidator {
    level: ValidationLevel,
    severities: RuleSeverities,
}

impl TemplateValidator {
    pub fn new(level: ValidationLevel) -> Self {
        Self {
            level,
            severities: RuleSeverities::for_level(level),
        }
    }

    /// Use a custom severity table
    pub fn with_severities(mut self, severities: RuleSeverities) -> Self {
        self.severities = severities;
        self
    }

    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    pub fn severities(&self) -> &RuleSeverities {
        &self.severities
    }

    /// Validate a content tree against the rules for `template_type`
    pub fn validate(&self, content: &JsonValue, template_type: TemplateType) -> ValidationResult {
        let mut checker = Checker {
            severities: &self.severities,
            result: ValidationResult::success(),
        };

        let empty = Map::new();
        let root = match content.as_object() {
            Some(root) => root,
            None => {
                checker.report(Rule::ContentNotMap, "template content must be a map".to_string());
                &empty
            }
        };

        checker.basic_structure(root);
        if let Some(JsonValue::Object(info)) = root.get("template_info") {
            checker.template_info(info);
        }
        if let Some(JsonValue::Array(sections)) = root.get("sections") {
            checker.sections(sections);
        }
        if let Some(JsonValue::Object(format)) = root.get("format_config") {
            checker.format_config(format);
        }
        checker.type_specific(root, template_type);
        checker.variables(content);

        checker.result
    }

    /// Sorted, de-duplicated names of every variable the tree reads
    pub fn get_template_variables(&self, content: &JsonValue) -> Vec<String> {
        get_template_variables(content)
    }
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new(ValidationLevel::default())
    }
}

/// Sorted, de-duplicated names of every variable the tree reads
///
/// Walks every string leaf. Variable tags contribute their dotted path;
/// calls contribute the paths of their arguments. A tag that does not parse
/// and is not call-shaped is returned verbatim so callers can report it.
pub fn get_template_variables(content: &JsonValue) -> Vec<String> {
    let mut found = TagScan::default();
    collect_tags(content, &mut found);
    found.variables.into_iter().collect()
}

#[derive(Default)]
struct TagScan {
    variables: BTreeSet<String>,
    malformed: BTreeSet<String>,
}

fn collect_tags(value: &JsonValue, found: &mut TagScan) {
    match value {
        JsonValue::String(s) => {
            for segment in scan(s) {
                let Segment::Tag { raw, body } = segment else {
                    continue;
                };
                match parse_expr(body) {
                    Ok(expr) => {
                        let mut paths = Vec::new();
                        expr.collect_paths(&mut paths);
                        found.variables.extend(paths);
                    }
                    Err(_) => {
                        let trimmed = body.trim();
                        if trimmed.is_empty() || trimmed.contains('(') {
                            found.malformed.insert(raw.to_string());
                        } else {
                            found.variables.insert(trimmed.to_string());
                        }
                    }
                }
            }
        }
        JsonValue::Object(map) => {
            for v in map.values() {
                collect_tags(v, found);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_tags(item, found);
            }
        }
        _ => {}
    }
}

/// Display form of a JSON value used in messages
fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Checker<'a> {
    severities: &'a RuleSeverities,
    result: ValidationResult,
}

impl Checker<'_> {
    fn report(&mut self, rule: Rule, message: String) {
        let severity = self.severities.get(rule);
        self.result.add(severity, message);
    }

    fn basic_structure(&mut self, root: &Map<String, JsonValue>) {
        for key in REQUIRED_TOP_LEVEL {
            if !root.contains_key(key) {
                self.report(
                    Rule::MissingTopLevelKey,
                    format!("missing required field: {}", key),
                );
            }
        }

        if root.get("sections").is_some_and(|v| !v.is_array()) {
            self.report(
                Rule::MistypedTopLevelKey,
                "field 'sections' must be a list".to_string(),
            );
        }
        for key in ["template_info", "format_config"] {
            if root.get(key).is_some_and(|v| !v.is_object()) {
                self.report(
                    Rule::MistypedTopLevelKey,
                    format!("field '{}' must be a map", key),
                );
            }
        }
    }

    fn template_info(&mut self, info: &Map<String, JsonValue>) {
        for key in REQUIRED_TEMPLATE_INFO {
            if !info.contains_key(key) {
                self.report(
                    Rule::MissingTemplateInfoField,
                    format!("template_info is missing required field: {}", key),
                );
            }
        }

        if let Some(version) = info.get("version") {
            let ok = version.as_str().is_some_and(is_version_string);
            if !ok {
                self.report(
                    Rule::InvalidVersion,
                    format!(
                        "invalid version '{}': expected x.y or x.y.z",
                        display_value(version)
                    ),
                );
            }
        }
    }

    fn sections(&mut self, sections: &[JsonValue]) {
        if sections.is_empty() {
            self.report(Rule::EmptySections, "template defines no sections".to_string());
            return;
        }

        let mut seen_ids: HashSet<String> = HashSet::new();
        for (i, section) in sections.iter().enumerate() {
            let position = i + 1;
            let Some(section) = section.as_object() else {
                self.report(Rule::SectionNotMap, format!("section {} must be a map", position));
                continue;
            };

            for key in REQUIRED_SECTION_FIELDS {
                if !section.contains_key(key) {
                    self.report(
                        Rule::MissingSectionField,
                        format!("section {} is missing required field: {}", position, key),
                    );
                }
            }

            if let Some(id) = section.get("id") {
                let id = display_value(id);
                if !seen_ids.insert(id.clone()) {
                    self.report(Rule::DuplicateSectionId, format!("duplicate section id: {}", id));
                }
            }

            if let Some(kind) = section.get("type") {
                let kind_str = kind.as_str().unwrap_or_default();
                if !SUPPORTED_SECTION_TYPES.contains(&kind_str) {
                    self.report(
                        Rule::UnsupportedSectionType,
                        format!("unsupported section type: {}", display_value(kind)),
                    );
                }
                self.section_by_type(section, kind_str);
            }
        }
    }

    fn section_by_type(&mut self, section: &Map<String, JsonValue>, kind: &str) {
        let id = section
            .get("id")
            .map(display_value)
            .unwrap_or_else(|| "<unknown>".to_string());
        let has = |key: &str| {
            section
                .get("content")
                .and_then(JsonValue::as_object)
                .is_some_and(|content| content.contains_key(key))
        };

        match kind {
            "image_text_pair" => {
                for key in ["image_placeholder", "text_template"] {
                    if !has(key) {
                        self.report(
                            Rule::ImageTextPairField,
                            format!("image_text_pair section {} is missing content.{}", id, key),
                        );
                    }
                }
            }
            "analysis_conclusion" => {
                if !has("conclusion_template") {
                    self.report(
                        Rule::MissingConclusionTemplate,
                        format!(
                            "analysis_conclusion section {} is missing content.conclusion_template",
                            id
                        ),
                    );
                }
                if !has("polish_config") {
                    self.report(
                        Rule::MissingPolishConfig,
                        format!(
                            "analysis_conclusion section {} should define content.polish_config",
                            id
                        ),
                    );
                }
            }
            "chart" => {
                if !has("chart_type") {
                    self.report(
                        Rule::MissingChartType,
                        format!("chart section {} should specify content.chart_type", id),
                    );
                }
            }
            _ => {}
        }
    }

    fn format_config(&mut self, format: &Map<String, JsonValue>) {
        if let Some(size) = format
            .get("page_settings")
            .and_then(JsonValue::as_object)
            .and_then(|page| page.get("size"))
        {
            let known = size
                .as_str()
                .is_some_and(|s| KNOWN_PAGE_SIZES.contains(&s));
            if !known {
                self.report(
                    Rule::UnusualPageSize,
                    format!("unusual page size: {}", display_value(size)),
                );
            }
        }

        if let Some(fonts) = format
            .get("styles")
            .and_then(JsonValue::as_object)
            .and_then(|styles| styles.get("font_family"))
        {
            let names: Vec<&str> = match fonts {
                JsonValue::String(s) => vec![s.as_str()],
                JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_str).collect(),
                _ => Vec::new(),
            };
            let has_cjk = names
                .iter()
                .any(|name| CJK_FONTS.iter().any(|font| name.contains(font)));
            if !has_cjk {
                self.report(
                    Rule::MissingCjkFont,
                    "add a CJK-capable font (e.g. SimHei or Microsoft YaHei) to styles.font_family"
                        .to_string(),
                );
            }
        }
    }

    fn type_specific(&mut self, root: &Map<String, JsonValue>, template_type: TemplateType) {
        let kinds: HashSet<&str> = root
            .get("sections")
            .and_then(JsonValue::as_array)
            .map(|sections| {
                sections
                    .iter()
                    .filter_map(|s| s.get("type").and_then(JsonValue::as_str))
                    .collect()
            })
            .unwrap_or_default();

        match template_type {
            TemplateType::VibrationAnalysis => {
                if !kinds.contains("analysis_conclusion") {
                    self.report(
                        Rule::VibrationConclusionExpected,
                        "vibration_analysis templates should include an analysis_conclusion section"
                            .to_string(),
                    );
                }
                if !kinds.contains("chart") {
                    self.report(
                        Rule::VibrationChartExpected,
                        "vibration_analysis templates should include a chart section".to_string(),
                    );
                }
            }
            TemplateType::FaultDiagnosis => {
                if !kinds.contains("analysis_conclusion") {
                    self.report(
                        Rule::FaultDiagnosisConclusionRequired,
                        "fault_diagnosis templates must include an analysis_conclusion section"
                            .to_string(),
                    );
                }
            }
            _ => {}
        }
    }

    fn variables(&mut self, content: &JsonValue) {
        let mut found = TagScan::default();
        collect_tags(content, &mut found);

        for name in &found.variables {
            if !name.split('.').all(is_identifier) {
                self.report(
                    Rule::InvalidVariableName,
                    format!("invalid variable name: {}", name),
                );
            }
            let head = name.split('.').next().unwrap_or_default();
            if head.starts_with("temp_") || head.starts_with("tmp_") {
                self.report(
                    Rule::TemporaryVariableName,
                    format!("variable {} looks temporary; consider a more descriptive name", name),
                );
            }
        }

        for raw in &found.malformed {
            self.report(
                Rule::MalformedExpression,
                format!("malformed expression {} will be left unrendered", raw),
            );
        }
    }
}

/// `x.y` or `x.y.z` with decimal components
fn is_version_string(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    (parts.len() == 2 || parts.len() == 3)
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
