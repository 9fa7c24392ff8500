//! Rendering of template content trees against a context

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::render::context::RenderContext;
use crate::render::functions::{builtins, to_text, BuiltinFn, FunctionError};
use crate::schema::syntax::{is_identifier, parse_expr, scan, Expr, Segment};
use crate::schema::{get_template_variables, TemplateValidator};

/// Deepest nesting of maps, lists and calls a render will follow
pub const MAX_DEPTH: usize = 256;

/// Internal render fault
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("template nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// Outcome of one render call
///
/// `content` is `None` exactly when `success` is false. Tags that could not
/// be resolved stay verbatim in the output and are listed in `unresolved`;
/// they are not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    pub success: bool,
    pub content: Option<JsonValue>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub unresolved: Vec<String>,
}

impl RenderResult {
    fn failed(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            content: None,
            errors,
            warnings,
            unresolved: Vec::new(),
        }
    }
}

/// Substitutes `{{ }}` tags in every string leaf of a content tree
///
/// Holds the built-in function table and the validator used as a pre-render
/// gate. Rendering never mutates the input tree and keeps no state between
/// calls.
#[derive(Clone)]
pub struct TemplateEngine {
    builtins: HashMap<&'static str, BuiltinFn>,
    validator: TemplateValidator,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self {
            builtins: builtins(),
            validator: TemplateValidator::default(),
        }
    }

    pub fn with_validator(mut self, validator: TemplateValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn validator(&self) -> &TemplateValidator {
        &self.validator
    }

    /// Render `content` against `context`
    ///
    /// With `validate` set and metadata in the context, the validator runs
    /// first for the metadata's template type; any validation error aborts
    /// the render. Validation warnings are passed through.
    pub fn render(&self, content: &JsonValue, context: &RenderContext, validate: bool) -> RenderResult {
        let mut warnings = Vec::new();

        if validate {
            if let Some(metadata) = &context.metadata {
                let validation = self.validator.validate(content, metadata.template_type);
                if !validation.is_valid {
                    warn!(
                        template_id = %metadata.template_id,
                        errors = validation.errors.len(),
                        "template failed validation, not rendering"
                    );
                    return RenderResult::failed(validation.errors, validation.warnings);
                }
                warnings = validation.warnings;
            }
        }

        let mut pass = RenderPass {
            engine: self,
            context,
            unresolved: BTreeSet::new(),
        };
        match pass.value(content, 0) {
            Ok(rendered) => RenderResult {
                success: true,
                content: Some(rendered),
                errors: Vec::new(),
                warnings,
                unresolved: pass.unresolved.into_iter().collect(),
            },
            Err(e) => {
                warn!(error = %e, "render aborted");
                RenderResult::failed(vec![format!("render error: {}", e)], warnings)
            }
        }
    }

    /// Render against made-up sample values, skipping validation
    pub fn preview(&self, content: &JsonValue) -> RenderResult {
        let context = self.create_sample_context(content);
        self.render(content, &context, false)
    }

    /// A context with a plausible sample value for every template variable
    ///
    /// When a template reads both `a` and `a.b`, `a` keeps its scalar sample
    /// and `a.b` is left unset.
    pub fn create_sample_context(&self, content: &JsonValue) -> RenderContext {
        let names: BTreeSet<String> = get_template_variables(content)
            .into_iter()
            .filter(|name| name.split('.').all(is_identifier))
            .collect();

        let mut context = RenderContext::new();
        for name in &names {
            let shadowed = name
                .match_indices('.')
                .any(|(i, _)| names.contains(&name[..i]));
            if shadowed {
                continue;
            }
            context.set_path(name, sample_value(name));
        }
        context
    }

    pub fn get_template_variables(&self, content: &JsonValue) -> Vec<String> {
        get_template_variables(content)
    }

    fn call(
        &self,
        context: &RenderContext,
        name: &str,
        args: &[JsonValue],
    ) -> Result<JsonValue, FunctionError> {
        if let Some(builtin) = self.builtins.get(name) {
            return builtin(args);
        }
        match context.functions.get(name) {
            Some(function) => function(args),
            None => Err(FunctionError::Unknown(name.to_string())),
        }
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builtins: Vec<&str> = self.builtins.keys().copied().collect();
        builtins.sort_unstable();
        f.debug_struct("TemplateEngine")
            .field("builtins", &builtins)
            .field("validator", &self.validator)
            .finish()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample value guessed from a variable's name
fn sample_value(name: &str) -> JsonValue {
    let lower = name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["date", "time"]) {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string().into()
    } else if has(&["name"]) {
        "Sample Name".into()
    } else if has(&["value", "result"]) {
        JsonValue::from(123.45_f64)
    } else if has(&["count", "number"]) {
        JsonValue::from(10_u64)
    } else if has(&["description", "content"]) {
        "This is a sample description.".into()
    } else {
        format!("sample_{}", name).into()
    }
}

struct RenderPass<'a> {
    engine: &'a TemplateEngine,
    context: &'a RenderContext,
    unresolved: BTreeSet<String>,
}

/// Why a tag could not be substituted
enum TagFailure {
    Missing,
    Function(FunctionError),
    Fault(RenderError),
}

impl RenderPass<'_> {
    fn value(&mut self, value: &JsonValue, depth: usize) -> Result<JsonValue, RenderError> {
        if depth > MAX_DEPTH {
            return Err(RenderError::TooDeep(MAX_DEPTH));
        }
        Ok(match value {
            JsonValue::String(s) => JsonValue::String(self.string(s, depth)?),
            JsonValue::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, v) in map {
                    out.insert(key.clone(), self.value(v, depth + 1)?);
                }
                JsonValue::Object(out)
            }
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.value(item, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        })
    }

    fn string(&mut self, s: &str, depth: usize) -> Result<String, RenderError> {
        let mut out = String::with_capacity(s.len());
        for segment in scan(s) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Tag { raw, body } => match self.tag(body, depth) {
                    Ok(text) => out.push_str(&text),
                    Err(TagFailure::Fault(e)) => return Err(e),
                    Err(TagFailure::Missing) => {
                        warn!(tag = raw, "undefined variable, leaving tag as-is");
                        self.unresolved.insert(raw.to_string());
                        out.push_str(raw);
                    }
                    Err(TagFailure::Function(e)) => {
                        warn!(tag = raw, error = %e, "function call failed, leaving tag as-is");
                        self.unresolved.insert(raw.to_string());
                        out.push_str(raw);
                    }
                },
            }
        }
        Ok(out)
    }

    fn tag(&mut self, body: &str, depth: usize) -> Result<String, TagFailure> {
        let expr = match parse_expr(body) {
            Ok(expr) => expr,
            Err(e) => {
                debug!(error = %e, "unparseable tag");
                return Err(TagFailure::Missing);
            }
        };
        match &expr {
            Expr::Path(path) => self
                .context
                .lookup(path)
                .and_then(to_text)
                .ok_or(TagFailure::Missing),
            _ => Ok(to_text(&self.eval(&expr, depth)?).unwrap_or_default()),
        }
    }

    fn eval(&mut self, expr: &Expr, depth: usize) -> Result<JsonValue, TagFailure> {
        if depth > MAX_DEPTH {
            return Err(TagFailure::Fault(RenderError::TooDeep(MAX_DEPTH)));
        }
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => Ok(self.context.lookup(path).cloned().unwrap_or(JsonValue::Null)),
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                self.engine
                    .call(self.context, name, &args)
                    .map_err(TagFailure::Function)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TemplateMetadata, TemplateType};
    use serde_json::json;

    fn render(content: JsonValue, variables: JsonValue) -> RenderResult {
        let variables = match variables {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        TemplateEngine::new().render(&content, &RenderContext::from_variables(variables), true)
    }

    #[test]
    fn test_render_variable() {
        let result = render(json!({"x": "Hello {{name}}"}), json!({"name": "World"}));
        assert!(result.success);
        assert_eq!(result.content, Some(json!({"x": "Hello World"})));
    }

    #[test]
    fn test_render_function() {
        let result = render(json!({"x": "{{upper(name)}}"}), json!({"name": "abc"}));
        assert_eq!(result.content, Some(json!({"x": "ABC"})));
    }

    #[test]
    fn test_unresolved_variable_stays_verbatim() {
        let result = render(json!({"x": "a {{missing}} b"}), json!({}));
        assert!(result.success);
        assert!(result.errors.is_empty());
        assert_eq!(result.content, Some(json!({"x": "a {{missing}} b"})));
        assert_eq!(result.unresolved, vec!["{{missing}}"]);
    }

    #[test]
    fn test_null_variable_is_unresolved() {
        let result = render(json!("{{ gone }}"), json!({"gone": null}));
        assert_eq!(result.content, Some(json!("{{ gone }}")));
    }

    #[test]
    fn test_failing_function_stays_verbatim() {
        let result = render(
            json!(["{{ upper(missing) }}", "{{ nope(1) }}", "{{ format_number('x') }}"]),
            json!({}),
        );
        assert!(result.success);
        assert_eq!(
            result.content,
            Some(json!(["{{ upper(missing) }}", "{{ nope(1) }}", "{{ format_number('x') }}"]))
        );
        assert_eq!(result.unresolved.len(), 3);
    }

    #[test]
    fn test_nested_calls_and_quoted_commas() {
        let result = render(
            json!({
                "a": "{{ upper(default(site, 'north, east')) }}",
                "b": "{{ format_number(stats.rms, 3) }} mm/s",
                "c": "{{ len(items) }} items",
                "d": "\\{{ literal }}"
            }),
            json!({"stats": {"rms": 4.21}, "items": [1, 2]}),
        );
        assert_eq!(
            result.content,
            Some(json!({
                "a": "NORTH, EAST",
                "b": "4.210 mm/s",
                "c": "2 items",
                "d": "{{ literal }}"
            }))
        );
    }

    #[test]
    fn test_builtins_shadow_custom_functions() {
        let ctx = RenderContext::new()
            .with_variable("name", "abc")
            .with_function("upper", |_| Ok(json!("custom")))
            .with_function("shout", |args| {
                let text = args.first().and_then(JsonValue::as_str).unwrap_or_default();
                Ok(json!(format!("{}!", text)))
            });
        let result = TemplateEngine::new().render(
            &json!(["{{ upper(name) }}", "{{ shout(name) }}"]),
            &ctx,
            false,
        );
        assert_eq!(result.content, Some(json!(["ABC", "abc!"])));
    }

    #[test]
    fn test_custom_function_error_is_contained() {
        let ctx = RenderContext::new()
            .with_function("boom", |_| Err(FunctionError::Failed("exploded".to_string())));
        let result = TemplateEngine::new().render(&json!({"x": "{{ boom() }}"}), &ctx, false);
        assert!(result.success);
        assert_eq!(result.content, Some(json!({"x": "{{ boom() }}"})));
    }

    #[test]
    fn test_non_string_leaves_pass_through() {
        let content = json!({"n": 1.5, "b": true, "z": null, "k": {"{{name}}": "{{name}}"}});
        let result = render(content, json!({"name": "v"}));
        assert_eq!(
            result.content,
            Some(json!({"n": 1.5, "b": true, "z": null, "k": {"{{name}}": "v"}}))
        );
    }

    #[test]
    fn test_input_is_not_mutated() {
        let content = json!({"x": "{{name}}"});
        let before = content.clone();
        let engine = TemplateEngine::new();
        let ctx = RenderContext::new().with_variable("name", "y");
        engine.render(&content, &ctx, false);
        assert_eq!(content, before);
    }

    #[test]
    fn test_validation_failure_blocks_render() {
        let ctx = RenderContext::new()
            .with_metadata(TemplateMetadata::new("Broken", TemplateType::Custom));
        let result = TemplateEngine::new().render(&json!({"x": "{{name}}"}), &ctx, true);
        assert!(!result.success);
        assert!(result.content.is_none());
        assert!(result.errors.iter().any(|e| e.contains("sections")));
    }

    #[test]
    fn test_validation_skipped_without_metadata_or_flag() {
        let content = json!({"x": "plain"});
        let engine = TemplateEngine::new();
        assert!(engine.render(&content, &RenderContext::new(), true).success);
        let ctx = RenderContext::new()
            .with_metadata(TemplateMetadata::new("Broken", TemplateType::Custom));
        assert!(engine.render(&content, &ctx, false).success);
    }

    #[test]
    fn test_validation_warnings_are_forwarded() {
        let content = json!({
            "template_info": {"name": "T", "version": "1.0", "description": "d"},
            "sections": [
                {"id": "c", "name": "C", "type": "analysis_conclusion",
                 "content": {"conclusion_template": "{{ summary }}", "polish_config": {}}}
            ],
            "format_config": {"page_settings": {"size": "A4"}, "styles": {"font_family": "SimHei"}}
        });
        let ctx = RenderContext::new()
            .with_variable("summary", "ok")
            .with_metadata(TemplateMetadata::new("T", TemplateType::VibrationAnalysis));
        let result = TemplateEngine::new().render(&content, &ctx, true);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.content.unwrap()["sections"][0]["content"]["conclusion_template"],
            json!("ok")
        );
    }

    #[test]
    fn test_runaway_nesting_is_internal_error() {
        let mut content = json!("leaf");
        for _ in 0..(MAX_DEPTH + 5) {
            content = json!([content]);
        }
        let result = TemplateEngine::new().render(&content, &RenderContext::new(), false);
        assert!(!result.success);
        assert!(result.content.is_none());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_sample_context_heuristics() {
        let engine = TemplateEngine::new();
        let content = json!({
            "a": "{{report_date}} {{turbine_name}} {{rms_value}} {{alarm_count}}",
            "b": "{{fault_description}} {{site.code}} {{bad-name}}"
        });
        let ctx = engine.create_sample_context(&content);
        let vars = JsonValue::Object(ctx.variables);

        assert_eq!(vars["report_date"].as_str().unwrap().len(), 19);
        assert_eq!(vars["turbine_name"], json!("Sample Name"));
        assert_eq!(vars["rms_value"], json!(123.45));
        assert_eq!(vars["alarm_count"], json!(10));
        assert_eq!(vars["fault_description"], json!("This is a sample description."));
        assert_eq!(vars["site"], json!({"code": "sample_site.code"}));
        assert!(vars.get("bad-name").is_none());
    }

    #[test]
    fn test_sample_context_keeps_scalar_over_dotted_extension() {
        let engine = TemplateEngine::new();
        let content = json!({"a": "{{site}} / {{site.code}}", "b": "{{turbine.rated_power}}"});
        let vars = JsonValue::Object(engine.create_sample_context(&content).variables);

        assert_eq!(vars["site"], json!("sample_site"));
        assert_eq!(vars["turbine"], json!({"rated_power": "sample_turbine.rated_power"}));

        let result = engine.preview(&content);
        assert_eq!(
            result.content.unwrap()["a"],
            json!("sample_site / {{site.code}}")
        );
    }

    #[test]
    fn test_deeply_nested_calls_stay_verbatim() {
        let depth = 20_000;
        let tag = format!("{{{{ {}x{} }}}}", "upper(".repeat(depth), ")".repeat(depth));
        let content = json!({"x": tag.clone()});

        let result = render(content.clone(), json!({"x": "deep"}));
        assert!(result.success);
        assert!(result.errors.is_empty());
        assert_eq!(result.content, Some(content));
        assert_eq!(result.unresolved, vec![tag]);
    }

    #[test]
    fn test_preview_snapshot() {
        let content = json!({
            "title": "{{ upper(site.code) }} report",
            "body": ["RMS {{ format_number(rms_value, 1) }}", "{{ alarm_count }} alarms"],
            "note": "{{ default(missing, 'none') }}"
        });
        let result = TemplateEngine::new().preview(&content);
        insta::assert_json_snapshot!(result, @r###"
        {
          "success": true,
          "content": {
            "title": "SAMPLE_SITE.CODE report",
            "body": [
              "RMS 123.5",
              "10 alarms"
            ],
            "note": "sample_missing"
          },
          "errors": [],
          "warnings": [],
          "unresolved": []
        }
        "###);
    }
}
