//! Bindings supplied to a single render call

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::TemplateMetadata;
use crate::render::functions::FunctionError;

/// A caller-supplied render function
pub type TemplateFunction =
    Arc<dyn Fn(&[JsonValue]) -> Result<JsonValue, FunctionError> + Send + Sync>;

/// Variables, functions and (optionally) metadata for one render
///
/// Metadata is only consulted to pick the validation rules for the
/// template's type.
#[derive(Clone, Default)]
pub struct RenderContext {
    pub variables: Map<String, JsonValue>,
    pub functions: HashMap<String, TemplateFunction>,
    pub metadata: Option<TemplateMetadata>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context over an existing variable map
    pub fn from_variables(variables: Map<String, JsonValue>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[JsonValue]) -> Result<JsonValue, FunctionError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn with_metadata(mut self, metadata: TemplateMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set a value at a dotted path, creating intermediate maps
    ///
    /// Any non-map value found along the path is replaced by a map.
    pub fn set_path(&mut self, path: &str, value: JsonValue) {
        let mut segments = path.split('.').peekable();
        let mut current = &mut self.variables;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                current.insert(segment.to_string(), value);
                return;
            }
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !entry.is_object() {
                *entry = JsonValue::Object(Map::new());
            }
            match entry {
                JsonValue::Object(map) => current = map,
                _ => return,
            }
        }
    }

    /// Walk a dotted path through the variables
    ///
    /// JSON null counts as absent.
    pub fn lookup(&self, path: &[String]) -> Option<&JsonValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.variables.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        (!current.is_null()).then_some(current)
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("RenderContext")
            .field("variables", &self.variables)
            .field("functions", &functions)
            .field("metadata", &self.metadata.as_ref().map(|m| &m.template_id))
            .finish()
    }
}
