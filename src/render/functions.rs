//! Built-in render functions
//!
//! | name            | arguments            | result                          |
//! |-----------------|----------------------|---------------------------------|
//! | `now`           |                      | local time `%Y-%m-%d %H:%M:%S`  |
//! | `today`         |                      | local date `%Y-%m-%d`           |
//! | `format_number` | `x, precision = 2`   | `x` with fixed decimals         |
//! | `upper`         | `x`                  | uppercased text                 |
//! | `lower`         | `x`                  | lowercased text                 |
//! | `title`         | `x`                  | each word capitalised           |
//! | `len`           | `x`                  | length of text, list or map     |
//! | `default`       | `x, fallback`        | `x`, or `fallback` if null      |

use chrono::Local;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

/// Signature shared by every built-in
pub type BuiltinFn = fn(&[JsonValue]) -> Result<JsonValue, FunctionError>;

/// Largest precision `format_number` accepts
pub const MAX_PRECISION: u64 = 17;

/// A render function could not produce a value
///
/// Never escapes a render: the tag that called the function is left as-is.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FunctionError {
    #[error("{name}() expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{name}(): {message}")]
    InvalidArgument { name: &'static str, message: String },

    #[error("unknown function: {0}")]
    Unknown(String),

    #[error("{0}")]
    Failed(String),
}

/// The built-in function table
pub fn builtins() -> HashMap<&'static str, BuiltinFn> {
    let table: [(&'static str, BuiltinFn); 8] = [
        ("now", now),
        ("today", today),
        ("format_number", format_number),
        ("upper", upper),
        ("lower", lower),
        ("title", title),
        ("len", len),
        ("default", default),
    ];
    table.into_iter().collect()
}

/// Text form of a value as it appears in rendered output
///
/// Null has no text form.
pub fn to_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn arity(
    name: &'static str,
    args: &[JsonValue],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), FunctionError> {
    if args.len() < min || args.len() > max {
        return Err(FunctionError::Arity {
            name,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn text_arg(name: &'static str, value: &JsonValue) -> Result<String, FunctionError> {
    to_text(value).ok_or_else(|| FunctionError::InvalidArgument {
        name,
        message: "argument is null".to_string(),
    })
}

fn now(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("now", args, 0, 0, "0")?;
    Ok(Local::now().format("%Y-%m-%d %H:%M:%S").to_string().into())
}

fn today(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("today", args, 0, 0, "0")?;
    Ok(Local::now().format("%Y-%m-%d").to_string().into())
}

fn format_number(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    const NAME: &str = "format_number";
    arity(NAME, args, 1, 2, "1 or 2")?;

    let number = match &args[0] {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| FunctionError::InvalidArgument {
        name: NAME,
        message: format!("not a number: {}", args[0]),
    })?;

    let precision = match args.get(1) {
        None => 2,
        Some(p) => p
            .as_u64()
            .or_else(|| p.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .filter(|p| *p <= MAX_PRECISION)
            .ok_or_else(|| FunctionError::InvalidArgument {
                name: NAME,
                message: format!("precision must be an integer from 0 to {}", MAX_PRECISION),
            })?,
    };

    Ok(format!("{:.*}", precision as usize, number).into())
}

fn upper(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("upper", args, 1, 1, "1")?;
    Ok(text_arg("upper", &args[0])?.to_uppercase().into())
}

fn lower(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("lower", args, 1, 1, "1")?;
    Ok(text_arg("lower", &args[0])?.to_lowercase().into())
}

fn title(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("title", args, 1, 1, "1")?;
    let text = text_arg("title", &args[0])?;

    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    Ok(out.into())
}

fn len(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("len", args, 1, 1, "1")?;
    let n = match &args[0] {
        JsonValue::String(s) => s.chars().count(),
        JsonValue::Array(items) => items.len(),
        JsonValue::Object(map) => map.len(),
        _ => 0,
    };
    Ok(n.into())
}

fn default(args: &[JsonValue]) -> Result<JsonValue, FunctionError> {
    arity("default", args, 2, 2, "2")?;
    if args[0].is_null() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}
