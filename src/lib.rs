//! RTT: Report Template Toolkit
//!
//! Storage, validation and rendering of structured report templates. A
//! template is a JSON content tree (`template_info`, `sections`,
//! `format_config`) whose string leaves carry `{{ }}` tags, plus a metadata
//! record describing it.

pub mod cli;
pub mod core;
pub mod render;
pub mod schema;
