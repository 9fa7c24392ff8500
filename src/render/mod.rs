//! Template rendering - context, built-in functions, engine

pub mod context;
pub mod engine;
pub mod functions;

pub use context::{RenderContext, TemplateFunction};
pub use engine::{RenderError, RenderResult, TemplateEngine};
pub use functions::FunctionError;
