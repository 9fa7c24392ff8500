//! Template syntax and validation

pub mod rules;
pub mod syntax;
pub mod validator;

pub use rules::{Rule, RuleSeverities, Severity, ValidationLevel};
pub use syntax::{Expr, Segment, SyntaxError};
pub use validator::{get_template_variables, TemplateValidator, ValidationResult};
