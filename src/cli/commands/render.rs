//! `rtt render` command - Render a template against a set of variables

use console::style;
use miette::Result;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::cli::helpers::{emit_json, parse_assignment, print_json, read_json_file, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::TemplateType;
use crate::render::{RenderContext, RenderResult};

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// JSON file with the variable map
    #[arg(long)]
    pub vars: Option<PathBuf>,

    /// Set a variable (repeatable, dotted names allowed, value parsed as JSON if possible)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,

    /// Skip pre-render validation
    #[arg(long)]
    pub no_validate: bool,

    /// Write the rendered tree to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: RenderArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let (content, metadata) = workspace
        .storage
        .get(&args.id, args.template_type)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut context = match &args.vars {
        Some(path) => match read_json_file(path)? {
            JsonValue::Object(variables) => RenderContext::from_variables(variables),
            _ => {
                return Err(miette::miette!(
                    "{} must hold a JSON object of variables",
                    path.display()
                ))
            }
        },
        None => RenderContext::new(),
    };
    for assignment in &args.assignments {
        let (key, value) = parse_assignment(assignment)?;
        context.set_path(&key, value);
    }
    context = context.with_metadata(metadata);

    let result = workspace
        .engine()
        .render(&content, &context, !args.no_validate);
    finish(&result, args.output.as_deref(), global)
}

/// Print a render outcome; errors become a non-zero exit
pub(crate) fn finish(
    result: &RenderResult,
    output: Option<&std::path::Path>,
    global: &GlobalOpts,
) -> Result<()> {
    if global.format == OutputFormat::Json && output.is_none() {
        print_json(result)?;
    } else if let Some(content) = &result.content {
        emit_json(content, output)?;
    }

    if !global.quiet {
        for warning in &result.warnings {
            eprintln!("{} {}", style("warning:").yellow(), warning);
        }
    }

    if result.success {
        if let Some(path) = output {
            if !global.quiet {
                eprintln!(
                    "{} Rendered to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
            }
        }
        Ok(())
    } else {
        for error in &result.errors {
            eprintln!("  {} {}", style("✗").red(), error);
        }
        Err(miette::miette!(
            "Render failed with {} error(s)",
            result.errors.len()
        ))
    }
}
