//! `rtt validate` command - Validate a stored template or a content file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{print_json, print_validation, read_json_file, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::TemplateType;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Stored template ID
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub id: Option<String>,

    /// Validate a JSON content file instead of a stored template
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Template type whose rules apply
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;

    let (label, content) = match (&args.file, &args.id) {
        (Some(file), _) => (file.display().to_string(), read_json_file(file)?),
        (None, Some(id)) => {
            let (content, _) = workspace
                .storage
                .get(id, args.template_type)
                .map_err(|e| miette::miette!("{}", e))?;
            (id.clone(), content)
        }
        (None, None) => return Err(miette::miette!("Give a template ID or --file")),
    };

    let result = workspace.validator().validate(&content, args.template_type);

    if global.format == OutputFormat::Json {
        print_json(&result)?;
    } else {
        let mark = if result.is_valid {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "{} {} ({}, validation: {})",
            mark,
            style(&label).cyan(),
            args.template_type,
            workspace.validation()
        );
        print_validation(&result);
        if !global.quiet {
            println!();
            println!(
                "{} error(s), {} warning(s), {} suggestion(s)",
                result.errors.len(),
                result.warnings.len(),
                result.suggestions.len()
            );
        }
    }

    if result.is_valid {
        Ok(())
    } else {
        Err(miette::miette!(
            "{} failed validation with {} error(s)",
            label,
            result.errors.len()
        ))
    }
}
