//! `rtt preview` command - Render a template against sample values

use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::render::finish;
use crate::cli::helpers::{print_json, Workspace};
use crate::cli::GlobalOpts;
use crate::core::TemplateType;

#[derive(clap::Args, Debug)]
pub struct PreviewArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// Print the generated sample variables instead of rendering
    #[arg(long)]
    pub samples: bool,

    /// Write the preview to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: PreviewArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let (content, _) = workspace
        .storage
        .get(&args.id, args.template_type)
        .map_err(|e| miette::miette!("{}", e))?;

    let engine = workspace.engine();
    if args.samples {
        let context = engine.create_sample_context(&content);
        return print_json(&context.variables);
    }

    let result = engine.preview(&content);
    finish(&result, args.output.as_deref(), global)
}
