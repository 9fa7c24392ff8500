//! `rtt list` command - List stored templates

use console::style;
use miette::Result;

use crate::cli::helpers::{metadata_table, print_json, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{TemplateMetadata, TemplateType};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only list templates of this type
    #[arg(long = "type", short = 't')]
    pub template_type: Option<TemplateType>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let templates = workspace.storage.list(args.template_type);

    if args.count {
        println!("{}", templates.len());
        return Ok(());
    }
    print_templates(&templates, global)
}

/// Print metadata in the selected output format
pub(crate) fn print_templates(templates: &[TemplateMetadata], global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => print_json(&templates),
        OutputFormat::Id => {
            for meta in templates {
                println!("{}", meta.template_id);
            }
            Ok(())
        }
        OutputFormat::Table | OutputFormat::Auto => {
            if templates.is_empty() {
                if !global.quiet {
                    println!("No templates found.");
                }
                return Ok(());
            }
            println!("{}", metadata_table(templates));
            if !global.quiet {
                println!();
                println!("{} template(s) found", style(templates.len()).cyan());
            }
            Ok(())
        }
    }
}
