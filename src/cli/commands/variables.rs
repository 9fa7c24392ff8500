//! `rtt variables` command - List the variables a template reads

use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{print_json, read_json_file, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::TemplateType;
use crate::schema::get_template_variables;

#[derive(clap::Args, Debug)]
pub struct VariablesArgs {
    /// Stored template ID
    #[arg(required_unless_present = "file", conflicts_with = "file", requires = "template_type")]
    pub id: Option<String>,

    /// Read a JSON content file instead of a stored template
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Template type (required with an ID)
    #[arg(long = "type", short = 't')]
    pub template_type: Option<TemplateType>,
}

pub fn run(args: VariablesArgs, global: &GlobalOpts) -> Result<()> {
    let content = match (&args.file, &args.id, args.template_type) {
        (Some(file), _, _) => read_json_file(file)?,
        (None, Some(id), Some(template_type)) => {
            let workspace = Workspace::open(global)?;
            let (content, _) = workspace
                .storage
                .get(id, template_type)
                .map_err(|e| miette::miette!("{}", e))?;
            content
        }
        _ => return Err(miette::miette!("Give a template ID with --type, or --file")),
    };

    let variables = get_template_variables(&content);
    if global.format == OutputFormat::Json {
        print_json(&variables)
    } else {
        for name in &variables {
            println!("{}", name);
        }
        Ok(())
    }
}
