//! `rtt show` command - Print a template's content

use miette::Result;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cli::helpers::{print_json, Workspace};
use crate::cli::GlobalOpts;
use crate::core::{TemplateMetadata, TemplateType};

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// Include the metadata record
    #[arg(long)]
    pub metadata: bool,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    metadata: &'a TemplateMetadata,
    content: &'a JsonValue,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let (content, metadata) = workspace
        .storage
        .get(&args.id, args.template_type)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.metadata {
        print_json(&ShowOutput {
            metadata: &metadata,
            content: &content,
        })
    } else {
        print_json(&content)
    }
}
