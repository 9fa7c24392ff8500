//! `rtt search` command - Search templates by name, description or tag

use console::style;
use miette::Result;

use crate::cli::commands::list::print_templates;
use crate::cli::helpers::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::TemplateType;

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search term (case-insensitive substring)
    pub query: String,

    /// Only search templates of this type
    #[arg(long = "type", short = 't')]
    pub template_type: Option<TemplateType>,

    /// Limit number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

pub fn run(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let mut results = workspace.storage.search(&args.query, args.template_type);
    results.truncate(args.limit);

    if results.is_empty() && matches!(global.format, OutputFormat::Auto | OutputFormat::Table) {
        println!("No results found for '{}'.", style(&args.query).yellow());
        return Ok(());
    }
    print_templates(&results, global)
}
