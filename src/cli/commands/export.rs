//! `rtt export` command - Write a template to a bundle file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::core::TemplateType;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// Bundle file to write
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Include version snapshots
    #[arg(long)]
    pub with_versions: bool,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let bundle = workspace
        .storage
        .export(&args.id, args.template_type, &args.output, args.with_versions)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Exported {} ({} version(s)) to {}",
            style("✓").green(),
            style(&args.id).cyan(),
            bundle.versions.len(),
            style(args.output.display()).cyan()
        );
    }
    Ok(())
}
