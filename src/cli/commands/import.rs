//! `rtt import` command - Load a template from a bundle file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Bundle file to read
    pub file: PathBuf,

    /// Replace an existing template with the same ID and type
    #[arg(long)]
    pub overwrite: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let id = workspace
        .storage
        .import(&args.file, args.overwrite)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Id | OutputFormat::Json => println!("{}", id),
        _ => {
            if !global.quiet {
                println!(
                    "{} Imported {} from {}",
                    style("✓").green(),
                    style(&id).cyan(),
                    style(args.file.display()).cyan()
                );
            }
        }
    }
    Ok(())
}
