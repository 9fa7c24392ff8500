//! `rtt delete` command - Delete a template and its snapshots

use console::style;
use miette::Result;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::core::{StorageError, TemplateType};

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,
}

pub fn run(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    if !workspace.storage.exists(&args.id, args.template_type) {
        return Err(miette::miette!(
            "{}",
            StorageError::NotFound {
                template_id: args.id,
                template_type: args.template_type,
            }
        ));
    }

    if !workspace.storage.delete(&args.id, args.template_type) {
        return Err(miette::miette!(
            "Failed to remove every record of {}; see the log for details",
            args.id
        ));
    }
    if !global.quiet {
        println!("{} Deleted {}", style("✓").green(), style(&args.id).cyan());
    }
    Ok(())
}
