//! `rtt init` command - Create the template store

use console::style;
use miette::Result;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::core::{seed_defaults, TemplateType};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the store without seeding the default templates
    #[arg(long)]
    pub no_defaults: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let storage = &workspace.storage;

    if !global.quiet {
        println!(
            "{} Initialized template store at {}",
            style("✓").green(),
            style(storage.root().display()).cyan()
        );
        for template_type in TemplateType::all() {
            println!("  {}/", template_type);
        }
    }

    if args.no_defaults {
        return Ok(());
    }

    let created = seed_defaults(storage, &workspace.config.author())
        .map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        if created.is_empty() {
            println!("Default templates already present.");
        } else {
            for id in &created {
                println!("{} Added default template {}", style("✓").green(), style(id).cyan());
            }
        }
        println!();
        println!("Next steps:");
        println!("  {} List templates", style("rtt list").yellow());
        println!("  {} Preview a template", style("rtt preview <ID> -t <TYPE>").yellow());
    }
    Ok(())
}
