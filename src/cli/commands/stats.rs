//! `rtt stats` command - Show store statistics

use console::style;
use miette::Result;

use crate::cli::helpers::{print_json, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct StatsArgs {}

pub fn run(_args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let stats = workspace.storage.statistics();

    if global.format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("{}", style("Template Store").bold());
    println!("  Location:  {}", workspace.storage.root().display());
    println!("  Templates: {}", style(stats.total_templates).cyan());
    println!("  Versions:  {}", style(stats.total_versions).cyan());

    if !stats.by_type.is_empty() {
        println!();
        println!("{}", style("By type").bold());
        for (template_type, count) in &stats.by_type {
            println!("  {:<20} {}", template_type, count);
        }
    }

    if !stats.recent.is_empty() {
        println!();
        println!("{}", style("Recently updated").bold());
        for recent in &stats.recent {
            println!(
                "  {}  {:<26} {} ({})",
                recent.updated_at,
                recent.template_id,
                recent.name,
                recent.template_type
            );
        }
    }
    Ok(())
}
