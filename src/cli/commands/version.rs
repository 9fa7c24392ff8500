//! `rtt version` command - Manage template version snapshots

use clap::Subcommand;
use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{print_json, truncate_str, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{TemplateType, MAX_VERSIONS};

#[derive(Subcommand, Debug)]
pub enum VersionCommands {
    /// Snapshot the current content of a template
    Create(CreateArgs),

    /// List a template's snapshots, oldest first
    List(ListArgs),

    /// Restore a template's content from a snapshot
    Restore(RestoreArgs),
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// Comment stored with the snapshot
    #[arg(long, short = 'm', default_value = "")]
    pub message: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Template ID
    pub id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,
}

#[derive(clap::Args, Debug)]
pub struct RestoreArgs {
    /// Template ID
    pub id: String,

    /// Snapshot to restore
    pub version_id: String,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,
}

pub fn run(cmd: VersionCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        VersionCommands::Create(args) => run_create(args, global),
        VersionCommands::List(args) => run_list(args, global),
        VersionCommands::Restore(args) => run_restore(args, global),
    }
}

fn run_create(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let info = workspace
        .storage
        .create_version(&args.id, args.template_type, &args.message)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Id => {
            println!("{}", info.version_id);
            Ok(())
        }
        _ => {
            println!(
                "{} Created version {} of {}",
                style("✓").green(),
                style(&info.version_id).cyan(),
                args.id
            );
            Ok(())
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let versions = workspace
        .storage
        .list_versions(&args.id, args.template_type)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => print_json(&versions),
        OutputFormat::Id => {
            for info in &versions {
                println!("{}", info.version_id);
            }
            Ok(())
        }
        OutputFormat::Table | OutputFormat::Auto => {
            if versions.is_empty() {
                println!("No versions of {}.", style(&args.id).cyan());
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["VERSION", "CREATED", "TEMPLATE VERSION", "COMMENT"]);
            for info in &versions {
                builder.push_record([
                    info.version_id.clone(),
                    info.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    info.template_version.clone().unwrap_or_default(),
                    truncate_str(&info.comment, 50),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
            if !global.quiet {
                println!();
                println!("{}/{} version(s) kept", versions.len(), MAX_VERSIONS);
            }
            Ok(())
        }
    }
}

fn run_restore(args: RestoreArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let backup = workspace
        .storage
        .restore_version(&args.id, args.template_type, &args.version_id)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Restored {} to {} (previous content saved as {})",
            style("✓").green(),
            style(&args.id).cyan(),
            style(&args.version_id).cyan(),
            backup.version_id
        );
    }
    Ok(())
}
