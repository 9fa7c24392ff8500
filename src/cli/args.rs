//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs,
    delete::DeleteArgs,
    export::ExportArgs,
    import::ImportArgs,
    init::InitArgs,
    list::ListArgs,
    new::NewArgs,
    preview::PreviewArgs,
    render::RenderArgs,
    search::SearchArgs,
    show::ShowArgs,
    stats::StatsArgs,
    validate::ValidateArgs,
    variables::VariablesArgs,
    version::VersionCommands,
};
use crate::schema::ValidationLevel;

#[derive(Parser)]
#[command(name = "rtt")]
#[command(author, version, about = "Report Template Toolkit")]
#[command(long_about = "Store, validate and render structured report templates for vibration analysis, fault diagnosis and maintenance reporting.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Template store directory (default: from config, else ./.rtt/templates)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Validation strictness: strict, warn or none
    #[arg(long, global = true)]
    pub validation: Option<ValidationLevel>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the template store and seed the default templates
    Init(InitArgs),

    /// List stored templates
    List(ListArgs),

    /// Search templates by name, description or tag
    Search(SearchArgs),

    /// Show a template's content
    Show(ShowArgs),

    /// Save a content tree from a JSON file as a new template
    New(NewArgs),

    /// Validate a stored template or a content file
    Validate(ValidateArgs),

    /// List the variables a template reads
    Variables(VariablesArgs),

    /// Render a template against a set of variables
    Render(RenderArgs),

    /// Render a template against generated sample values
    Preview(PreviewArgs),

    /// Delete a template and its snapshots
    Delete(DeleteArgs),

    /// Template version snapshots
    #[command(subcommand)]
    Version(VersionCommands),

    /// Export a template to a bundle file
    Export(ExportArgs),

    /// Import a template from a bundle file
    Import(ImportArgs),

    /// Show store statistics
    Stats(StatsArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically pick per command (table for lists, JSON for documents)
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Table,
    /// Just IDs, one per line
    Id,
}
