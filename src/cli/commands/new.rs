//! `rtt new` command - Save a content tree as a new template

use console::style;
use miette::Result;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::cli::helpers::{print_validation, read_json_file, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::defaults::section_ids;
use crate::core::{StorageError, TemplateMetadata, TemplateType};
use crate::schema::get_template_variables;

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// JSON file holding the template content
    pub file: PathBuf,

    /// Template type
    #[arg(long = "type", short = 't')]
    pub template_type: TemplateType,

    /// Template name (default: template_info.name, else the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Description (default: template_info.description)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Explicit template ID (default: generated)
    #[arg(long)]
    pub id: Option<String>,

    /// Template version (default: template_info.version)
    #[arg(long = "template-version")]
    pub template_version: Option<String>,

    /// Save even if validation fails or the ID is taken
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let content = read_json_file(&args.file)?;

    let result = workspace.validator().validate(&content, args.template_type);
    if !global.quiet && (result.has_issues() || !result.suggestions.is_empty()) {
        println!("Validation of {}:", style(args.file.display()).cyan());
        print_validation(&result);
    }
    if !result.is_valid && !args.force {
        return Err(miette::miette!(
            "Template has {} validation error(s); fix them or pass --force",
            result.errors.len()
        ));
    }

    if let Some(id) = &args.id {
        if !args.force && workspace.storage.exists(id, args.template_type) {
            return Err(miette::miette!(
                "{}",
                StorageError::AlreadyExists {
                    template_id: id.clone(),
                    template_type: args.template_type,
                }
            ));
        }
    }

    let mut metadata = build_metadata(&args, &content, &workspace.config.author());
    let id = workspace
        .storage
        .save(&content, &mut metadata)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Id | OutputFormat::Json => println!("{}", id),
        _ => println!(
            "{} Created {} template {}",
            style("✓").green(),
            args.template_type,
            style(&id).cyan()
        ),
    }
    Ok(())
}

fn build_metadata(args: &NewArgs, content: &JsonValue, author: &str) -> TemplateMetadata {
    let info = |key: &str| {
        content
            .get("template_info")
            .and_then(|i| i.get(key))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    };

    let name = args
        .name
        .clone()
        .or_else(|| info("name"))
        .or_else(|| {
            args.file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let mut metadata = TemplateMetadata::new(name, args.template_type)
        .with_author(author)
        .with_tags(args.tags.iter().cloned());
    if let Some(id) = &args.id {
        metadata.template_id = id.clone();
    }
    if let Some(description) = args.description.clone().or_else(|| info("description")) {
        metadata.description = description;
    }
    if let Some(version) = args.template_version.clone().or_else(|| info("version")) {
        metadata.version = version;
    }
    metadata.sections = section_ids(content);
    metadata.required_fields = get_template_variables(content);
    metadata
}
