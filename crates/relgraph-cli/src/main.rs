//! CLI binary for relgraph: extract class relationships from Java and Kotlin
//! sources, check ownership invariants, and render diagrams.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use relgraph_core::config::RelgraphConfig;
use relgraph_core::graph::{EdgeKind, EdgeKinds};
use relgraph_core::ingest::{Ingested, ingest};
use relgraph_core::model::{ClassKind, ClassModel};
use relgraph_parser::languages::Language;
use relgraph_render::Format;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "relgraph", about = "Typed class relationship graphs from Java and Kotlin sources")]
struct Cli {
    /// Project root holding `.relgraph/config.toml` (defaults to the input directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which sources to read.
#[derive(Args)]
struct Input {
    /// Source file or directory
    path: PathBuf,

    /// Restrict to one language (java, kotlin)
    #[arg(short, long)]
    lang: Option<String>,

    /// Glob patterns to include files (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Glob patterns to exclude files (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a class diagram
    Convert {
        #[command(flatten)]
        input: Input,

        /// Output file (defaults to diagram.<format extension>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: puml, aml, json, dot (inferred from --output if omitted)
        #[arg(short, long)]
        format: Option<String>,

        /// Diagram title (defaults to the output file stem)
        #[arg(long)]
        title: Option<String>,
    },

    /// Report ownership and role-contract violations; fails when any exist
    Check {
        #[command(flatten)]
        input: Input,
    },

    /// Show what deleting an instance of a class takes with it, and what it uses
    Impact {
        #[command(flatten)]
        input: Input,

        /// Class name
        class: String,
    },

    /// Show class, entity and edge statistics
    Info {
        #[command(flatten)]
        input: Input,
    },
}

impl Commands {
    fn input(&self) -> &Input {
        match self {
            Commands::Convert { input, .. }
            | Commands::Check { input }
            | Commands::Impact { input, .. }
            | Commands::Info { input } => input,
        }
    }
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = &cli.project {
        return Ok(p.clone());
    }
    let path = &cli.command.input().path;
    if path.is_dir() {
        return Ok(path.clone());
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;
    let config = RelgraphConfig::load(&project_root)
        .with_context(|| format!("failed to load config from {}", project_root.display()))?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            title,
        } => cmd_convert(&input, output, format.as_deref(), title, config),
        Commands::Check { input } => cmd_check(&input, &config),
        Commands::Impact { input, class } => cmd_impact(&input, &class, &config),
        Commands::Info { input } => cmd_info(&input, &config),
    }
}

fn build_glob_set(patterns: &[String], flag: &str) -> Result<Option<globset::GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = globset::GlobSetBuilder::new();
    for p in patterns {
        builder.add(globset::Glob::new(p).with_context(|| format!("invalid {flag} glob: {p}"))?);
    }
    Ok(Some(
        builder
            .build()
            .with_context(|| format!("invalid {flag} glob set"))?,
    ))
}

/// Collect source files matching language and glob filters.
fn collect_source_files(
    root: &Path,
    languages: &[Language],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<(PathBuf, String)>> {
    use indicatif::{ProgressBar, ProgressStyle};

    let include_set = build_glob_set(include, "--include")?;
    let exclude_set = build_glob_set(exclude, "--exclude")?;

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .add_custom_ignore_filename(".relgraphignore")
        .build();

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Scanning files...");

    let mut files = Vec::new();

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_lang = Language::from_extension(ext);
        if !file_lang.is_some_and(|l| languages.contains(&l)) {
            continue;
        }
        let rel_path = path.strip_prefix(root).unwrap_or(path);
        if let Some(ref inc) = include_set
            && !inc.is_match(rel_path)
        {
            continue;
        }
        if let Some(ref exc) = exclude_set
            && exc.is_match(rel_path)
        {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(source) => {
                files.push((rel_path.to_path_buf(), source));
                spinner.set_message(format!("{} files collected", files.len()));
                spinner.tick();
            }
            Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
        }
    }
    spinner.finish_and_clear();
    Ok(files)
}

/// Extract class models from a single file or a directory tree.
fn load_classes(input: &Input, config: &RelgraphConfig) -> Result<Vec<ClassModel>> {
    let languages: Vec<Language> = match &input.lang {
        Some(l) => vec![
            Language::from_name(l)
                .or_else(|| Language::from_extension(l))
                .ok_or_else(|| anyhow::anyhow!("unsupported language: {}", l))?,
        ],
        None => Language::ALL.to_vec(),
    };

    let files = if input.path.is_file() {
        let ext = input.path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !Language::from_extension(ext).is_some_and(|l| languages.contains(&l)) {
            anyhow::bail!(
                "{} is not a supported source file (extensions: {})",
                input.path.display(),
                relgraph_parser::languages::supported_extensions().join(", ")
            );
        }
        let source = std::fs::read_to_string(&input.path)
            .with_context(|| format!("failed to read {}", input.path.display()))?;
        vec![(input.path.clone(), source)]
    } else if input.path.is_dir() {
        collect_source_files(&input.path, &languages, &input.include, &input.exclude)?
    } else {
        anyhow::bail!("{} does not exist", input.path.display());
    };

    if files.is_empty() {
        anyhow::bail!(
            "No source files found in {}. Supported extensions: {}",
            input.path.display(),
            relgraph_parser::languages::supported_extensions().join(", ")
        );
    }

    let classes = relgraph_parser::classes::parse_files_parallel(&files, &config.extraction);
    eprintln!("Parsed {} classes from {} files", classes.len(), files.len());
    Ok(classes)
}

fn load_graph(input: &Input, config: &RelgraphConfig) -> Result<(Vec<ClassModel>, Ingested)> {
    let classes = load_classes(input, config)?;
    let ingested = ingest(&classes, &config.extraction).context("failed to build entity graph")?;
    Ok((classes, ingested))
}

fn cmd_convert(
    input: &Input,
    output: Option<PathBuf>,
    format: Option<&str>,
    title: Option<String>,
    mut config: RelgraphConfig,
) -> Result<()> {
    let format = match format {
        Some(f) => f.parse::<Format>().map_err(anyhow::Error::msg)?,
        None => output
            .as_deref()
            .and_then(Format::from_path)
            .unwrap_or_default(),
    };
    let output =
        output.unwrap_or_else(|| PathBuf::from(format!("diagram.{}", format.default_extension())));

    if title.is_some() {
        config.render.title = title;
    } else if config.render.title.is_none() {
        config.render.title = output
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);
    }

    let classes = load_classes(input, &config)?;
    let rendered = relgraph_render::render(&classes, format, &config)?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, rendered)
        .with_context(|| format!("failed to write {}", output.display()))?;
    eprintln!("Wrote {} diagram to {}", format, output.display());
    Ok(())
}

fn cmd_check(input: &Input, config: &RelgraphConfig) -> Result<()> {
    let (_, ingested) = load_graph(input, config)?;

    for issue in &ingested.issues {
        println!("WARN: {}", issue);
    }
    let violations = ingested.graph.check_invariants();
    for violation in &violations {
        println!("ERROR: {}", violation);
    }

    let total = ingested.issues.len() + violations.len();
    if total > 0 {
        anyhow::bail!("{} issue(s) found", total);
    }
    println!(
        "OK: {} entities, {} edges, no ownership or contract violations",
        ingested.graph.entity_count(),
        ingested.graph.edge_count()
    );
    Ok(())
}

fn cmd_impact(input: &Input, class: &str, config: &RelgraphConfig) -> Result<()> {
    let (classes, ingested) = load_graph(input, config)?;

    let Some(id) = ingested.entity_named(class) else {
        match classes.iter().find(|c| c.name == class) {
            Some(c) if !c.is_instantiable() => {
                anyhow::bail!("{} is {} and has no instances", class, describe(c))
            }
            Some(_) => anyhow::bail!("{} could not be instantiated; run `relgraph check`", class),
            None => anyhow::bail!("class not found: {}", class),
        }
    };

    let name = |id| ingested.name_of(id).unwrap_or("?");
    let owned: Vec<&str> = ingested.graph.reachable(id, EdgeKinds::OWNERSHIP)?.map(name).collect();
    let used: Vec<&str> = ingested.graph.reachable(id, EdgeKinds::USAGE)?.map(name).collect();
    let mut referrers: Vec<String> = ingested
        .graph
        .edges_to(id)
        .filter(|e| e.kind != EdgeKind::Composition)
        .map(|e| format!("{} ({})", name(e.source), e.kind))
        .collect();
    referrers.sort();
    referrers.dedup();

    println!("Impact of deleting {} ({}):", class, id);
    print_section("Deleted with it (composition)", &owned);
    print_section("Uses (association, dependency)", &used);
    let referrers: Vec<&str> = referrers.iter().map(String::as_str).collect();
    print_section("Edges dropped from", &referrers);
    Ok(())
}

fn print_section(title: &str, names: &[&str]) {
    println!("  {} [{}]:", title, names.len());
    if names.is_empty() {
        println!("    (none)");
    }
    for n in names {
        println!("    {}", n);
    }
}

fn describe(class: &ClassModel) -> &'static str {
    match class.kind {
        ClassKind::Interface => "an interface",
        ClassKind::Annotation => "an annotation",
        _ => "abstract",
    }
}

fn cmd_info(input: &Input, config: &RelgraphConfig) -> Result<()> {
    let (classes, ingested) = load_graph(input, config)?;
    let graph = &ingested.graph;

    println!("Classes: {}", classes.len());
    for kind in [
        ClassKind::Class,
        ClassKind::Interface,
        ClassKind::Enum,
        ClassKind::Object,
        ClassKind::Record,
        ClassKind::Annotation,
    ] {
        let count = classes.iter().filter(|c| c.kind == kind).count();
        if count > 0 {
            println!("  {}: {}", kind, count);
        }
    }
    println!();
    println!("Entities: {}", graph.entity_count());
    println!("Edges: {}", graph.edge_count());
    for kind in EdgeKind::ALL {
        let count = graph.edges().filter(|e| e.kind == kind).count();
        println!("  {}: {}", kind, count);
    }

    let roles: Vec<&str> = graph.registry().roles().map(|r| r.tag.as_str()).collect();
    println!();
    println!("Roles: {}", roles.len());
    for role in roles {
        let holders = graph
            .entities()
            .filter(|e| e.roles.contains(role))
            .count();
        println!("  {} ({} entities)", role, holders);
    }
    if !ingested.issues.is_empty() {
        println!();
        println!("Issues: {} (run `relgraph check` for details)", ingested.issues.len());
    }
    Ok(())
}
