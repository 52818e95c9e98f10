//! CLI binary for running the designflow code-to-design pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use designflow::artifact::{render, ArtifactStore};
use designflow::config::OrchestratorConfig;
use designflow::context::{OutputFormat, PipelineRequest, RepositoryConfig};
use designflow::events::LoggingEventSink;
use designflow::observability::init_tracing;
use designflow::pipeline::{PipelineController, PipelinePlan};
use designflow::registry::UnitRegistry;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "designflow", version, about = "Turn a code repository into a design document")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the code-to-design pipeline over a repository
    Run {
        /// Repository path or URL
        repository: String,

        /// Execution identifier (default: exec_<timestamp>)
        #[arg(long)]
        execution_id: Option<String>,

        /// Include glob pattern; repeat to add more (replaces the defaults)
        #[arg(long = "include", value_name = "PATTERN")]
        include: Vec<String>,

        /// Exclude glob pattern; repeat to add more (replaces the defaults)
        #[arg(long = "exclude", value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Output format: markdown, json or html
        #[arg(long, default_value = "markdown")]
        format: OutputFormat,

        /// Leave diagrams out of the document
        #[arg(long)]
        no_diagrams: bool,

        /// Maximum number of units running at once
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Orchestrator settings file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory (default: ./data/outputs)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List the built-in plan and registered units
    Units,
}

struct RunArgs {
    repository: String,
    execution_id: Option<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    format: OutputFormat,
    no_diagrams: bool,
    max_parallel: Option<usize>,
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            repository,
            execution_id,
            include,
            exclude,
            format,
            no_diagrams,
            max_parallel,
            config,
            output_dir,
        } => {
            let args = RunArgs {
                repository,
                execution_id,
                include,
                exclude,
                format,
                no_diagrams,
                max_parallel,
                config,
                output_dir,
            };
            cmd_run(args, cli.verbose, cli.log_json).await
        }
        Commands::Units => {
            init_tracing(if cli.verbose { "debug" } else { "warn" }, cli.log_json);
            cmd_units();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(args: &RunArgs) -> anyhow::Result<OrchestratorConfig> {
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => OrchestratorConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(n) = args.max_parallel {
        config = config.with_max_parallel_units(n);
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_directory(dir.clone());
    }
    Ok(config)
}

fn build_request(args: &RunArgs) -> PipelineRequest {
    let mut repository = RepositoryConfig::new(args.repository.clone());
    if !args.include.is_empty() {
        repository = repository.with_file_patterns(args.include.clone());
    }
    if !args.exclude.is_empty() {
        repository = repository.with_exclude_patterns(args.exclude.clone());
    }

    let mut request = PipelineRequest::new(args.repository.clone())
        .with_repository(repository)
        .with_output_format(args.format)
        .with_diagrams(!args.no_diagrams);
    if let Some(id) = &args.execution_id {
        request = request.with_execution_id(id.clone());
    }
    request
}

async fn cmd_run(args: RunArgs, verbose: bool, log_json: bool) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    init_tracing(level, log_json);

    let store = ArtifactStore::new(config.output_directory.clone());
    let intermediate = config.intermediate_outputs;
    let request = build_request(&args);
    let format = request.output_format;
    let include_diagrams = request.include_diagrams;

    let registry = Arc::new(UnitRegistry::with_builtin_units());
    let controller = PipelineController::new(registry, config)
        .with_event_sink(Arc::new(LoggingEventSink::debug()));
    let outcome = controller.run(request).await;

    store
        .save_outcome(&outcome, intermediate)
        .await
        .context("persisting run")?;

    if let Some(artifact) = &outcome.artifact {
        let document = render(artifact, format, include_diagrams)?;
        let path = store
            .save_document(&artifact.id, format, &document)
            .await
            .context("writing design document")?;
        info!(path = %path.display(), "design document written");
    } else {
        for err in &outcome.errors {
            error!(error = %err, "run failed");
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome.status_object())?);
    Ok(ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1)))
}

fn cmd_units() {
    let plan = PipelinePlan::code_to_design();
    let registry = UnitRegistry::with_builtin_units();

    println!("Plan:");
    println!("  analysis:   {}", plan.analysis.join(", "));
    println!("  synthesis:  {}", plan.synthesis);
    println!("  validation: {}", plan.validation);
    println!();
    println!("Registered units ({}):", registry.len());
    for name in registry.names() {
        println!("  {name}");
    }
}
