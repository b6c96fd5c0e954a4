//! Kaskflow - workflow execution and health assessment for software projects.
//!
//! Registers projects, assesses their health with ecosystem tooling, and runs
//! workflows against them. Results are printed as JSON on stdout; logs go to
//! stderr.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use kaskflow::health::Category;
use kaskflow::storage::ProjectStore;
use kaskflow::{
    CategorySelection, Config, ExecutionStatus, HandlerRegistry, HealthChecker, HealthSnapshot,
    JsonStore, Project, SystemRunner, TemplateCatalog, ToolCapture, TriggerRequest, TriggerType,
    WorkflowEngine, WorkflowResult, WorkflowTrigger,
};

/// Workflow execution and project health assessment
#[derive(Parser)]
#[command(name = "kaskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(long, global = true, env = "KASKFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding projects, executions and assets
    #[arg(long, global = true, env = "KASKFLOW_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered projects
    Project {
        #[command(subcommand)]
        operation: ProjectOperation,
    },

    /// Assess a project's health
    Check {
        /// Registered project ID
        #[arg(required_unless_present = "path")]
        project_id: Option<Uuid>,

        /// Assess a directory without registering or persisting anything
        #[arg(long, conflicts_with = "project_id")]
        path: Option<PathBuf>,

        /// Categories to skip
        #[arg(long, value_enum)]
        skip: Vec<CategoryArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Run a workflow now
    Run {
        /// Workflow type (asset_generation, state_check, full_analysis, git_sync)
        #[arg(required_unless_present = "template")]
        workflow_type: Option<String>,

        /// Project ID
        #[arg(short, long)]
        project: Uuid,

        /// Start from a named template instead of a workflow type
        #[arg(short, long, conflicts_with = "workflow_type")]
        template: Option<String>,

        /// Trigger type recorded on the execution
        #[arg(long, default_value = "manual")]
        trigger: String,

        /// Configuration assignments (key=value, values parsed as JSON when possible)
        #[arg(short, long = "set")]
        set: Vec<String>,

        /// Configuration as a JSON object (applied before --set)
        #[arg(long)]
        config_json: Option<String>,

        /// User recorded as the trigger author
        #[arg(long, env = "KASKFLOW_USER", default_value = "cli")]
        user: String,
    },

    /// Record a workflow for an external scheduler
    Schedule {
        /// Workflow type
        workflow_type: String,

        /// Project ID
        #[arg(short, long)]
        project: Uuid,

        /// When to run (RFC 3339)
        #[arg(long)]
        at: String,

        /// Configuration assignments (key=value)
        #[arg(short, long = "set")]
        set: Vec<String>,

        /// Configuration as a JSON object (applied before --set)
        #[arg(long)]
        config_json: Option<String>,

        /// User recorded as the trigger author
        #[arg(long, env = "KASKFLOW_USER", default_value = "cli")]
        user: String,
    },

    /// Run a scheduled (pending) execution now
    Dispatch {
        /// Execution ID
        execution_id: Uuid,
    },

    /// Cancel a pending or running execution
    Cancel {
        /// Execution ID
        execution_id: Uuid,
    },

    /// List a project's executions
    Executions {
        /// Project ID
        project_id: Uuid,
    },

    /// Show one execution
    Show {
        /// Execution ID
        execution_id: Uuid,
    },

    /// List workflow templates
    Templates,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ProjectOperation {
    /// Register a project directory
    Add {
        /// Project directory
        path: PathBuf,

        /// Display name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List registered projects
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CategoryArg {
    Build,
    Test,
    Lint,
    Security,
    Deployment,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Build => Self::Build,
            CategoryArg::Test => Self::Test,
            CategoryArg::Lint => Self::Lint,
            CategoryArg::Security => Self::Security,
            CategoryArg::Deployment => Self::Deployment,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Project { ref operation } => cmd_project(&cli, operation),
        Commands::Check { project_id, ref path, ref skip, format } => {
            cmd_check(&cli, project_id, path.as_ref(), skip, format)
        }
        Commands::Run {
            ref workflow_type,
            project,
            ref template,
            ref trigger,
            ref set,
            ref config_json,
            ref user,
        } => {
            let configuration = build_configuration(config_json.as_deref(), set)?;
            cmd_run(&cli, workflow_type.as_deref(), template.as_deref(), project, trigger, configuration, user)
        }
        Commands::Schedule { ref workflow_type, project, ref at, ref set, ref config_json, ref user } => {
            let configuration = build_configuration(config_json.as_deref(), set)?;
            cmd_schedule(&cli, workflow_type, project, at, configuration, user)
        }
        Commands::Dispatch { execution_id } => {
            let services = Services::open(&cli)?;
            let result = services.engine.dispatch_scheduled(execution_id)?;
            finish_result(&result)
        }
        Commands::Cancel { execution_id } => {
            let services = Services::open(&cli)?;
            print_json(&services.engine.cancel(execution_id)?)
        }
        Commands::Executions { project_id } => {
            let services = Services::open(&cli)?;
            print_json(&services.engine.executions_for_project(project_id)?)
        }
        Commands::Show { execution_id } => {
            let services = Services::open(&cli)?;
            print_json(&services.engine.execution(execution_id)?)
        }
        Commands::Templates => cmd_templates(&cli),
        Commands::Config { path } => cmd_config(&cli, path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Engines wired to the JSON store in the data directory.
struct Services {
    store: Arc<JsonStore>,
    checker: Arc<HealthChecker>,
    engine: WorkflowEngine,
    catalog: TemplateCatalog,
}

impl Services {
    fn open(cli: &Cli) -> Result<Self> {
        let config = load_config(cli)?;
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => config.data_dir()?,
        };

        let store = Arc::new(
            JsonStore::open(&data_dir)
                .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
        );
        let runner = Arc::new(SystemRunner::new().poll_interval(config.health.poll_interval()));

        let checker = Arc::new(
            HealthChecker::new(store.clone(), store.clone(), runner.clone())
                .with_settings(config.health.clone()),
        );
        let media = Arc::new(
            ToolCapture::new(runner, store.clone(), &data_dir).with_settings(config.capture.clone()),
        );
        let engine =
            WorkflowEngine::new(store.clone(), HandlerRegistry::new(checker.clone(), media));
        let catalog = TemplateCatalog::from_config(&config.templates)
            .context("Invalid [[templates]] entry in configuration")?;

        tracing::debug!(data_dir = %data_dir.display(), "Services ready");
        Ok(Self { store, checker, engine, catalog })
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a workflow result; a failed workflow exits with status 1.
fn finish_result(result: &WorkflowResult) -> Result<()> {
    print_json(result)?;
    if result.status == ExecutionStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Merge `--config-json` and `--set key=value` into one configuration object.
fn build_configuration(json: Option<&str>, assignments: &[String]) -> Result<Value> {
    let mut configuration = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("Invalid --config-json")? {
            Value::Object(map) => map,
            _ => anyhow::bail!("--config-json must be a JSON object"),
        },
        None => Map::new(),
    };

    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid assignment '{assignment}', expected key=value"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        configuration.insert(key.trim().to_string(), value);
    }

    Ok(Value::Object(configuration))
}

/// Handle project commands.
fn cmd_project(cli: &Cli, operation: &ProjectOperation) -> Result<()> {
    let services = Services::open(cli)?;

    match operation {
        ProjectOperation::Add { path, name } => {
            let path = path
                .canonicalize()
                .with_context(|| format!("Project directory {} not found", path.display()))?;
            if !path.is_dir() {
                anyhow::bail!("{} is not a directory", path.display());
            }

            let name = name.clone().unwrap_or_else(|| {
                path.file_name().map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned())
            });
            let project = Project::new(name, path);
            services.store.create_project(&project)?;
            print_json(&project)
        }
        ProjectOperation::List { format } => {
            let projects = services.store.list_projects()?;
            match format {
                OutputFormat::Json => print_json(&projects),
                OutputFormat::Text => {
                    for project in &projects {
                        let path = project.metadata.get("path").and_then(Value::as_str).unwrap_or("-");
                        println!("{}  {}  {}", project.id, project.name, path);
                    }
                    println!("\nTotal: {} projects", projects.len());
                    Ok(())
                }
            }
        }
    }
}

/// Assess a registered project or a bare directory.
fn cmd_check(
    cli: &Cli,
    project_id: Option<Uuid>,
    path: Option<&PathBuf>,
    skip: &[CategoryArg],
    format: OutputFormat,
) -> Result<()> {
    let mut selection = CategorySelection::all();
    for category in skip {
        match Category::from(*category) {
            Category::Build => selection.build = false,
            Category::Test => selection.test = false,
            Category::Lint => selection.lint = false,
            Category::Security => selection.security = false,
            Category::Deployment => selection.deployment = false,
        }
    }

    let services = Services::open(cli)?;
    let snapshot = match (project_id, path) {
        (Some(id), _) => services.checker.check_project_state_with(id, selection)?,
        (None, Some(path)) => {
            if !path.is_dir() {
                anyhow::bail!("{} is not a directory", path.display());
            }
            services.checker.assess(path, selection)
        }
        (None, None) => anyhow::bail!("Either a project ID or --path is required"),
    };

    match format {
        OutputFormat::Json => print_json(&snapshot),
        OutputFormat::Text => {
            print_snapshot(&snapshot);
            Ok(())
        }
    }
}

fn print_snapshot(snapshot: &HealthSnapshot) {
    println!("Health score: {}/100\n", snapshot.health_score);
    for probe in &snapshot.probes {
        println!(
            "  {:<11} {:<8} {}",
            probe.category.display_name(),
            probe.status.as_str(),
            probe.tool.as_deref().unwrap_or("-")
        );
    }
    if snapshot.coverage_reported {
        println!("\nCoverage: {:.1}%", snapshot.coverage);
    } else {
        println!("\nCoverage: not reported");
    }

    let sections = [
        ("Next steps", &snapshot.next_steps),
        ("Errors", &snapshot.errors),
        ("Warnings", &snapshot.warnings),
        ("Suggestions", &snapshot.suggestions),
    ];
    for (title, items) in sections {
        if !items.is_empty() {
            println!("\n{title}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }
}

/// Run a workflow by type or template.
fn cmd_run(
    cli: &Cli,
    workflow_type: Option<&str>,
    template: Option<&str>,
    project: Uuid,
    trigger: &str,
    configuration: Value,
    user: &str,
) -> Result<()> {
    let services = Services::open(cli)?;

    let result = match (template, workflow_type) {
        (Some(name), _) => {
            let overrides = match configuration {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let trigger_type: TriggerType = trigger.parse()?;
            let trigger = services
                .catalog
                .instantiate(name, project, user, overrides)?
                .with_trigger_type(trigger_type);
            services.engine.execute(&trigger)?
        }
        (None, Some(workflow_type)) => services.engine.execute_request(TriggerRequest {
            project_id: project,
            workflow_type: workflow_type.to_string(),
            trigger_type: trigger.to_string(),
            configuration,
            triggered_by: user.to_string(),
        })?,
        (None, None) => anyhow::bail!("Either a workflow type or --template is required"),
    };

    finish_result(&result)
}

/// Record a pending execution.
fn cmd_schedule(
    cli: &Cli,
    workflow_type: &str,
    project: Uuid,
    at: &str,
    configuration: Value,
    user: &str,
) -> Result<()> {
    let scheduled_for: DateTime<Utc> = DateTime::parse_from_rfc3339(at)
        .with_context(|| format!("Invalid --at '{at}', expected RFC 3339"))?
        .with_timezone(&Utc);

    let services = Services::open(cli)?;
    let trigger = WorkflowTrigger::try_from(TriggerRequest {
        project_id: project,
        workflow_type: workflow_type.to_string(),
        trigger_type: "scheduled".to_string(),
        configuration,
        triggered_by: user.to_string(),
    })?;

    print_json(&services.engine.schedule(&trigger, scheduled_for)?)
}

/// List templates.
fn cmd_templates(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let catalog = TemplateCatalog::from_config(&config.templates)?;

    for template in catalog.iter() {
        println!("{} ({})", template.name, template.workflow_type);
        if !template.description.is_empty() {
            println!("  {}", template.description);
        }
    }
    Ok(())
}

/// Show configuration.
fn cmd_config(cli: &Cli, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = load_config(cli)?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kaskflow", &mut io::stdout());
}
