//! Template Orchestrator CLI
//!
//! Usage:
//!   toctl [OPTIONS] transform json < envelope.json
//!   toctl [OPTIONS] validate config
//!   toctl [OPTIONS] inspect templates
//!
//! Options:
//!   -c, --config <FILE>            Configuration file (TOML format)
//!   --module <SPEC>                Pre-defined module: <locator>[,<name>]
//!   --module-spec-delim <DELIM>    Delimiter between locator and name
//!   --default-module <LOCATOR>     Module used when the envelope names none
//!   --default-tmpl-id <ID>         Template variant used when the envelope names none
//!   --allow-arbitrary-modules      Accept templateModuleURL in envelopes
//!   --module-root <DIR>            Directory holding file-based modules
//!   -v, --verbose                  Debug logging and detailed validation output
//!   -h, --help                     Print help

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use template_orchestrator::{transform, ModuleHealth, OrchestratorConfig};

#[derive(Parser)]
#[command(name = "toctl")]
#[command(about = "Template orchestration controller")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pre-defined template module as <locator>[<delim><name>]; repeatable
    #[arg(long = "module", global = true)]
    modules: Vec<String>,

    /// Delimiter between locator and name in --module
    #[arg(long, default_value = ",", global = true)]
    module_spec_delim: String,

    /// Module used when the envelope names none
    #[arg(long, global = true)]
    default_module: Option<String>,

    /// Template variant used when the envelope names none
    #[arg(long = "default-tmpl-id", global = true)]
    default_template_identity: Option<String>,

    /// Accept templateModuleURL in envelopes
    #[arg(long, global = true)]
    allow_arbitrary_modules: bool,

    /// Directory holding file-based template modules
    #[arg(long, global = true)]
    module_root: Option<PathBuf>,

    /// Debug logging and detailed validation output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template
    Transform {
        #[command(subcommand)]
        input: TransformInput,
    },
    /// Check configuration
    Validate {
        #[command(subcommand)]
        target: ValidateTarget,
    },
    /// Show configured state
    Inspect {
        #[command(subcommand)]
        target: InspectTarget,
    },
}

#[derive(Subcommand)]
enum TransformInput {
    /// Read a JSON envelope from stdin and print the rendered template
    Json,
}

#[derive(Subcommand)]
enum ValidateTarget {
    /// Load every configured module and report problems
    Config,
}

#[derive(Subcommand)]
enum InspectTarget {
    /// Print the pre-defined modules as JSON
    Templates,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    let code = match &cli.command {
        Command::Transform { input: TransformInput::Json } => transform_json(&config).await,
        Command::Validate { target: ValidateTarget::Config } => validate_config(&config, cli.verbose).await,
        Command::Inspect { target: InspectTarget::Templates } => inspect_templates(&config),
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "toctl=debug,template_orchestrator=debug"
    } else {
        "toctl=info,template_orchestrator=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Config file first, then command line flags on top
fn load_config(cli: &Cli) -> Result<OrchestratorConfig, String> {
    let mut config = match &cli.config {
        Some(path) => OrchestratorConfig::from_file(path)
            .map_err(|e| format!("Error loading config '{}': {}", path.display(), e))?,
        None => OrchestratorConfig::default(),
    };

    for spec in &cli.modules {
        config.add_module_spec(spec, &cli.module_spec_delim);
    }
    if let Some(default_module) = &cli.default_module {
        config.default_module = Some(default_module.clone());
    }
    if let Some(identity) = &cli.default_template_identity {
        config.default_template_identity = Some(identity.clone());
    }
    if cli.allow_arbitrary_modules {
        config.allow_arbitrary_modules = true;
    }
    if let Some(root) = &cli.module_root {
        config.module_root = Some(root.clone());
    }

    tracing::debug!(modules = config.modules.len(), "configuration loaded");
    Ok(config)
}

/// Diagnostics go to stdout like rendered output, with exit code 2
async fn transform_json(config: &OrchestratorConfig) -> i32 {
    let mut input = Vec::new();
    if let Err(e) = tokio::io::stdin().read_to_end(&mut input).await {
        eprintln!("Error reading from stdin: {}", e);
        return 1;
    }
    if input.iter().all(u8::is_ascii_whitespace) {
        eprintln!("No JSON provided in STDIN");
        return 1;
    }

    let loader = match config.loader() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match transform(&input, &loader, &config.to_policy()).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(diagnostic) => {
            println!("{}", diagnostic);
            2
        }
    }
}

async fn validate_config(config: &OrchestratorConfig, verbose: bool) -> i32 {
    if config.modules.is_empty() {
        eprintln!("No --module entries defined.");
        return 1;
    }

    let loader = match config.loader() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let statuses = config.check_modules(&loader).await;
    let mut failed = false;
    for status in &statuses {
        match &status.health {
            ModuleHealth::Healthy => {
                if verbose {
                    println!("{} ({}): OK", status.name, status.locator);
                }
            }
            ModuleHealth::Failing { stage, diagnostic } => {
                failed = true;
                eprintln!("{} ({}): {} failed", status.name, status.locator, stage);
                eprintln!("{}", diagnostic);
            }
        }
    }

    if failed {
        1
    } else {
        0
    }
}

fn inspect_templates(config: &OrchestratorConfig) -> i32 {
    match serde_json::to_string_pretty(&config.modules) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
