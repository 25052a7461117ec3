//! # pcal CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Pipette calibration toolkit.
///
/// Runs scripted calibration sessions against the simulated robot,
/// validates labware definitions, and prints workflow graphs.
#[derive(Parser, Debug)]
#[command(name = "pcal", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a calibration session from a command script.
    Run(pcal_cli::run::RunArgs),
    /// Validate labware definition files.
    ValidateLabware(pcal_cli::labware::ValidateLabwareArgs),
    /// Print a workflow graph's transition table.
    Graph(pcal_cli::graph::GraphArgs),
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Run(args) => pcal_cli::run::execute(args).await,
        Commands::ValidateLabware(args) => pcal_cli::labware::execute(&args),
        Commands::Graph(args) => pcal_cli::graph::execute(&args),
    }
}
