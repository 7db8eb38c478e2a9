mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    client::ClientSubcommand, config::ConfigSubcommand, deliverable::DeliverableSubcommand,
    doc::DocSubcommand, risk::RiskSubcommand, signature::SignatureSubcommand,
    step::StepSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "onboard",
    about = "Client onboarding: clients, plans, risks, documents and signatures",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .onboard/)
    #[arg(long, global = true, env = "ONBOARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an onboarding project in the current directory
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "3141")]
        port: u16,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },

    /// Manage clients
    Client {
        #[command(subcommand)]
        subcommand: ClientSubcommand,
    },

    /// Manage onboarding steps
    Step {
        #[command(subcommand)]
        subcommand: StepSubcommand,
    },

    /// Track client risks
    Risk {
        #[command(subcommand)]
        subcommand: RiskSubcommand,
    },

    /// Upload and list client documents and shared resources
    Doc {
        #[command(subcommand)]
        subcommand: DocSubcommand,
    },

    /// Manage milestone deliverables
    Deliverable {
        #[command(subcommand)]
        subcommand: DeliverableSubcommand,
    },

    /// Manage signature requests
    Signature {
        #[command(subcommand)]
        subcommand: SignatureSubcommand,
    },

    /// Dashboard statistics
    Stats {
        /// Restrict counts to one client (id or name)
        #[arg(long)]
        client: Option<String>,
    },

    /// Inspect and edit the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
        Commands::Client { subcommand } => cmd::client::run(&root, subcommand, cli.json),
        Commands::Step { subcommand } => cmd::step::run(&root, subcommand, cli.json),
        Commands::Risk { subcommand } => cmd::risk::run(&root, subcommand, cli.json),
        Commands::Doc { subcommand } => cmd::doc::run(&root, subcommand, cli.json),
        Commands::Deliverable { subcommand } => cmd::deliverable::run(&root, subcommand, cli.json),
        Commands::Signature { subcommand } => cmd::signature::run(&root, subcommand, cli.json),
        Commands::Stats { client } => cmd::stats::run(&root, client.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
