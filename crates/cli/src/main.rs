mod logs_cmd;
mod serve_cmd;
mod server_ctl;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ezviewer",
    version,
    about = "ezviewer - watch local log files live in the browser"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new log file to track
    Add {
        /// Short name shown in the viewer
        alias: String,
        /// Path to the log file
        path: PathBuf,
    },

    /// Update an existing log alias to a new path
    Update { alias: String, path: PathBuf },

    /// Remove a tracked log
    Remove { alias: String },

    /// List all tracked logs
    List,

    /// Start the viewer server in the background
    Start(ListenArgs),

    /// Stop the background viewer server
    Stop,

    /// Show whether the background server is running
    Status,

    /// Run the viewer server in the foreground
    Run(ListenArgs),

    /// Show the full path of the tracked logs JSON file
    ShowPath,

    /// Show the folder where ezviewer keeps its state
    ShowDir,
}

/// Listen address overrides; unset values come from `ezviewer.toml`.
#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
    /// Port to listen on (default 9200)
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind (default 0.0.0.0)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Run(_) => "ezviewer=info,ezviewer_server=info,tower_http=info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let result = match cli.command {
        Commands::Add { alias, path } => logs_cmd::run_add(&alias, &path),
        Commands::Update { alias, path } => logs_cmd::run_update(&alias, &path),
        Commands::Remove { alias } => logs_cmd::run_remove(&alias),
        Commands::List => logs_cmd::run_list(),
        Commands::Start(listen) => server_ctl::server_start(&listen),
        Commands::Stop => server_ctl::server_stop(),
        Commands::Status => server_ctl::server_status(),
        Commands::Run(listen) => serve_cmd::run_foreground(&listen).await,
        Commands::ShowPath => logs_cmd::run_show_path(),
        Commands::ShowDir => logs_cmd::run_show_dir(),
    };

    if let Err(e) = result {
        eprintln!("[Error] {:#}", e);
        std::process::exit(1);
    }
}
