//! Judge organization server binary
//!
//! Usage:
//!   judge-server serve [--host 0.0.0.0] [--port 3030] [--data-dir DIR]
//!   judge-server add-user --username alice --password ... [--points 120]
//!
//! Environment variables:
//!   - JUDGE_ROOT: Base directory for config and data (default: ~/.judge)
//!   - JUDGE_CONFIG: Server config file (default: <JUDGE_ROOT>/server.yaml)
//!   - JUDGE_API_HOST / JUDGE_API_PORT: Bind address (default: 127.0.0.1:3030)
//!   - JUDGE_DATA_DIR: Directory holding the JSONL tables
//!   - RUST_LOG: Log filter (default: info)

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use judge_lib::api::{self, AppState};
use judge_lib::commands::users;
use judge_lib::config::ServerConfig;
use judge_lib::data_impl::jsonl::{JsonlDatabase, JsonlProfileRepository};
use judge_lib::init_tracing::init_tracing;
use judge_lib::utils::paths::get_config_path;

#[derive(Parser)]
#[command(name = "judge-server", version, about = "Organization pages for the judge")]
struct Cli {
    /// Server config file
    #[arg(long, global = true, env = "JUDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Create a user profile
    AddUser(AddUserArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,

    /// Directory holding the JSONL tables
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Args)]
struct AddUserArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "JUDGE_NEW_USER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Reputation points
    #[arg(long, default_value_t = 0.0)]
    points: f64,

    #[arg(long)]
    display_name: Option<String>,

    /// Directory holding the JSONL tables
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn load_config(path: Option<PathBuf>) -> Result<ServerConfig, String> {
    let path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };
    ServerConfig::load_or_default(&path)
        .and_then(ServerConfig::apply_env)
        .map_err(|e| e.to_string())
}

async fn serve(mut config: ServerConfig, args: ServeArgs) -> Result<(), String> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    let data_dir = config.resolve_data_dir().map_err(|e| e.to_string())?;
    let db = JsonlDatabase::open(&data_dir).map_err(|e| e.to_string())?;

    let state = AppState::new(Arc::new(db), config);
    api::start_server(state)
        .await
        .map_err(|e| format!("HTTP server error: {}", e))
}

async fn add_user(config: ServerConfig, args: AddUserArgs) -> Result<(), String> {
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => config.resolve_data_dir().map_err(|e| e.to_string())?,
    };
    let db = JsonlDatabase::open(&data_dir).map_err(|e| e.to_string())?;
    let profiles = JsonlProfileRepository::new(Arc::new(db));

    let profile = users::add_user(
        &profiles,
        &args.username,
        &args.password,
        args.points,
        args.display_name,
    )
    .await?;

    println!("Added user {} (id {})", profile.username, profile.id);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing("info") {
        eprintln!("Warning: {}", e);
    }

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(config, args).await,
        Command::AddUser(args) => add_user(config, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
