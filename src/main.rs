use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing::{error, info};
use toolchat::{config::Config, routes::create_router, utils::init_tracing, AppState, FileReader};

#[derive(Parser)]
#[command(name = "toolchat")]
#[command(about = "Ask questions about uploaded files through a tool-calling LLM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Bind address, overrides HOST
        #[arg(long)]
        host: Option<String>,
        /// Listen port, overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a file's text using the same lookup as the file reader tool
    Read {
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            init_tracing();
            serve(host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Read { path } => Ok(read(&path)),
    }
}

async fn serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Configuration loaded: {:?}", config.server);
    info!(provider = %config.llm.provider, model = %config.llm.model, "LLM configured");

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

fn read(path: &str) -> ExitCode {
    match FileReader::default().read(path) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
