use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use anyhow::anyhow;

use waav_call_relay::{ServerConfig, routes, state::AppState};

/// WaaV Call Relay - Bridges phone calls to a realtime speech-to-speech model
#[derive(Parser, Debug)]
#[command(name = "waav-call-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if let Some(Commands::CheckConfig) = cli.command {
        println!("Configuration OK");
        println!("  listen:        {}", config.address());
        println!("  realtime url:  {}", config.realtime_url);
        println!("  model:         {}", config.realtime_model);
        println!("  voice:         {}", config.realtime_voice);
        println!("  audio format:  {}", config.audio_format);
        println!(
            "  stream url:    {}/<CallSid> (served at {})",
            config.ws_server_uri.trim_end_matches('/'),
            config.stream_path
        );
        return Ok(());
    }

    let address = config.address();
    println!("Starting server on {address}");

    info!(
        model = %config.realtime_model,
        voice = %config.realtime_voice,
        audio_format = %config.audio_format,
        stream_path = %config.stream_path,
        settle_delay_ms = config.settle_delay_ms,
        setup_timeout_secs = config.setup_timeout_secs,
        "Relay configured"
    );

    let app_state = AppState::new(config);
    let _sweeper = app_state.spawn_session_sweeper();
    let app = routes::create_app(app_state);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    let listener = TcpListener::bind(&socket_addr).await?;
    info!("Listening on {}", socket_addr);
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    Ok(())
}
