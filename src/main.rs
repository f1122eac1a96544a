//! Craftopia service entry point.

use craftopia::api::{ApiState, start_http_server};
use craftopia::config::Config;
use craftopia::documents::DocumentStore;
use craftopia::flows::{
    CraftInsightsInput, DataUri, GeminiClient, TranscribeAudioInput, explore_craft_insights,
    transcribe_and_polish_story, transcribe_audio,
};
use craftopia::profile::{ProfileStore, VerificationStatus};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Marketplace service for handmade crafts.
#[derive(Parser, Debug)]
#[command(name = "craftopia", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        /// Address to listen on, overriding `server.bind`.
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Ask the model about a craft tradition.
    Insights {
        craft: String,
    },
    /// Transcribe an audio recording.
    Transcribe {
        file: PathBuf,
        /// MIME type of the recording; guessed from the extension when omitted.
        #[arg(long)]
        mime: Option<String>,
        /// Also polish the transcript into an artisan story.
        #[arg(long)]
        polish: bool,
    },
    /// Override an artisan's verification status.
    SetVerification {
        uid: String,
        /// pending, verified or rejected.
        status: VerificationStatus,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _log_guard = craftopia::logging::init(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config).await
        }
        Command::Insights { craft } => {
            let model = GeminiClient::from_config(&config.model)?;
            let output = explore_craft_insights(&model, &CraftInsightsInput { craft_name: craft }).await?;
            println!("{}", output.craft_details);
            Ok(())
        }
        Command::Transcribe { file, mime, polish } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mime = mime.unwrap_or_else(|| mime_guess::from_path(&file).first_or_octet_stream().to_string());
            let input = TranscribeAudioInput {
                audio_data_uri: DataUri::from_bytes(mime, &bytes).to_string(),
            };

            let model = GeminiClient::from_config(&config.model)?;
            if polish {
                let story = transcribe_and_polish_story(&model, &input).await?;
                println!("{}", serde_json::to_string_pretty(&story)?);
            } else {
                println!("{}", transcribe_audio(&model, &input).await?.transcript);
            }
            Ok(())
        }
        Command::SetVerification { uid, status } => {
            let pool = craftopia::db::connect(&config.database_path()?).await?;
            let profiles = ProfileStore::new(DocumentStore::new(pool));
            profiles.require(&uid).await?;
            profiles.set_verification_status(&uid, status).await?;
            tracing::info!(%uid, %status, "verification status updated");
            Ok(())
        }
        Command::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&Config::default())?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(ApiState::from_config(&config).await?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = start_http_server(config.server.bind, state, shutdown_rx).await?;
    tracing::info!(public_url = %config.public_url(), "craftopia started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    server.await?;

    Ok(())
}
