use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{default_config_path, history_path, load_config, Config};
use crate::gateway::{
    sanitize_filename, Delivery, DeliveryMode, ExtractionRequest, Gateway, HttpUpstream,
    ProviderPreference, ProviderTable,
};
use crate::history::{HistoryEntry, HistoryStore, JsonFileHistory};
use crate::models::DownloadResponse;

// --- Modules ---
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod history;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

// --- Command-Line Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Download gateway for TikTok and X/Twitter videos.", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway in the foreground.
    Serve,
    /// Download a video through the gateway and record it in the local history.
    Fetch {
        url: String,
        #[arg(long, value_enum, default_value_t = ProviderArg::Primary)]
        provider: ProviderArg,
        /// Directory to write into.
        #[arg(long, default_value = ".")]
        output: PathBuf,
        #[arg(long)]
        filename: Option<String>,
        /// Also download the audio track when the provider offers one.
        #[arg(long)]
        audio: bool,
    },
    /// Resolve a link to its media URLs without downloading anything.
    Resolve {
        url: String,
        #[arg(long, value_enum, default_value_t = ProviderArg::Primary)]
        provider: ProviderArg,
    },
    /// Inspect or edit the local download history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Print the resolved configuration.
    Config,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List downloads, newest first.
    List,
    /// Remove one entry by id.
    Remove { id: u64 },
    /// Remove every entry.
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    Primary,
    Secondary,
}

impl From<ProviderArg> for ProviderPreference {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Primary => ProviderPreference::Primary,
            ProviderArg::Secondary => ProviderPreference::Secondary,
        }
    }
}

// --- Main Application Logic ---
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tikdrop=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().await?,
    };

    match cli.command {
        Commands::Serve => run_server(&config_path).await?,
        Commands::Fetch {
            url,
            provider,
            output,
            filename,
            audio,
        } => fetch(&config_path, &url, provider.into(), &output, filename, audio).await?,
        Commands::Resolve { url, provider } => resolve(&config_path, &url, provider.into()).await?,
        Commands::History { action } => history(action).await?,
        Commands::Config => show_config(&config_path).await?,
    }

    Ok(())
}

async fn resolved_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = load_config(path).await?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

fn build_gateway(config: &Config) -> anyhow::Result<Gateway> {
    let providers = ProviderTable::from_config(config);
    if !providers.has_api_key() {
        tracing::warn!(
            "{} is not configured; every extraction request will fail",
            crate::config::API_KEY_ENV
        );
    }
    let upstream = HttpUpstream::new(config.upstream_timeout())?;
    Ok(Gateway::new(providers, Arc::new(upstream)))
}

// --- Command Functions ---

/// The core function that runs the Axum web server.
async fn run_server(config_path: &Path) -> anyhow::Result<()> {
    let config = resolved_config(config_path).await?;
    let state = AppState {
        gateway: Arc::new(build_gateway(&config)?),
    };
    let addr = config.bind_addr();
    let app = routes::create_router(state);

    tracing::info!("Starting server in foreground, listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Client flow: direct download, optional audio lookup, history record.
async fn fetch(
    config_path: &Path,
    url: &str,
    preference: ProviderPreference,
    output: &Path,
    filename: Option<String>,
    with_audio: bool,
) -> anyhow::Result<()> {
    let gateway = build_gateway(&resolved_config(config_path).await?)?;
    tokio::fs::create_dir_all(output).await?;

    let request = ExtractionRequest::new(url, preference, DeliveryMode::Direct, filename)?;
    let (video_name, bytes) = match gateway.run(&request).await? {
        Delivery::Media { filename, bytes } => (filename, bytes),
        Delivery::Reference(_) => anyhow::bail!("Gateway returned a reference for a direct request"),
    };
    let video_path = output.join(sanitize_filename(&video_name));
    tokio::fs::write(&video_path, &bytes).await?;
    println!("Saved {} ({} bytes)", video_path.display(), bytes.len());

    if with_audio {
        match gateway.audio_info(&request).await? {
            Some(track) => {
                let audio = gateway.fetch_audio(&track).await?;
                let audio_path = output.join(sanitize_filename(&track.filename));
                tokio::fs::write(&audio_path, &audio).await?;
                println!("Saved {} ({} bytes)", audio_path.display(), audio.len());
            }
            None => println!("No audio track available for this link."),
        }
    }

    let store = JsonFileHistory::new(history_path().await?);
    store.append(HistoryEntry::new(url, video_name)).await?;
    Ok(())
}

async fn resolve(
    config_path: &Path,
    url: &str,
    preference: ProviderPreference,
) -> anyhow::Result<()> {
    let gateway = build_gateway(&resolved_config(config_path).await?)?;
    let request = ExtractionRequest::new(url, preference, DeliveryMode::Indirect, None)?;
    let result = gateway.extract(&request).await?;
    println!("{}", serde_json::to_string_pretty(&DownloadResponse::from(result))?);
    Ok(())
}

async fn history(action: HistoryAction) -> anyhow::Result<()> {
    let store = JsonFileHistory::new(history_path().await?);
    match action {
        HistoryAction::List => {
            let entries = store.list().await?;
            if entries.is_empty() {
                println!("No download history yet");
            }
            for entry in entries {
                println!(
                    "{}  {}  {}  {}",
                    entry.id,
                    entry.downloaded_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.filename,
                    entry.url
                );
            }
        }
        HistoryAction::Remove { id } => {
            if store.remove(id).await? {
                println!("Removed entry {}.", id);
            } else {
                println!("No entry with id {}.", id);
            }
        }
        HistoryAction::Clear => {
            store.clear().await?;
            println!("Download history has been cleared");
        }
    }
    Ok(())
}

async fn show_config(config_path: &Path) -> anyhow::Result<()> {
    let config = resolved_config(config_path).await?;
    println!("# {}", config_path.display());
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
