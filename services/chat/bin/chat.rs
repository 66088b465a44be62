//! Main Entrypoint for the AID Win Terminal Chat
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Initializing logging on stderr, leaving stdout to the conversation.
//! 3. Choosing the audio recorder and player, then running the chat session.

use aidwin_chat::{app, config::Config, default_player, default_recorder};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with AID Win from the terminal")]
struct Args {
    /// Overrides CHAT_API_URL.
    #[arg(long)]
    chat_url: Option<String>,

    /// Overrides AUDIO_API_URL.
    #[arg(long)]
    audio_url: Option<String>,

    /// Overrides AUDIO_DEVICE.
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let mut config = Config::from_env()
        .context("Failed to load configuration")?
        .with_endpoint_overrides(args.chat_url.as_deref(), args.audio_url.as_deref())
        .context("Invalid endpoint on the command line")?;
    if let Some(device) = args.device {
        config.audio_device = device;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        chat_url = %config.endpoints.chat,
        audio_url = %config.endpoints.audio,
        probe_interval = ?config.probe_interval,
        probe_timeout = ?config.probe_timeout,
        "Configuration loaded. Starting chat session..."
    );

    // --- 3. Run ---
    let recorder = default_recorder(&config);
    app::run(config, recorder, default_player()).await
}
