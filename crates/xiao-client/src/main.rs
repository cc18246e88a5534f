use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use xiao_client::app::App;
use xiao_client::chat::{format_message, ChatClient, LineMode, SpeakOptions};
use xiao_client::console::LiveBlock;
use xiao_client::theme;
use xiao_proto::config::Config;
use xiao_proto::prefs::Prefs;

#[derive(Parser, Debug)]
#[command(name = "xiao")]
#[command(about = "Music browser and assistant chat for the xiaobot speaker backend")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides server.base_url)
    #[arg(short, long)]
    server: Option<String>,

    /// Config file (default: <config dir>/xiao/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and print the answer
    Chat {
        message: String,
        /// Have the speaker read the question aloud
        #[arg(long)]
        speak_query: bool,
        /// Have the speaker read the answer aloud
        #[arg(long)]
        speak_answer: bool,
        /// Print the markup instead of styled text
        #[arg(long)]
        raw: bool,
    },
    /// Format stdin the way chat answers are formatted
    Format,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = xiao_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("xiao.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP/WebSocket client internals quiet.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn".to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("xiao log: {}", log_path.display());

    tracing::info!("xiao starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("config: {:#}, using defaults", e);
            Config::default()
        }),
    };
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    tracing::info!("backend: {}", config.server.base_url);

    match cli.command {
        None => App::new(&config)?.run().await,
        Some(Command::Chat {
            message,
            speak_query,
            speak_answer,
            raw,
        }) => {
            let client = ChatClient::new(
                reqwest::Client::new(),
                &config.server.base_url,
                LineMode::from_config(config.chat.buffer_partial_lines),
            )?;
            let opts = SpeakOptions {
                play_query: speak_query,
                play_answer: speak_answer,
            };
            let cancel = CancellationToken::new();
            let result = if raw {
                let mut fragment = String::new();
                let result = client.ask(&message, opts, &mut fragment, &cancel).await;
                println!("{}", fragment);
                result
            } else {
                // Redrawn in place while the answer streams in.
                let prefs = Prefs::load(&config.paths.prefs_file);
                let mut live = LiveBlock::stdout(theme::palette(prefs.dark_mode));
                client.ask(&message, opts, &mut live, &cancel).await
            };
            result.map(|_| ()).map_err(Into::into)
        }
        Some(Command::Format) => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            println!("{}", format_message(&input));
            Ok(())
        }
    }
}
