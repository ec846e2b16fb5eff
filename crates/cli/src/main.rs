use std::sync::Arc;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    voicebridge_config::BridgeConfig,
    voicebridge_providers::{CompletionRequest, GeminiGenerator, TextGenerator},
    voicebridge_voice::{FallbackSynthesizer, FormatPolicy, UpliftTts},
    voicebridge_whatsapp::{CloudApiSender, ReplySender},
};

#[derive(Parser)]
#[command(name = "voicebridge", about = "voicebridge — WhatsApp voice assistant bridge")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (skips the usual discovery).
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Send a one-off text message over the delivery channel.
    Send {
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        message: String,
    },
    /// Run one generate-and-synthesize turn, without store or delivery.
    Chat {
        /// The message to send to the model.
        message: String,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    match &cli.config {
        Some(path) => voicebridge_config::load_config(path),
        None => Ok(voicebridge_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "voicebridge starting");

    let config = resolve_config(&cli)?;

    match cli.command {
        // Default: start the gateway when no subcommand is provided.
        None | Some(Commands::Gateway) => voicebridge_gateway::start_gateway(config).await,
        Some(Commands::Send { to, message }) => handle_send(&config, &to, &message).await,
        Some(Commands::Chat { message }) => handle_chat(&config, &message).await,
    }
}

async fn handle_send(config: &BridgeConfig, to: &str, message: &str) -> anyhow::Result<()> {
    let sender = CloudApiSender::new(&config.whatsapp);
    sender.send_text(to, message).await?;
    println!("Sent to {to}.");
    Ok(())
}

/// One turn of the reduced pipeline: generate, synthesize, print. No
/// store behind it, and nothing is delivered anywhere.
async fn handle_chat(config: &BridgeConfig, message: &str) -> anyhow::Result<()> {
    let generator = GeminiGenerator::new(&config.generation);
    let completion = generator
        .complete(&CompletionRequest::new(Vec::new(), message))
        .await?;
    println!("{}", completion.text);

    let synthesizer = FallbackSynthesizer::new(
        Arc::new(UpliftTts::new(&config.synthesis)),
        FormatPolicy::from_names(&config.synthesis.formats)?,
    );
    match synthesizer.synthesize(&completion.text, None).await {
        Ok(spoken) => println!("\nVoice ({}): {}", spoken.format, spoken.url),
        Err(e) => eprintln!("\nVoice unavailable: {e}"),
    }
    Ok(())
}
