mod api;
mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use sosie_channels::{whatsapp, WhatsAppTransport};
use sosie_core::{config, context::Context, runtime::RuntimeState, traits::Provider};
use sosie_memory::Store;
use sosie_providers::{OpenAiCorrector, OpenAiProvider};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sosie",
    version,
    about = "Sosie — personal WhatsApp persona agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the persona agent.
    Start,
    /// Check configuration and provider availability.
    Status,
    /// Pair with WhatsApp by scanning a QR code.
    Pair,
    /// Send a one-shot assistant query (no persona, no pacing).
    Ask {
        /// The question to ask.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

fn build_provider(cfg: &config::Config) -> Arc<OpenAiProvider> {
    Arc::new(OpenAiProvider::from_config(
        cfg.provider.base_url.clone(),
        cfg.provider.api_key.clone(),
        cfg.provider.reply_model.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            if cfg.provider.api_key.is_empty() {
                anyhow::bail!(
                    "provider api_key is empty. Set it in {} under [provider].",
                    cli.config
                );
            }
            if !cfg.channel.whatsapp.enabled {
                anyhow::bail!("WhatsApp channel is disabled in config.");
            }

            let provider = build_provider(&cfg);
            if !provider.is_available().await {
                anyhow::bail!("provider '{}' is not available", provider.name());
            }

            let corrector = Arc::new(OpenAiCorrector::from_config(
                cfg.provider.base_url.clone(),
                cfg.provider.api_key.clone(),
                cfg.provider.correction_model.clone(),
            ));

            let channel = Arc::new(WhatsAppTransport::new(&cfg.agent.data_dir));
            let store = Store::new(&cfg.memory).await?;

            // Restore the posture the agent was shut down with.
            let flags = store.load_flags().await?;
            let runtime = Arc::new(RuntimeState::from_flags(&flags));

            println!("Sosie — starting persona agent...");
            let gw = Arc::new(gateway::Gateway::new(
                provider, corrector, channel, store, runtime, cfg,
            ));
            gw.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Sosie — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Persona: {}", cfg.agent.owner_name);
            println!(
                "Provider: {} ({})",
                cfg.provider.base_url, cfg.provider.reply_model
            );

            let provider = build_provider(&cfg);
            println!(
                "  reachable: {}",
                if provider.is_available().await {
                    "yes"
                } else {
                    "no"
                }
            );

            let session_db = format!(
                "{}/whatsapp_session/whatsapp.db",
                config::shellexpand(&cfg.agent.data_dir)
            );
            println!(
                "WhatsApp session: {}",
                if std::path::Path::new(&session_db).exists() {
                    "present"
                } else {
                    "not paired"
                }
            );

            let store = Store::new(&cfg.memory).await?;
            let flags = store.load_flags().await?;
            println!(
                "State: {} | auto-correct {} | {} contacts",
                if flags.paused { "paused" } else { "active" },
                if flags.autocorrect_enabled {
                    "on"
                } else {
                    "off"
                },
                store.list_contacts().await?.len(),
            );
        }
        Commands::Pair => {
            let cfg = config::load(&cli.config)?;
            println!("Sosie — WhatsApp pairing. Scan the QR code with your phone.\n");

            let (mut qr_rx, mut done_rx) = whatsapp::start_pairing(&cfg.agent.data_dir).await?;
            loop {
                tokio::select! {
                    Some(code) = qr_rx.recv() => {
                        match whatsapp::generate_qr_terminal(&code) {
                            Ok(rendered) => println!("{rendered}"),
                            Err(e) => eprintln!("QR rendering failed: {e}"),
                        }
                    }
                    Some(_) = done_rx.recv() => {
                        println!("Paired. You can now run `sosie start`.");
                        break;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("Pairing aborted.");
                        break;
                    }
                }
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no question provided. Usage: sosie ask <question>");
            }

            let cfg = config::load(&cli.config)?;
            let provider = build_provider(&cfg);
            if !provider.is_available().await {
                anyhow::bail!("provider is not available, check api_key in {}", cli.config);
            }

            let mut context = Context::new(&message.join(" "));
            context.model = Some(cfg.provider.assistant_model.clone());
            context.temperature = Some(0.7);
            context.max_tokens = Some(800);

            let completion = provider.complete(&context).await?;
            println!("{}", completion.text);
        }
    }

    Ok(())
}
