use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::Parser;
use jante::{
    bot::{Bot, BotError, BotResult, Transport},
    config::BotConfig,
    event::{Address, Message},
    plugins, Error, InternalResult,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOCAL_USER: &str = "local";

#[derive(Parser)]
#[command(author, version, about = "Chat bot with composable commands", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Terminal transport: one line per outbound message.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn send(&self, message: &Message) -> BotResult<()> {
        let line = format!("{}: {}\n", message.sender, message.text());
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))
    }
}

async fn run(cli: &Cli) -> InternalResult<()> {
    let config = match &cli.config {
        Some(path) => BotConfig::from_file(&path.to_string_lossy())?,
        None => BotConfig::default(),
    };
    info!("config loaded.");
    debug!("config: {:?}", config);

    let bot = Arc::new(Bot::new(config)?);
    plugins::load_default_plugins(&bot)?;

    let sender = bot.clone();
    let sender_task =
        tokio::spawn(async move { sender.run_sender(Arc::new(StdoutTransport)).await });
    bot.start_timer();

    println!(
        "{} is listening. Commands start with \"{}\". Press Ctrl+C to quit.",
        bot.config().nick,
        bot.config().command_prefix
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| Error::internal(format!("Failed to wait for Ctrl+C: {}", e)))?;
                println!("Shutdown signal received, performing clean shutdown...");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    let message = Message::new(&line, LOCAL_USER, Address::external(LOCAL_USER));
                    if let Err(e) = bot.receive(message) {
                        warn!("Message not dispatched: {}", e);
                    }
                }
                None => break,
            },
        }
    }

    bot.shutdown().await?;
    match sender_task.await {
        Ok(result) => result?,
        Err(e) => return Err(Error::internal(format!("Sender task failed: {}", e))),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
