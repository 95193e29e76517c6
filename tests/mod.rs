mod bot_tests;
mod eval_tests;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jante::{
    bot::{Bot, ChannelTransport, Command, CommandResult},
    config::BotConfig,
    event::Message,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Command answering `<name>(<args>)`.
pub struct Tag(pub &'static str);

#[async_trait]
impl Command for Tag {
    async fn execute(&self, message: &Message) -> CommandResult<String> {
        Ok(format!("{}({})", self.0, message.text().trim()))
    }
}

/// Command that never answers in time.
pub struct Stall;

#[async_trait]
impl Command for Stall {
    async fn execute(&self, _message: &Message) -> CommandResult<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }
}

pub fn test_config() -> BotConfig {
    BotConfig {
        tick_interval: Duration::ZERO,
        shutdown_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

/// Bot with the default plugins, `!a`..`!d` tag commands and a running sender.
pub async fn running_bot() -> (Arc<Bot>, mpsc::UnboundedReceiver<Message>) {
    let bot = Arc::new(Bot::new(test_config()).unwrap());
    for name in ["a", "b", "c", "d"] {
        bot.add_command(name, "", Arc::new(Tag(name))).unwrap();
    }
    bot.add_command("stall", "", Arc::new(Stall)).unwrap();
    jante::plugins::load_default_plugins(&bot).unwrap();

    let (transport, rx) = ChannelTransport::new();
    let sender = bot.clone();
    tokio::spawn(async move { sender.run_sender(Arc::new(transport)).await });
    (bot, rx)
}

pub async fn next_reply(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no reply in time")
        .expect("transport closed")
}
