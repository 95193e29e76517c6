use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::event::Message;

use super::{BotError, BotResult};

/// Outbound half of a chat network adapter.
///
/// Only externally addressed messages ever reach a transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &Message) -> BotResult<()>;
}

/// Transport that forwards every outbound message into a channel.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, message: &Message) -> BotResult<()> {
        self.tx
            .send(message.clone())
            .map_err(|e| BotError::Transport(format!("channel closed: {}", e)))
    }
}
