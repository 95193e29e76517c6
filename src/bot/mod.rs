//! # Bot
//!
//! Process-wide glue between chat transports and the event host.
//!
//! ```text
//!  transport ──receive──▶ on_message ──▶ commands ──send_message──▶ outbox
//!                                                                     │
//!  transport ◀──────── external ──── run_sender ◀─────────────────────┘
//!                                       │
//!                                       └──▶ on_message_sent (every message)
//! ```
//!
//! Internally addressed replies never reach a transport; they are only
//! republished on `on_message_sent`, where the evaluator waiting for them
//! picks them up.

pub mod command;
pub mod ticker;
pub mod transport;

use std::sync::Arc;

use futures::future::join_all;
use regex::Regex;
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    time::timeout,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::BotConfig,
    event::{
        message_payload, message_schema, payload_message, Body, Callback, CoreEvent, EventError,
        EventHost, Message, Payload, Prefilter, Preprocessor, TaskSet, Target,
    },
};

pub use command::{Command, CommandError, CommandInfo, CommandRegistry, CommandResult};
pub use ticker::Ticker;
pub use transport::{ChannelTransport, Transport};

pub struct Bot {
    config: BotConfig,
    host: Arc<EventHost>,
    registry: Arc<CommandRegistry>,
    outbox_tx: mpsc::UnboundedSender<Message>,
    outbox_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    tasks: Arc<TaskSet>,
    ticker: Ticker,
    shutdown_tx: broadcast::Sender<()>,
}

impl Bot {
    /// Validates `config` and creates the core events on a fresh host.
    pub fn new(config: BotConfig) -> BotResult<Self> {
        config
            .validate()
            .map_err(|e| BotError::InvalidConfig(e.to_string()))?;

        let host = Arc::new(EventHost::new());
        for event in [
            CoreEvent::OnMessage,
            CoreEvent::OnMessageSent,
            CoreEvent::OnPluginsLoaded,
            CoreEvent::ShouldSave,
            CoreEvent::OnTimerTick,
        ] {
            host.create(event.name(), event.schema())?;
        }

        let tasks = Arc::new(TaskSet::default());
        let ticker = Ticker::new(host.clone(), tasks.clone(), config.tick_interval);
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            host,
            registry: Arc::new(CommandRegistry::new()),
            outbox_tx,
            outbox_rx: tokio::sync::Mutex::new(Some(outbox_rx)),
            tasks,
            ticker,
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn host(&self) -> Arc<EventHost> {
        self.host.clone()
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.registry.clone()
    }

    /// Dispatches that `shutdown` waits for.
    pub fn tasks(&self) -> Arc<TaskSet> {
        self.tasks.clone()
    }

    pub fn register_command(&self, owner: &str, name: &str, description: &str) -> BotResult<bool> {
        Ok(self.registry.register(owner, name, description)?)
    }

    /// Removes `name` from the registry and stops answering it.
    pub fn unregister_command(&self, name: &str) -> bool {
        match self.registry.unregister(name) {
            Some((_, callback)) => {
                if let Some(callback) = callback {
                    self.host
                        .unsubscribe(CoreEvent::OnMessage.name(), &callback);
                }
                true
            }
            None => false,
        }
    }

    pub fn commands(&self) -> Vec<CommandInfo> {
        self.registry.list()
    }

    /// Answers `<prefix><name>` messages with `command`.
    ///
    /// The command sees the message with the prefix, the name and one
    /// separating whitespace character removed. Its result goes back to the
    /// sender through the outbox, keeping the original address.
    pub fn add_command(
        &self,
        name: &str,
        description: &str,
        command: Arc<dyn Command>,
    ) -> BotResult<()> {
        if !self.registry.register(name, name, description)? {
            return Err(CommandError::AlreadyRegistered {
                name: name.to_string(),
            }
            .into());
        }

        let pattern = format!(
            r"^{}{}($|\s)",
            regex::escape(&self.config.command_prefix),
            regex::escape(name)
        );
        let preamble = match Regex::new(&pattern) {
            Ok(regex) => Arc::new(regex),
            Err(e) => {
                self.registry.unregister(name);
                return Err(CommandError::InvalidName {
                    name: name.to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        };

        let matcher = preamble.clone();
        let prefilter = Prefilter::new(message_schema(), move |payload| {
            payload_message(payload).is_some_and(|message| match &message.body {
                Body::Text(text) => matcher.is_match(text),
                Body::Error(_) => false,
            })
        });
        let preprocessor = Preprocessor::new(message_schema(), move |payload| {
            match payload_message(&payload) {
                Some(message) => {
                    let stripped = preamble.replace(message.text(), "").into_owned();
                    message_payload(message.clone().with_text(&stripped))
                }
                None => payload,
            }
        });

        let outbox = self.outbox_tx.clone();
        let responder = name.to_string();
        let target = Target::new(message_schema(), move |payload: Payload| {
            let command = command.clone();
            let outbox = outbox.clone();
            let responder = responder.clone();
            async move {
                let Some(message) = payload_message(&payload) else {
                    return;
                };
                let body = match command.execute(message).await {
                    Ok(text) if text.trim().is_empty() && !message.is_internal() => {
                        Body::Error(format!("{} returned an empty string.", responder))
                    }
                    Ok(text) => Body::Text(text),
                    Err(e) => {
                        debug!("{} failed: {}", responder, e);
                        Body::Error(e.to_string())
                    }
                };
                if outbox.send(message.respond(body, &responder)).is_err() {
                    warn!("Outbox closed, dropping reply from {}", responder);
                }
            }
        });

        let callback = Callback::new(target)
            .with_prefilter(prefilter)
            .with_preprocessor(preprocessor);
        if let Err(e) = self
            .host
            .subscribe(CoreEvent::OnMessage.name(), callback.clone())
        {
            self.registry.unregister(name);
            return Err(e.into());
        }
        self.registry.attach(name, callback);
        debug!("Command registered: {}", name);
        Ok(())
    }

    /// Queues `message` for [`Bot::run_sender`].
    pub fn send_message(&self, message: Message) {
        if self.outbox_tx.send(message).is_err() {
            warn!("Outbox closed, message dropped");
        }
    }

    /// Drains the outbox until shutdown. Only one sender may run at a time.
    pub async fn run_sender(&self, transport: Arc<dyn Transport>) -> BotResult<()> {
        let mut outbox = self
            .outbox_rx
            .lock()
            .await
            .take()
            .ok_or(BotError::SenderRunning)?;
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("Sender stopping");
                    break;
                }
                received = outbox.recv() => match received {
                    Some(message) => self.deliver(message, transport.as_ref()).await,
                    None => break,
                },
            }
        }

        *self.outbox_rx.lock().await = Some(outbox);
        Ok(())
    }

    async fn deliver(&self, mut message: Message, transport: &dyn Transport) {
        if message.address.is_unset() {
            error!("Attempted to send message without address: {:?}", message);
            return;
        }

        if !message.is_internal() {
            if let Body::Error(e) = &message.body {
                message.body = Body::Text(format!("{}-exception: {}", message.sender, e));
            }
            if let Err(e) = transport.send(&message).await {
                error!("Transport failed to deliver to {}: {}", message.address, e);
                return;
            }
        }

        match self
            .host
            .fire(CoreEvent::OnMessageSent.name(), message_payload(message))
        {
            Ok(handles) => self.tasks.track(handles),
            Err(e) => error!("Failed to publish sent message: {}", e),
        }
    }

    /// Entry point for transports. Returns whether the message was dispatched.
    ///
    /// Blank messages and senders that are not a single word are ignored.
    /// When more than `max_tasks` dispatches are still running the message
    /// is dropped.
    pub fn receive(&self, mut message: Message) -> BotResult<bool> {
        let acceptable = !message.text().trim().is_empty()
            && !message.sender.is_empty()
            && !message.sender.contains(char::is_whitespace);
        if !acceptable {
            debug!("Ignoring message from {:?}", message.sender);
            return Ok(false);
        }

        let in_flight = self.tasks.prune();
        if in_flight > self.config.max_tasks {
            warn!(
                "{} tasks in flight, dropping message from {}",
                in_flight, message.sender
            );
            return Ok(false);
        }

        if message.alias.is_none() {
            message.alias = Some(message.sender.clone());
        }
        let handles = self
            .host
            .fire(CoreEvent::OnMessage.name(), message_payload(message))?;
        self.tasks.track(handles);
        Ok(true)
    }

    pub fn outstanding_tasks(&self) -> usize {
        self.tasks.prune()
    }

    /// Announces that every plugin has registered its commands.
    pub fn plugins_loaded(&self) -> BotResult<()> {
        let handles = self
            .host
            .fire(CoreEvent::OnPluginsLoaded.name(), Payload::new())?;
        self.tasks.track(handles);
        info!("Plugins loaded: {} commands", self.registry.list().len());
        Ok(())
    }

    pub fn start_timer(&self) {
        self.ticker.start();
    }

    /// Asks listeners to persist state, waits for outstanding tasks up to
    /// `shutdown_timeout`, then stops the sender.
    pub async fn shutdown(&self) -> BotResult<()> {
        info!("Shutting down {}", self.config.nick);
        self.ticker.stop();

        match self.host.fire(CoreEvent::ShouldSave.name(), Payload::new()) {
            Ok(handles) => self.tasks.track(handles),
            Err(e) => warn!("should_save not dispatched: {}", e),
        }

        let handles = self.tasks.drain();
        let pending = handles.len();
        match timeout(self.config.shutdown_timeout, join_all(handles)).await {
            Ok(results) => {
                for result in results.into_iter().filter_map(Result::err) {
                    error!("Task failed during shutdown: {}", result);
                }
            }
            Err(_) => warn!(
                "{} tasks still running after {:?}",
                pending, self.config.shutdown_timeout
            ),
        }

        // no sender running is fine
        let _ = self.shutdown_tx.send(());
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sender loop already running")]
    SenderRunning,
}

pub type BotResult<T> = Result<T, BotError>;
