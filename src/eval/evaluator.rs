//! # Expression Evaluator
//!
//! Walks a parsed expression and turns every command it builds into an
//! internal round trip on the event host:
//!
//! ```text
//!  evaluate("x = !a; !b $x")
//!     │
//!     ├─ lex + parse
//!     ├─ VariableAssign x ── "!a" ──▶ on_message ··· on_message_sent ──▶ x = reply
//!     └─ "!b " + $x ─────────────────▶ on_message ··· on_message_sent ──▶ result
//! ```
//!
//! All round trips of one evaluation share a single deadline and a single
//! correlation id. Each round trip subscribes its own listener and removes it
//! again on every exit path.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_recursion::async_recursion;
use tokio::{sync::oneshot, time::Instant};
use tracing::{debug, instrument, warn};

use crate::{
    analyzer::Parser,
    ast::Node,
    config::EvalConfig,
    event::{
        message_payload, message_schema, payload_message, Address, Body, Callback, CoreEvent,
        CorrelationId, EventHost, Message, Prefilter, TaskSet, Target,
    },
    tokenizer::Lexer,
};

use super::{context::Scope, EvalError, EvalResult};

const CORRELATION_ORIGIN: &str = "evaluator";
/// Stand-in for time limits too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

pub struct Evaluator {
    host: Arc<EventHost>,
    origin: Message,
    command_prefix: String,
    lexer: Lexer,
    parser: Parser,
    deadline: Instant,
    tasks: Option<Arc<TaskSet>>,
}

impl Evaluator {
    /// `origin` is the message that asked for the evaluation; its sender,
    /// alias and group flag are copied onto every issued command.
    pub fn new(
        host: Arc<EventHost>,
        origin: &Message,
        command_prefix: &str,
        config: &EvalConfig,
    ) -> Self {
        Self {
            host,
            origin: origin.clone(),
            command_prefix: command_prefix.to_string(),
            lexer: Lexer::new(config.syntax.clone()),
            parser: Parser::new(config.max_depth),
            deadline: deadline_after(config.time_limit),
            tasks: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = deadline;
        self
    }

    /// Commands issued by round trips are tracked in `tasks`.
    pub fn with_tasks(mut self, tasks: Arc<TaskSet>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn evaluate(&self, text: &str) -> EvalResult<String> {
        let tokens = self.lexer.lex(text)?;
        let tree = self.parser.parse(&tokens)?;
        let address = CorrelationId::new(CORRELATION_ORIGIN);
        let mut scope = Scope::new();
        self.run_tree(&tree, &mut scope, &address).await
    }

    #[async_recursion]
    async fn run_tree(
        &self,
        tree: &[Node],
        scope: &mut Scope,
        address: &CorrelationId,
    ) -> EvalResult<String> {
        let mut command = String::new();

        for node in tree {
            match node {
                Node::Literal(text) => command.push_str(text),
                Node::VariableDeref(name) => command.push_str(scope.lookup(name)?),
                Node::Subtree(children) => {
                    let mut inner = scope.child();
                    let result = self.run_tree(children, &mut inner, address).await?;
                    command.push_str(&result);
                }
                Node::VariableAssign { name, value } => {
                    let mut inner = scope.child();
                    let result = self.run_tree(value, &mut inner, address).await?;
                    scope.insert(name.clone(), result);
                }
                Node::Suppress => {
                    if !command.trim().is_empty() {
                        self.round_trip(&command, address).await?;
                    }
                    command.clear();
                }
            }
        }

        if !command.trim().starts_with(&self.command_prefix) {
            return Ok(command);
        }
        self.round_trip(&command, address).await
    }

    /// Publishes `command` on `on_message` and waits for the reply addressed
    /// back to `address`.
    #[instrument(level = "debug", skip(self, address))]
    async fn round_trip(&self, command: &str, address: &CorrelationId) -> EvalResult<String> {
        let command = command.trim().to_string();
        let address = Address::Internal(address.clone());

        let (tx, rx) = oneshot::channel::<Message>();
        let inbox = Arc::new(Mutex::new(Some(tx)));
        let expected = address.clone();
        let prefilter = Prefilter::new(message_schema(), move |payload| {
            payload_message(payload).is_some_and(|message| message.address == expected)
        });
        let target = Target::new(message_schema(), move |payload| {
            let inbox = inbox.clone();
            async move {
                let Some(reply) = payload_message(&payload).cloned() else {
                    return;
                };
                let sender = inbox.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(sender) = sender {
                    let _ = sender.send(reply);
                }
            }
        });
        let _listener = Listener::subscribe(
            self.host.clone(),
            CoreEvent::OnMessageSent.name(),
            Callback::new(target).with_prefilter(prefilter),
        )?;

        let request = Message {
            body: Body::Text(command.clone()),
            sender: self.origin.sender.clone(),
            alias: self.origin.alias.clone(),
            is_in_group: self.origin.is_in_group,
            address,
            ..Default::default()
        };
        let handles = self
            .host
            .fire(CoreEvent::OnMessage.name(), message_payload(request))?;
        if let Some(tasks) = &self.tasks {
            tasks.track(handles);
        }

        match tokio::time::timeout_at(self.deadline, rx).await {
            Err(_) => {
                warn!("Ran out of time on command {}", command);
                Err(EvalError::Timeout { command })
            }
            Ok(Err(_)) => Err(EvalError::ReplyLost { command }),
            Ok(Ok(reply)) => match reply.body {
                Body::Text(text) => {
                    debug!("{} -> {:?}", command, text);
                    Ok(text)
                }
                Body::Error(message) => Err(EvalError::CommandFailed { command, message }),
            },
        }
    }
}

fn deadline_after(time_limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(time_limit)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Subscription that is removed when dropped.
struct Listener {
    host: Arc<EventHost>,
    event: &'static str,
    callback: Callback,
}

impl Listener {
    fn subscribe(
        host: Arc<EventHost>,
        event: &'static str,
        callback: Callback,
    ) -> EvalResult<Self> {
        host.subscribe(event, callback.clone())?;
        Ok(Self {
            host,
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.host.unsubscribe(self.event, &self.callback);
    }
}
