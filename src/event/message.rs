//! # Chat Messages
//!
//! [`Message`] is the single payload type carried by the `on_message` and
//! `on_message_sent` events. A message is addressed either to an external
//! channel (a plain string understood by a transport) or to an internal
//! [`CorrelationId`] minted for a round trip. Transports must never try to
//! deliver internally addressed messages.

use std::fmt;

use uuid::Uuid;

/// Opaque routing key for internal round trips.
///
/// Two ids are only equal when they were minted by the same call to
/// [`CorrelationId::new`] (or cloned from it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    origin: String,
    id: Uuid,
}

impl CorrelationId {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            id: Uuid::new_v4(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Address {
    /// Not routed anywhere yet.
    #[default]
    Unset,
    /// A channel or user identifier owned by a transport.
    External(String),
    /// A round-trip correlation key; never leaves the process.
    Internal(CorrelationId),
}

impl Address {
    pub fn external(channel: &str) -> Self {
        Address::External(channel.to_string())
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Address::Internal(_))
    }

    pub fn is_unset(&self) -> bool {
        match self {
            Address::Unset => true,
            Address::External(channel) => channel.is_empty(),
            Address::Internal(_) => false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unset => write!(f, "<unset>"),
            Address::External(channel) => write!(f, "{}", channel),
            Address::Internal(id) => write!(f, "internal({})", id),
        }
    }
}

/// Message content: either plain text or a failure description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Error(String),
}

impl Default for Body {
    fn default() -> Self {
        Body::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: Body,
    pub sender: String,
    pub recipient: String,
    pub address: Address,
    pub is_in_group: bool,
    pub send_to_all: bool,
    pub alias: Option<String>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            body: Body::default(),
            sender: String::new(),
            recipient: String::new(),
            address: Address::Unset,
            is_in_group: true,
            send_to_all: false,
            alias: None,
        }
    }
}

impl Message {
    pub fn new(text: &str, sender: &str, address: Address) -> Self {
        Self {
            body: Body::Text(text.to_string()),
            sender: sender.to_string(),
            address,
            ..Default::default()
        }
    }

    /// Plain text of the message; failures yield their description.
    pub fn text(&self) -> &str {
        match &self.body {
            Body::Text(text) | Body::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, Body::Error(_))
    }

    pub fn is_internal(&self) -> bool {
        self.address.is_internal()
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.body = Body::Text(text.to_string());
        self
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Builds a reply travelling back to wherever this message came from.
    pub fn respond(&self, body: Body, sender: &str) -> Message {
        Message {
            body,
            sender: sender.to_string(),
            recipient: self.sender.clone(),
            address: self.address.clone(),
            is_in_group: self.is_in_group,
            send_to_all: self.send_to_all,
            alias: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = CorrelationId::new("evaluator");
        let b = CorrelationId::new("evaluator");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert_eq!(a.origin(), "evaluator");
    }

    #[test]
    fn test_respond_keeps_address() {
        let id = CorrelationId::new("evaluator");
        let message = Message::new("!echo hi", "alice", Address::Internal(id.clone()));
        let reply = message.respond(Body::Text("hi".to_string()), "EchoCommand");

        assert!(reply.is_internal());
        assert_eq!(reply.address, Address::Internal(id));
        assert_eq!(reply.recipient, "alice");
        assert_eq!(reply.text(), "hi");
    }

    #[test]
    fn test_unset_address() {
        assert!(Address::Unset.is_unset());
        assert!(Address::external("").is_unset());
        assert!(!Address::external("#chan").is_unset());
        assert!(!Address::Internal(CorrelationId::new("x")).is_unset());
    }

    #[test]
    fn test_error_body() {
        let message = Message {
            body: Body::Error("boom".to_string()),
            ..Default::default()
        };
        assert!(message.is_error());
        assert_eq!(message.text(), "boom");
    }
}
