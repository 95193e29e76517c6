//! # Event-Driven Architecture
//!
//! Every feature of the bot talks to every other feature through named events
//! hosted by a single [`EventHost`](event_host::EventHost).
//!
//! ## Event Flow
//!
//! ```text
//! ┌──────────┐  fire   ┌───────────┐  spawn  ┌──────────┐
//! │  Firer   │────────▶│ EventHost │────────▶│ Callback │ (one task each)
//! └──────────┘         └───────────┘         └──────────┘
//!                           │
//!                      ┌────▼────┐
//!                      │ Schema  │
//!                      └─────────┘
//! ```
//!
//! 1. The host process creates events with a payload [`Schema`](event_host::Schema)
//! 2. Features subscribe [`Callback`](event_host::Callback)s, before or after creation
//! 3. Firing checks the payload against the schema and spawns each matching target
//!
//! ## Round Trips
//!
//! Chat commands are answered on `on_message_sent`. A component that needs the
//! answer to a command it issued addresses the command to a private
//! [`CorrelationId`](message::CorrelationId) and listens for replies carrying
//! the same address:
//!
//! ```text
//! ┌─────────┐  on_message(addr=id)   ┌─────────┐
//! │Requester│───────────────────────▶│ Command │
//! └────┬────┘                        └────┬────┘
//!      │   on_message_sent(addr=id)       │
//!      └──────────────────────────────────┘
//! ```

pub mod core_event;
pub mod event_host;
pub mod message;
pub mod task_set;

pub use core_event::{message_payload, message_schema, payload_message, CoreEvent, MESSAGE_PARAM};
pub use event_host::{
    Callback, EventError, EventHost, EventResult, Payload, Prefilter, Preprocessor, Schema,
    Target, Value,
};
pub use message::{Address, Body, CorrelationId, Message};
pub use task_set::TaskSet;
