//! # Jante
//!
//! A chat bot whose commands can be composed with a small substitution
//! language:
//!
//! ```text
//! !eval x = !echo foo; !echo $x $(!echo -u bar baz)
//! ```
//!
//! Every feature talks through the [`event::EventHost`]. Evaluating a nested
//! command publishes it on `on_message` and waits for the reply on
//! `on_message_sent`, so commands compose without knowing about each other.
//!
//! - [`tokenizer`] and [`analyzer`] turn text into an [`ast::Node`] tree
//! - [`eval`] walks the tree and performs the round trips
//! - [`bot`] connects transports, the outbox and registered commands
//! - [`plugins`] holds the built-in commands

pub mod analyzer;
pub mod ast;
pub mod bot;
pub mod config;
pub mod error;
pub mod eval;
pub mod event;
pub mod plugins;
pub mod tokenizer;

// Re-exports
pub use error::*;
