use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;

use crate::{
    eval::EvalError,
    event::{Callback, Message},
};

/// A chat command reachable as `<prefix><name> ...`.
///
/// `message` arrives with the prefix and command name already stripped, so
/// `message.text()` holds only the arguments.
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, message: &Message) -> CommandResult<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    pub name: String,
    pub owner: String,
    pub description: String,
}

struct RegisteredCommand {
    info: CommandInfo,
    callback: Option<Callback>,
}

/// Names every command the bot answers to, with who registered it.
#[derive(Default)]
pub struct CommandRegistry {
    commands: DashMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `name` is already taken.
    pub fn register(&self, owner: &str, name: &str, description: &str) -> CommandResult<bool> {
        validate_name(name)?;
        match self.commands.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(RegisteredCommand {
                    info: CommandInfo {
                        name: name.to_string(),
                        owner: owner.to_string(),
                        description: description.to_string(),
                    },
                    callback: None,
                });
                Ok(true)
            }
        }
    }

    pub(crate) fn attach(&self, name: &str, callback: Callback) {
        if let Some(mut command) = self.commands.get_mut(name) {
            command.callback = Some(callback);
        }
    }

    /// Removes `name`, handing back the listener that served it, if any.
    pub fn unregister(&self, name: &str) -> Option<(CommandInfo, Option<Callback>)> {
        self.commands
            .remove(name)
            .map(|(_, command)| (command.info, command.callback))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<CommandInfo> {
        self.commands.get(name).map(|command| command.info.clone())
    }

    /// All commands, sorted by name.
    pub fn list(&self) -> Vec<CommandInfo> {
        let mut commands: Vec<CommandInfo> = self
            .commands
            .iter()
            .map(|command| command.info.clone())
            .collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }
}

fn validate_name(name: &str) -> CommandResult<()> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(CommandError::InvalidName {
            name: name.to_string(),
            message: "must be a single non-empty word".to_string(),
        });
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Command \"{name}\" is already registered")]
    AlreadyRegistered { name: String },

    #[error("Invalid command name \"{name}\": {message}")]
    InvalidName { name: String, message: String },
}

pub type CommandResult<T> = Result<T, CommandError>;
