use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    bot::{Command, CommandError, CommandRegistry, CommandResult},
    event::Message,
};

/// Lists registered commands, or describes one of them.
pub struct HelpCommand {
    registry: Arc<CommandRegistry>,
    command_prefix: String,
}

impl HelpCommand {
    pub fn new(registry: Arc<CommandRegistry>, command_prefix: &str) -> Self {
        Self {
            registry,
            command_prefix: command_prefix.to_string(),
        }
    }
}

#[async_trait]
impl Command for HelpCommand {
    async fn execute(&self, message: &Message) -> CommandResult<String> {
        let wanted = message.text().trim();
        if wanted.is_empty() {
            let names: Vec<String> = self
                .registry
                .list()
                .into_iter()
                .map(|info| format!("{}{}", self.command_prefix, info.name))
                .collect();
            return Ok(format!("Commands: {}", names.join(", ")));
        }

        let name = wanted.trim_start_matches(self.command_prefix.as_str());
        match self.registry.get(name) {
            Some(info) if info.description.is_empty() => {
                Ok(format!("{}{}", self.command_prefix, info.name))
            }
            Some(info) => Ok(format!(
                "{}{}: {}",
                self.command_prefix, info.name, info.description
            )),
            None => Err(CommandError::Failed(format!("No such command \"{}\"", name))),
        }
    }
}
