//! Commands shipped with the bot.

pub mod echo;
pub mod eval;
pub mod help;

use std::sync::Arc;

use crate::bot::{Bot, BotResult};

pub use echo::EchoCommand;
pub use eval::EvalCommand;
pub use help::HelpCommand;

/// Registers `echo`, `eval` and `help`, then fires `on_plugins_loaded`.
pub fn load_default_plugins(bot: &Bot) -> BotResult<()> {
    let prefix = bot.config().command_prefix.clone();

    bot.add_command(
        "echo",
        "Echo text back to the sender",
        Arc::new(EchoCommand::new()),
    )?;
    bot.add_command(
        "eval",
        "Evaluate statements!",
        Arc::new(
            EvalCommand::new(bot.host(), &prefix, bot.config().eval.clone())
                .with_tasks(bot.tasks()),
        ),
    )?;
    bot.add_command(
        "help",
        "List commands or describe one",
        Arc::new(HelpCommand::new(bot.registry(), &prefix)),
    )?;

    bot.plugins_loaded()
}
