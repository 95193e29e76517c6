use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::{CommandFactory, Parser};

use crate::{
    bot::{Command, CommandError, CommandResult},
    config::EvalConfig,
    eval::Evaluator,
    event::{EventHost, Message, TaskSet},
};

/// Evaluate expressions.
///
/// Expressions are formed as
///     !eval x = !echo foo; !echo $x bar
///
/// Variable assignments end with ;
/// Nested calls can be made
///     !eval !roll $(!list --escape movies)
/// Inner scopes can read variables from outer scopes but not the other way
/// around. The value of a variable is computed once, when it is assigned.
#[derive(Parser, Debug)]
#[command(name = "eval", disable_help_flag = true, verbatim_doc_comment)]
struct EvalArgs {
    /// Show this help message
    #[arg(short, long)]
    help: bool,

    /// Max amount of seconds that the expression will be evaluated under.
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<u64>,

    /// The expression that is to be evaluated.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    expression: Vec<String>,
}

pub struct EvalCommand {
    host: Arc<EventHost>,
    command_prefix: String,
    config: EvalConfig,
    tasks: Option<Arc<TaskSet>>,
}

impl EvalCommand {
    pub fn new(host: Arc<EventHost>, command_prefix: &str, config: EvalConfig) -> Self {
        Self {
            host,
            command_prefix: command_prefix.to_string(),
            config,
            tasks: None,
        }
    }

    pub fn with_tasks(mut self, tasks: Arc<TaskSet>) -> Self {
        self.tasks = Some(tasks);
        self
    }
}

#[async_trait]
impl Command for EvalCommand {
    async fn execute(&self, message: &Message) -> CommandResult<String> {
        let args = EvalArgs::try_parse_from(
            std::iter::once("eval").chain(message.text().split_whitespace()),
        )
        .map_err(|e| CommandError::InvalidArguments(format!("\n{}", e)))?;

        if args.help {
            return Ok(EvalArgs::command().render_help().to_string());
        }
        if args.expression.is_empty() {
            return Ok(EvalArgs::command().render_usage().to_string());
        }

        let mut config = self.config.clone();
        if let Some(seconds) = args.time_limit {
            config.time_limit = Duration::from_secs(seconds);
        }
        let mut evaluator = Evaluator::new(
            self.host.clone(),
            message,
            &self.command_prefix,
            &config,
        );
        if let Some(tasks) = &self.tasks {
            evaluator = evaluator.with_tasks(tasks.clone());
        }
        Ok(evaluator.evaluate(&args.expression.join(" ")).await?)
    }
}
