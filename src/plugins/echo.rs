use async_trait::async_trait;
use clap::{CommandFactory, Parser};

use crate::{
    bot::{Command, CommandError, CommandResult},
    event::Message,
};

/// Echo text back to the sender, loosely after the shell builtin.
#[derive(Parser, Debug)]
#[command(name = "echo", about = "Echos things", disable_help_flag = true)]
struct EchoArgs {
    /// The first character of each word will be made uppercase.
    #[arg(short, long)]
    title: bool,

    /// Changes all letters to lowercase.
    #[arg(short, long)]
    lower: bool,

    /// Converts the first character of the text to uppercase.
    #[arg(short, long)]
    capitalize: bool,

    /// Encodes the text according to URL-safe conventions.
    #[arg(short, long)]
    urlencode: bool,

    /// Shows this helpful message.
    #[arg(short, long)]
    help: bool,

    /// Return the text in all caps.
    #[arg(long = "all-caps", visible_alias = "upper")]
    all_caps: bool,

    /// Words that will be echoed.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EchoCommand;

impl EchoCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Command for EchoCommand {
    async fn execute(&self, message: &Message) -> CommandResult<String> {
        let args = EchoArgs::try_parse_from(
            std::iter::once("echo").chain(message.text().split_whitespace()),
        )
        .map_err(|e| CommandError::InvalidArguments(format!("\n{}", e)))?;

        if args.help {
            return Ok(EchoArgs::command().render_help().to_string());
        }

        let mut answer = args.words.join(" ");
        if args.lower {
            answer = answer.to_lowercase();
        }
        if args.title {
            answer = title_case(&answer);
        }
        if args.capitalize {
            answer = capitalize(&answer);
        }
        if args.all_caps {
            answer = answer.to_uppercase();
        }
        if args.urlencode {
            answer = url_encode(&answer);
        }
        Ok(answer)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            result.push(c);
            word_start = true;
        }
    }
    result
}

/// Form encoding: unreserved bytes kept, space as `+`, the rest percent-escaped.
fn url_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::Address;

    async fn echo(args: &str) -> CommandResult<String> {
        let message = Message::new(args, "alice", Address::external("#c"));
        EchoCommand::new().execute(&message).await
    }

    #[tokio::test]
    async fn test_plain() {
        assert_eq!(echo("hello  world").await.unwrap(), "hello world");
        assert_eq!(echo("").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_flags() {
        assert_eq!(echo("-l HeLLo").await.unwrap(), "hello");
        assert_eq!(echo("-t hello big world").await.unwrap(), "Hello Big World");
        assert_eq!(echo("-c åäö abc").await.unwrap(), "Åäö abc");
        assert_eq!(echo("--upper shout").await.unwrap(), "SHOUT");
        assert_eq!(echo("--all-caps shout").await.unwrap(), "SHOUT");
        assert_eq!(echo("-u a b&c").await.unwrap(), "a+b%26c");
    }

    #[tokio::test]
    async fn test_hyphen_words_after_text() {
        assert_eq!(echo("it is -5 degrees").await.unwrap(), "it is -5 degrees");
    }

    #[tokio::test]
    async fn test_help() {
        let help = echo("-h").await.unwrap();
        assert!(help.contains("--title"));
    }
}
