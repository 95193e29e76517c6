use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{analyzer::DEFAULT_MAX_DEPTH, tokenizer::Syntax, Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_nick")]
    pub nick: String,

    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// In-flight dispatches above which incoming messages are dropped.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    #[serde(default = "default_shutdown_timeout", with = "duration_ms")]
    pub shutdown_timeout: Duration,

    /// `0` disables `on_timer_tick`.
    #[serde(default = "default_tick_interval", with = "duration_ms")]
    pub tick_interval: Duration,

    #[serde(default)]
    pub eval: EvalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_time_limit", with = "duration_ms")]
    pub time_limit: Duration,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub syntax: Syntax,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            time_limit: default_time_limit(),
            max_depth: default_max_depth(),
            syntax: Syntax::default(),
        }
    }
}

fn default_nick() -> String {
    "jante".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_max_tasks() -> usize {
    20
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_time_limit() -> Duration {
    Duration::from_secs(5)
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            command_prefix: default_command_prefix(),
            max_tasks: default_max_tasks(),
            shutdown_timeout: default_shutdown_timeout(),
            tick_interval: default_tick_interval(),
            eval: EvalConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn from_file(path: &str) -> InternalResult<Self> {
        let config: Self = from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InternalResult<()> {
        if self.nick.trim().is_empty() || self.nick.contains(char::is_whitespace) {
            return Err(Error::Config(format!("invalid nick {:?}", self.nick)));
        }
        if self.command_prefix.is_empty() {
            return Err(Error::Config("command_prefix must not be empty".to_string()));
        }
        if !self.eval.syntax.is_consistent() {
            return Err(Error::Config(format!(
                "eval syntax characters must be distinct: {:?}",
                self.eval.syntax
            )));
        }
        Ok(())
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: BotConfig = from_str("{}").unwrap();
        assert_eq!(config.nick, "jante");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.max_tasks, 20);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(5000));
        assert_eq!(config.eval.time_limit, Duration::from_secs(5));
        assert_eq!(config.eval.max_depth, 10);
        assert_eq!(config.eval.syntax, Syntax::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config: BotConfig = from_str(
            r#"{
                "nick": "bot",
                "command_prefix": ".",
                "tick_interval": 0,
                "eval": { "time_limit": 250, "syntax": { "suppress": "|" } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.nick, "bot");
        assert_eq!(config.tick_interval, Duration::ZERO);
        assert_eq!(config.eval.time_limit, Duration::from_millis(250));
        assert_eq!(config.eval.syntax.suppress, '|');
        assert_eq!(config.eval.syntax.action, '$');
    }

    #[test]
    fn test_invalid_config() {
        let config = BotConfig {
            nick: "two words".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        assert!(from_str::<BotConfig>("{ nope").is_err());
        assert!(BotConfig::from_file("/nonexistent/jante.json").is_err());
    }
}
