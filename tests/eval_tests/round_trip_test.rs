use std::time::Duration;

use futures::future::join_all;
use jante::{
    config::EvalConfig,
    eval::{EvalError, Evaluator},
    event::{Address, CoreEvent, Message},
};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use crate::{next_reply, running_bot};

fn origin() -> Message {
    Message::new("", "alice", Address::external("#chan"))
}

#[tokio::test]
async fn test_suppressed_command_only_returns_last_reply() {
    let (bot, _rx) = running_bot().await;
    let evaluator = Evaluator::new(bot.host(), &origin(), "!", &EvalConfig::default());

    let result = evaluator.evaluate("!echo This ; !echo That").await;
    assert_eq!(result, Ok("That".to_string()));
}

#[tokio::test]
async fn test_eval_command_from_chat() {
    let (bot, mut rx) = running_bot().await;

    bot.receive(Message::new(
        "!eval x = !echo foo; !echo $x bar",
        "alice",
        Address::external("#chan"),
    ))
    .unwrap();

    let reply = next_reply(&mut rx).await;
    assert_eq!(reply.text(), "foo bar");
    assert_eq!(reply.sender, "eval");
    assert_eq!(reply.address, Address::external("#chan"));
}

#[tokio::test]
async fn test_nested_commands_with_flags() {
    let (bot, mut rx) = running_bot().await;

    bot.receive(Message::new(
        "!eval !echo --upper $(!echo -t hello world) \\$5",
        "alice",
        Address::external("#chan"),
    ))
    .unwrap();

    assert_eq!(next_reply(&mut rx).await.text(), "HELLO WORLD $5");
}

#[tokio::test]
async fn test_timeout_names_command_and_cleans_up() {
    let (bot, _rx) = running_bot().await;
    let host = bot.host();
    let baseline = host.subscriber_count(CoreEvent::OnMessageSent.name());

    let evaluator = Evaluator::new(host.clone(), &origin(), "!", &EvalConfig::default())
        .with_deadline(Instant::now() + Duration::from_millis(100));
    let result = evaluator.evaluate("!echo ok; !stall now").await;

    assert_eq!(
        result,
        Err(EvalError::Timeout {
            command: "!stall now".to_string()
        })
    );
    assert_eq!(
        host.subscriber_count(CoreEvent::OnMessageSent.name()),
        baseline
    );
}

#[tokio::test]
async fn test_timeout_reported_to_chat() {
    let (bot, mut rx) = running_bot().await;

    bot.receive(Message::new(
        "!eval -t 1 !echo $(!nobody)",
        "alice",
        Address::external("#chan"),
    ))
    .unwrap();

    assert_eq!(
        next_reply(&mut rx).await.text(),
        "eval-exception: Ran out of time on command \"!nobody\"."
    );
}

#[tokio::test]
async fn test_concurrent_evaluations_stay_separate() {
    let (bot, _rx) = running_bot().await;

    let evaluations = (0..10).map(|i| {
        let host = bot.host();
        async move {
            let evaluator = Evaluator::new(host, &origin(), "!", &EvalConfig::default());
            evaluator.evaluate(&format!("!a {}", i)).await
        }
    });
    let results = join_all(evaluations).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result, Ok(format!("a({})", i)));
    }
}

#[tokio::test]
async fn test_plain_text_is_not_sent() {
    let (bot, _rx) = running_bot().await;
    let evaluator = Evaluator::new(bot.host(), &origin(), "!", &EvalConfig::default());
    assert_eq!(
        evaluator.evaluate("no commands here").await,
        Ok("no commands here".to_string())
    );
}
