use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use jante::{
    bot::{Bot, BotError},
    config::BotConfig,
    event::{payload_message, Address, Callback, CoreEvent, Message, Payload, Schema, Target},
};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use crate::{next_reply, running_bot, test_config};

#[tokio::test]
async fn test_echo_from_chat() {
    let (bot, mut rx) = running_bot().await;
    bot.receive(Message::new("!echo -c åäö abc", "alice", Address::external("#c")))
        .unwrap();

    let reply = next_reply(&mut rx).await;
    assert_eq!(reply.text(), "Åäö abc");
    assert_eq!(reply.recipient, "alice");
}

#[tokio::test]
async fn test_help_lists_default_plugins() {
    let (bot, mut rx) = running_bot().await;
    bot.receive(Message::new("!help", "alice", Address::external("#c")))
        .unwrap();

    assert_eq!(
        next_reply(&mut rx).await.text(),
        "Commands: !a, !b, !c, !d, !echo, !eval, !help, !stall"
    );
}

#[tokio::test]
async fn test_non_commands_get_no_reply() {
    let (bot, mut rx) = running_bot().await;
    assert!(bot
        .receive(Message::new("just chatting", "alice", Address::external("#c")))
        .unwrap());
    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_every_delivery_is_announced() {
    let (bot, mut rx) = running_bot().await;
    let sent = Arc::new(Mutex::new(Vec::new()));
    let record = sent.clone();
    bot.host()
        .subscribe(
            CoreEvent::OnMessageSent.name(),
            Callback::new(Target::new(
                CoreEvent::OnMessageSent.schema(),
                move |payload: Payload| {
                    let record = record.clone();
                    async move {
                        if let Some(message) = payload_message(&payload) {
                            record
                                .lock()
                                .unwrap()
                                .push((message.is_internal(), message.text().to_string()));
                        }
                    }
                },
            )),
        )
        .unwrap();

    bot.receive(Message::new(
        "!eval !echo $(!echo inner)",
        "alice",
        Address::external("#c"),
    ))
    .unwrap();
    assert_eq!(next_reply(&mut rx).await.text(), "inner");
    sleep(Duration::from_millis(50)).await;

    let sent = sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![
            (true, "inner".to_string()),
            (true, "inner".to_string()),
            (false, "inner".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_plugins_loaded_and_should_save_fire() {
    let bot = Bot::new(test_config()).unwrap();
    let fired = Arc::new(Mutex::new(Vec::new()));

    for event in [CoreEvent::OnPluginsLoaded, CoreEvent::ShouldSave] {
        let record = fired.clone();
        bot.host()
            .subscribe(
                event.name(),
                Callback::new(Target::new(Schema::empty(), move |_| {
                    let record = record.clone();
                    async move { record.lock().unwrap().push(event) }
                })),
            )
            .unwrap();
    }

    jante::plugins::load_default_plugins(&bot).unwrap();
    sleep(Duration::from_millis(20)).await;
    bot.shutdown().await.unwrap();

    assert_eq!(
        *fired.lock().unwrap(),
        vec![CoreEvent::OnPluginsLoaded, CoreEvent::ShouldSave]
    );
}

#[tokio::test]
async fn test_timer_ticks() {
    let bot = Bot::new(BotConfig {
        tick_interval: Duration::from_millis(10),
        ..test_config()
    })
    .unwrap();
    let ticks = Arc::new(Mutex::new(0usize));
    let counter = ticks.clone();
    bot.host()
        .subscribe(
            CoreEvent::OnTimerTick.name(),
            Callback::new(Target::new(
                CoreEvent::OnTimerTick.schema(),
                move |_| {
                    let counter = counter.clone();
                    async move { *counter.lock().unwrap() += 1 }
                },
            )),
        )
        .unwrap();

    bot.start_timer();
    sleep(Duration::from_millis(80)).await;
    bot.shutdown().await.unwrap();
    assert!(*ticks.lock().unwrap() >= 2);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let result = Bot::new(BotConfig {
        command_prefix: String::new(),
        ..test_config()
    });
    assert!(matches!(result, Err(BotError::InvalidConfig(_))));
}
