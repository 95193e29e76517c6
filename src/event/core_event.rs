use super::{
    event_host::{Payload, Schema, Value},
    message::Message,
};

/// Payload key carrying a [`Message`].
pub const MESSAGE_PARAM: &str = "message";

/// Events every bot process creates at startup.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum CoreEvent {
    /// A chat line arrived, from a transport or from an internal round trip.
    OnMessage,
    /// A reply left the outbound queue.
    OnMessageSent,
    OnPluginsLoaded,
    ShouldSave,
    OnTimerTick,
}

impl CoreEvent {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn schema(self) -> Schema {
        match self {
            CoreEvent::OnMessage | CoreEvent::OnMessageSent => Schema::new([MESSAGE_PARAM]),
            CoreEvent::OnPluginsLoaded | CoreEvent::ShouldSave => Schema::empty(),
            CoreEvent::OnTimerTick => Schema::new(["timeval"]),
        }
    }
}

pub fn message_schema() -> Schema {
    Schema::new([MESSAGE_PARAM])
}

pub fn message_payload(message: Message) -> Payload {
    let mut payload = Payload::new();
    payload.insert(MESSAGE_PARAM.to_string(), Value::Message(message));
    payload
}

/// Message carried by a `{message}` payload, if any.
pub fn payload_message(payload: &Payload) -> Option<&Message> {
    payload.get(MESSAGE_PARAM).and_then(Value::as_message)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(CoreEvent::OnMessage.name(), "on_message");
        assert_eq!(CoreEvent::OnMessageSent.name(), "on_message_sent");
        assert_eq!(CoreEvent::OnTimerTick.to_string(), "on_timer_tick");
        for event in CoreEvent::iter() {
            assert_eq!(CoreEvent::from_str(event.name()).unwrap(), event);
        }
    }

    #[test]
    fn test_payload_roundtrip() {
        let message = Message::new("hi", "bob", Default::default());
        let payload = message_payload(message.clone());
        assert_eq!(payload_message(&payload), Some(&message));
    }
}
