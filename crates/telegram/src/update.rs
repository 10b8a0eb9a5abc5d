//! Inbound update schema. Raw webhook payloads are narrowed down to the two
//! shapes the bot reacts to: a text message and an inline-button press.
//! Everything else (edits, stickers, photos, joins) becomes `Unsupported`,
//! which the gateway acknowledges and drops.

use numera_core::errors::GatewayError;
use numera_store::UserIdentity;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// An update narrowed to what the handlers act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    TextMessage { chat_id: i64, sender: UserIdentity, text: String },
    Callback { chat_id: i64, sender: UserIdentity, callback_id: String, data: String },
    Unsupported { update_id: i64 },
}

impl InboundEvent {
    /// Parse a raw webhook body. A body that is not an update at all is a
    /// gateway error; a well-formed update the bot has no use for parses
    /// fine and comes back as `Unsupported`.
    pub fn parse(payload: serde_json::Value) -> Result<Self, GatewayError> {
        let update: Update = serde_json::from_value(payload)
            .map_err(|error| GatewayError::MalformedPayload(error.to_string()))?;
        Ok(Self::from_update(update))
    }

    pub fn from_update(update: Update) -> Self {
        if let Some(query) = update.callback_query {
            if let (Some(message), Some(data)) = (query.message, query.data) {
                return Self::Callback {
                    chat_id: message.chat.id,
                    sender: query.from.identity(),
                    callback_id: query.id,
                    data,
                };
            }
            return Self::Unsupported { update_id: update.update_id };
        }

        if let Some(message) = update.message {
            if let (Some(from), Some(text)) = (message.from, message.text) {
                return Self::TextMessage {
                    chat_id: message.chat.id,
                    sender: from.identity(),
                    text,
                };
            }
        }

        Self::Unsupported { update_id: update.update_id }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::InboundEvent;

    #[test]
    fn text_messages_parse_into_events() {
        let payload = json!({
            "update_id": 100,
            "message": {
                "chat": { "id": 555 },
                "from": { "id": 42, "first_name": "Jane", "username": "jane" },
                "text": "15.05.1990"
            }
        });

        let event = InboundEvent::parse(payload).expect("parse");
        match event {
            InboundEvent::TextMessage { chat_id, sender, text } => {
                assert_eq!(chat_id, 555);
                assert_eq!(sender.id, 42);
                assert_eq!(text, "15.05.1990");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn callback_queries_carry_their_data() {
        let payload = json!({
            "update_id": 101,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42 },
                "message": { "chat": { "id": 555 } },
                "data": "forecast:month"
            }
        });

        let event = InboundEvent::parse(payload).expect("parse");
        match event {
            InboundEvent::Callback { chat_id, callback_id, data, .. } => {
                assert_eq!(chat_id, 555);
                assert_eq!(callback_id, "cb-1");
                assert_eq!(data, "forecast:month");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn non_text_messages_are_unsupported_not_errors() {
        let payload = json!({
            "update_id": 102,
            "message": {
                "chat": { "id": 555 },
                "from": { "id": 42 }
            }
        });

        let event = InboundEvent::parse(payload).expect("parse");
        assert_eq!(event, InboundEvent::Unsupported { update_id: 102 });
    }

    #[test]
    fn bodies_that_are_not_updates_are_malformed() {
        assert!(InboundEvent::parse(serde_json::json!([1, 2, 3])).is_err());
        assert!(InboundEvent::parse(serde_json::json!({ "hello": "world" })).is_err());
    }
}
