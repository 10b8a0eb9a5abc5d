//! Telegram-facing surface of the numera bot: the inbound update schema, the
//! outbound Bot API client, the keyboards and their callback codec, and the
//! reply flows that tie the router, the store and the text-generation
//! collaborator together.

pub mod api;
pub mod handlers;
pub mod keyboards;
pub mod update;

pub use api::{BotApi, BotApiError, HttpBotApi, RecordingBotApi, SentMessage};
pub use handlers::EventProcessor;
pub use keyboards::{parse_callback, CallbackAction, ReplyMarkup};
pub use update::{InboundEvent, Update};
