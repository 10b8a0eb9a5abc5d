//! Core domain logic for the numera bot.
//!
//! Everything here is deliberately free of I/O:
//! - **Config** (`config`) - layered configuration with env overrides
//! - **Intent routing** (`intent`) - classify free-form text into a reply flow
//! - **Action history** (`history`) - the bounded per-user action vocabulary
//! - **Numerology** (`numerology`) - life-path arithmetic and local fallbacks
//!
//! The intent router is a pure function of `(message text, history snapshot)`;
//! persistence and transport live in the `numera-store`, `numera-telegram`,
//! and `numera-server` crates.

pub mod config;
pub mod errors;
pub mod history;
pub mod intent;
pub mod numerology;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use errors::{FlowError, GatewayError};
pub use history::{ActionRecord, ActionTag, ForecastPeriod, HoroscopeKind, HISTORY_LIMIT};
pub use intent::{classify, BirthDate, MenuCommand, PendingIntent};
