use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::history::{ActionRecord, ActionTag, ForecastPeriod, HoroscopeKind};

/// A birth date accepted in `DD.MM.YYYY` form and validated as a real
/// calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate(pub NaiveDate);

impl BirthDate {
    pub fn parse(token: &str) -> Option<Self> {
        NaiveDate::parse_from_str(token, "%d.%m.%Y").ok().map(Self)
    }

    /// The original `DD.MM.YYYY` rendering, used in prompts and replies.
    pub fn display(&self) -> String {
        self.0.format("%d.%m.%Y").to_string()
    }

    /// All digits of the date in `DDMMYYYY` order, the input to the
    /// life-path reduction.
    pub fn digits(&self) -> String {
        self.0.format("%d%m%Y").to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuCommand {
    Start,
    Portrait,
    Compatibility,
    Forecast,
    Horoscope,
    Affirmation,
    About,
    Stats,
}

impl MenuCommand {
    /// The exact reply-keyboard label that selects this command. Routing is
    /// an exact string match; anything else falls through to date parsing.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::Portrait => "My numerology portrait",
            Self::Compatibility => "Partner compatibility",
            Self::Forecast => "Forecast for a period",
            Self::Horoscope => "Personal horoscope",
            Self::Affirmation => "My affirmation of the day",
            Self::About => "About this bot",
            Self::Stats => "Bot statistics",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        [
            Self::Start,
            Self::Portrait,
            Self::Compatibility,
            Self::Forecast,
            Self::Horoscope,
            Self::Affirmation,
            Self::About,
            Self::Stats,
        ]
        .into_iter()
        .find(|command| command.label() == text)
    }
}

/// The reply flow a message should trigger. Derived transiently by
/// [`classify`] and handed to exactly one handler; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingIntent {
    Portrait(BirthDate),
    Compatibility(BirthDate, BirthDate),
    Forecast(BirthDate, ForecastPeriod),
    Horoscope(BirthDate, HoroscopeKind),
    Affirmation(BirthDate),
    Menu(MenuCommand),
    Unknown,
}

/// Classify one inbound text message against a snapshot of the user's action
/// history.
///
/// Priority order:
/// 1. exact menu-label match;
/// 2. two whitespace-separated `DD.MM.YYYY` tokens -> compatibility, no
///    matter what the history says;
/// 3. one `DD.MM.YYYY` token -> resolved by the single most recent history
///    record (empty history defaults to portrait);
/// 4. anything else -> `Unknown`.
pub fn classify(text: &str, history: &[ActionRecord]) -> PendingIntent {
    let trimmed = text.trim();

    if let Some(command) = MenuCommand::from_label(trimmed) {
        return PendingIntent::Menu(command);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    match tokens.as_slice() {
        [first, second] => {
            match (BirthDate::parse(first), BirthDate::parse(second)) {
                (Some(a), Some(b)) => PendingIntent::Compatibility(a, b),
                _ => PendingIntent::Unknown,
            }
        }
        [single] => match BirthDate::parse(single) {
            Some(date) => resolve_single_date(date, history),
            None => PendingIntent::Unknown,
        },
        _ => PendingIntent::Unknown,
    }
}

/// A bare date is ambiguous: the most recent action record decides which flow
/// the user is in the middle of. Only the last record is consulted.
fn resolve_single_date(date: BirthDate, history: &[ActionRecord]) -> PendingIntent {
    let Some(last) = history.last() else {
        return PendingIntent::Portrait(date);
    };

    match last.tag {
        ActionTag::ForecastRequested { period } | ActionTag::ForecastGenerated { period } => {
            PendingIntent::Forecast(date, period)
        }
        ActionTag::HoroscopeRequested { kind } | ActionTag::HoroscopeGenerated { kind } => {
            PendingIntent::Horoscope(date, kind)
        }
        ActionTag::AffirmationRequested => PendingIntent::Affirmation(date),
        _ => PendingIntent::Portrait(date),
    }
}
