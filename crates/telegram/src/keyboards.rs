//! Reply and inline keyboards, plus the callback-data codec for the inline
//! buttons. Callback payloads are `<flow>:<choice>`; anything that fails to
//! parse is treated as a stale button and ignored.

use numera_core::history::{ForecastPeriod, HoroscopeKind};
use numera_core::intent::MenuCommand;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboard),
    Inline(InlineKeyboard),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct KeyboardButton {
    text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct InlineButton {
    text: String,
    callback_data: String,
}

fn menu_button(command: MenuCommand) -> KeyboardButton {
    KeyboardButton { text: command.label().to_owned() }
}

/// The persistent main menu shown under the input field.
pub fn main_menu() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboard {
        keyboard: vec![
            vec![menu_button(MenuCommand::Portrait)],
            vec![menu_button(MenuCommand::Compatibility)],
            vec![menu_button(MenuCommand::Forecast), menu_button(MenuCommand::Horoscope)],
            vec![menu_button(MenuCommand::Affirmation)],
            vec![menu_button(MenuCommand::About)],
        ],
        resize_keyboard: true,
    })
}

pub fn forecast_periods() -> ReplyMarkup {
    let button = |label: &str, period: ForecastPeriod| InlineButton {
        text: label.to_owned(),
        callback_data: format!("forecast:{}", period.as_str()),
    };
    ReplyMarkup::Inline(InlineKeyboard {
        inline_keyboard: vec![
            vec![button("A week", ForecastPeriod::Week), button("A month", ForecastPeriod::Month)],
            vec![
                button("Three months", ForecastPeriod::Quarter),
                button("A year", ForecastPeriod::Year),
            ],
        ],
    })
}

pub fn horoscope_kinds() -> ReplyMarkup {
    let button = |label: &str, kind: HoroscopeKind| InlineButton {
        text: label.to_owned(),
        callback_data: format!("horoscope:{}", kind.as_str()),
    };
    ReplyMarkup::Inline(InlineKeyboard {
        inline_keyboard: vec![
            vec![button("For today", HoroscopeKind::Today), button("For tomorrow", HoroscopeKind::Tomorrow)],
            vec![button("For the week", HoroscopeKind::Week), button("For the month", HoroscopeKind::Month)],
        ],
    })
}

/// A decoded inline-button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Forecast(ForecastPeriod),
    Horoscope(HoroscopeKind),
}

pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    let (flow, choice) = data.split_once(':')?;
    match flow {
        "forecast" => ForecastPeriod::parse(choice).map(CallbackAction::Forecast),
        "horoscope" => HoroscopeKind::parse(choice).map(CallbackAction::Horoscope),
        _ => None,
    }
}
