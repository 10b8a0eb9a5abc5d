use rand::Rng;

use crate::intent::BirthDate;

/// Digit-sum reduction of a `DDMMYYYY` date, preserving the master numbers
/// 11, 22 and 33. `15.05.1990` reduces 1+5+0+5+1+9+9+0 = 30 -> 3.
pub fn life_path_number(date: &BirthDate) -> u32 {
    let mut total: u32 = date.digits().bytes().map(|b| u32::from(b - b'0')).sum();

    while total > 9 && !matches!(total, 11 | 22 | 33) {
        total = digit_sum(total);
    }

    total
}

fn digit_sum(mut value: u32) -> u32 {
    let mut sum = 0;
    while value > 0 {
        sum += value % 10;
        value /= 10;
    }
    sum
}

/// Deterministic affirmation keyed by life-path number. This is the local
/// fallback when the text-generation collaborator is unavailable, and the
/// basis for affirmation replies in tests.
pub fn fallback_affirmation(life_number: u32) -> &'static str {
    match life_number {
        1 => "I lead my own life and move toward my goals with confidence.",
        2 => "I am open to harmonious relationships and cooperation.",
        3 => "I express myself creatively and bring joy into the world.",
        4 => "I build a solid foundation for my future.",
        5 => "I am free in my choices and open to change.",
        6 => "I create harmony and care in my relationships.",
        7 => "I trust my intuition and seek wisdom.",
        8 => "I attract abundance and achieve success.",
        9 => "I close cycles with gratitude and open myself to the new.",
        11 => "I inspire others with my vision and sensitivity.",
        22 => "I turn great ideas into reality.",
        33 => "I bring light and healing through service to others.",
        _ => "I meet this day with gratitude and openness.",
    }
}

/// Deterministic stand-in reply used when the collaborator times out or
/// errors. The user always receives something non-empty.
pub fn fallback_reply() -> &'static str {
    "Something went wrong while preparing your reading. Please try again in a moment."
}

/// A small flourish for affirmation replies, mirroring the original bot's
/// "number of the day".
pub fn number_of_the_day() -> u32 {
    rand::thread_rng().gen_range(1..=9)
}

/// Rotating opening for the welcome message.
pub fn welcome_opening() -> &'static str {
    const OPENINGS: [&'static str; 3] = ["Hello", "Welcome", "Glad to see you"];
    OPENINGS[rand::thread_rng().gen_range(0..OPENINGS.len())]
}
