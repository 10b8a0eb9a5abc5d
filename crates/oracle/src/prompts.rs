//! Prompt builders for each reply flow. The builders carry the birth date,
//! the precomputed life-path number and the chosen period or kind; the
//! collaborator never re-derives any of them.

use chrono::NaiveDate;
use numera_core::history::{ForecastPeriod, HoroscopeKind};
use numera_core::intent::BirthDate;

fn display_day(day: NaiveDate) -> String {
    day.format("%d.%m.%Y").to_string()
}

pub fn portrait(date: &BirthDate, life_number: u32, today: NaiveDate) -> String {
    format!(
        "Create a deep personal numerology portrait for a person born on {birth}. \
         Life path number: {life_number}. Analysis date: {today}.\n\
         Structure, strictly: 1) the key number and the meaning of the life path; \
         2) core personality traits, including inner contradictions; 3) three or four \
         strengths; 4) at most three growth areas, honest but supportive; 5) career and \
         self-realization; 6) relationships; 7) a one-sentence closing summary.\n\
         Style: calm, confident, expert; address the reader as \"you\"; no cliches, no \
         astrology, no first person. Length: 300-360 words.",
        birth = date.display(),
        today = display_day(today),
    )
}

pub fn compatibility(
    first: &BirthDate,
    second: &BirthDate,
    first_life: u32,
    second_life: u32,
) -> String {
    format!(
        "Create a personal compatibility analysis for two people born on {a} and {b}. \
         Life path numbers: {a_life} and {b_life}.\n\
         Structure, strictly: 1) overall compatibility score as a percentage with a short \
         explanation; 2) what makes this pairing distinctive; 3) three or four concrete \
         strengths of the union; 4) at most three possible frictions, framed as growth \
         areas; 5) practical recommendations; 6) the one area where this pair is \
         strongest.\n\
         Style: calm, respectful, expert; refer to the pair in the third person; no \
         cliches, no mysticism. Length: 270-300 words.",
        a = first.display(),
        b = second.display(),
        a_life = first_life,
        b_life = second_life,
    )
}

pub fn forecast(
    date: &BirthDate,
    life_number: u32,
    period: ForecastPeriod,
    today: NaiveDate,
) -> String {
    format!(
        "Create a personal numerology forecast for {period} for a person born on \
         {birth}. Period starts on {today}. Life path number: {life_number}.\n\
         Structure, strictly: 1) the main theme of the period; 2) how energy and focus \
         will shift across it; 3) two or three favorable stretches and what they suit \
         best; 4) likely challenges; 5) practical recommendations; 6) two or three focus \
         areas; 7) a one-sentence summary.\n\
         Use only numerology and psychological analysis, never astrology. Address the \
         reader as \"you\". Length: 200-300 words.",
        period = period.display(),
        birth = date.display(),
        today = display_day(today),
    )
}

pub fn horoscope(
    date: &BirthDate,
    life_number: u32,
    kind: HoroscopeKind,
    today: NaiveDate,
) -> String {
    format!(
        "Create a personal numerology horoscope for {kind} for a person born on \
         {birth}. Reference date: {today}. Life path number: {life_number}.\n\
         Structure, strictly: 1) a short opening tied to the date; 2) the energy of the \
         period: mood, concentration, inner rhythm; 3) key areas: work and finances, \
         relationships and communication, inner state; 4) likely challenges; 5) one \
         practical piece of advice from the numbers; 6) a lucky number with a short \
         note on how to use it; 7) a one-sentence summary.\n\
         Style: calm, confident, like a personal consultant; address the reader as \
         \"you\"; no abstract philosophy. Length: 150-250 words.",
        kind = kind.display(),
        birth = date.display(),
        today = display_day(today),
    )
}

pub fn affirmation(date: &BirthDate, life_number: u32, today: NaiveDate) -> String {
    format!(
        "Create one personal affirmation for the day for a person born on {birth}. \
         Life path number: {life_number}. The day is {today}.\n\
         Requirements: one sentence, two at most; first person (\"I\"); at most twenty \
         words; calm, confident, supportive; reflects the strengths of number \
         {life_number}; practical, applicable in real life. Forbidden: the words \
         \"universe\", \"karma\", \"energy flows\"; motivational-poster cliches; any \
         explanation or commentary. Return only the affirmation text, without quotes.",
        birth = date.display(),
        today = display_day(today),
    )
}
