use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on the per-user action log; oldest records are evicted first.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastPeriod {
    Week,
    Month,
    Quarter,
    Year,
}

impl Default for ForecastPeriod {
    fn default() -> Self {
        Self::Month
    }
}

impl ForecastPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Week => "the week",
            Self::Month => "the month",
            Self::Quarter => "the next three months",
            Self::Year => "the year",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoroscopeKind {
    Today,
    Tomorrow,
    Week,
    Month,
}

impl Default for HoroscopeKind {
    fn default() -> Self {
        Self::Today
    }
}

impl HoroscopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "the week",
            Self::Month => "the month",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

/// The fixed vocabulary of things a user can do, recorded per user in
/// insertion order. Period and kind choices travel inside the variant rather
/// than being re-parsed out of a tag string by each handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum ActionTag {
    Started,
    PortraitRequested,
    CompatibilityRequested,
    ForecastRequested { period: ForecastPeriod },
    HoroscopeRequested { kind: HoroscopeKind },
    AffirmationRequested,
    PortraitGenerated,
    CompatibilityGenerated,
    ForecastGenerated { period: ForecastPeriod },
    HoroscopeGenerated { kind: HoroscopeKind },
    AffirmationGenerated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(flatten)]
    pub tag: ActionTag,
    pub recorded_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(tag: ActionTag) -> Self {
        Self { tag, recorded_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionRecord, ActionTag, ForecastPeriod};

    #[test]
    fn action_records_round_trip_with_flattened_tag() {
        let record =
            ActionRecord::new(ActionTag::ForecastRequested { period: ForecastPeriod::Quarter });
        let json = serde_json::to_string(&record).expect("serialize");

        assert!(json.contains("\"tag\":\"forecast_requested\""));
        assert!(json.contains("\"period\":\"quarter\""));

        let parsed: ActionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }

    #[test]
    fn period_and_kind_default_to_original_fallbacks() {
        assert_eq!(ForecastPeriod::default(), ForecastPeriod::Month);
        assert_eq!(super::HoroscopeKind::default(), super::HoroscopeKind::Today);
    }
}
