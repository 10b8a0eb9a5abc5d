use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use numera_core::history::ActionRecord;
use serde::{Deserialize, Serialize};

/// Display attributes of an inbound sender, as reported by the platform.
/// Informational only; the id is the identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserIdentity {
    /// Preferred display name for replies, mirroring how the platform shows
    /// the user.
    pub fn display_name(&self) -> String {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            "dear friend".to_string()
        } else {
            joined
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub joined: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub total_requests: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersDocument {
    pub users: BTreeMap<i64, UserProfile>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub histories: BTreeMap<i64, Vec<ActionRecord>>,
}

/// The reply-flow categories tracked by the aggregate counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowCategory {
    Portrait,
    Compatibility,
    Forecast,
    Horoscope,
    Affirmation,
    NewUser,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounts {
    #[serde(default)]
    pub portraits: u64,
    #[serde(default)]
    pub compatibility_checks: u64,
    #[serde(default)]
    pub forecasts: u64,
    #[serde(default)]
    pub horoscopes: u64,
    #[serde(default)]
    pub affirmations: u64,
    #[serde(default)]
    pub new_users: u64,
}

impl FlowCounts {
    pub fn bump(&mut self, category: FlowCategory) {
        match category {
            FlowCategory::Portrait => self.portraits += 1,
            FlowCategory::Compatibility => self.compatibility_checks += 1,
            FlowCategory::Forecast => self.forecasts += 1,
            FlowCategory::Horoscope => self.horoscopes += 1,
            FlowCategory::Affirmation => self.affirmations += 1,
            FlowCategory::NewUser => self.new_users += 1,
        }
    }

    pub fn total_readings(&self) -> u64 {
        self.portraits + self.compatibility_checks + self.forecasts + self.horoscopes
            + self.affirmations
    }
}

/// Lifetime counts plus per-calendar-day buckets keyed `YYYY-MM-DD`. Buckets
/// are never pruned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersDocument {
    #[serde(default)]
    pub lifetime: FlowCounts,
    #[serde(default)]
    pub daily: BTreeMap<String, FlowCounts>,
}

impl CountersDocument {
    pub fn increment(&mut self, category: FlowCategory, day: NaiveDate) {
        self.lifetime.bump(category);
        self.daily.entry(day.format("%Y-%m-%d").to_string()).or_default().bump(category);
    }

    pub fn day(&self, day: NaiveDate) -> FlowCounts {
        self.daily.get(&day.format("%Y-%m-%d").to_string()).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{CountersDocument, FlowCategory, UserIdentity};

    #[test]
    fn counters_track_lifetime_and_day_buckets_independently() {
        let mut counters = CountersDocument::default();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date");
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).expect("valid date");

        counters.increment(FlowCategory::Portrait, monday);
        counters.increment(FlowCategory::Portrait, tuesday);
        counters.increment(FlowCategory::Forecast, tuesday);

        assert_eq!(counters.lifetime.portraits, 2);
        assert_eq!(counters.lifetime.forecasts, 1);
        assert_eq!(counters.day(monday).portraits, 1);
        assert_eq!(counters.day(tuesday).portraits, 1);
        assert_eq!(counters.day(tuesday).forecasts, 1);
        assert_eq!(counters.lifetime.total_readings(), 3);
    }

    #[test]
    fn display_name_joins_available_fragments() {
        let full = UserIdentity {
            id: 1,
            username: Some("jd".to_owned()),
            first_name: Some("Jane".to_owned()),
            last_name: Some("Doe".to_owned()),
        };
        assert_eq!(full.display_name(), "Jane Doe");

        let bare = UserIdentity { id: 2, ..UserIdentity::default() };
        assert_eq!(bare.display_name(), "dear friend");
    }
}
