//! Persistent state store for the numera bot.
//!
//! Three whole-document JSON stores live under one data directory:
//! `users.json` (profiles), `history.json` (bounded per-user action logs) and
//! `stats.json` (aggregate counters). Every mutation goes through a single
//! choke point per document: take the document mutex, mutate the in-memory
//! copy, then flush the full document with a write-to-temporary-then-rename
//! replace. A failed flush is logged and swallowed; the in-memory copy stays
//! authoritative for the rest of the process lifetime.

pub mod documents;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use numera_core::history::{ActionRecord, HISTORY_LIMIT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

pub use documents::{
    CountersDocument, FlowCategory, FlowCounts, HistoryDocument, UserIdentity, UserProfile,
    UsersDocument,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not prepare data directory `{path}`: {source}")]
    DataDir { path: PathBuf, source: std::io::Error },
    #[error("could not read document `{path}`: {source}")]
    ReadDocument { path: PathBuf, source: std::io::Error },
    #[error("could not parse document `{path}`: {source}")]
    ParseDocument { path: PathBuf, source: serde_json::Error },
}

/// Whether an inbound sender was already known to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserSeen {
    New,
    Returning,
}

pub struct StateStore {
    users_path: PathBuf,
    history_path: PathBuf,
    counters_path: PathBuf,
    users: Mutex<UsersDocument>,
    histories: Mutex<HistoryDocument>,
    counters: Mutex<CountersDocument>,
}

impl StateStore {
    /// Open the store, reading any existing documents. A missing document is
    /// not an error; it yields the empty default. A document that exists but
    /// cannot be parsed is an error, so a corrupt file is never silently
    /// overwritten with defaults.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|source| StoreError::DataDir { path: data_dir.to_path_buf(), source })?;

        let users_path = data_dir.join("users.json");
        let history_path = data_dir.join("history.json");
        let counters_path = data_dir.join("stats.json");

        Ok(Self {
            users: Mutex::new(load_or_default(&users_path).await?),
            histories: Mutex::new(load_or_default(&history_path).await?),
            counters: Mutex::new(load_or_default(&counters_path).await?),
            users_path,
            history_path,
            counters_path,
        })
    }

    /// Upsert the sender's profile: create it on first contact, refresh
    /// last-seen otherwise. Returns whether the user was new.
    pub async fn record_user_seen(&self, identity: &UserIdentity) -> UserSeen {
        let now = Utc::now();
        let mut doc = self.users.lock().await;

        let seen = match doc.users.get_mut(&identity.id) {
            Some(profile) => {
                profile.last_active = now;
                profile.username = identity.username.clone();
                profile.first_name = identity.first_name.clone();
                profile.last_name = identity.last_name.clone();
                UserSeen::Returning
            }
            None => {
                doc.users.insert(
                    identity.id,
                    UserProfile {
                        username: identity.username.clone(),
                        first_name: identity.first_name.clone(),
                        last_name: identity.last_name.clone(),
                        joined: now,
                        last_active: now,
                        total_requests: 0,
                    },
                );
                UserSeen::New
            }
        };

        flush(&self.users_path, &*doc).await;
        seen
    }

    /// Bump the lifetime request counter on the sender's profile.
    pub async fn bump_requests(&self, user_id: i64) {
        let mut doc = self.users.lock().await;
        if let Some(profile) = doc.users.get_mut(&user_id) {
            profile.total_requests += 1;
            profile.last_active = Utc::now();
        }
        flush(&self.users_path, &*doc).await;
    }

    /// Append one action record to the user's history, evicting the oldest
    /// records beyond the bound of [`HISTORY_LIMIT`].
    pub async fn append_action(&self, user_id: i64, record: ActionRecord) {
        let mut doc = self.histories.lock().await;
        let history = doc.histories.entry(user_id).or_default();
        history.push(record);
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
        flush(&self.history_path, &*doc).await;
    }

    /// Bump one flow category in the lifetime and per-day counters.
    pub async fn increment_counter(&self, category: FlowCategory, day: NaiveDate) {
        let mut doc = self.counters.lock().await;
        doc.increment(category, day);
        flush(&self.counters_path, &*doc).await;
    }

    /// Snapshot of one user's action history, oldest first.
    pub async fn history(&self, user_id: i64) -> Vec<ActionRecord> {
        self.histories.lock().await.histories.get(&user_id).cloned().unwrap_or_default()
    }

    pub async fn profile(&self, user_id: i64) -> Option<UserProfile> {
        self.users.lock().await.users.get(&user_id).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.users.lock().await.users.len()
    }

    /// Snapshot of the counters document, for the stats endpoint and admin
    /// summaries.
    pub async fn counters(&self) -> CountersDocument {
        self.counters.lock().await.clone()
    }
}

async fn load_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw)
            .map_err(|source| StoreError::ParseDocument { path: path.to_path_buf(), source }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StoreError::ReadDocument { path: path.to_path_buf(), source }),
    }
}

/// Persist the full document. Failures are logged and swallowed: the
/// in-memory copy remains authoritative, the mutation may be lost on restart.
async fn flush<T: Serialize>(path: &Path, document: &T) {
    let payload = match serde_json::to_vec_pretty(document) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to serialize document");
            return;
        }
    };

    let tmp_path = path.with_extension("json.tmp");
    if let Err(error) = tokio::fs::write(&tmp_path, &payload).await {
        warn!(path = %path.display(), error = %error, "failed to write document");
        return;
    }
    if let Err(error) = tokio::fs::rename(&tmp_path, path).await {
        warn!(path = %path.display(), error = %error, "failed to replace document");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use numera_core::history::{ActionRecord, ActionTag, ForecastPeriod, HISTORY_LIMIT};
    use tempfile::TempDir;

    use super::{FlowCategory, StateStore, UserIdentity, UserSeen};

    fn identity(id: i64) -> UserIdentity {
        UserIdentity {
            id,
            username: Some(format!("user{id}")),
            first_name: Some("Test".to_owned()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn open_yields_defaults_when_no_documents_exist() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::open(dir.path()).await.expect("open");

        assert_eq!(store.user_count().await, 0);
        assert!(store.history(42).await.is_empty());
        assert_eq!(store.counters().await.lifetime.total_readings(), 0);
    }

    #[tokio::test]
    async fn history_is_bounded_to_the_most_recent_fifty_records() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::open(dir.path()).await.expect("open");

        for index in 0..(HISTORY_LIMIT as i64 + 1) {
            let period =
                if index % 2 == 0 { ForecastPeriod::Week } else { ForecastPeriod::Month };
            store.append_action(7, ActionRecord::new(ActionTag::ForecastGenerated { period })).await;
        }

        let history = store.history(7).await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        // The very first record (index 0, week) was evicted; the second
        // (index 1, month) is now the oldest.
        assert_eq!(
            history.first().map(|record| record.tag),
            Some(ActionTag::ForecastGenerated { period: ForecastPeriod::Month })
        );
        assert_eq!(
            history.last().map(|record| record.tag),
            Some(ActionTag::ForecastGenerated { period: ForecastPeriod::Week })
        );
    }

    #[tokio::test]
    async fn documents_survive_a_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = StateStore::open(dir.path()).await.expect("open");
            assert_eq!(store.record_user_seen(&identity(1)).await, UserSeen::New);
            store.bump_requests(1).await;
            store.append_action(1, ActionRecord::new(ActionTag::PortraitRequested)).await;
            store
                .increment_counter(FlowCategory::Portrait, Utc::now().date_naive())
                .await;
        }

        let reopened = StateStore::open(dir.path()).await.expect("reopen");
        let profile = reopened.profile(1).await.expect("profile persisted");
        assert_eq!(profile.total_requests, 1);
        assert_eq!(reopened.history(1).await.len(), 1);
        assert_eq!(reopened.counters().await.lifetime.portraits, 1);
    }

    #[tokio::test]
    async fn returning_users_keep_their_join_timestamp() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::open(dir.path()).await.expect("open");

        assert_eq!(store.record_user_seen(&identity(5)).await, UserSeen::New);
        let joined = store.profile(5).await.expect("profile").joined;

        assert_eq!(store.record_user_seen(&identity(5)).await, UserSeen::Returning);
        let profile = store.profile(5).await.expect("profile");
        assert_eq!(profile.joined, joined);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_in_memory_view_authoritative() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::open(dir.path()).await.expect("open");
        store.record_user_seen(&identity(9)).await;

        // Drop the backing directory out from under the store; every flush
        // from here on fails, but mutations must still be visible.
        drop(dir);

        store.bump_requests(9).await;
        store.append_action(9, ActionRecord::new(ActionTag::AffirmationRequested)).await;
        store
            .increment_counter(FlowCategory::Affirmation, NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid"))
            .await;

        assert_eq!(store.profile(9).await.expect("profile").total_requests, 1);
        assert_eq!(store.history(9).await.len(), 1);
        assert_eq!(store.counters().await.lifetime.affirmations, 1);
    }

    #[tokio::test]
    async fn open_fails_on_a_corrupt_document_rather_than_wiping_it() {
        let dir = TempDir::new().expect("tempdir");
        tokio::fs::write(dir.path().join("users.json"), b"{not json")
            .await
            .expect("write corrupt file");

        assert!(StateStore::open(dir.path()).await.is_err());
    }
}
