//! Session vote ledger
//!
//! Remembers which prompts this anonymous session voted on, for a fixed
//! cooldown. Expired entries are dropped when read; nothing sweeps them
//! in the background. The whole ledger is written back on every change.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use ulid::Ulid;

use crate::data::{LocalStore, SESSION_ID_KEY, SESSION_VOTES_KEY, VoteType, load_json, save_json};

/// Persisted ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVote {
    pub has_liked: bool,
    pub has_disliked: bool,
    /// Unix epoch milliseconds of the vote
    pub timestamp: i64,
}

/// Vote flags for one prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteStatus {
    pub has_liked: bool,
    pub has_disliked: bool,
}

impl VoteStatus {
    pub fn has_any(&self) -> bool {
        self.has_liked || self.has_disliked
    }
}

/// Time-boxed, locally persisted record of this session's votes
pub struct SessionVoteLedger {
    store: Arc<dyn LocalStore>,
    cooldown_ms: i64,
    votes: Mutex<HashMap<String, SessionVote>>,
}

impl SessionVoteLedger {
    /// Rehydrate the ledger; a missing or corrupt blob starts empty
    pub fn load(store: Arc<dyn LocalStore>, cooldown: Duration) -> Self {
        let votes: HashMap<String, SessionVote> =
            load_json(store.as_ref(), SESSION_VOTES_KEY).unwrap_or_default();
        tracing::debug!(entries = votes.len(), "Session vote ledger loaded");

        Self {
            store,
            cooldown_ms: i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX),
            votes: Mutex::new(votes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionVote>> {
        self.votes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, votes: &HashMap<String, SessionVote>) {
        save_json(self.store.as_ref(), SESSION_VOTES_KEY, votes);
    }

    fn is_expired(&self, vote: &SessionVote, now_ms: i64) -> bool {
        now_ms.saturating_sub(vote.timestamp) > self.cooldown_ms
    }

    pub fn has_voted(&self, prompt_id: &str) -> VoteStatus {
        self.has_voted_at(prompt_id, Utc::now().timestamp_millis())
    }

    /// Vote flags as seen at `now_ms`, dropping the entry if it expired
    pub fn has_voted_at(&self, prompt_id: &str, now_ms: i64) -> VoteStatus {
        let mut votes = self.lock();
        let Some(vote) = votes.get(prompt_id).copied() else {
            return VoteStatus::default();
        };

        if self.is_expired(&vote, now_ms) {
            votes.remove(prompt_id);
            self.persist(&votes);
            tracing::debug!(prompt_id, "Session vote expired");
            return VoteStatus::default();
        }

        VoteStatus {
            has_liked: vote.has_liked,
            has_disliked: vote.has_disliked,
        }
    }

    pub fn can_vote(&self, prompt_id: &str) -> bool {
        self.can_vote_at(prompt_id, Utc::now().timestamp_millis())
    }

    pub fn can_vote_at(&self, prompt_id: &str, now_ms: i64) -> bool {
        !self.has_voted_at(prompt_id, now_ms).has_any()
    }

    pub fn record_vote(&self, prompt_id: &str, vote: VoteType) {
        self.record_vote_at(prompt_id, vote, Utc::now().timestamp_millis());
    }

    /// Set exactly one flag for `prompt_id`, replacing any previous vote
    pub fn record_vote_at(&self, prompt_id: &str, vote: VoteType, now_ms: i64) {
        let mut votes = self.lock();
        votes.insert(
            prompt_id.to_string(),
            SessionVote {
                has_liked: vote == VoteType::Like,
                has_disliked: vote == VoteType::Dislike,
                timestamp: now_ms,
            },
        );
        self.persist(&votes);
    }

    pub fn clear_votes(&self) {
        self.lock().clear();
        if let Err(error) = self.store.remove(SESSION_VOTES_KEY) {
            tracing::warn!(%error, "Failed to remove session votes");
        }
    }

    /// Entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Anonymous session id, created and persisted on first use
pub fn load_or_create_session_id(store: &dyn LocalStore) -> String {
    match store.get(SESSION_ID_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => return existing.trim().to_string(),
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "Session id unreadable, creating a new one"),
    }

    let session_id = Ulid::new().to_string();
    if let Err(error) = store.set(SESSION_ID_KEY, &session_id) {
        tracing::warn!(%error, "Failed to persist session id");
    }
    tracing::info!(%session_id, "Created anonymous session");
    session_id
}
