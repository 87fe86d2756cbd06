//! Per-prompt action tracker
//!
//! Runs counter actions (like, dislike, copy, use, server vote) and keeps
//! the set of in-flight actions per prompt id. A pair is marked loading
//! for exactly as long as its future runs; empty sets are pruned.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clipboard::Clipboard;
use crate::data::{CounterColumn, PromptPatch, VoteReceipt, VoteType};
use crate::error::AppError;
use crate::gateway::CounterGateway;
use crate::metrics::ACTIONS_TOTAL;

/// Named action on a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptAction {
    Like,
    Dislike,
    Copy,
    Use,
    /// Server-side rate-limited vote
    Vote,
}

impl PromptAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Copy => "copy",
            Self::Use => "use",
            Self::Vote => "vote",
        }
    }
}

impl fmt::Display for PromptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives `(prompt_id, patch)` after a successful action
pub type UpdateCallback = Arc<dyn Fn(&str, &PromptPatch) + Send + Sync>;

type LoadingMap = Arc<Mutex<HashMap<String, HashSet<PromptAction>>>>;

fn lock_map(map: &LoadingMap) -> MutexGuard<'_, HashMap<String, HashSet<PromptAction>>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears one loading mark when dropped, whatever the action's outcome
pub(crate) struct LoadingGuard {
    loading: LoadingMap,
    entity_id: String,
    action: PromptAction,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut loading = lock_map(&self.loading);
        if let Some(actions) = loading.get_mut(&self.entity_id) {
            actions.remove(&self.action);
            if actions.is_empty() {
                loading.remove(&self.entity_id);
            }
        }
    }
}

/// Tracks and executes per-prompt actions
#[derive(Clone)]
pub struct ActionTracker {
    counters: Arc<dyn CounterGateway>,
    clipboard: Arc<dyn Clipboard>,
    loading: LoadingMap,
    on_update: Option<UpdateCallback>,
}

impl ActionTracker {
    pub fn new(counters: Arc<dyn CounterGateway>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            counters,
            clipboard,
            loading: Arc::new(Mutex::new(HashMap::new())),
            on_update: None,
        }
    }

    /// Install the callback that merges new counter values into caller state
    pub fn with_on_update<F>(mut self, on_update: F) -> Self
    where
        F: Fn(&str, &PromptPatch) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(on_update));
        self
    }

    pub fn is_loading(&self, entity_id: &str, action: PromptAction) -> bool {
        lock_map(&self.loading)
            .get(entity_id)
            .is_some_and(|actions| actions.contains(&action))
    }

    /// In-flight actions for a prompt, in no particular order
    pub fn loading_actions(&self, entity_id: &str) -> Vec<PromptAction> {
        lock_map(&self.loading)
            .get(entity_id)
            .map(|actions| actions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of prompts with at least one in-flight action
    pub fn tracked_entities(&self) -> usize {
        lock_map(&self.loading).len()
    }

    /// Mark `(entity_id, action)` loading until the guard drops.
    ///
    /// Fails with `ActionInFlight` when the pair is already loading.
    pub(crate) fn begin(
        &self,
        entity_id: &str,
        action: PromptAction,
    ) -> Result<LoadingGuard, AppError> {
        let mut loading = lock_map(&self.loading);
        let inserted = loading
            .entry(entity_id.to_string())
            .or_default()
            .insert(action);
        if !inserted {
            ACTIONS_TOTAL
                .with_label_values(&[action.as_str(), "rejected"])
                .inc();
            return Err(AppError::ActionInFlight {
                entity_id: entity_id.to_string(),
                action: action.as_str().to_string(),
            });
        }

        Ok(LoadingGuard {
            loading: self.loading.clone(),
            entity_id: entity_id.to_string(),
            action,
        })
    }

    fn notify(&self, entity_id: &str, patch: &PromptPatch) {
        if let Some(on_update) = &self.on_update {
            on_update(entity_id, patch);
        }
    }

    fn finish<T>(action: PromptAction, entity_id: &str, result: &Result<T, AppError>) {
        let outcome = if result.is_ok() { "success" } else { "failure" };
        ACTIONS_TOTAL
            .with_label_values(&[action.as_str(), outcome])
            .inc();
        if let Err(error) = result {
            tracing::warn!(prompt_id = entity_id, action = action.as_str(), %error, "Action failed");
        }
    }

    async fn increment(
        &self,
        entity_id: &str,
        action: PromptAction,
        column: CounterColumn,
        current: i64,
    ) -> Result<i64, AppError> {
        let new_value = match self
            .counters
            .increment_counter(entity_id, column, current)
            .await?
        {
            Some(value) => value,
            None => {
                tracing::debug!(
                    prompt_id = entity_id,
                    column = column.column(),
                    "Increment response carried no value, counting locally"
                );
                current + 1
            }
        };

        self.notify(entity_id, &column.patch(new_value));
        tracing::debug!(
            prompt_id = entity_id,
            action = action.as_str(),
            new_value,
            "Counter incremented"
        );
        Ok(new_value)
    }

    async fn run_increment(
        &self,
        entity_id: &str,
        action: PromptAction,
        column: CounterColumn,
        current: i64,
    ) -> Result<i64, AppError> {
        let guard = self.begin(entity_id, action)?;
        self.increment_claimed(&guard, column, current).await
    }

    /// Increment for the pair a caller already holds through `begin`
    pub(crate) async fn increment_claimed(
        &self,
        guard: &LoadingGuard,
        column: CounterColumn,
        current: i64,
    ) -> Result<i64, AppError> {
        let result = self
            .increment(&guard.entity_id, guard.action, column, current)
            .await;
        Self::finish(guard.action, &guard.entity_id, &result);
        result
    }

    /// Increment likes; returns the new like count
    pub async fn like(&self, entity_id: &str, current_likes: i64) -> Result<i64, AppError> {
        self.run_increment(entity_id, PromptAction::Like, CounterColumn::Likes, current_likes)
            .await
    }

    /// Increment dislikes; returns the new dislike count
    pub async fn dislike(&self, entity_id: &str, current_dislikes: i64) -> Result<i64, AppError> {
        self.run_increment(
            entity_id,
            PromptAction::Dislike,
            CounterColumn::Dislikes,
            current_dislikes,
        )
        .await
    }

    /// Count a use without touching the clipboard
    pub async fn record_use(&self, entity_id: &str, current_uses: i64) -> Result<i64, AppError> {
        self.run_increment(entity_id, PromptAction::Use, CounterColumn::Uses, current_uses)
            .await
    }

    /// Copy prompt text, then count a use.
    ///
    /// The counter is left alone when the clipboard write fails.
    pub async fn copy(
        &self,
        entity_id: &str,
        content: &str,
        current_uses: i64,
    ) -> Result<i64, AppError> {
        let action = PromptAction::Copy;
        let _guard = self.begin(entity_id, action)?;

        let result = match self.clipboard.write_text(content).await {
            Ok(()) => {
                self.increment(entity_id, action, CounterColumn::Uses, current_uses)
                    .await
            }
            Err(error) => Err(error),
        };
        Self::finish(action, entity_id, &result);
        result
    }

    /// Vote through the backend's rate-limited procedure.
    ///
    /// A receipt with `success = false` is returned as `RateLimited`.
    pub async fn rate_limited_vote(
        &self,
        entity_id: &str,
        session_id: &str,
        vote: VoteType,
    ) -> Result<VoteReceipt, AppError> {
        let action = PromptAction::Vote;
        let _guard = self.begin(entity_id, action)?;

        let result = match self
            .counters
            .rate_limited_vote(entity_id, session_id, vote)
            .await
        {
            Ok(receipt) if receipt.success => {
                let patch = receipt.patch();
                if !patch.is_empty() {
                    self.notify(entity_id, &patch);
                }
                Ok(receipt)
            }
            Ok(receipt) => Err(AppError::RateLimited(
                receipt
                    .message
                    .unwrap_or_else(|| "vote rejected".to_string()),
            )),
            Err(error) => Err(error),
        };
        Self::finish(action, entity_id, &result);
        result
    }
}
