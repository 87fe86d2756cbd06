//! Prompt feed
//!
//! Wires the paginated query, action tracker, vote ledger and filters
//! together. Filter changes re-query from offset 0; vote and copy results
//! are merged into the loaded pages without a refetch.

use async_trait::async_trait;
use std::sync::Arc;

use super::actions::{ActionTracker, PromptAction};
use super::filters::{FilterPatch, FilterStore};
use super::pagination::{FetchOutcome, PageSnapshot, PageSource, PaginatedQuery};
use super::votes::SessionVoteLedger;
use crate::clipboard::Clipboard;
use crate::data::{CounterColumn, FilterState, Prompt, VoteReceipt, VoteType};
use crate::error::AppError;
use crate::gateway::{CounterGateway, PageRange, PromptSource};

/// Prompt pages read through the gateway
pub struct PromptPages {
    source: Arc<dyn PromptSource>,
}

impl PromptPages {
    pub fn new(source: Arc<dyn PromptSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageSource for PromptPages {
    type Item = Prompt;
    type Params = FilterState;

    async fn fetch_page(
        &self,
        params: &FilterState,
        range: PageRange,
    ) -> Result<Vec<Prompt>, AppError> {
        self.source.fetch_prompts(params, range).await
    }
}

/// Result of a like/dislike request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote counted; carries the new counter value
    Counted(i64),
    /// This session already cast the same vote within the cooldown
    AlreadyVoted,
}

/// Filtered, paginated prompt feed with vote and copy actions
pub struct PromptFeed {
    query: Arc<PaginatedQuery<PromptPages>>,
    tracker: ActionTracker,
    ledger: Arc<SessionVoteLedger>,
    filters: Arc<FilterStore>,
    session_id: String,
}

impl PromptFeed {
    /// Build a feed over the current filters. Nothing is fetched until
    /// `refresh` is called.
    pub fn new(
        source: Arc<dyn PromptSource>,
        counters: Arc<dyn CounterGateway>,
        clipboard: Arc<dyn Clipboard>,
        ledger: Arc<SessionVoteLedger>,
        filters: Arc<FilterStore>,
        session_id: impl Into<String>,
        page_size: usize,
    ) -> Self {
        let query = Arc::new(PaginatedQuery::new(
            PromptPages::new(source),
            filters.current(),
            page_size,
        ));

        let pages = query.clone();
        let tracker = ActionTracker::new(counters, clipboard).with_on_update(move |id, patch| {
            pages.set_items(|items| {
                if let Some(prompt) = items.iter_mut().find(|prompt| prompt.id == id) {
                    prompt.apply(patch);
                }
            });
        });

        Self {
            query,
            tracker,
            ledger,
            filters,
            session_id: session_id.into(),
        }
    }

    pub fn items(&self) -> Vec<Prompt> {
        self.query.items()
    }

    pub fn snapshot(&self) -> PageSnapshot<Prompt> {
        self.query.snapshot()
    }

    pub fn query(&self) -> &PaginatedQuery<PromptPages> {
        &self.query
    }

    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    pub fn ledger(&self) -> &SessionVoteLedger {
        &self.ledger
    }

    pub fn filters(&self) -> FilterState {
        self.filters.current()
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.has_active_filters()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Loaded prompt by id
    pub fn prompt(&self, id: &str) -> Option<Prompt> {
        self.query
            .items()
            .into_iter()
            .find(|prompt| prompt.id == id)
    }

    pub fn is_loading(&self, id: &str, action: PromptAction) -> bool {
        self.tracker.is_loading(id, action)
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.query.refresh().await
    }

    pub async fn load_more(&self) -> FetchOutcome {
        self.query.load_more().await
    }

    /// Merge a filter update and re-query when it changed anything
    pub async fn apply_filters(&self, patch: FilterPatch) -> FetchOutcome {
        let filters = self.filters.set_filters(patch);
        self.query.set_params(filters).await
    }

    pub async fn clear_filters(&self) -> FetchOutcome {
        let filters = self.filters.clear_all_filters();
        self.query.set_params(filters).await
    }

    fn loaded(&self, id: &str) -> Result<Prompt, AppError> {
        self.prompt(id).ok_or(AppError::NotFound)
    }

    fn ensure_idle(&self, id: &str, action: PromptAction) -> Result<(), AppError> {
        if self.tracker.is_loading(id, action) {
            return Err(AppError::ActionInFlight {
                entity_id: id.to_string(),
                action: action.as_str().to_string(),
            });
        }
        Ok(())
    }

    pub async fn like(&self, id: &str) -> Result<VoteOutcome, AppError> {
        self.vote(id, VoteType::Like).await
    }

    pub async fn dislike(&self, id: &str) -> Result<VoteOutcome, AppError> {
        self.vote(id, VoteType::Dislike).await
    }

    /// Count a like or dislike for this session.
    ///
    /// The loading mark is held from before the ledger check until the vote
    /// is recorded, so a concurrent call for the same pair fails with
    /// `ActionInFlight` and never touches the counters. Switching sides
    /// first takes one off the opposite counter locally (never below zero).
    /// The vote is recorded only after the increment succeeds; on failure
    /// the local compensation is left for the caller to revert.
    async fn vote(&self, id: &str, vote: VoteType) -> Result<VoteOutcome, AppError> {
        let (action, column) = match vote {
            VoteType::Like => (PromptAction::Like, CounterColumn::Likes),
            VoteType::Dislike => (PromptAction::Dislike, CounterColumn::Dislikes),
        };
        let guard = self.tracker.begin(id, action)?;

        let status = self.ledger.has_voted(id);
        let (same, opposite) = match vote {
            VoteType::Like => (status.has_liked, status.has_disliked),
            VoteType::Dislike => (status.has_disliked, status.has_liked),
        };
        if same {
            tracing::debug!(prompt_id = id, vote = vote.as_str(), "Already voted this session");
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let prompt = self.loaded(id)?;
        if opposite {
            self.query.set_items(|items| {
                if let Some(prompt) = items.iter_mut().find(|prompt| prompt.id == id) {
                    match vote {
                        VoteType::Like => {
                            prompt.total_dislikes = (prompt.total_dislikes - 1).max(0)
                        }
                        VoteType::Dislike => prompt.total_likes = (prompt.total_likes - 1).max(0),
                    }
                }
            });
        }

        let current = match vote {
            VoteType::Like => prompt.total_likes,
            VoteType::Dislike => prompt.total_dislikes,
        };
        let new_value = self
            .tracker
            .increment_claimed(&guard, column, current)
            .await?;
        self.ledger.record_vote(id, vote);
        drop(guard);

        tracing::info!(prompt_id = id, vote = vote.as_str(), new_value, "Vote counted");
        Ok(VoteOutcome::Counted(new_value))
    }

    /// Copy a loaded prompt's text and count a use
    pub async fn copy(&self, id: &str) -> Result<i64, AppError> {
        self.ensure_idle(id, PromptAction::Copy)?;
        let prompt = self.loaded(id)?;
        self.tracker
            .copy(id, &prompt.content, prompt.total_uses)
            .await
    }

    /// Count a use (e.g. opening the prompt in its model) without copying
    pub async fn record_use(&self, id: &str) -> Result<i64, AppError> {
        self.ensure_idle(id, PromptAction::Use)?;
        let prompt = self.loaded(id)?;
        self.tracker.record_use(id, prompt.total_uses).await
    }

    /// Vote through the backend's rate limiter with this session's id.
    ///
    /// A vote this session already cast within the cooldown is refused
    /// locally as `RateLimited`. Otherwise the server decides and its
    /// receipt carries both counters, so no local switch compensation is
    /// applied.
    pub async fn vote_with_rate_limit(
        &self,
        id: &str,
        vote: VoteType,
    ) -> Result<VoteReceipt, AppError> {
        let status = self.ledger.has_voted(id);
        let already = match vote {
            VoteType::Like => status.has_liked,
            VoteType::Dislike => status.has_disliked,
        };
        if already {
            tracing::debug!(prompt_id = id, vote = vote.as_str(), "Already voted this session");
            return Err(AppError::RateLimited(
                "already voted this session".to_string(),
            ));
        }

        let receipt = self
            .tracker
            .rate_limited_vote(id, &self.session_id, vote)
            .await?;
        self.ledger.record_vote(id, vote);
        Ok(receipt)
    }
}
