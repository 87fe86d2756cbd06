//! Remote data gateway
//!
//! The hosted backend (tables, counters, vote procedure, follows) is
//! reached through the traits below. `RestGateway` implements all of
//! them over the PostgREST HTTP interface; tests substitute mocks.

mod query;
mod rest;

use async_trait::async_trait;

use crate::data::{
    Category, CounterColumn, FilterState, NewPrompt, Prompt, PromptRank, VoteReceipt, VoteType,
};
use crate::error::AppError;

pub use query::{PROMPT_SELECT, order_clause, prompt_query_params, search_pattern};
pub use rest::RestGateway;

/// Half-open index window `[from, to)` into an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub from: usize,
    pub to: usize,
}

impl PageRange {
    /// Window of `limit` items starting at `offset`
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            from: offset,
            to: offset + limit,
        }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read side of the prompt tables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromptSource: Send + Sync {
    /// Filtered, sorted, range-limited prompt read
    async fn fetch_prompts(
        &self,
        filters: &FilterState,
        range: PageRange,
    ) -> Result<Vec<Prompt>, AppError>;

    /// All categories ordered by name
    async fn fetch_categories(&self) -> Result<Vec<Category>, AppError>;

    /// Most used, then most liked, prompts
    async fn fetch_top_prompts(&self, limit: usize) -> Result<Vec<PromptRank>, AppError>;
}

/// Counter updates and the server-side vote procedure
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterGateway: Send + Sync {
    /// Set `column` to `current + 1`.
    ///
    /// Returns the stored value, or `None` when the updated row came back
    /// without it. Updating no row at all is `AppError::NotFound`.
    async fn increment_counter(
        &self,
        prompt_id: &str,
        column: CounterColumn,
        current: i64,
    ) -> Result<Option<i64>, AppError>;

    /// Rate-limited vote enforced by the backend
    async fn rate_limited_vote(
        &self,
        prompt_id: &str,
        session_id: &str,
        vote: VoteType,
    ) -> Result<VoteReceipt, AppError>;
}

/// Write side used by prompt submission
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromptWriter: Send + Sync {
    async fn insert_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, AppError>;

    async fn insert_tags(&self, prompt_id: &str, tags: &[String]) -> Result<(), AppError>;
}

/// Author follow relationships
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowGateway: Send + Sync {
    async fn is_following(&self, follower_id: &str, following_id: &str)
    -> Result<bool, AppError>;

    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError>;

    async fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError>;

    /// Number of users following `user_id`
    async fn count_followers(&self, user_id: &str) -> Result<u64, AppError>;

    /// Number of users `user_id` follows
    async fn count_following(&self, user_id: &str) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_is_half_open() {
        let range = PageRange::new(40, 20);
        assert_eq!(range.from, 40);
        assert_eq!(range.to, 60);
        assert_eq!(range.len(), 20);
        assert!(!range.is_empty());
        assert!(PageRange::new(5, 0).is_empty());
    }
}
