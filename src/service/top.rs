//! Top prompts view
//!
//! Ids of the most used prompts, filled by a one-shot query and refreshed
//! on demand. Handed to whoever needs the "top" badge.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::data::PromptRank;
use crate::error::AppError;
use crate::gateway::PromptSource;

pub struct TopPromptsView {
    source: Arc<dyn PromptSource>,
    limit: usize,
    ranks: RwLock<Vec<PromptRank>>,
}

impl TopPromptsView {
    pub fn new(source: Arc<dyn PromptSource>, limit: usize) -> Self {
        Self {
            source,
            limit,
            ranks: RwLock::new(Vec::new()),
        }
    }

    /// Re-run the ranking query; the previous ranking is kept on failure
    pub async fn refresh(&self) -> Result<usize, AppError> {
        let ranks = self.source.fetch_top_prompts(self.limit).await?;
        let count = ranks.len();
        *self.ranks.write().unwrap_or_else(PoisonError::into_inner) = ranks;
        tracing::debug!(count, "Top prompts refreshed");
        Ok(count)
    }

    pub fn is_top(&self, prompt_id: &str) -> bool {
        self.ranks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|rank| rank.id == prompt_id)
    }

    /// Ranked ids, best first
    pub fn ids(&self) -> Vec<String> {
        self.ranks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|rank| rank.id.clone())
            .collect()
    }

    pub fn id_set(&self) -> HashSet<String> {
        self.ids().into_iter().collect()
    }
}
