//! Paginated query engine
//!
//! Accumulates offset-based pages from a `PageSource`. Every reset bumps
//! a generation counter; a response whose generation is no longer current
//! is dropped so a late `load_more` can never leak into a newer result set.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AppError;
use crate::gateway::PageRange;
use crate::metrics::{PAGE_FETCHES_TOTAL, STALE_PAGES_DISCARDED_TOTAL};

/// Something that can serve one window of an ordered result set
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;
    /// Query parameters; a change resets the accumulated pages
    type Params: Clone + PartialEq + Send + Sync + 'static;

    async fn fetch_page(
        &self,
        params: &Self::Params,
        range: PageRange,
    ) -> Result<Vec<Self::Item>, AppError>;
}

/// What happened to a fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page applied to the state
    Applied { fetched: usize },
    /// Not issued: already loading or no more data
    Skipped,
    /// Response arrived after a newer reset and was dropped
    Stale,
    /// Gateway failed; message stored in `error`
    Failed,
}

/// Read-only copy of the engine state
#[derive(Debug, Clone)]
pub struct PageSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
    pub offset: usize,
}

struct PageState<T, P> {
    params: P,
    items: Vec<T>,
    /// Total items fetched for the current generation
    offset: usize,
    has_more: bool,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

#[derive(Clone, Copy)]
enum FetchKind {
    Refresh,
    NextPage,
}

impl FetchKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::NextPage => "next_page",
        }
    }
}

/// Cursor-based accumulating query over a `PageSource`
pub struct PaginatedQuery<S: PageSource> {
    source: S,
    limit: usize,
    state: Mutex<PageState<S::Item, S::Params>>,
}

impl<S: PageSource> PaginatedQuery<S> {
    /// Create an idle query; call `refresh` to load the first page
    ///
    /// # Arguments
    /// * `source` - Page provider
    /// * `params` - Initial query parameters
    /// * `limit` - Page size (clamped to at least 1)
    pub fn new(source: S, params: S::Params, limit: usize) -> Self {
        Self {
            source,
            limit: limit.max(1),
            state: Mutex::new(PageState {
                params,
                items: Vec::new(),
                offset: 0,
                has_more: true,
                loading: false,
                error: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState<S::Item, S::Params>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn offset(&self) -> usize {
        self.lock().offset
    }

    pub fn params(&self) -> S::Params {
        self.lock().params.clone()
    }

    pub fn snapshot(&self) -> PageSnapshot<S::Item> {
        let state = self.lock();
        PageSnapshot {
            items: state.items.clone(),
            loading: state.loading,
            error: state.error.clone(),
            has_more: state.has_more,
            offset: state.offset,
        }
    }

    /// Patch items locally without a network round-trip
    pub fn set_items<F>(&self, update: F)
    where
        F: FnOnce(&mut Vec<S::Item>),
    {
        update(&mut self.lock().items);
    }

    /// Replace the query parameters, refreshing when they changed
    pub async fn set_params(&self, params: S::Params) -> FetchOutcome {
        {
            let mut state = self.lock();
            if state.params == params {
                return FetchOutcome::Skipped;
            }
            state.params = params;
        }
        self.refresh().await
    }

    /// Drop all pages and fetch the first window again
    pub async fn refresh(&self) -> FetchOutcome {
        let (generation, params) = {
            let mut state = self.lock();
            state.generation += 1;
            state.items.clear();
            state.offset = 0;
            state.has_more = true;
            state.loading = true;
            state.error = None;
            (state.generation, state.params.clone())
        };

        let range = PageRange::new(0, self.limit);
        let result = self.source.fetch_page(&params, range).await;
        self.apply(FetchKind::Refresh, generation, result)
    }

    /// Fetch and append the next window, unless loading or exhausted
    pub async fn load_more(&self) -> FetchOutcome {
        let (generation, params, offset) = {
            let mut state = self.lock();
            if state.loading || !state.has_more {
                return FetchOutcome::Skipped;
            }
            state.loading = true;
            state.error = None;
            (state.generation, state.params.clone(), state.offset)
        };

        let range = PageRange::new(offset, self.limit);
        let result = self.source.fetch_page(&params, range).await;
        self.apply(FetchKind::NextPage, generation, result)
    }

    fn apply(
        &self,
        kind: FetchKind,
        generation: u64,
        result: Result<Vec<S::Item>, AppError>,
    ) -> FetchOutcome {
        let mut state = self.lock();
        if state.generation != generation {
            STALE_PAGES_DISCARDED_TOTAL.inc();
            tracing::debug!(
                kind = kind.as_str(),
                response_generation = generation,
                current_generation = state.generation,
                "Discarding stale page response"
            );
            return FetchOutcome::Stale;
        }

        state.loading = false;
        match result {
            Ok(page) => {
                let fetched = page.len();
                match kind {
                    FetchKind::Refresh => state.items = page,
                    FetchKind::NextPage => state.items.extend(page),
                }
                state.offset += fetched;
                state.has_more = fetched == self.limit;
                PAGE_FETCHES_TOTAL
                    .with_label_values(&[kind.as_str(), "applied"])
                    .inc();
                tracing::debug!(
                    kind = kind.as_str(),
                    fetched,
                    offset = state.offset,
                    has_more = state.has_more,
                    "Page applied"
                );
                FetchOutcome::Applied { fetched }
            }
            Err(error) => {
                PAGE_FETCHES_TOTAL
                    .with_label_values(&[kind.as_str(), "failed"])
                    .inc();
                tracing::warn!(kind = kind.as_str(), %error, "Page fetch failed");
                state.error = Some(error.to_string());
                FetchOutcome::Failed
            }
        }
    }
}
