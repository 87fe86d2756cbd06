//! PromptScroll - client core for a prompt gallery backed by a hosted Postgres
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Paginated prompt feed (filters, load more, refresh)      │
//! │  - Per-prompt actions (like, dislike, copy, use)            │
//! │  - Session vote ledger, top prompts, follows, submission    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway Layer                            │
//! │  - PostgREST tables and RPC over reqwest                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Gateway record models                                    │
//! │  - Local JSON blobs (filters, votes, session id)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: Feed, action tracking and vote bookkeeping
//! - `gateway`: Remote data gateway traits and the PostgREST client
//! - `data`: Models and local persisted storage
//! - `classify`: Keyword-based category and tag detection
//! - `clipboard`: Clipboard seam for the copy action
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod classify;
pub mod clipboard;
pub mod config;
pub mod data;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Everything a front end needs, wired from one configuration
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Remote gateway client
    pub gateway: Arc<gateway::RestGateway>,

    /// Local blob storage (filters, votes, session id)
    pub store: Arc<dyn data::LocalStore>,

    /// Persisted feed filters
    pub filters: Arc<service::FilterStore>,

    /// This session's recent votes
    pub ledger: Arc<service::SessionVoteLedger>,

    /// Paginated prompt feed
    pub feed: Arc<service::PromptFeed>,

    /// Most used prompts
    pub top: Arc<service::TopPromptsView>,

    /// Follow relationships for the signed-in user
    pub follows: Arc<service::FollowService>,

    /// Prompt creation
    pub submissions: Arc<service::SubmissionService>,

    /// Anonymous session id used for server-side vote limits
    pub session_id: String,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open local storage
    /// 2. Build the gateway client
    /// 3. Restore filters, votes and session id
    ///
    /// # Errors
    /// Returns error if the storage directory or HTTP client cannot be created
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store = data::FileStore::open(&config.storage.dir)?;
        tracing::info!(dir = %store.dir().display(), "Local storage opened");

        let gateway = gateway::RestGateway::new(&config.gateway)?;
        tracing::info!(rest_url = %gateway.rest_url(), "Gateway client initialized");

        Ok(Self::from_parts(
            config,
            gateway,
            Arc::new(store),
            Arc::new(clipboard::MemoryClipboard::new()),
            None,
        ))
    }

    /// Wire services from already-built parts
    pub fn from_parts(
        config: config::AppConfig,
        gateway: gateway::RestGateway,
        store: Arc<dyn data::LocalStore>,
        clipboard: Arc<dyn clipboard::Clipboard>,
        current_user: Option<String>,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let filters = Arc::new(service::FilterStore::load(store.clone()));
        let ledger = Arc::new(service::SessionVoteLedger::load(
            store.clone(),
            config.votes.cooldown(),
        ));
        let session_id = service::load_or_create_session_id(store.as_ref());

        let feed = service::PromptFeed::new(
            gateway.clone(),
            gateway.clone(),
            clipboard,
            ledger.clone(),
            filters.clone(),
            session_id.clone(),
            config.feed.page_size,
        );
        let top = service::TopPromptsView::new(gateway.clone(), config.feed.top_limit);
        let follows = service::FollowService::new(gateway.clone(), current_user);
        let submissions = service::SubmissionService::new(gateway.clone(), gateway.clone());

        tracing::info!(%session_id, "Application state initialized successfully");

        Self {
            config: Arc::new(config),
            gateway,
            store,
            filters,
            ledger,
            feed: Arc::new(feed),
            top: Arc::new(top),
            follows: Arc::new(follows),
            submissions: Arc::new(submissions),
            session_id,
        }
    }
}
