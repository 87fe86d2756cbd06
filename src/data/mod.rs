//! Data layer module
//!
//! Handles records and local persistence:
//! - Gateway record models (prompts, categories, votes)
//! - Locally persisted client state (filters, session votes)

mod models;
mod store;

pub use models::*;
pub use store::{
    FILTERS_KEY, FileStore, LocalStore, MemoryStore, SESSION_ID_KEY, SESSION_VOTES_KEY,
    load_json, save_json,
};
