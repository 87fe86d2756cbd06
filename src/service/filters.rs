//! Feed filter state
//!
//! Shallow-merge updates over `FilterState`, persisted on every change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data::{
    AiModel, Difficulty, FILTERS_KEY, FilterState, LocalStore, SortOption, load_json, save_json,
};

/// Partial filter update; `None` leaves a field untouched.
///
/// Optional fields take `Some(None)` to clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<SortOption>,
    pub difficulty: Option<Option<Difficulty>>,
    pub model: Option<Option<AiModel>>,
    pub verified: Option<Option<bool>>,
}

impl FilterPatch {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn sort_by(sort_by: SortOption) -> Self {
        Self {
            sort_by: Some(sort_by),
            ..Self::default()
        }
    }

    /// Merge into `state`
    pub fn apply_to(self, state: &mut FilterState) {
        if let Some(category) = self.category {
            state.category = category;
        }
        if let Some(search) = self.search {
            state.search = search;
        }
        if let Some(sort_by) = self.sort_by {
            state.sort_by = sort_by;
        }
        if let Some(difficulty) = self.difficulty {
            state.difficulty = difficulty;
        }
        if let Some(model) = self.model {
            state.model = model;
        }
        if let Some(verified) = self.verified {
            state.verified = verified;
        }
    }
}

/// Current filters plus their local persistence
pub struct FilterStore {
    store: Arc<dyn LocalStore>,
    state: Mutex<FilterState>,
}

impl FilterStore {
    /// Restore the last saved filters, or defaults
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let state = load_json(store.as_ref(), FILTERS_KEY).unwrap_or_default();
        Self {
            store,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FilterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> FilterState {
        self.lock().clone()
    }

    /// Merge a partial update; returns the new state
    pub fn set_filters(&self, patch: FilterPatch) -> FilterState {
        self.update(|state| patch.apply_to(state))
    }

    /// Apply an updater to the current state; returns the new state
    pub fn update<F>(&self, updater: F) -> FilterState
    where
        F: FnOnce(&mut FilterState),
    {
        let mut state = self.lock();
        updater(&mut state);
        save_json(self.store.as_ref(), FILTERS_KEY, &*state);
        tracing::debug!(filters = ?*state, "Filters updated");
        state.clone()
    }

    pub fn clear_all_filters(&self) -> FilterState {
        self.update(|state| *state = FilterState::default())
    }

    /// Whether any field differs from its default
    pub fn has_active_filters(&self) -> bool {
        *self.lock() != FilterState::default()
    }
}
