//! Shared query and playback state.
//!
//! One [`QueryStore`] holds the committed query, the draft the form is
//! editing, the playback cursor and the play flag. Pages receive a cloned
//! [`QueryHandle`] and go through it for every read and write, so every
//! view on a page sees the same date.

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::grouping::DateGroup;

/// Parameters sent to `/unified-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub start_date: String,
    pub end_date: String,
    /// Empty means every activity type
    pub activity_type: String,
    pub cluster: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            start_date: "2023-07-01".to_string(),
            end_date: "2023-07-31".to_string(),
            activity_type: String::new(),
            cluster: "Philadelphia Cluster".to_string(),
        }
    }
}

impl QueryParams {
    /// Copy of these params with `patch` merged in.
    pub fn merged(&self, patch: &QueryPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }

    /// Merge `patch` in place. Absent fields are left alone.
    pub fn apply(&mut self, patch: &QueryPatch) {
        if let Some(v) = &patch.start_date {
            self.start_date = v.clone();
        }
        if let Some(v) = &patch.end_date {
            self.end_date = v.clone();
        }
        if let Some(v) = &patch.activity_type {
            self.activity_type = v.clone();
        }
        if let Some(v) = &patch.cluster {
            self.cluster = v.clone();
        }
    }

    /// Key/value pairs for the request URL, in a fixed order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start_date", self.start_date.clone()),
            ("end_date", self.end_date.clone()),
            ("activity_type", self.activity_type.clone()),
            ("cluster", self.cluster.clone()),
        ]
    }
}

/// Partial update for [`QueryParams`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPatch {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub activity_type: Option<String>,
    pub cluster: Option<String>,
}

impl QueryPatch {
    pub fn start_date(mut self, value: &str) -> Self {
        self.start_date = Some(value.to_string());
        self
    }

    pub fn end_date(mut self, value: &str) -> Self {
        self.end_date = Some(value.to_string());
        self
    }

    pub fn activity_type(mut self, value: &str) -> Self {
        self.activity_type = Some(value.to_string());
        self
    }

    pub fn cluster(mut self, value: &str) -> Self {
        self.cluster = Some(value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &QueryPatch::default()
    }
}

/// Query, draft, cursor and play flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryStore {
    /// Committed params; what the pages fetch with
    pub query: QueryParams,
    /// Draft params bound to the form inputs
    pub input: QueryParams,
    /// Date currently shown by every view
    pub current_timestep: Option<String>,
    pub is_playing: bool,
}

impl QueryStore {
    /// Store whose committed and draft params both start at `query`.
    pub fn new(query: QueryParams) -> Self {
        Self {
            input: query.clone(),
            query,
            current_timestep: None,
            is_playing: false,
        }
    }

    /// Merge into the committed params. A new start date moves the cursor
    /// there immediately, before any fetch completes.
    pub fn update_query_params(&mut self, patch: &QueryPatch) {
        self.query.apply(patch);
        if let Some(start) = &patch.start_date {
            self.current_timestep = Some(start.clone());
        }
        debug!("[QueryStore] Query now {:?}", self.query);
    }

    /// Merge into the draft only.
    pub fn update_input_params(&mut self, patch: &QueryPatch) {
        self.input.apply(patch);
    }

    pub fn update_current_timestep(&mut self, date: Option<String>) {
        self.current_timestep = date;
    }

    /// Replace the cursor with a value computed from the current one.
    pub fn update_current_timestep_with<F>(&mut self, f: F)
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        self.current_timestep = f(self.current_timestep.as_deref());
    }

    pub fn toggle_playback(&mut self) {
        self.is_playing = !self.is_playing;
    }

    /// Commit the draft as the query and return it for the refetch.
    pub fn submit_inputs(&mut self) -> QueryParams {
        let patch = QueryPatch {
            start_date: Some(self.input.start_date.clone()),
            end_date: Some(self.input.end_date.clone()),
            activity_type: Some(self.input.activity_type.clone()),
            cluster: Some(self.input.cluster.clone()),
        };
        self.update_query_params(&patch);
        self.query.clone()
    }

    /// Keep the cursor on a date the grouped set contains.
    ///
    /// An empty set clears the cursor and stops playback; a cursor outside
    /// the set moves to the first date. Returns whether anything changed.
    pub fn sync_with_groups(&mut self, groups: &[DateGroup]) -> bool {
        let Some(first) = groups.first() else {
            let changed = self.current_timestep.is_some() || self.is_playing;
            self.current_timestep = None;
            self.is_playing = false;
            return changed;
        };

        let present = self
            .current_timestep
            .as_deref()
            .is_some_and(|date| groups.iter().any(|g| g.date == date));
        if present {
            return false;
        }

        debug!(
            "[QueryStore] Cursor {:?} not in range, moving to {}",
            self.current_timestep, first.date
        );
        self.current_timestep = Some(first.date.clone());
        true
    }
}

/// Cloneable handle to a shared [`QueryStore`].
#[derive(Debug, Clone, Default)]
pub struct QueryHandle {
    inner: Arc<Mutex<QueryStore>>,
}

impl QueryHandle {
    pub fn new(store: QueryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueryStore> {
        // A panicked writer leaves plain data behind; keep using it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut QueryStore) -> R,
    {
        let mut store = self.lock();
        f(&mut store)
    }

    /// Copy of the current store.
    pub fn snapshot(&self) -> QueryStore {
        self.lock().clone()
    }

    pub fn query(&self) -> QueryParams {
        self.lock().query.clone()
    }

    pub fn current_timestep(&self) -> Option<String> {
        self.lock().current_timestep.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().is_playing
    }

    pub fn update_query_params(&self, patch: &QueryPatch) {
        self.with(|s| s.update_query_params(patch));
    }

    pub fn update_input_params(&self, patch: &QueryPatch) {
        self.with(|s| s.update_input_params(patch));
    }

    pub fn update_current_timestep(&self, date: Option<String>) {
        self.with(|s| s.update_current_timestep(date));
    }

    pub fn update_current_timestep_with<F>(&self, f: F)
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        self.with(|s| s.update_current_timestep_with(f));
    }

    pub fn toggle_playback(&self) {
        self.with(|s| s.toggle_playback());
    }

    pub fn submit_inputs(&self) -> QueryParams {
        self.with(|s| s.submit_inputs())
    }

    pub fn sync_with_groups(&self, groups: &[DateGroup]) -> bool {
        self.with(|s| s.sync_with_groups(groups))
    }

    /// Whether two handles share one store.
    pub fn same_store(&self, other: &QueryHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
