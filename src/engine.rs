//! # Dashboard Engine
//!
//! Stateful holder for the record set a page is currently showing.
//!
//! The engine keeps:
//! - The fetched activity records (replaced wholesale on every re-fetch)
//! - Date groups, computed lazily
//! - The participant directory, computed lazily
//! - A cumulative accumulator that follows the cursor
//!
//! Derived state is tracked with dirty flags and rebuilt on first use after
//! [`DashboardEngine::load`].

use log::{debug, info};

use crate::cumulative::{CumulativeAccumulator, CumulativeGraph};
use crate::grouping::{group_by_date, index_of_date, merge_activities, DateGroup, MergedActivity};
use crate::participants::ParticipantDirectory;
use crate::{ActivityRecord, Result};

// ============================================================================
// Dashboard Engine
// ============================================================================

/// Records plus everything derived from them.
pub struct DashboardEngine {
    // Core state
    records: Vec<ActivityRecord>,
    groups: Vec<DateGroup>,
    directory: ParticipantDirectory,
    accumulator: CumulativeAccumulator,

    // Dirty tracking
    groups_dirty: bool,
    directory_dirty: bool,
}

impl DashboardEngine {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            groups: Vec::new(),
            directory: ParticipantDirectory::new(),
            accumulator: CumulativeAccumulator::new(),
            groups_dirty: false,
            directory_dirty: false,
        }
    }

    /// Engine preloaded with `records`.
    pub fn with_records(records: Vec<ActivityRecord>) -> Self {
        let mut engine = Self::new();
        engine.load(records);
        engine
    }

    // ========================================================================
    // Record Management
    // ========================================================================

    /// Replace the record set. All derived state is invalidated.
    pub fn load(&mut self, records: Vec<ActivityRecord>) {
        info!("[DashboardEngine] Loaded {} records", records.len());
        self.records = records;
        self.groups.clear();
        self.accumulator.reset();
        self.groups_dirty = true;
        self.directory_dirty = true;
    }

    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    fn ensure_groups(&mut self) -> Result<()> {
        if !self.groups_dirty {
            return Ok(());
        }
        self.groups = group_by_date(&self.records)?;
        self.accumulator.reset();
        self.groups_dirty = false;
        debug!("[DashboardEngine] Regrouped into {} dates", self.groups.len());
        Ok(())
    }

    /// Date groups in calendar order.
    pub fn groups(&mut self) -> Result<&[DateGroup]> {
        self.ensure_groups()?;
        Ok(&self.groups)
    }

    /// Ordered date strings, as the transport consumes them.
    pub fn dates(&mut self) -> Result<Vec<String>> {
        Ok(self.groups()?.iter().map(|g| g.date.clone()).collect())
    }

    pub fn index_of(&mut self, date: &str) -> Result<Option<usize>> {
        Ok(index_of_date(self.groups()?, date))
    }

    /// Activities recorded on `date`; empty when the date has none.
    pub fn activities_on(&mut self, date: &str) -> Result<&[ActivityRecord]> {
        self.ensure_groups()?;
        Ok(self
            .groups
            .iter()
            .find(|g| g.date == date)
            .map(|g| g.activities.as_slice())
            .unwrap_or(&[]))
    }

    /// SUM aggregate for `date`.
    pub fn merged_on(&mut self, date: &str) -> Result<MergedActivity> {
        Ok(merge_activities(self.activities_on(date)?))
    }

    // ========================================================================
    // Participants
    // ========================================================================

    pub fn directory(&mut self) -> &ParticipantDirectory {
        if self.directory_dirty {
            self.directory = ParticipantDirectory::from_records(&self.records);
            self.directory_dirty = false;
        }
        &self.directory
    }

    // ========================================================================
    // Cumulative
    // ========================================================================

    /// Cumulative graph over `groups[0..=index]`.
    pub fn cumulative_at(&mut self, index: usize) -> Result<&CumulativeGraph> {
        self.ensure_groups()?;
        Ok(self.accumulator.seek(&self.groups, index))
    }

    /// Cumulative graph up to and including `date`. A date outside the
    /// range yields an empty graph.
    pub fn cumulative_through(&mut self, date: &str) -> Result<CumulativeGraph> {
        match self.index_of(date)? {
            Some(index) => Ok(self.cumulative_at(index)?.clone()),
            None => Ok(CumulativeGraph::new()),
        }
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&mut self) -> Result<EngineStats> {
        self.ensure_groups()?;
        let participant_count = self.directory().len() as u32;

        Ok(EngineStats {
            record_count: self.records.len() as u32,
            date_count: self.groups.len() as u32,
            participant_count,
            folded_dates: self.accumulator.folded() as u32,
        })
    }
}

impl Default for DashboardEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub record_count: u32,
    pub date_count: u32,
    pub participant_count: u32,
    pub folded_dates: u32,
}

// ============================================================================
// Tests
// ============================================================================
