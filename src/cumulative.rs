//! Cumulative participant and connection graphs.
//!
//! The SUM network view shows everyone who took part in anything from the
//! start of the range up to the cursor, and every pair that ever met,
//! each with a per-activity-kind occurrence count.
//!
//! [`build_cumulative_graph`] folds a whole prefix from scratch.
//! [`CumulativeAccumulator`] keeps the fold between calls and only folds the
//! groups it has not seen yet, so stepping forward costs one day's activities.

use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::grouping::DateGroup;
use crate::{ActivityRecord, ActivityType};

/// Activity kind -> number of occurrences.
pub type TypeCounts = BTreeMap<ActivityType, u32>;

/// Unordered pair of participant IDs, stored with the smaller ID first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionKey {
    pub from: String,
    pub to: String,
}

impl ConnectionKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Participants and connections with per-kind counts, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeGraph {
    participant_order: Vec<String>,
    participants: HashMap<String, TypeCounts>,
    connection_order: Vec<ConnectionKey>,
    connections: HashMap<ConnectionKey, TypeCounts>,
}

impl CumulativeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every activity of a date group.
    pub fn fold_group(&mut self, group: &DateGroup) {
        for activity in &group.activities {
            self.fold_activity(activity);
        }
    }

    /// Count one activity for each participant and each participant pair.
    /// Records whose participant lists disagree in length are skipped.
    pub fn fold_activity(&mut self, activity: &ActivityRecord) {
        if let Err(e) = activity.participants() {
            warn!("[CumulativeGraph] Skipping record: {}", e);
            return;
        }
        let ids = activity.participant_ids();
        let kind = &activity.activity_type;

        for id in &ids {
            if !self.participants.contains_key(*id) {
                self.participant_order.push(id.to_string());
            }
            *self
                .participants
                .entry(id.to_string())
                .or_default()
                .entry(kind.clone())
                .or_insert(0) += 1;
        }

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if ids[i] == ids[j] {
                    continue;
                }
                let key = ConnectionKey::new(ids[i], ids[j]);
                if !self.connections.contains_key(&key) {
                    self.connection_order.push(key.clone());
                }
                *self
                    .connections
                    .entry(key)
                    .or_default()
                    .entry(kind.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Participants in first-seen order with their counts.
    pub fn participants(&self) -> impl Iterator<Item = (&str, &TypeCounts)> {
        self.participant_order
            .iter()
            .filter_map(|id| self.participants.get(id).map(|c| (id.as_str(), c)))
    }

    /// Connections in first-seen order with their counts.
    pub fn connections(&self) -> impl Iterator<Item = (&ConnectionKey, &TypeCounts)> {
        self.connection_order
            .iter()
            .filter_map(|key| self.connections.get(key).map(|c| (key, c)))
    }

    pub fn participant_counts(&self, id: &str) -> Option<&TypeCounts> {
        self.participants.get(id)
    }

    pub fn connection_counts(&self, key: &ConnectionKey) -> Option<&TypeCounts> {
        self.connections.get(key)
    }

    pub fn participant_count(&self) -> usize {
        self.participant_order.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connection_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participant_order.is_empty()
    }
}

/// Fold `groups[0..=upto_index]` into a fresh graph.
///
/// An index past the end folds every group; an empty slice yields an empty
/// graph. Same inputs always give the same graph.
pub fn build_cumulative_graph(groups: &[DateGroup], upto_index: usize) -> CumulativeGraph {
    let mut graph = CumulativeGraph::new();
    let end = upto_index.saturating_add(1).min(groups.len());
    for group in &groups[..end] {
        graph.fold_group(group);
    }
    graph
}

/// Incrementally maintained cumulative graph.
///
/// Moving forward folds only the new groups; moving backwards resets and
/// re-folds. Call [`CumulativeAccumulator::reset`] whenever the grouped set
/// itself changes.
#[derive(Debug, Clone, Default)]
pub struct CumulativeAccumulator {
    graph: CumulativeGraph,
    /// Number of leading groups already folded
    folded: usize,
}

impl CumulativeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything folded so far.
    pub fn reset(&mut self) {
        self.graph = CumulativeGraph::new();
        self.folded = 0;
    }

    /// Number of leading groups currently folded in.
    pub fn folded(&self) -> usize {
        self.folded
    }

    pub fn graph(&self) -> &CumulativeGraph {
        &self.graph
    }

    /// Bring the fold to `groups[0..=index]` and return it.
    pub fn seek(&mut self, groups: &[DateGroup], index: usize) -> &CumulativeGraph {
        let target = index.saturating_add(1).min(groups.len());

        if target < self.folded || self.folded > groups.len() {
            debug!(
                "[CumulativeAccumulator] Rewind from {} to {} groups",
                self.folded, target
            );
            self.reset();
        }

        for group in &groups[self.folded..target] {
            self.graph.fold_group(group);
        }
        self.folded = target;

        &self.graph
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_by_date;

    fn activity(date: &str, kind: &str, ids: &str) -> ActivityRecord {
        let n = ids.split(',').count();
        let mut r = ActivityRecord::new(date, kind, 3);
        r.participant_ids = ids.to_string();
        r.participant_names = ids.to_string();
        r.participant_roles = vec!["Participant"; n].join(",");
        r
    }

    #[test]
    fn test_mismatched_record_skipped() {
        let mut graph = CumulativeGraph::new();
        let mut r = ActivityRecord::new("2023-07-01", "JYG", 3);
        r.participant_ids = "a,b".to_string();
        graph.fold_activity(&r);
        assert!(graph.is_empty());
    }

    fn sample_groups() -> Vec<DateGroup> {
        group_by_date(&[
            activity("2023-07-01", "JYG", "a,b,c"),
            activity("2023-07-01", "Study Circle", "a,b"),
            activity("2023-07-02", "JYG", "c,d"),
            activity("2023-07-03", "Devotional", "b,a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts_per_kind() {
        let groups = sample_groups();
        let graph = build_cumulative_graph(&groups, 0);

        assert_eq!(graph.participant_count(), 3);
        let a = graph.participant_counts("a").unwrap();
        assert_eq!(a.get(&ActivityType::Jyg), Some(&1));
        assert_eq!(a.get(&ActivityType::StudyCircle), Some(&1));

        let ab = graph.connection_counts(&ConnectionKey::new("b", "a")).unwrap();
        assert_eq!(ab.values().sum::<u32>(), 2);
        assert_eq!(graph.connection_count(), 3);
    }

    #[test]
    fn test_prefix_grows() {
        let groups = sample_groups();
        let day1 = build_cumulative_graph(&groups, 0);
        let day3 = build_cumulative_graph(&groups, 2);

        assert!(day1.participant_counts("d").is_none());
        assert!(day3.participant_counts("d").is_some());
        let ab = day3.connection_counts(&ConnectionKey::new("a", "b")).unwrap();
        assert_eq!(ab.get(&ActivityType::Devotional), Some(&1));
    }

    #[test]
    fn test_idempotent() {
        let groups = sample_groups();
        assert_eq!(
            build_cumulative_graph(&groups, 1),
            build_cumulative_graph(&groups, 1)
        );
        assert!(build_cumulative_graph(&[], 5).is_empty());
    }

    #[test]
    fn test_index_past_end_folds_everything() {
        let groups = sample_groups();
        let full = build_cumulative_graph(&groups, groups.len() - 1);
        assert_eq!(build_cumulative_graph(&groups, usize::MAX), full);

        let mut acc = CumulativeAccumulator::new();
        assert_eq!(acc.seek(&groups, usize::MAX), &full);
        assert_eq!(acc.folded(), groups.len());
    }

    #[test]
    fn test_accumulator_matches_full_fold() {
        let groups = sample_groups();
        let mut acc = CumulativeAccumulator::new();

        for index in [0, 1, 2, 0, 2, 1] {
            let graph = acc.seek(&groups, index).clone();
            assert_eq!(graph, build_cumulative_graph(&groups, index));
            assert_eq!(acc.folded(), index + 1);
        }
    }

    #[test]
    fn test_accumulator_reset() {
        let groups = sample_groups();
        let mut acc = CumulativeAccumulator::new();
        acc.seek(&groups, 2);
        acc.reset();
        assert_eq!(acc.folded(), 0);
        assert!(acc.graph().is_empty());
    }

    #[test]
    fn test_connection_key_display() {
        assert_eq!(ConnectionKey::new("p9", "p1").to_string(), "p1-p9");
    }
}
