//! Date grouping and SUM aggregation.
//!
//! This module buckets flat activity records into one [`DateGroup`] per
//! distinct `Date` and merges a day's activities into a single
//! [`MergedActivity`] for the SUM views.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::{ActivityRecord, ActivityType, OptionExt, Result};

/// All activities recorded on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    /// The `Date` string exactly as the records carry it
    pub date: String,
    /// Parsed calendar day, used for ordering
    #[serde(skip)]
    pub day: NaiveDate,
    pub activities: Vec<ActivityRecord>,
}

impl AsRef<str> for DateGroup {
    fn as_ref(&self) -> &str {
        &self.date
    }
}

/// Group records by their `Date` string.
///
/// Criteria:
/// 1. The grouping key is exact string equality on `Date`
/// 2. Every record lands in exactly one group, in input order
/// 3. Groups are ordered by parsed calendar date; equal days keep
///    first-seen order
///
/// A record whose date cannot be parsed fails the whole call with
/// [`crate::DashboardError::InvalidDate`] rather than being misplaced on the
/// timeline.
pub fn group_by_date(records: &[ActivityRecord]) -> Result<Vec<DateGroup>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DateGroup> = Vec::new();

    for record in records {
        match index.get(record.date.as_str()) {
            Some(&i) => groups[i].activities.push(record.clone()),
            None => {
                let day = record.parsed_date().ok_or_invalid_date(&record.date)?;
                index.insert(record.date.as_str(), groups.len());
                groups.push(DateGroup {
                    date: record.date.clone(),
                    day,
                    activities: vec![record.clone()],
                });
            }
        }
    }

    // Stable: ties keep first-seen order
    groups.sort_by_key(|g| g.day);

    debug!(
        "[group_by_date] {} records -> {} dates",
        records.len(),
        groups.len()
    );

    Ok(groups)
}

/// Position of a date in a grouped set.
pub fn index_of_date(groups: &[DateGroup], date: &str) -> Option<usize> {
    groups.iter().position(|g| g.date == date)
}

/// Aggregate of every activity on one date (the SUM view).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedActivity {
    /// Activity kinds, one per merged activity, aligned with `activity_sizes`
    pub activities: Vec<ActivityType>,
    /// Distinct action names in first-insertion order
    pub actions: Vec<String>,
    /// Distinct environment items in first-insertion order
    pub environment: Vec<String>,
    pub total_participants: u32,
    pub activity_sizes: Vec<u32>,
    /// For each action, indices into `activities` that reference it
    pub action_sources: Vec<Vec<usize>>,
    /// For each environment item, indices into `activities` that reference it
    pub environment_sources: Vec<Vec<usize>>,
}

impl MergedActivity {
    /// Indices of activities referencing both an action and an environment item.
    pub fn shared_sources(&self, action_index: usize, env_index: usize) -> Vec<usize> {
        let (Some(actions), Some(envs)) = (
            self.action_sources.get(action_index),
            self.environment_sources.get(env_index),
        ) else {
            return Vec::new();
        };
        actions.iter().copied().filter(|i| envs.contains(i)).collect()
    }
}

/// Merge activities into one [`MergedActivity`].
///
/// Actions and environment items are set-unions: each appears once no
/// matter how many activities reference it, in order of first insertion.
/// Environment items come from step materials and topics, then
/// `MaterialUsed` and `ServiceProjectType`.
pub fn merge_activities(activities: &[ActivityRecord]) -> MergedActivity {
    let mut merged = MergedActivity::default();
    let mut action_index: HashMap<&str, usize> = HashMap::new();
    let mut env_index: HashMap<&str, usize> = HashMap::new();

    for (i, activity) in activities.iter().enumerate() {
        merged.activities.push(activity.activity_type.clone());
        merged.activity_sizes.push(activity.activity_size);
        merged.total_participants += activity.activity_size;

        for step in &activity.sequence {
            let slot = *action_index.entry(step.action.as_str()).or_insert_with(|| {
                merged.actions.push(step.action.clone());
                merged.action_sources.push(Vec::new());
                merged.actions.len() - 1
            });
            add_source(&mut merged.action_sources[slot], i);
        }

        for item in activity.environment_items() {
            let slot = *env_index.entry(item).or_insert_with(|| {
                merged.environment.push(item.to_string());
                merged.environment_sources.push(Vec::new());
                merged.environment.len() - 1
            });
            add_source(&mut merged.environment_sources[slot], i);
        }
    }

    merged
}

fn add_source(sources: &mut Vec<usize>, activity_index: usize) {
    if sources.last() != Some(&activity_index) {
        sources.push(activity_index);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceStep;

    fn step(action: &str, material: Option<&str>) -> SequenceStep {
        SequenceStep {
            action: action.to_string(),
            material: material.map(str::to_string),
            topic: None,
        }
    }

    fn scenario() -> Vec<ActivityRecord> {
        vec![
            ActivityRecord::new("2023-07-01", "JYG", 4),
            ActivityRecord::new("2023-07-01", "Study Circle", 6),
            ActivityRecord::new("2023-07-02", "JYG", 2),
        ]
    }

    #[test]
    fn test_group_scenario() {
        let groups = group_by_date(&scenario()).unwrap();
        let dates: Vec<&str> = groups.iter().map(|g| g.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-07-01", "2023-07-02"]);
        assert_eq!(merge_activities(&groups[0].activities).total_participants, 10);
    }

    #[test]
    fn test_group_conserves_records() {
        let records = vec![
            ActivityRecord::new("2023-07-03", "Devotional", 5),
            ActivityRecord::new("2023-07-01", "JYG", 4),
            ActivityRecord::new("2023-07-03", "Home Visit", 2),
            ActivityRecord::new("2023-07-02", "Nucleus", 8),
            ActivityRecord::new("2023-07-01", "JYG", 1),
        ];
        let groups = group_by_date(&records).unwrap();

        let total: usize = groups.iter().map(|g| g.activities.len()).sum();
        assert_eq!(total, records.len());

        let mut dates: Vec<&str> = groups.iter().map(|g| g.date.as_str()).collect();
        dates.dedup();
        assert_eq!(dates.len(), groups.len());

        for record in &records {
            let group = &groups[index_of_date(&groups, &record.date).unwrap()];
            assert!(group.activities.contains(record));
        }
    }

    #[test]
    fn test_group_sorts_out_of_order_input() {
        let records = vec![
            ActivityRecord::new("2023-07-10", "JYG", 1),
            ActivityRecord::new("2023-07-02", "JYG", 1),
        ];
        let groups = group_by_date(&records).unwrap();
        assert_eq!(groups[0].date, "2023-07-02");
        assert_eq!(groups[1].date, "2023-07-10");
    }

    #[test]
    fn test_group_rejects_bad_date() {
        let records = vec![ActivityRecord::new("someday", "JYG", 1)];
        assert!(matches!(
            group_by_date(&records),
            Err(crate::DashboardError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_date(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_merge_shared_action_once() {
        let mut a = ActivityRecord::new("2023-07-01", "JYG", 4);
        a.sequence = vec![step("Prayer", None), step("Study", Some("Book 1"))];
        let mut b = ActivityRecord::new("2023-07-01", "Study Circle", 6);
        b.sequence = vec![step("Prayer", Some("Book 1"))];
        b.material_used = Some("Book 2".to_string());

        let merged = merge_activities(&[a, b]);

        assert_eq!(merged.actions, vec!["Prayer", "Study"]);
        assert_eq!(merged.environment, vec!["Book 1", "Book 2"]);
        assert_eq!(merged.total_participants, 10);
        assert_eq!(merged.activity_sizes, vec![4, 6]);
        assert_eq!(
            merged.activities,
            vec![ActivityType::Jyg, ActivityType::StudyCircle]
        );
        assert_eq!(merged.action_sources, vec![vec![0, 1], vec![0]]);
        assert_eq!(merged.environment_sources, vec![vec![0, 1], vec![1]]);
    }

    #[test]
    fn test_shared_sources() {
        let mut a = ActivityRecord::new("2023-07-01", "JYG", 4);
        a.sequence = vec![step("Prayer", None)];
        a.material_used = Some("Book 1".to_string());
        let mut b = ActivityRecord::new("2023-07-01", "Devotional", 6);
        b.sequence = vec![step("Prayer", None), step("Music", None)];

        let merged = merge_activities(&[a, b]);
        // "Book 1" is only referenced by the JYG
        assert_eq!(merged.shared_sources(0, 0), vec![0]);
        assert!(merged.shared_sources(1, 0).is_empty());
        assert!(merged.shared_sources(9, 0).is_empty());
    }
}
