//! Bar chart view: per-kind counts for the current date, plus daily and
//! cumulative tallies over the whole range.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::grouping::DateGroup;
use crate::palette::{activity_color, activity_label, Rgba};
use crate::{ActivityRecord, ActivityType};

pub const CANVAS_WIDTH: f64 = 700.0;
pub const CANVAS_HEIGHT: f64 = 260.0;
pub const BAR_WIDTH: f64 = 54.0;

/// Length of the entrance animation.
pub const ANIMATION_DURATION: Duration = Duration::from_secs(1);

// Canvas margins
const LEFT_MARGIN: f64 = 19.0;
const RIGHT_RESERVE: f64 = 190.0;
const TOP_RESERVE: f64 = 60.0;
const BASELINE_OFFSET: f64 = 40.0;
const LABEL_OFFSET: f64 = 5.0;

/// One bar, in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub activity_type: ActivityType,
    pub label: String,
    pub color: Rgba,
    pub count: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Label anchor (centre of the bar, bottom of the canvas)
    pub label_x: f64,
    pub label_y: f64,
}

/// Counts for the six known kinds, in chart order. Other kinds are not
/// charted.
pub fn bucket_counts(activities: &[ActivityRecord]) -> [u32; 6] {
    let mut counts = [0u32; 6];
    for activity in activities {
        if let Some(slot) = ActivityType::KNOWN
            .iter()
            .position(|k| *k == activity.activity_type)
        {
            counts[slot] += 1;
        }
    }
    counts
}

/// Linear entrance progress in `0.0..=1.0`.
pub fn entrance_progress(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / ANIMATION_DURATION.as_secs_f64()).clamp(0.0, 1.0)
}

/// Canvas size of a bar chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarChart {
    pub width: f64,
    pub height: f64,
}

impl Default for BarChart {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

impl BarChart {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Gap between bars.
    pub fn spacing(&self) -> f64 {
        let bars = ActivityType::KNOWN.len() as f64;
        (self.width - RIGHT_RESERVE - BAR_WIDTH * bars) / bars
    }

    /// Six bars for `activities`, grown to `progress` of their full height.
    pub fn bars(&self, activities: &[ActivityRecord], progress: f64) -> Vec<Bar> {
        let counts = bucket_counts(activities);
        let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let progress = progress.clamp(0.0, 1.0);
        let spacing = self.spacing();

        ActivityType::KNOWN
            .iter()
            .zip(counts)
            .enumerate()
            .map(|(index, (kind, count))| {
                let full = count as f64 / max_count * (self.height - TOP_RESERVE);
                let height = (full * progress).max(0.0);
                let x = LEFT_MARGIN + index as f64 * (BAR_WIDTH + spacing);
                Bar {
                    activity_type: kind.clone(),
                    label: activity_label(kind).to_string(),
                    color: activity_color(kind),
                    count,
                    x,
                    y: self.height - height - BASELINE_OFFSET,
                    width: BAR_WIDTH,
                    height,
                    label_x: x + BAR_WIDTH / 2.0,
                    label_y: self.height - LABEL_OFFSET,
                }
            })
            .collect()
    }
}

// ============================================================================
// Tallies
// ============================================================================

/// Count of one kind on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub daily: u32,
    pub cumulative: u32,
}

/// Per-kind tallies for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTally {
    pub date: String,
    pub counts: BTreeMap<ActivityType, Tally>,
}

impl DailyTally {
    /// Activities recorded on this date, all kinds.
    pub fn daily_total(&self) -> u32 {
        self.counts.values().map(|t| t.daily).sum()
    }

    pub fn get(&self, kind: &ActivityType) -> Tally {
        self.counts.get(kind).copied().unwrap_or_default()
    }
}

/// Daily and running counts per kind, one entry per date group.
///
/// Every entry carries every kind that appears anywhere in the range, so a
/// kind missing on some day still reports its carried-forward cumulative.
pub fn daily_tallies(groups: &[DateGroup]) -> Vec<DailyTally> {
    let kinds: BTreeSet<&ActivityType> = groups
        .iter()
        .flat_map(|g| g.activities.iter().map(|a| &a.activity_type))
        .collect();

    let mut running: BTreeMap<ActivityType, u32> =
        kinds.iter().map(|k| ((*k).clone(), 0)).collect();
    let mut tallies = Vec::with_capacity(groups.len());

    for group in groups {
        let mut daily: BTreeMap<&ActivityType, u32> = BTreeMap::new();
        for activity in &group.activities {
            *daily.entry(&activity.activity_type).or_insert(0) += 1;
        }

        let counts = running
            .iter_mut()
            .map(|(kind, cumulative)| {
                let today = daily.get(kind).copied().unwrap_or(0);
                *cumulative += today;
                (
                    kind.clone(),
                    Tally {
                        daily: today,
                        cumulative: *cumulative,
                    },
                )
            })
            .collect();

        tallies.push(DailyTally {
            date: group.date.clone(),
            counts,
        });
    }

    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_by_date;

    #[test]
    fn test_bar_geometry() {
        let activities = vec![
            ActivityRecord::new("2023-07-01", "JYG", 3),
            ActivityRecord::new("2023-07-01", "JYG", 3),
            ActivityRecord::new("2023-07-01", "Study Circle", 3),
            ActivityRecord::new("2023-07-01", "Reflection Meeting", 3),
        ];
        let chart = BarChart::default();
        let bars = chart.bars(&activities, 1.0);

        assert_eq!(bars.len(), 6);
        // (700 - 190 - 324) / 6 = 31
        assert!((chart.spacing() - 31.0).abs() < 1e-9);
        assert_eq!(bars[0].label, "SC");
        assert!((bars[0].height - 100.0).abs() < 1e-9);
        assert!((bars[4].height - 200.0).abs() < 1e-9);
        assert!((bars[4].x - (19.0 + 4.0 * 85.0)).abs() < 1e-9);
        assert!((bars[4].y - 20.0).abs() < 1e-9);
        assert_eq!(bars[1].height, 0.0);
        assert_eq!(bars.iter().map(|b| b.count).sum::<u32>(), 3);
    }

    #[test]
    fn test_bars_animate() {
        let activities = vec![ActivityRecord::new("2023-07-01", "Nucleus", 3)];
        let chart = BarChart::default();
        let half = chart.bars(&activities, entrance_progress(Duration::from_millis(500)));
        assert!((half[5].height - 100.0).abs() < 1e-9);
        assert_eq!(entrance_progress(Duration::from_secs(3)), 1.0);
        assert!(chart.bars(&[], 1.0).iter().all(|b| b.height == 0.0));
    }

    #[test]
    fn test_daily_tallies_carry_forward() {
        let groups = group_by_date(&[
            ActivityRecord::new("2023-07-01", "JYG", 1),
            ActivityRecord::new("2023-07-01", "Study Circle", 1),
            ActivityRecord::new("2023-07-02", "JYG", 1),
            ActivityRecord::new("2023-07-03", "JYG", 1),
            ActivityRecord::new("2023-07-03", "JYG", 1),
        ])
        .unwrap();
        let tallies = daily_tallies(&groups);

        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[1].get(&ActivityType::StudyCircle), Tally { daily: 0, cumulative: 1 });
        assert_eq!(tallies[2].get(&ActivityType::Jyg), Tally { daily: 2, cumulative: 4 });
        assert_eq!(tallies[2].daily_total(), 2);
        assert_eq!(tallies[0].get(&ActivityType::Nucleus), Tally::default());
    }
}
