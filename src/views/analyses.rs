//! Analyses panels: network centrality, communities, shortest paths, growth
//! rates and expansion/consolidation phases.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::participants::ParticipantDirectory;
use crate::views::classical::DailyTally;
use crate::{parse_activity_date, ActivityType};

/// Rows shown in a centrality ranking.
pub const TOP_RANKED: usize = 10;

/// Smallest visible bar for any value above the minimum.
pub const MIN_VISIBLE_WIDTH: f64 = 0.05;

/// Message shown when the shortest-path request itself fails.
pub const SHORTEST_PATH_FAILED: &str = "Failed to fetch shortest path";

const GOLDEN_ANGLE: f64 = 137.508;
const DAYS_PER_YEAR: f64 = 365.0;

// ============================================================================
// Centrality
// ============================================================================

/// `/centrality-measures` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CentralityResponse {
    #[serde(default)]
    pub centrality: CentralityMeasures,
}

/// Per-participant measures computed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityMeasures {
    pub degree: HashMap<String, f64>,
    pub closeness: HashMap<String, f64>,
    pub betweenness: HashMap<String, f64>,
    pub eigenvector: HashMap<String, f64>,
    /// Participant ID -> community number
    pub communities: HashMap<String, u32>,
    pub avg_shortest_path: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityMeasure {
    Degree,
    Closeness,
    Betweenness,
    Eigenvector,
}

impl CentralityMeasure {
    pub const ALL: [CentralityMeasure; 4] = [
        CentralityMeasure::Degree,
        CentralityMeasure::Closeness,
        CentralityMeasure::Betweenness,
        CentralityMeasure::Eigenvector,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CentralityMeasure::Degree => "Degree",
            CentralityMeasure::Closeness => "Closeness",
            CentralityMeasure::Betweenness => "Betweenness",
            CentralityMeasure::Eigenvector => "Eigenvector",
        }
    }
}

impl CentralityMeasures {
    pub fn values(&self, measure: CentralityMeasure) -> &HashMap<String, f64> {
        match measure {
            CentralityMeasure::Degree => &self.degree,
            CentralityMeasure::Closeness => &self.closeness,
            CentralityMeasure::Betweenness => &self.betweenness,
            CentralityMeasure::Eigenvector => &self.eigenvector,
        }
    }

    /// `Average Shortest Path Length: x.xxxx`, when the server sent one.
    pub fn avg_shortest_path_line(&self) -> Option<String> {
        self.avg_shortest_path
            .map(|v| format!("Average Shortest Path Length: {:.4}", v))
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub name: String,
    pub value: f64,
    /// Bar fill in `0.0..=1.0`
    pub bar_width: f64,
}

/// Bar fill for `value` between `min` and `max`: square-root scaled, at
/// least [`MIN_VISIBLE_WIDTH`] above the minimum, 0 at it.
pub fn bar_width(value: f64, min: f64, max: f64) -> f64 {
    if value <= min || max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).sqrt().max(MIN_VISIBLE_WIDTH)
}

/// Top [`TOP_RANKED`] participants for `measure`, highest first.
///
/// Ties are broken by ID so the order is stable between renders.
pub fn rank_centrality(
    measures: &CentralityMeasures,
    measure: CentralityMeasure,
    directory: &ParticipantDirectory,
) -> Vec<RankedEntry> {
    let mut rows: Vec<(&String, f64)> = measures
        .values(measure)
        .iter()
        .map(|(id, v)| (id, *v))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows.truncate(TOP_RANKED);

    let max = rows.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);
    let min = rows.iter().map(|r| r.1).fold(f64::INFINITY, f64::min);

    rows.into_iter()
        .map(|(id, value)| RankedEntry {
            id: id.clone(),
            name: directory.display_name(id).to_string(),
            value,
            bar_width: bar_width(value, min, max),
        })
        .collect()
}

// ============================================================================
// Communities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Community {
    pub number: u32,
    /// `Community <n>`
    pub label: String,
    /// HSL hue in degrees
    pub hue: f64,
    pub members: Vec<String>,
}

/// Spread community colors around the wheel by the golden angle.
pub fn community_hue(number: u32) -> f64 {
    (number as f64 * GOLDEN_ANGLE) % 360.0
}

/// Participants grouped by community, ordered by label.
pub fn group_communities(
    measures: &CentralityMeasures,
    directory: &ParticipantDirectory,
) -> Vec<Community> {
    let mut rows: Vec<(String, u32, String)> = measures
        .communities
        .iter()
        .map(|(id, n)| {
            (
                format!("Community {}", n),
                *n,
                directory.display_name(id).to_string(),
            )
        })
        .collect();
    rows.sort();

    let mut communities: Vec<Community> = Vec::new();
    for (label, number, name) in rows {
        match communities.last_mut() {
            Some(last) if last.label == label => last.members.push(name),
            _ => communities.push(Community {
                number,
                label,
                hue: community_hue(number),
                members: vec![name],
            }),
        }
    }
    communities
}

// ============================================================================
// Shortest path
// ============================================================================

/// `/shortest-path` payload: either a path or an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortestPathResponse {
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShortestPathOutcome {
    Found { path: Vec<String>, length: f64 },
    Error(String),
}

impl ShortestPathOutcome {
    pub fn from_response(response: ShortestPathResponse) -> Self {
        match response.error {
            Some(error) => ShortestPathOutcome::Error(error),
            None => ShortestPathOutcome::Found {
                length: response
                    .length
                    .unwrap_or(response.path.len().saturating_sub(1) as f64),
                path: response.path,
            },
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            ShortestPathOutcome::Found { path, length } => vec![
                format!("Shortest Path: {}", path.join(" → ")),
                format!("Path Length: {}", length),
            ],
            ShortestPathOutcome::Error(message) => vec![message.clone()],
        }
    }
}

// ============================================================================
// Growth rates
// ============================================================================

/// Compound annual growth rate in percent.
///
/// `None` when the start is zero or the span is not positive.
pub fn cagr(start: f64, end: f64, years: f64) -> Option<f64> {
    if start <= 0.0 || years <= 0.0 {
        return None;
    }
    let rate = ((end / start).powf(1.0 / years) - 1.0) * 100.0;
    rate.is_finite().then_some(rate)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRate {
    pub activity_type: ActivityType,
    pub rate: Option<f64>,
}

impl fmt::Display for GrowthRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rate {
            Some(rate) => write!(f, "{}: {:.2}%", self.activity_type, rate),
            None => write!(f, "{}: n/a", self.activity_type),
        }
    }
}

/// CAGR of each kind's cumulative count from the first to the last date.
pub fn growth_rates(tallies: &[DailyTally]) -> Vec<GrowthRate> {
    let (Some(first), Some(last)) = (tallies.first(), tallies.last()) else {
        return Vec::new();
    };

    let years = match (parse_activity_date(&first.date), parse_activity_date(&last.date)) {
        (Some(a), Some(b)) => (b - a).num_days() as f64 / DAYS_PER_YEAR,
        _ => 0.0,
    };

    last.counts
        .keys()
        .map(|kind| GrowthRate {
            activity_type: kind.clone(),
            rate: cagr(
                first.get(kind).cumulative as f64,
                last.get(kind).cumulative as f64,
                years,
            ),
        })
        .collect()
}

// ============================================================================
// Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseKind {
    Expansion,
    Consolidation,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Expansion => f.write_str("Expansion"),
            PhaseKind::Consolidation => f.write_str("Consolidation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub start: String,
    pub end: String,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} to {}", self.kind, self.start, self.end)
    }
}

/// Split the range into expansion and consolidation runs.
///
/// The walk starts expanding. An expanding run ends on a day whose total is
/// below the previous day's; a consolidating run ends on a rise.
pub fn identify_phases(tallies: &[DailyTally]) -> Vec<Phase> {
    let Some(first) = tallies.first() else {
        return Vec::new();
    };

    let mut phases = Vec::new();
    let mut kind = PhaseKind::Expansion;
    let mut start = first.date.clone();

    for pair in tallies.windows(2) {
        let (previous, current) = (pair[0].daily_total(), pair[1].daily_total());
        let flips = match kind {
            PhaseKind::Expansion => current < previous,
            PhaseKind::Consolidation => current > previous,
        };
        if flips {
            phases.push(Phase {
                kind,
                start: std::mem::replace(&mut start, pair[1].date.clone()),
                end: pair[0].date.clone(),
            });
            kind = match kind {
                PhaseKind::Expansion => PhaseKind::Consolidation,
                PhaseKind::Consolidation => PhaseKind::Expansion,
            };
        }
    }

    let end = tallies
        .last()
        .map(|t| t.date.clone())
        .unwrap_or_default();
    phases.push(Phase { kind, start, end });
    phases
}
