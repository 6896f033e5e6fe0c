//! Page compositions.
//!
//! A page reads the shared store, pulls the current date's data (or the
//! cumulative range) out of the engine and hands it to its views. The
//! result is a [`PageSnapshot`]: everything one frame of the page shows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DashboardConfig;
use crate::engine::DashboardEngine;
use crate::grouping::merge_activities;
use crate::query::QueryStore;
use crate::views::analyses::{
    group_communities, growth_rates, identify_phases, rank_centrality, CentralityMeasure,
    CentralityMeasures, Community, GrowthRate, Phase, RankedEntry, ShortestPathOutcome,
};
use crate::views::classical::{daily_tallies, Bar, BarChart, DailyTally};
use crate::views::geo::{
    build_markers, build_overlay, map_center, CensusCollection, Marker, OverlayKind,
    OverlayPolygon,
};
use crate::views::network::{build_set_network, build_sum_network, NetworkElements};
use crate::views::ontology::{
    build_set_trees, build_sum_dag, set_activity_log, sum_activity_log, OntologyGraph,
};
use crate::views::ViewMode;
use crate::{ActivityRecord, Result};

/// The five routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Overview,
    Geo,
    Net,
    Structural,
    Classical,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Overview,
        Page::Geo,
        Page::Net,
        Page::Structural,
        Page::Classical,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Page::Overview => "/",
            Page::Geo => "/geo",
            Page::Net => "/net",
            Page::Structural => "/structural",
            Page::Classical => "/classical",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Analytics Dashboard",
            Page::Geo => "Geographic View",
            Page::Net => "Network View",
            Page::Structural => "Programmatic View",
            Page::Classical => "Standard View",
        }
    }

    /// Page for a route path or a bare name (`net`, `/net`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Page::ALL.into_iter().find(|page| {
            page.path() == value
                || page.path().trim_start_matches('/') == value
                || (value.eq_ignore_ascii_case("overview") && *page == Page::Overview)
        })
    }

    /// Whether the page needs `/centrality-measures` besides the activities.
    pub fn needs_centrality(self) -> bool {
        matches!(self, Page::Net)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ============================================================================
// Load status
// ============================================================================

/// Where a page is in its load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PageStatus {
    Loading,
    Failed(String),
    Ready,
}

impl PageStatus {
    /// Status from a fetch's loading flag and error. A fetch in flight
    /// shows as loading even while the previous error is still set.
    pub fn from_parts(loading: bool, error: Option<&str>) -> Self {
        match error {
            _ if loading => PageStatus::Loading,
            Some(message) => PageStatus::Failed(message.to_string()),
            None => PageStatus::Ready,
        }
    }

    /// Text shown instead of the page, or `None` when it can render.
    pub fn render_placeholder(&self) -> Option<String> {
        match self {
            PageStatus::Loading => Some("Loading...".to_string()),
            PageStatus::Failed(message) => Some(format!("Error: {}", message)),
            PageStatus::Ready => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PageStatus::Ready)
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Ontology panel in either mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OntologyView {
    /// One tree per activity with its log lines
    Set(Vec<(OntologyGraph, Vec<String>)>),
    /// One DAG for the merged day
    Sum(OntologyGraph, Vec<String>),
}

impl OntologyView {
    pub fn node_count(&self) -> usize {
        match self {
            OntologyView::Set(trees) => trees.iter().map(|(g, _)| g.nodes.len()).sum(),
            OntologyView::Sum(graph, _) => graph.nodes.len(),
        }
    }

    pub fn log_lines(&self) -> Vec<String> {
        match self {
            OntologyView::Set(trees) => trees.iter().flat_map(|(_, log)| log.clone()).collect(),
            OntologyView::Sum(_, log) => log.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSnapshot {
    pub markers: Vec<Marker>,
    pub center: [f64; 2],
    pub network: NetworkElements,
    pub ontology: OntologyView,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoSnapshot {
    pub markers: Vec<Marker>,
    pub center: [f64; 2],
    pub overlay: Option<OverlayKind>,
    pub polygons: Vec<OverlayPolygon>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetSnapshot {
    pub network: NetworkElements,
    pub rankings: Vec<(CentralityMeasure, Vec<RankedEntry>)>,
    pub communities: Vec<Community>,
    pub avg_shortest_path: Option<String>,
    /// Filled in once the user asks for a path
    pub shortest_path: Option<ShortestPathOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassicalSnapshot {
    pub bars: Vec<Bar>,
    pub tallies: Vec<DailyTally>,
    pub growth: Vec<GrowthRate>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Overview(OverviewSnapshot),
    Geo(GeoSnapshot),
    Net(NetSnapshot),
    Structural(OntologyView),
    Classical(ClassicalSnapshot),
}

/// One frame of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub page: Page,
    pub date: Option<String>,
    pub mode: ViewMode,
    pub is_playing: bool,
    pub content: PageContent,
}

impl PageSnapshot {
    /// Plain-text digest of the frame, for terminals and logs.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} [{}] {} {}",
            self.page.title(),
            self.mode.label(),
            self.date.as_deref().unwrap_or("-"),
            if self.is_playing { "playing" } else { "paused" }
        )];

        match &self.content {
            PageContent::Overview(s) => {
                lines.push(format!("Markers: {}", s.markers.len()));
                lines.push(network_line(&s.network));
                lines.push(format!("Ontology nodes: {}", s.ontology.node_count()));
                lines.extend(bar_lines(&s.bars));
            }
            PageContent::Geo(s) => {
                lines.push(format!("Markers: {}", s.markers.len()));
                lines.push(format!("Center: {:.4}, {:.4}", s.center[0], s.center[1]));
                if let Some(kind) = s.overlay {
                    lines.push(format!("{}: {} tracts", kind.label(), s.polygons.len()));
                }
            }
            PageContent::Net(s) => {
                lines.push(network_line(&s.network));
                for (measure, entries) in &s.rankings {
                    let top: Vec<String> = entries
                        .iter()
                        .take(3)
                        .map(|e| format!("{} ({:.4})", e.name, e.value))
                        .collect();
                    lines.push(format!("{}: {}", measure.name(), top.join(", ")));
                }
                lines.push(format!("Communities: {}", s.communities.len()));
                lines.extend(s.avg_shortest_path.clone());
                if let Some(outcome) = &s.shortest_path {
                    lines.extend(outcome.lines());
                }
            }
            PageContent::Structural(view) => {
                lines.push(format!("Ontology nodes: {}", view.node_count()));
                lines.extend(view.log_lines());
            }
            PageContent::Classical(s) => {
                lines.extend(bar_lines(&s.bars));
                lines.extend(s.growth.iter().map(|g| g.to_string()));
                lines.extend(s.phases.iter().map(|p| p.to_string()));
            }
        }
        lines
    }
}

fn network_line(network: &NetworkElements) -> String {
    format!(
        "Network: {} nodes, {} edges",
        network.nodes.len(),
        network.edges.len()
    )
}

fn bar_lines(bars: &[Bar]) -> Vec<String> {
    vec![bars
        .iter()
        .map(|b| format!("{} {}", b.label, b.count))
        .collect::<Vec<_>>()
        .join(" | ")]
}

// ============================================================================
// Composition
// ============================================================================

/// Page-local inputs besides the shared store.
#[derive(Debug, Clone)]
pub struct PageInputs<'a> {
    pub mode: ViewMode,
    /// Bar entrance animation progress
    pub progress: f64,
    pub overlay: Option<(OverlayKind, &'a CensusCollection)>,
    pub centrality: Option<&'a CentralityMeasures>,
}

impl Default for PageInputs<'_> {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            progress: 1.0,
            overlay: None,
            centrality: None,
        }
    }
}

fn current_activities(engine: &mut DashboardEngine, date: Option<&str>) -> Result<Vec<ActivityRecord>> {
    match date {
        Some(date) => Ok(engine.activities_on(date)?.to_vec()),
        None => Ok(Vec::new()),
    }
}

fn network_view(
    engine: &mut DashboardEngine,
    date: Option<&str>,
    mode: ViewMode,
    activities: &[ActivityRecord],
) -> Result<NetworkElements> {
    match mode {
        ViewMode::Set => Ok(build_set_network(activities)),
        ViewMode::Sum => {
            let graph = match date {
                Some(date) => engine.cumulative_through(date)?,
                None => return Ok(NetworkElements::default()),
            };
            Ok(build_sum_network(&graph, engine.directory()))
        }
    }
}

fn ontology_view(mode: ViewMode, activities: &[ActivityRecord]) -> OntologyView {
    match mode {
        ViewMode::Set => OntologyView::Set(
            build_set_trees(activities)
                .into_iter()
                .zip(activities.iter().map(set_activity_log))
                .collect(),
        ),
        ViewMode::Sum => {
            let merged = merge_activities(activities);
            OntologyView::Sum(build_sum_dag(&merged), sum_activity_log(&merged))
        }
    }
}

/// Build one frame of `page` at the store's cursor.
pub fn compose(
    page: Page,
    engine: &mut DashboardEngine,
    store: &QueryStore,
    config: &DashboardConfig,
    inputs: &PageInputs<'_>,
) -> Result<PageSnapshot> {
    let date = store.current_timestep.as_deref();
    let activities = current_activities(engine, date)?;
    let mode = inputs.mode;

    let content = match page {
        Page::Overview => {
            let markers = build_markers(&activities, store.is_playing, &config.markers);
            PageContent::Overview(OverviewSnapshot {
                center: map_center(&markers, &config.markers),
                markers,
                network: network_view(engine, date, mode, &activities)?,
                ontology: ontology_view(mode, &activities),
                bars: BarChart::default().bars(&activities, inputs.progress),
            })
        }
        Page::Geo => {
            let markers = build_markers(&activities, store.is_playing, &config.markers);
            let (overlay, polygons) = match inputs.overlay {
                Some((kind, collection)) => (Some(kind), build_overlay(collection, kind)),
                None => (None, Vec::new()),
            };
            PageContent::Geo(GeoSnapshot {
                center: map_center(&markers, &config.markers),
                markers,
                overlay,
                polygons,
            })
        }
        Page::Net => {
            let network = network_view(engine, date, mode, &activities)?;
            let directory = engine.directory();
            let (rankings, communities, avg_shortest_path) = match inputs.centrality {
                Some(measures) => (
                    CentralityMeasure::ALL
                        .into_iter()
                        .map(|m| (m, rank_centrality(measures, m, directory)))
                        .collect(),
                    group_communities(measures, directory),
                    measures.avg_shortest_path_line(),
                ),
                None => (Vec::new(), Vec::new(), None),
            };
            PageContent::Net(NetSnapshot {
                network,
                rankings,
                communities,
                avg_shortest_path,
                shortest_path: None,
            })
        }
        Page::Structural => PageContent::Structural(ontology_view(mode, &activities)),
        Page::Classical => {
            let tallies = daily_tallies(engine.groups()?);
            PageContent::Classical(ClassicalSnapshot {
                bars: BarChart::default().bars(&activities, inputs.progress),
                growth: growth_rates(&tallies),
                phases: identify_phases(&tallies),
                tallies,
            })
        }
    };

    Ok(PageSnapshot {
        page,
        date: store.current_timestep.clone(),
        mode,
        is_playing: store.is_playing,
        content,
    })
}
