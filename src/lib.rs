//! # Cluster Dashboard
//!
//! Core of the community-activity dashboard: everything between the activity
//! API and the rendering widgets.
//!
//! This library provides:
//! - Typed activity records as served by the `/unified-data` endpoint
//! - Date grouping, SUM/SET aggregation and cumulative participant graphs
//! - A shared query/playback store and a transport state machine that keeps
//!   every view on the same date
//! - Renderer-agnostic view models for the map, network, ontology and
//!   bar-chart widgets, plus the analyses panels
//!
//! ## Features
//!
//! - **`http`** (default) - HTTP client and fetch hook for the activity API
//!   (turns on `playback`)
//! - **`playback`** - Interval playback timer on a tokio task
//! - **`parallel`** - Build per-activity ontology trees with rayon
//! - **`cli`** - Terminal driver binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use cluster_dashboard::{group_by_date, merge_activities, ActivityRecord};
//!
//! let json = r#"[
//!     {"Date": "2023-07-01", "ActivityType": "JYG", "ActivitySize": 4, "Sequence": []},
//!     {"Date": "2023-07-01", "ActivityType": "Study Circle", "ActivitySize": 6, "Sequence": []},
//!     {"Date": "2023-07-02", "ActivityType": "JYG", "ActivitySize": 2, "Sequence": []}
//! ]"#;
//! let records: Vec<ActivityRecord> = serde_json::from_str(json).unwrap();
//!
//! let groups = group_by_date(&records).unwrap();
//! assert_eq!(groups.len(), 2);
//!
//! let merged = merge_activities(&groups[0].activities);
//! assert_eq!(merged.total_participants, 10);
//! ```

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Unified error handling
pub mod error;
pub use error::{DashboardError, OptionExt, Result};

// Configuration (API endpoint, playback intervals, marker scale)
pub mod config;
pub use config::{DashboardConfig, MarkerConfig, PlaybackConfig};

// Shared activity palette and color blending
pub mod palette;
pub use palette::{activity_color, activity_label, blend_colors, Rgba};

// Participant directory (names and roles by date)
pub mod participants;
pub use participants::{ParticipantDirectory, ParticipantInfo};

// Date grouping and SUM aggregation
pub mod grouping;
pub use grouping::{group_by_date, merge_activities, DateGroup, MergedActivity};

// Cumulative participant/connection graphs
pub mod cumulative;
pub use cumulative::{
    build_cumulative_graph, ConnectionKey, CumulativeAccumulator, CumulativeGraph, TypeCounts,
};

// Shared query and playback state
pub mod query;
pub use query::{QueryHandle, QueryParams, QueryPatch, QueryStore};

// Playback transport
pub mod playback;
pub use playback::{PlaybackState, TransportCommand};
#[cfg(feature = "playback")]
pub use playback::PlaybackTimer;

// Stateful timeline engine (records, groups, accumulator)
pub mod engine;
pub use engine::{DashboardEngine, EngineStats};

// View models for the rendering widgets
pub mod views;
pub use views::ViewMode;

// Page compositions
pub mod pages;
pub use pages::{Page, PageStatus};

// HTTP module for the activity API
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ApiClient, DataFetcher, FetchState};

// ============================================================================
// Core Types
// ============================================================================

/// Kind of community activity.
///
/// The API sends free-form strings; the six known kinds get their own
/// variant and anything else is kept verbatim in [`ActivityType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    StudyCircle,
    Devotional,
    HomeVisit,
    ChildrensClass,
    Jyg,
    Nucleus,
    Other(String),
}

impl ActivityType {
    /// The six kinds with a fixed slot in charts, in display order.
    pub const KNOWN: [ActivityType; 6] = [
        ActivityType::StudyCircle,
        ActivityType::Devotional,
        ActivityType::HomeVisit,
        ActivityType::ChildrensClass,
        ActivityType::Jyg,
        ActivityType::Nucleus,
    ];

    /// Name as used by the API.
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::StudyCircle => "Study Circle",
            ActivityType::Devotional => "Devotional",
            ActivityType::HomeVisit => "Home Visit",
            ActivityType::ChildrensClass => "Children's Class",
            ActivityType::Jyg => "JYG",
            ActivityType::Nucleus => "Nucleus",
            ActivityType::Other(name) => name,
        }
    }

    /// Whether this is one of the six known kinds.
    pub fn is_known(&self) -> bool {
        !matches!(self, ActivityType::Other(_))
    }
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        match value.trim() {
            "Study Circle" => ActivityType::StudyCircle,
            "Devotional" => ActivityType::Devotional,
            "Home Visit" => ActivityType::HomeVisit,
            "Children's Class" => ActivityType::ChildrensClass,
            "JYG" => ActivityType::Jyg,
            "Nucleus" => ActivityType::Nucleus,
            _ => ActivityType::Other(value),
        }
    }
}

impl From<&str> for ActivityType {
    fn from(value: &str) -> Self {
        ActivityType::from(value.to_string())
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an activity's action sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceStep {
    pub action: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub material: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub topic: Option<String>,
}

impl SequenceStep {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            material: None,
            topic: None,
        }
    }
}

/// One observed activity, as returned by `/unified-data`.
///
/// Participants travel as three comma-joined parallel lists; use
/// [`ActivityRecord::participants`] to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityRecord {
    pub date: String,
    pub activity_type: ActivityType,
    pub activity_size: u32,
    #[serde(default)]
    pub sequence: Vec<SequenceStep>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub material_used: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub service_project_type: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(rename = "ParticipantIDs", default, deserialize_with = "string_or_null")]
    pub participant_ids: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub participant_names: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub participant_roles: String,
}

/// A participant of one activity, decoded from the parallel lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl ActivityRecord {
    /// Create a record with no sequence, location or participants.
    pub fn new(date: &str, activity_type: impl Into<ActivityType>, activity_size: u32) -> Self {
        Self {
            date: date.to_string(),
            activity_type: activity_type.into(),
            activity_size,
            sequence: Vec::new(),
            material_used: None,
            service_project_type: None,
            latitude: 0.0,
            longitude: 0.0,
            participant_ids: String::new(),
            participant_names: String::new(),
            participant_roles: String::new(),
        }
    }

    /// Participant IDs in list order.
    pub fn participant_ids(&self) -> Vec<&str> {
        split_list(&self.participant_ids)
    }

    /// Decode the parallel participant lists.
    ///
    /// Fails with [`DashboardError::ParticipantMismatch`] when the three
    /// lists do not have the same number of entries.
    pub fn participants(&self) -> Result<Vec<Participant>> {
        let ids = split_list(&self.participant_ids);
        let names = split_list(&self.participant_names);
        let roles = split_list(&self.participant_roles);

        if ids.len() != names.len() || ids.len() != roles.len() {
            return Err(DashboardError::ParticipantMismatch {
                date: self.date.clone(),
                ids: ids.len(),
                names: names.len(),
                roles: roles.len(),
            });
        }

        Ok(ids
            .into_iter()
            .zip(names)
            .zip(roles)
            .map(|((id, name), role)| Participant {
                id: id.to_string(),
                name: name.to_string(),
                role: role.to_string(),
            })
            .collect())
    }

    /// Environment items in first-reference order: step materials and topics,
    /// then `MaterialUsed`, then `ServiceProjectType`. Duplicates are kept.
    pub fn environment_items(&self) -> Vec<&str> {
        let mut items = Vec::new();
        for step in &self.sequence {
            if let Some(material) = step.material.as_deref() {
                items.push(material);
            }
            if let Some(topic) = step.topic.as_deref() {
                items.push(topic);
            }
        }
        if let Some(material) = self.material_used.as_deref() {
            items.push(material);
        }
        if let Some(project) = self.service_project_type.as_deref() {
            items.push(project);
        }
        items
    }

    /// Parsed calendar date, if the `Date` string is readable.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_activity_date(&self.date)
    }
}

/// Parse a date as the API and the query form write it.
///
/// Accepts `YYYY-MM-DD`, `MM-DD-YYYY`, RFC 3339 timestamps and RFC 2822
/// timestamps (`Sat, 01 Jul 2023 00:00:00 GMT`).
pub fn parse_activity_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m-%d-%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
        .or_else(|| DateTime::parse_from_rfc2822(value).ok().map(|d| d.date_naive()))
}

fn split_list(value: &str) -> Vec<&str> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::trim).collect()
}

fn non_empty_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
