//! View models for the rendering widgets.
//!
//! Each submodule turns records, groups or cumulative graphs into plain
//! element lists. Nothing here draws: the map, graph and canvas engines
//! receive these elements as-is.

use serde::{Deserialize, Serialize};

pub mod analyses;
pub mod classical;
pub mod geo;
pub mod network;
pub mod ontology;

/// Per-activity (SET) or merged (SUM) presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// One element group per activity
    #[default]
    Set,
    /// Everything merged (per date, or cumulative for the network)
    Sum,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Set => ViewMode::Sum,
            ViewMode::Sum => ViewMode::Set,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Set => "SET",
            ViewMode::Sum => "SUM",
        }
    }
}
