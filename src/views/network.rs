//! Participant network view models.
//!
//! SET mode draws the participants of the current date's activities, each
//! node colored by the first activity it was seen in. SUM mode draws the
//! cumulative graph, every node and edge colored by the blend of the
//! activity kinds it took part in.

use log::warn;
use serde::Serialize;
use std::collections::HashSet;

use crate::cumulative::{ConnectionKey, CumulativeGraph};
use crate::palette::{activity_color, blend_activity_counts, Rgba};
use crate::participants::ParticipantDirectory;
use crate::{ActivityRecord, ActivityType};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    /// Role in SET mode
    pub group: Option<String>,
    pub color: Rgba,
    pub border_width: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEdge {
    /// Sorted `"<a>-<b>"` key
    pub id: String,
    pub from: String,
    pub to: String,
    pub color: Rgba,
    /// Activity that created the edge, SET mode only
    pub activity_type: Option<ActivityType>,
}

/// Nodes and edges handed to the graph widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkElements {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

impl NetworkElements {
    pub fn node(&self, id: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&NetworkEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Border width for a role: thin for plain participants.
pub fn border_width_for_role(role: &str) -> u8 {
    if role.eq_ignore_ascii_case("participant") {
        1
    } else {
        2
    }
}

/// Network of one date's activities. First sighting of a node or edge wins.
pub fn build_set_network(activities: &[ActivityRecord]) -> NetworkElements {
    let mut elements = NetworkElements::default();
    let mut seen_nodes: HashSet<String> = HashSet::new();
    let mut seen_edges: HashSet<String> = HashSet::new();

    for record in activities {
        let participants = match record.participants() {
            Ok(p) => p,
            Err(e) => {
                warn!("[NetworkView] Skipping record: {}", e);
                continue;
            }
        };
        let color = activity_color(&record.activity_type);

        for (i, participant) in participants.iter().enumerate() {
            if seen_nodes.insert(participant.id.clone()) {
                let role = if participant.role.is_empty() {
                    UNKNOWN
                } else {
                    participant.role.as_str()
                };
                elements.nodes.push(NetworkNode {
                    id: participant.id.clone(),
                    label: if participant.name.is_empty() {
                        participant.id.clone()
                    } else {
                        participant.name.clone()
                    },
                    group: Some(role.to_string()),
                    color,
                    border_width: border_width_for_role(role),
                });
            }

            for other in &participants[i + 1..] {
                if other.id == participant.id {
                    continue;
                }
                let key = ConnectionKey::new(&participant.id, &other.id).to_string();
                if seen_edges.insert(key.clone()) {
                    elements.edges.push(NetworkEdge {
                        id: key,
                        from: participant.id.clone(),
                        to: other.id.clone(),
                        color,
                        activity_type: Some(record.activity_type.clone()),
                    });
                }
            }
        }
    }

    elements
}

/// Network of everything up to the cursor.
pub fn build_sum_network(
    graph: &CumulativeGraph,
    directory: &ParticipantDirectory,
) -> NetworkElements {
    let nodes = graph
        .participants()
        .map(|(id, counts)| NetworkNode {
            id: id.to_string(),
            label: directory.display_name(id).to_string(),
            group: None,
            color: blend_activity_counts(counts.iter().map(|(k, v)| (k, *v))),
            border_width: 2,
        })
        .collect();

    let edges = graph
        .connections()
        .map(|(key, counts)| NetworkEdge {
            id: key.to_string(),
            from: key.from.clone(),
            to: key.to.clone(),
            color: blend_activity_counts(counts.iter().map(|(k, v)| (k, *v))),
            activity_type: None,
        })
        .collect();

    NetworkElements { nodes, edges }
}

// ============================================================================
// Selection panel
// ============================================================================

/// What the user clicked in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedElement {
    Node(String),
    Edge { from: String, to: String },
}

impl SelectedElement {
    /// Resolve a clicked element ID against the drawn elements.
    pub fn from_click(elements: &NetworkElements, id: &str) -> Option<Self> {
        if let Some(node) = elements.node(id) {
            return Some(SelectedElement::Node(node.id.clone()));
        }
        elements.edge(id).map(|edge| SelectedElement::Edge {
            from: edge.from.clone(),
            to: edge.to.clone(),
        })
    }
}

/// Side panel content for the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElementInfo {
    Nothing,
    Participant {
        name: String,
        role: String,
        id: String,
    },
    Connection {
        from_name: String,
        from_role: String,
        to_name: String,
        to_role: String,
    },
}

impl ElementInfo {
    /// Panel text, one line per row.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ElementInfo::Nothing => vec![
                "No element selected. Click on a node or edge to see its information.".to_string(),
            ],
            ElementInfo::Participant { name, role, id } => vec![
                "Participant Information".to_string(),
                name.clone(),
                role.clone(),
                format!("ID: {}", id),
            ],
            ElementInfo::Connection {
                from_name,
                from_role,
                to_name,
                to_role,
            } => vec![
                "Connection Information".to_string(),
                format!("From: {} (Role: {})", from_name, from_role),
                format!("To: {} (Role: {})", to_name, to_role),
            ],
        }
    }
}

fn name_or_unknown(directory: &ParticipantDirectory, id: &str) -> String {
    directory
        .get(id)
        .map(|info| info.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn role_or_unknown(directory: &ParticipantDirectory, id: &str, date: Option<&str>) -> String {
    date.and_then(|d| directory.role_on(id, d))
        .filter(|role| !role.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Describe the selection using names and the roles held on `date`.
pub fn element_info(
    selected: Option<&SelectedElement>,
    directory: &ParticipantDirectory,
    date: Option<&str>,
) -> ElementInfo {
    match selected {
        None => ElementInfo::Nothing,
        Some(SelectedElement::Node(id)) => ElementInfo::Participant {
            name: name_or_unknown(directory, id),
            role: role_or_unknown(directory, id, date),
            id: id.clone(),
        },
        Some(SelectedElement::Edge { from, to }) => ElementInfo::Connection {
            from_name: name_or_unknown(directory, from),
            from_role: role_or_unknown(directory, from, date),
            to_name: name_or_unknown(directory, to),
            to_role: role_or_unknown(directory, to, date),
        },
    }
}
