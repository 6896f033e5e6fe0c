//! Hierarchical ("ontology") view models.
//!
//! SET mode: one three-level tree per activity (activity -> actions ->
//! environment items). SUM mode: a single DAG over the day's
//! [`MergedActivity`], where shared actions and environment items are drawn
//! once and colored by the activities that reference them.

use serde::Serialize;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::grouping::MergedActivity;
use crate::palette::{activity_color, activity_label, blend_colors, Rgba, EMPTY_BLEND_COLOR};
use crate::ActivityRecord;

/// Node size bounds for activity roots.
const MIN_ACTIVITY_NODE: f64 = 60.0;
const MAX_ACTIVITY_NODE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologyNode {
    pub id: String,
    pub label: String,
    /// 0 = activity, 1 = action, 2 = environment
    pub level: u8,
    pub color: Rgba,
    /// Set on activity nodes only
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologyEdge {
    pub from: String,
    pub to: String,
    pub color: Rgba,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OntologyGraph {
    pub nodes: Vec<OntologyNode>,
    pub edges: Vec<OntologyEdge>,
}

impl OntologyGraph {
    fn add_node(&mut self, id: String, label: &str, level: u8, color: Rgba, size: Option<f64>) {
        self.nodes.push(OntologyNode {
            id,
            label: label.to_string(),
            level,
            color,
            size,
        });
    }

    fn add_edge(&mut self, from: &str, to: &str, color: Rgba) {
        self.edges.push(OntologyEdge {
            from: from.to_string(),
            to: to.to_string(),
            color,
        });
    }

    pub fn node(&self, id: &str) -> Option<&OntologyNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_at_level(&self, level: u8) -> impl Iterator<Item = &OntologyNode> {
        self.nodes.iter().filter(move |n| n.level == level)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }
}

/// `clamp(sqrt(size) * 6, 60, 100)`
pub fn activity_node_size(activity_size: u32) -> f64 {
    ((activity_size as f64).sqrt() * 6.0).clamp(MIN_ACTIVITY_NODE, MAX_ACTIVITY_NODE)
}

// ============================================================================
// SET
// ============================================================================

/// Tree for one activity.
///
/// Each step's material and topic hang off that step. `MaterialUsed` and
/// `ServiceProjectType` not already drawn hang off the last step, or off
/// the activity itself when there are no steps.
pub fn build_set_tree(record: &ActivityRecord) -> OntologyGraph {
    let mut graph = OntologyGraph::default();
    let color = activity_color(&record.activity_type);
    let root = record.activity_type.as_str().to_string();

    graph.add_node(
        root.clone(),
        activity_label(&record.activity_type),
        0,
        color,
        Some(activity_node_size(record.activity_size)),
    );

    let mut env_nodes: HashMap<&str, String> = HashMap::new();
    let mut last_action = root.clone();

    for (index, step) in record.sequence.iter().enumerate() {
        let action_id = format!("action_{}", index);
        graph.add_node(action_id.clone(), &step.action, 1, color, None);
        graph.add_edge(&root, &action_id, color);

        for item in [step.material.as_deref(), step.topic.as_deref()].into_iter().flatten() {
            let env_id = env_node(&mut graph, &mut env_nodes, item, color);
            graph.add_edge(&action_id, &env_id, color);
        }
        last_action = action_id;
    }

    let leftovers = [
        record.material_used.as_deref(),
        record.service_project_type.as_deref(),
    ];
    for item in leftovers.into_iter().flatten() {
        if env_nodes.contains_key(item) {
            continue;
        }
        let env_id = env_node(&mut graph, &mut env_nodes, item, color);
        graph.add_edge(&last_action, &env_id, color);
    }

    graph
}

fn env_node<'a>(
    graph: &mut OntologyGraph,
    env_nodes: &mut HashMap<&'a str, String>,
    item: &'a str,
    color: Rgba,
) -> String {
    if let Some(id) = env_nodes.get(item) {
        return id.clone();
    }
    let id = format!("env_{}", env_nodes.len());
    graph.add_node(id.clone(), item, 2, color, None);
    env_nodes.insert(item, id.clone());
    id
}

/// One tree per activity, in input order.
#[cfg(not(feature = "parallel"))]
pub fn build_set_trees(activities: &[ActivityRecord]) -> Vec<OntologyGraph> {
    activities.iter().map(build_set_tree).collect()
}

/// One tree per activity, in input order.
#[cfg(feature = "parallel")]
pub fn build_set_trees(activities: &[ActivityRecord]) -> Vec<OntologyGraph> {
    activities.par_iter().map(build_set_tree).collect()
}

/// Log lines for one activity: `Action - Material` (or topic, or `N/A`).
pub fn set_activity_log(record: &ActivityRecord) -> Vec<String> {
    record
        .sequence
        .iter()
        .map(|step| {
            let detail = step
                .material
                .as_deref()
                .or(step.topic.as_deref())
                .unwrap_or("N/A");
            format!("{} - {}", step.action, detail)
        })
        .collect()
}

// ============================================================================
// SUM
// ============================================================================

fn blend_sources(colors: &[Rgba], sources: &[usize]) -> Rgba {
    let weighted: Vec<(Rgba, f64)> = sources
        .iter()
        .filter_map(|&i| colors.get(i).map(|c| (*c, 1.0)))
        .collect();
    blend_colors(&weighted).unwrap_or(EMPTY_BLEND_COLOR)
}

/// DAG over a merged day.
///
/// Edges run activity -> action for every activity that performed the
/// action, and action -> environment item when some activity references
/// both.
pub fn build_sum_dag(merged: &MergedActivity) -> OntologyGraph {
    let mut graph = OntologyGraph::default();
    let colors: Vec<Rgba> = merged.activities.iter().map(activity_color).collect();

    for (index, kind) in merged.activities.iter().enumerate() {
        let size = merged.activity_sizes.get(index).copied().unwrap_or(0);
        graph.add_node(
            format!("activity_{}", index),
            activity_label(kind),
            0,
            colors[index],
            Some(activity_node_size(size)),
        );
    }

    for (index, action) in merged.actions.iter().enumerate() {
        let action_id = format!("action_{}", index);
        let sources = merged.action_sources.get(index).map(Vec::as_slice).unwrap_or(&[]);
        graph.add_node(action_id.clone(), action, 1, blend_sources(&colors, sources), None);
        for &activity in sources {
            graph.add_edge(&format!("activity_{}", activity), &action_id, colors[activity]);
        }
    }

    for (env_index, item) in merged.environment.iter().enumerate() {
        let env_id = format!("env_{}", env_index);
        let sources = merged
            .environment_sources
            .get(env_index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        graph.add_node(env_id.clone(), item, 2, blend_sources(&colors, sources), None);

        for action_index in 0..merged.actions.len() {
            let shared = merged.shared_sources(action_index, env_index);
            if !shared.is_empty() {
                graph.add_edge(
                    &format!("action_{}", action_index),
                    &env_id,
                    blend_sources(&colors, &shared),
                );
            }
        }
    }

    graph
}

/// Summary lines for the merged day.
pub fn sum_activity_log(merged: &MergedActivity) -> Vec<String> {
    let activities: Vec<&str> = merged.activities.iter().map(|a| a.as_str()).collect();
    vec![
        format!("Activities: {}", activities.join(", ")),
        format!("Actions: {}", merged.actions.join(", ")),
        format!("Environment: {}", merged.environment.join(", ")),
        format!("Total Participants: {}", merged.total_participants),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::merge_activities;
    use crate::{ActivityType, SequenceStep};

    fn step(action: &str, material: Option<&str>, topic: Option<&str>) -> SequenceStep {
        SequenceStep {
            action: action.to_string(),
            material: material.map(str::to_string),
            topic: topic.map(str::to_string),
        }
    }

    #[test]
    fn test_node_size_clamped() {
        assert_eq!(activity_node_size(1), 60.0);
        assert_eq!(activity_node_size(400), 100.0);
        assert!((activity_node_size(200) - 200f64.sqrt() * 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_tree_levels() {
        let mut record = ActivityRecord::new("2023-07-01", "Study Circle", 5);
        record.sequence = vec![
            step("Prayer", None, Some("Unity")),
            step("Study", Some("Book 1"), None),
        ];
        record.material_used = Some("Book 1".to_string());
        record.service_project_type = Some("Garden".to_string());

        let tree = build_set_tree(&record);
        assert_eq!(tree.node("Study Circle").unwrap().label, "SC");
        assert_eq!(tree.nodes_at_level(1).count(), 2);
        // Unity, Book 1, Garden; the repeated Book 1 is not drawn twice
        assert_eq!(tree.nodes_at_level(2).count(), 3);
        assert!(tree.has_edge("Study Circle", "action_0"));
        assert_eq!(tree.node("action_0").unwrap().label, "Prayer");
        assert!(tree.has_edge("action_0", "env_0"));
        assert!(tree.has_edge("action_1", "env_1"));
        assert!(tree.has_edge("action_1", "env_2"));
        assert_eq!(tree.node("env_2").unwrap().label, "Garden");
    }

    #[test]
    fn test_set_tree_without_sequence() {
        let mut record = ActivityRecord::new("2023-07-01", "Home Visit", 2);
        record.material_used = Some("Flyer".to_string());

        let tree = build_set_tree(&record);
        assert_eq!(tree.nodes.len(), 2);
        assert!(tree.has_edge("Home Visit", "env_0"));
    }

    #[test]
    fn test_set_tree_action_named_env() {
        let mut record = ActivityRecord::new("2023-07-01", "JYG", 4);
        record.sequence = vec![step("env", Some("Workbook"), None)];

        let tree = build_set_tree(&record);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.node("action_0").unwrap().label, "env");
        assert_eq!(tree.node("env_0").unwrap().label, "Workbook");
        assert!(tree.has_edge("action_0", "env_0"));
        assert!(!tree.has_edge("env_0", "env_0"));
    }

    #[test]
    fn test_set_trees_keep_order() {
        let records = vec![
            ActivityRecord::new("2023-07-01", "JYG", 3),
            ActivityRecord::new("2023-07-01", "Nucleus", 3),
        ];
        let trees = build_set_trees(&records);
        assert_eq!(trees[0].nodes[0].label, "JYG");
        assert_eq!(trees[1].nodes[0].label, "NUC");
    }

    #[test]
    fn test_sum_dag_restricts_edges() {
        let mut a = ActivityRecord::new("2023-07-01", "JYG", 4);
        a.sequence = vec![step("Prayer", Some("Book 1"), None)];
        let mut b = ActivityRecord::new("2023-07-01", "Devotional", 9);
        b.sequence = vec![step("Prayer", None, None), step("Music", Some("Songbook"), None)];

        let merged = merge_activities(&[a, b]);
        let dag = build_sum_dag(&merged);

        assert_eq!(dag.nodes_at_level(0).count(), 2);
        assert_eq!(dag.nodes_at_level(1).count(), 2);
        assert!(dag.has_edge("activity_0", "action_0"));
        assert!(dag.has_edge("activity_1", "action_0"));
        assert!(!dag.has_edge("activity_0", "action_1"));

        // Book 1 only through the JYG's Prayer; Songbook only through Music
        assert!(dag.has_edge("action_0", "env_0"));
        assert!(!dag.has_edge("action_1", "env_0"));
        assert!(dag.has_edge("action_1", "env_1"));
        assert!(!dag.has_edge("action_0", "env_1"));

        assert_eq!(
            dag.node("env_0").unwrap().color,
            activity_color(&ActivityType::Jyg)
        );
        assert_ne!(
            dag.node("action_0").unwrap().color,
            activity_color(&ActivityType::Jyg)
        );
    }

    #[test]
    fn test_activity_logs() {
        let mut record = ActivityRecord::new("2023-07-01", "JYG", 4);
        record.sequence = vec![step("Prayer", None, Some("Service")), step("Games", None, None)];
        assert_eq!(
            set_activity_log(&record),
            vec!["Prayer - Service", "Games - N/A"]
        );

        let merged = merge_activities(&[record]);
        let log = sum_activity_log(&merged);
        assert_eq!(log[0], "Activities: JYG");
        assert_eq!(log[3], "Total Participants: 4");
    }
}
