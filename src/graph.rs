use std::collections::HashMap;

use crate::ir::{Graph, Link, Node};
use crate::normalize::Path;
use crate::stages::StageCatalog;

/// Node identity for a category value at a path position.
///
/// Outcomes use their raw text so the same outcome reached through paths of
/// different lengths lands on one node. Everything else appends the position
/// and the text length (UTF-16 units). The suffix keeps equal text at
/// different stages apart but is not collision-free: `"z"` at position
/// 100000000011 and `"z1000000000"` at position 1 share an identity.
pub fn node_identity(text: &str, position: usize, catalog: &StageCatalog) -> String {
    if catalog.is_outcome(text) {
        return text.to_string();
    }
    let len = text.encode_utf16().count();
    format!("{text}{position}{len}")
}

/// Builds the flow graph from normalized paths. Nodes are registered in
/// first-seen order; every consecutive pair in a path becomes its own link.
pub fn build(paths: &[Path], catalog: &StageCatalog) -> Graph {
    let mut graph = Graph::new();
    let mut id_to_idx: HashMap<String, usize> = HashMap::new();

    let mut intern = |graph: &mut Graph, text: &str, position: usize| -> usize {
        let id = node_identity(text, position, catalog);
        if let Some(&idx) = id_to_idx.get(&id) {
            return idx;
        }
        let idx = graph.nodes.len();
        graph.nodes.push(Node {
            id: id.clone(),
            name: text.to_string(),
        });
        id_to_idx.insert(id, idx);
        idx
    };

    for path in paths.iter().filter(|path| path.has_links()) {
        for (position, pair) in path.stages.windows(2).enumerate() {
            let source = intern(&mut graph, &pair[0], position);
            let target = intern(&mut graph, &pair[1], position + 1);
            graph.links.push(Link {
                source,
                target,
                value: path.value,
            });
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageDescription;
    use pretty_assertions::assert_eq;

    fn path(stages: &[&str], value: f64) -> Path {
        Path {
            stages: stages.iter().map(|s| s.to_string()).collect(),
            value,
        }
    }

    fn outcome_catalog() -> StageCatalog {
        StageCatalog::new(
            vec![
                StageDescription::new("A", "A ok", "A failed"),
                StageDescription::new("OUTCOME", "Success", "Fail"),
            ],
            vec!["Success".to_string(), "Fail".to_string()],
            vec!["A".to_string(), "OUTCOME".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn emits_one_link_per_consecutive_pair() {
        let catalog = StageCatalog::default();
        let graph = build(&[path(&["a", "b", "c", "d"], 2.0)], &catalog);
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.links.iter().all(|link| link.value == 2.0));
    }

    #[test]
    fn short_paths_are_skipped() {
        let catalog = StageCatalog::default();
        let graph = build(&[path(&["only"], 5.0), path(&[], 1.0)], &catalog);
        assert!(graph.is_empty());
        assert!(graph.links.is_empty());
    }

    #[test]
    fn repeated_text_in_one_path_stays_distinct() {
        let catalog = StageCatalog::default();
        let graph = build(&[path(&["x", "x", "x"], 1.0)], &catalog);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x01", "x11", "x21"]);
    }

    #[test]
    fn outcomes_merge_across_path_lengths() {
        let catalog = outcome_catalog();
        let graph = build(
            &[path(&["a", "Success"], 1.0), path(&["a", "b", "c", "Success"], 2.0)],
            &catalog,
        );
        let success: Vec<usize> = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.name == "Success")
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(success.len(), 1);
        assert_eq!(graph.nodes[success[0]].id, "Success");
        assert_eq!(graph.node_value(success[0]), 3.0);
    }

    #[test]
    fn parallel_links_are_not_merged() {
        let catalog = outcome_catalog();
        let graph = build(
            &[path(&["X", "Fail"], 1.0), path(&["X", "Fail"], 4.0)],
            &catalog,
        );
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 2);
        assert_eq!(graph.node_value(0), 5.0);
    }

    #[test]
    fn end_to_end_two_outcomes() {
        let catalog = outcome_catalog();
        let graph = build(
            &[path(&["X", "Success"], 10.0), path(&["X", "Fail"], 5.0)],
            &catalog,
        );
        let names: Vec<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Success", "Fail"]);
        assert_eq!(
            graph.links,
            vec![
                Link { source: 0, target: 1, value: 10.0 },
                Link { source: 0, target: 2, value: 5.0 },
            ]
        );
        assert_eq!(graph.node_value(0), 15.0);
    }

    #[test]
    fn equal_text_at_different_positions_gets_distinct_ids() {
        let catalog = StageCatalog::default();
        assert_ne!(
            node_identity("Eligible", 0, &catalog),
            node_identity("Eligible", 2, &catalog)
        );
    }

    #[test]
    fn suffix_collision_is_possible() {
        let catalog = StageCatalog::default();
        let first = node_identity("z", 100_000_000_011, &catalog);
        let second = node_identity("z1000000000", 1, &catalog);
        assert_eq!(first, "z1000000000111");
        assert_eq!(first, second);
    }

    #[test]
    fn length_counts_utf16_units() {
        let catalog = StageCatalog::default();
        assert_eq!(node_identity("é", 0, &catalog), "é01");
        assert_eq!(node_identity("😀", 3, &catalog), "😀32");
    }
}
