use std::collections::{HashMap, HashSet};

use crate::models::TaskDependency;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// In-memory "blocked-by" graph for one owner: task id → ids it is blocked by.
///
/// Built per call from a snapshot of the owner's edges; nothing is cached.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    adj: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(edges: &[TaskDependency]) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.task_id, &edge.blocked_by_id);
        }
        graph
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.adj.entry(from.to_string()).or_default().push(to.to_string());
        self.adj.entry(to.to_string()).or_default();
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Would adding `from -> to` close a cycle?
    ///
    /// The edge is appended for the duration of the search and always removed
    /// before returning, so the graph is unchanged afterwards.
    pub fn would_create_cycle(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let created_from = !self.adj.contains_key(from);
        let created_to = !self.adj.contains_key(to);
        self.adj.entry(from.to_string()).or_default().push(to.to_string());
        self.adj.entry(to.to_string()).or_default();

        // A path to -> ... -> from plus the new edge from -> to is a cycle.
        let cyclic = self.reaches_excluding_last(to, from, from);

        if let Some(targets) = self.adj.get_mut(from) {
            targets.pop();
        }
        if created_from {
            self.adj.remove(from);
        }
        if created_to {
            self.adj.remove(to);
        }
        cyclic
    }

    /// Reachability over the pre-existing edges: the most recently appended
    /// edge out of `new_edge_from` is skipped.
    fn reaches_excluding_last(&self, start: &str, target: &str, new_edge_from: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![start];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(neighbors) = self.adj.get(node) {
                let existing = if node == new_edge_from {
                    &neighbors[..neighbors.len().saturating_sub(1)]
                } else {
                    &neighbors[..]
                };
                for next in existing {
                    if !visited.contains(next.as_str()) {
                        stack.push(next);
                    }
                }
            }
        }
        false
    }

    /// Whole-graph cycle detection with three-color DFS.
    pub fn has_cycle(&self) -> bool {
        let mut color: HashMap<&str, Color> =
            self.adj.keys().map(|k| (k.as_str(), Color::White)).collect();

        for node in self.adj.keys() {
            if color[node.as_str()] == Color::White && self.dfs_back_edge(node, &mut color) {
                return true;
            }
        }
        false
    }

    fn dfs_back_edge<'a>(&'a self, node: &'a str, color: &mut HashMap<&'a str, Color>) -> bool {
        color.insert(node, Color::Gray);
        if let Some(neighbors) = self.adj.get(node) {
            for neighbor in neighbors {
                match color.get(neighbor.as_str()).copied().unwrap_or(Color::White) {
                    Color::Gray => return true,
                    Color::White => {
                        if self.dfs_back_edge(neighbor, color) {
                            return true;
                        }
                    }
                    Color::Black => {}
                }
            }
        }
        color.insert(node, Color::Black);
        false
    }

    /// Everything `start` transitively depends on, without duplicates.
    pub fn all_reachable(&self, start: &str) -> HashSet<String> {
        let mut reached: HashSet<String> = HashSet::new();
        let mut stack: Vec<&str> = match self.adj.get(start) {
            Some(n) => n.iter().map(String::as_str).collect(),
            None => return reached,
        };
        while let Some(node) = stack.pop() {
            if !reached.insert(node.to_string()) {
                continue;
            }
            if let Some(neighbors) = self.adj.get(node) {
                for next in neighbors {
                    if !reached.contains(next) {
                        stack.push(next);
                    }
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(task: &str, blocker: &str) -> TaskDependency {
        TaskDependency {
            task_id: task.into(),
            blocked_by_id: blocker.into(),
        }
    }

    #[test]
    fn test_self_edge_is_cycle() {
        let mut g = DependencyGraph::new();
        assert!(g.would_create_cycle("a", "a"));
    }

    #[test]
    fn test_reverse_edge_is_cycle() {
        let mut g = DependencyGraph::from_edges(&[edge("A", "B")]);
        assert!(g.would_create_cycle("B", "A"));
        assert!(!g.would_create_cycle("B", "C"));
    }

    #[test]
    fn test_transitive_cycle() {
        let mut g = DependencyGraph::from_edges(&[edge("a", "b"), edge("b", "c")]);
        assert!(g.would_create_cycle("c", "a"));
        assert!(!g.would_create_cycle("a", "c"));
    }

    #[test]
    fn test_probe_leaves_graph_unchanged() {
        let mut g = DependencyGraph::from_edges(&[edge("a", "b")]);
        let before = g.node_count();
        assert!(g.would_create_cycle("b", "a"));
        assert!(!g.would_create_cycle("x", "y"));
        assert_eq!(g.node_count(), before);
        assert!(!g.has_cycle());
        assert_eq!(g.all_reachable("a").len(), 1);
        assert!(g.all_reachable("x").is_empty());
    }

    #[test]
    fn test_probe_with_duplicate_existing_edge() {
        // a -> b already exists; probing a -> b again must not see itself.
        let mut g = DependencyGraph::from_edges(&[edge("a", "b")]);
        assert!(!g.would_create_cycle("a", "b"));
        assert_eq!(g.all_reachable("a").len(), 1);
    }

    #[test]
    fn test_has_cycle() {
        let g = DependencyGraph::from_edges(&[edge("b", "a"), edge("c", "b")]);
        assert!(!g.has_cycle());
        let g = DependencyGraph::from_edges(&[edge("b", "a"), edge("c", "b"), edge("a", "c")]);
        assert!(g.has_cycle());
    }

    #[test]
    fn test_has_cycle_in_disconnected_component() {
        let g = DependencyGraph::from_edges(&[edge("a", "b"), edge("x", "y"), edge("y", "x")]);
        assert!(g.has_cycle());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let g = DependencyGraph::from_edges(&[
            edge("d", "b"),
            edge("d", "c"),
            edge("b", "a"),
            edge("c", "a"),
        ]);
        assert!(!g.has_cycle());
        let reach = g.all_reachable("d");
        assert_eq!(reach.len(), 3);
        assert!(reach.contains("a") && reach.contains("b") && reach.contains("c"));
    }

    #[test]
    fn test_reachable_agrees_with_cycle_probe() {
        let edges = [edge("a", "b"), edge("b", "c"), edge("c", "d"), edge("x", "c")];
        let g = DependencyGraph::from_edges(&edges);
        for from in ["a", "b", "c", "d", "x"] {
            for to in ["a", "b", "c", "d", "x"] {
                if from == to {
                    continue;
                }
                let mut probe = g.clone();
                let expected = g.all_reachable(to).contains(from);
                assert_eq!(probe.would_create_cycle(from, to), expected, "{from}->{to}");
            }
        }
    }
}
