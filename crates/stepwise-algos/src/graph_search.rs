// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph search from a start node: depth-first, breadth-first and Dijkstra.
//!
//! All three read the undirected [`Graph`] used by the spanning tree
//! executors and scan neighbours in ascending node id (parallel edges by
//! edge id). Depth-first search keeps an explicit stack and pushes
//! neighbours in reverse so the smallest id is popped first. Dijkstra
//! settles the unvisited node with the lowest `(distance, node id)`.
//! Nodes outside the start node's component are never visited.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::mst::{Edge, Graph};
use crate::wide;

/// Traversal strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchAlgorithm {
    /// Depth-first, explicit stack.
    Dfs,
    /// Breadth-first, FIFO queue.
    Bfs,
    /// Single-source shortest paths over positive weights.
    Dijkstra,
}

impl SearchAlgorithm {
    /// Every algorithm, in display order.
    pub const ALL: [Self; 3] = [Self::Dfs, Self::Bfs, Self::Dijkstra];

    /// Stable identifier used by executors and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dfs => "dfs",
            Self::Bfs => "bfs",
            Self::Dijkstra => "dijkstra",
        }
    }

    fn counters(self) -> &'static [&'static str] {
        match self {
            Self::Dfs | Self::Bfs => &["visits", "edges_explored"],
            Self::Dijkstra => &["visits", "edges_explored", "relaxations"],
        }
    }
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchAlgorithm {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| InputError::Invalid(format!("Unknown graph search `{s}`")))
    }
}

/// A graph and the node to search from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInput {
    /// Graph to search.
    pub graph: Graph,
    /// Start node.
    pub start: usize,
}

/// What a search snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStep {
    /// Input graph and start node.
    #[default]
    Init,
    /// A node was visited (settled, for Dijkstra).
    Visit,
    /// An edge put a node on the stack or queue.
    Explore,
    /// An edge shortened a tentative distance.
    Relax,
    /// Finished.
    Done,
}

/// Snapshot payload for graph search traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    /// Node count.
    pub nodes: usize,
    /// Edge list; ids are positions.
    pub edges: Vec<Edge>,
    /// Start node.
    pub start: usize,
    /// Node being visited.
    pub current: Option<usize>,
    /// Edge being followed.
    pub current_edge: Option<usize>,
    /// Per-node visited flag.
    pub visited: Vec<bool>,
    /// Nodes in visiting order.
    pub order: Vec<usize>,
    /// Stack bottom to top (DFS), queue front to back (BFS), or unsettled
    /// reachable nodes by `(distance, id)` (Dijkstra).
    pub frontier: Vec<usize>,
    /// Distance from the start: search-tree depth for DFS and BFS, path
    /// weight for Dijkstra. `None` is unreached.
    pub distances: Vec<Option<u32>>,
    /// Search-tree parent of each reached node.
    pub parents: Vec<Option<usize>>,
    /// Kind of step.
    pub step: SearchStep,
}

impl SearchState {
    /// Nodes from the start to `node` along parent links, or `None` when
    /// `node` was never reached.
    #[must_use]
    pub fn path_to(&self, node: usize) -> Option<Vec<usize>> {
        if node != self.start && self.parents.get(node).copied().flatten().is_none() {
            return None;
        }
        let mut path = vec![node];
        let mut cur = node;
        while let Some(parent) = self.parents[cur] {
            path.push(parent);
            cur = parent;
        }
        path.reverse();
        Some(path)
    }
}

/// Executor for one [`SearchAlgorithm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphSearchExecutor {
    algorithm: SearchAlgorithm,
}

impl GraphSearchExecutor {
    /// Executor for `algorithm`.
    #[must_use]
    pub fn new(algorithm: SearchAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl Executor for GraphSearchExecutor {
    type Input = SearchInput;
    type State = SearchState;

    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn run(&self, input: &SearchInput) -> Trace<SearchState> {
        let graph = &input.graph;
        let checked = graph.validate().and_then(|()| {
            InputError::check_range("start node", wide(input.start), 0, wide(graph.nodes) - 1)
        });
        if let Err(e) = checked {
            return reject(&e, SearchState::default());
        }
        let n = graph.nodes;
        let state = SearchState {
            nodes: n,
            edges: graph.edges.clone(),
            start: input.start,
            visited: vec![false; n],
            distances: vec![None; n],
            parents: vec![None; n],
            ..SearchState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!(
                "Graph with {n} nodes and {} edges; searching from node {}",
                graph.edges.len(),
                input.start
            ),
            state.clone(),
            self.algorithm.counters(),
        );
        let mut run = SearchRun {
            adjacency: adjacency(graph),
            via: vec![None; n],
            state,
            rec,
        };
        match self.algorithm {
            SearchAlgorithm::Dfs => run.dfs(),
            SearchAlgorithm::Bfs => run.bfs(),
            SearchAlgorithm::Dijkstra => run.dijkstra(),
        }
        run.rec.finish()
    }
}

/// `(neighbour, edge id)` lists, ascending.
fn adjacency(graph: &Graph) -> Vec<Vec<(usize, usize)>> {
    let mut adj = vec![Vec::new(); graph.nodes];
    for (id, e) in graph.edges.iter().enumerate() {
        adj[e.from].push((e.to, id));
        adj[e.to].push((e.from, id));
    }
    for list in &mut adj {
        list.sort_unstable();
    }
    adj
}

struct SearchRun {
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Edge each node was reached through.
    via: Vec<Option<usize>>,
    state: SearchState,
    rec: TraceRecorder<SearchState>,
}

impl SearchRun {
    fn snap(&mut self, description: String, step: SearchStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn visit(&mut self, node: usize, description: String) {
        self.state.visited[node] = true;
        self.state.order.push(node);
        self.state.current = Some(node);
        self.state.current_edge = self.via[node];
        self.rec.count("visits");
        self.snap(description, SearchStep::Visit);
    }

    fn reach(&mut self, node: usize, from: usize, edge: usize) {
        self.state.parents[node] = Some(from);
        self.via[node] = Some(edge);
        self.state.current_edge = Some(edge);
    }

    fn dfs(&mut self) {
        let start = self.state.start;
        let mut stack = vec![start];
        self.state.frontier.clone_from(&stack);
        self.state.distances[start] = Some(0);
        self.snap(
            format!("Starting depth-first search from node {start}"),
            SearchStep::Init,
        );
        while let Some(node) = stack.pop() {
            if self.state.visited[node] {
                continue;
            }
            self.state.frontier.clone_from(&stack);
            self.visit(node, format!("Visiting node {node}"));
            let depth = self.state.distances[node].unwrap_or(0);
            let neighbours = self.adjacency[node].clone();
            for &(next, id) in neighbours.iter().rev() {
                if self.state.visited[next] {
                    continue;
                }
                // The last push wins, matching the order nodes are popped.
                self.reach(next, node, id);
                self.state.distances[next] = Some(depth + 1);
                stack.push(next);
                self.state.frontier.clone_from(&stack);
                self.rec.count("edges_explored");
                let e = self.state.edges[id];
                self.snap(
                    format!("Exploring edge {e}: pushed node {next} onto the stack"),
                    SearchStep::Explore,
                );
            }
        }
        self.done_traversal();
    }

    fn bfs(&mut self) {
        let start = self.state.start;
        let mut queue = VecDeque::from([start]);
        let mut discovered = vec![false; self.state.nodes];
        discovered[start] = true;
        self.state.frontier = vec![start];
        self.state.distances[start] = Some(0);
        self.snap(
            format!("Starting breadth-first search from node {start}"),
            SearchStep::Init,
        );
        while let Some(node) = queue.pop_front() {
            self.state.frontier = queue.iter().copied().collect();
            self.visit(node, format!("Visiting node {node}"));
            let depth = self.state.distances[node].unwrap_or(0);
            let neighbours = self.adjacency[node].clone();
            for (next, id) in neighbours {
                if discovered[next] {
                    continue;
                }
                discovered[next] = true;
                self.reach(next, node, id);
                self.state.distances[next] = Some(depth + 1);
                queue.push_back(next);
                self.state.frontier = queue.iter().copied().collect();
                self.rec.count("edges_explored");
                let e = self.state.edges[id];
                self.snap(
                    format!("Exploring edge {e}: queued node {next}"),
                    SearchStep::Explore,
                );
            }
        }
        self.done_traversal();
    }

    fn done_traversal(&mut self) {
        self.state.current = None;
        self.state.current_edge = None;
        self.state.frontier.clear();
        let order = self.state.order.clone();
        let missed = self.state.nodes - order.len();
        let description = if missed == 0 {
            format!("Traversal complete: visited {order:?}")
        } else {
            format!(
                "Traversal complete: visited {order:?}; {missed} node(s) unreachable from node {}",
                self.state.start
            )
        };
        self.snap(description, SearchStep::Done);
    }

    /// Unsettled nodes with a finite distance, nearest first.
    fn refresh_frontier(&mut self) {
        let s = &self.state;
        let mut open: Vec<(u32, usize)> = (0..s.nodes)
            .filter(|&v| !s.visited[v])
            .filter_map(|v| s.distances[v].map(|d| (d, v)))
            .collect();
        open.sort_unstable();
        self.state.frontier = open.into_iter().map(|(_, v)| v).collect();
    }

    fn dijkstra(&mut self) {
        let start = self.state.start;
        self.state.distances[start] = Some(0);
        self.refresh_frontier();
        self.snap(
            format!("Distance to node {start} is 0; every other node starts at infinity"),
            SearchStep::Init,
        );
        while let Some(&node) = self.state.frontier.first() {
            let dist = self.state.distances[node].unwrap_or(0);
            self.state.frontier.remove(0);
            self.visit(node, format!("Settled node {node} at distance {dist}"));
            let neighbours = self.adjacency[node].clone();
            for (next, id) in neighbours {
                if self.state.visited[next] {
                    continue;
                }
                self.rec.count("edges_explored");
                let e = self.state.edges[id];
                let candidate = dist + e.weight;
                let old = self.state.distances[next];
                if old.is_some_and(|d| d <= candidate) {
                    continue;
                }
                self.state.distances[next] = Some(candidate);
                self.reach(next, node, id);
                self.refresh_frontier();
                self.rec.count("relaxations");
                let was = old.map_or_else(|| "infinity".to_owned(), |d| d.to_string());
                self.snap(
                    format!("Relaxed edge {e}: distance to node {next} {was} -> {candidate}"),
                    SearchStep::Relax,
                );
            }
            self.refresh_frontier();
        }
        self.state.current = None;
        self.state.current_edge = None;
        let listed: Vec<String> = self
            .state
            .distances
            .iter()
            .enumerate()
            .map(|(v, d)| d.map_or_else(|| format!("{v}:unreachable"), |d| format!("{v}:{d}")))
            .collect();
        self.snap(
            format!("Shortest distances from node {start}: {}", listed.join(", ")),
            SearchStep::Done,
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn input(nodes: usize, edges: &[&str], start: usize) -> SearchInput {
        SearchInput {
            graph: Graph {
                nodes,
                edges: edges.iter().map(|e| e.parse().unwrap()).collect(),
            },
            start,
        }
    }

    fn sample() -> SearchInput {
        input(5, &["0-1:4", "0-2:1", "2-1:2", "1-3:1", "2-3:5", "3-4:3"], 0)
    }

    fn run(algorithm: SearchAlgorithm, input: &SearchInput) -> Trace<SearchState> {
        GraphSearchExecutor::new(algorithm).run(input)
    }

    #[test]
    fn dfs_goes_deep_in_ascending_order() {
        let t = run(SearchAlgorithm::Dfs, &sample());
        let last = t.final_state();
        assert_eq!(last.order, vec![0, 1, 2, 3, 4]);
        assert_eq!(last.path_to(4), Some(vec![0, 1, 2, 3, 4]));
        assert_eq!(t.last().metrics.get("visits"), 5);
        assert_eq!(last.step, SearchStep::Done);
    }

    #[test]
    fn bfs_goes_level_by_level() {
        let t = run(SearchAlgorithm::Bfs, &sample());
        let last = t.final_state();
        assert_eq!(last.order, vec![0, 1, 2, 3, 4]);
        assert_eq!(last.parents, vec![None, Some(0), Some(0), Some(1), Some(3)]);
        assert_eq!(last.distances, vec![Some(0), Some(1), Some(1), Some(2), Some(3)]);
        assert_eq!(t.last().metrics.get("edges_explored"), 4);
    }

    #[test]
    fn dijkstra_relaxes_to_shortest_distances() {
        let t = run(SearchAlgorithm::Dijkstra, &sample());
        let last = t.final_state();
        assert_eq!(last.distances, vec![Some(0), Some(3), Some(1), Some(4), Some(7)]);
        assert_eq!(last.order, vec![0, 2, 1, 3, 4]);
        assert_eq!(last.path_to(4), Some(vec![0, 2, 1, 3, 4]));
        assert_eq!(t.last().metrics.get("relaxations"), 6);
        assert!(t
            .descriptions()
            .any(|d| d == "Relaxed edge (2, 1) w=2: distance to node 1 4 -> 3"));
        assert_eq!(
            t.last().description,
            "Shortest distances from node 0: 0:0, 1:3, 2:1, 3:4, 4:7"
        );
    }

    #[test]
    fn other_components_are_never_visited() {
        let graph = input(4, &["0-1:1", "2-3:1"], 2);
        for algorithm in SearchAlgorithm::ALL {
            let t = run(algorithm, &graph);
            let last = t.final_state();
            assert_eq!(last.order, vec![2, 3], "{algorithm}");
            assert_eq!(last.path_to(0), None);
            assert_eq!(last.distances[1], None);
        }
        let t = run(SearchAlgorithm::Bfs, &graph);
        assert!(t.last().description.ends_with("2 node(s) unreachable from node 2"));
    }

    #[test]
    fn bad_start_is_rejected() {
        let mut bad = sample();
        bad.start = 9;
        let t = run(SearchAlgorithm::Dijkstra, &bad);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].description, "start node 9 is out of range [0, 4]");
        assert!("astar".parse::<SearchAlgorithm>().is_err());
        assert_eq!("BFS".parse::<SearchAlgorithm>().unwrap(), SearchAlgorithm::Bfs);
    }
}
