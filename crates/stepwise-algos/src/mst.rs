// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimum spanning trees: Kruskal and Prim.
//!
//! Kruskal stable-sorts edges by weight (input order breaks ties) and keeps
//! an edge when a disjoint-set forest says its endpoints differ. Prim grows
//! from node 0, taking the lightest edge that crosses the cut; ties go to
//! the lower edge index. On a disconnected graph Kruskal yields a spanning
//! forest and Prim stops at the component of node 0.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::wide;

/// Most nodes accepted.
pub const MAX_GRAPH_NODES: usize = 12;
/// Most edges accepted.
pub const MAX_GRAPH_EDGES: usize = 40;
/// Heaviest edge accepted.
pub const MAX_WEIGHT: u32 = 99;

const COUNTERS: &[&str] = &["edges_considered", "edges_accepted"];

/// An undirected weighted edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// One endpoint.
    pub from: usize,
    /// Other endpoint.
    pub to: usize,
    /// Weight `1..=MAX_WEIGHT`.
    pub weight: u32,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) w={}", self.from, self.to, self.weight)
    }
}

impl FromStr for Edge {
    type Err = InputError;

    /// Accepts `A-B:W`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || InputError::Parse {
            input: s.to_owned(),
            reason: "expected `A-B:W`".to_owned(),
        };
        let (ends, weight) = s.trim().split_once(':').ok_or_else(parse_err)?;
        let (a, b) = ends.split_once('-').ok_or_else(parse_err)?;
        Ok(Self {
            from: a.trim().parse().map_err(|_| parse_err())?,
            to: b.trim().parse().map_err(|_| parse_err())?,
            weight: weight.trim().parse().map_err(|_| parse_err())?,
        })
    }
}

/// Weighted undirected graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes are `0..nodes`.
    pub nodes: usize,
    /// Edge list; an edge's id is its position.
    pub edges: Vec<Edge>,
}

impl Graph {
    pub(crate) fn validate(&self) -> Result<(), InputError> {
        InputError::check_range("node count", wide(self.nodes), 2, wide(MAX_GRAPH_NODES))?;
        InputError::check_len("edge list", self.edges.len(), MAX_GRAPH_EDGES)?;
        let last = wide(self.nodes) - 1;
        for e in &self.edges {
            InputError::check_range("node", wide(e.from), 0, last)?;
            InputError::check_range("node", wide(e.to), 0, last)?;
            InputError::check_range("weight", e.weight.into(), 1, MAX_WEIGHT.into())?;
            if e.from == e.to {
                return Err(InputError::Invalid(format!(
                    "self-loop on node {} is not allowed",
                    e.from
                )));
            }
        }
        Ok(())
    }
}

/// Spanning tree strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MstAlgorithm {
    /// Global edge order plus disjoint sets.
    Kruskal,
    /// Grow one tree across the cut.
    Prim,
}

impl MstAlgorithm {
    /// Every algorithm, in display order.
    pub const ALL: [Self; 2] = [Self::Kruskal, Self::Prim];

    /// Stable identifier used by executors and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Kruskal => "kruskal",
            Self::Prim => "prim",
        }
    }
}

impl FromStr for MstAlgorithm {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| InputError::Invalid(format!("Unknown spanning tree algorithm `{s}`")))
    }
}

/// What an MST snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MstStep {
    /// Input graph.
    #[default]
    Init,
    /// Edges sorted by weight.
    Sorted,
    /// Looking at an edge.
    Consider,
    /// Edge joined the tree.
    Accept,
    /// Edge would close a cycle.
    Reject,
    /// Finished.
    Done,
}

/// Snapshot payload for MST traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MstState {
    /// Node count.
    pub nodes: usize,
    /// Edge list; ids are positions.
    pub edges: Vec<Edge>,
    /// Edge ids in processing order (Kruskal) or input order (Prim).
    pub order: Vec<usize>,
    /// Edge under consideration.
    pub current: Option<usize>,
    /// Accepted edge ids, in acceptance order.
    pub tree: Vec<usize>,
    /// Component representative of each node.
    pub components: Vec<usize>,
    /// Nodes already in Prim's tree.
    pub visited: Vec<bool>,
    /// Sum of accepted weights.
    pub total_weight: u32,
    /// Kind of step.
    pub step: MstStep,
}

/// Executor for one [`MstAlgorithm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MstExecutor {
    algorithm: MstAlgorithm,
}

impl MstExecutor {
    /// Executor for `algorithm`.
    #[must_use]
    pub fn new(algorithm: MstAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl Executor for MstExecutor {
    type Input = Graph;
    type State = MstState;

    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn run(&self, input: &Graph) -> Trace<MstState> {
        if let Err(e) = input.validate() {
            return reject(&e, MstState::default());
        }
        let state = MstState {
            nodes: input.nodes,
            edges: input.edges.clone(),
            order: (0..input.edges.len()).collect(),
            components: (0..input.nodes).collect(),
            visited: vec![false; input.nodes],
            ..MstState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!("Graph with {} nodes and {} edges", input.nodes, input.edges.len()),
            state.clone(),
            COUNTERS,
        );
        let mut run = MstRun {
            parent: (0..input.nodes).collect(),
            rank: vec![0; input.nodes],
            state,
            rec,
        };
        match self.algorithm {
            MstAlgorithm::Kruskal => run.kruskal(),
            MstAlgorithm::Prim => run.prim(),
        }
        run.rec.finish()
    }
}

struct MstRun {
    parent: Vec<usize>,
    rank: Vec<u32>,
    state: MstState,
    rec: TraceRecorder<MstState>,
}

impl MstRun {
    fn snap(&mut self, description: String, step: MstStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    fn refresh_components(&mut self) {
        self.state.components = (0..self.parent.len()).map(|x| self.find(x)).collect();
    }

    fn accept(&mut self, id: usize) {
        let e = self.state.edges[id];
        self.state.tree.push(id);
        self.state.total_weight += e.weight;
        self.rec.count("edges_accepted");
        let total = self.state.total_weight;
        self.snap(format!("Added edge {e} to the tree; total weight {total}"), MstStep::Accept);
    }

    fn kruskal(&mut self) {
        let edges = self.state.edges.clone();
        // Stable: equal weights keep input order.
        self.state.order.sort_by_key(|&id| edges[id].weight);
        self.snap("Sorted edges by weight".to_owned(), MstStep::Sorted);
        let target = self.state.nodes - 1;
        for k in 0..self.state.order.len() {
            if self.state.tree.len() == target {
                break;
            }
            let id = self.state.order[k];
            let e = edges[id];
            self.state.current = Some(id);
            self.rec.count("edges_considered");
            self.snap(format!("Considering edge {e}"), MstStep::Consider);
            if self.union(e.from, e.to) {
                self.refresh_components();
                self.accept(id);
            } else {
                self.snap(format!("Rejected edge {e}: it would close a cycle"), MstStep::Reject);
            }
        }
        self.state.current = None;
        self.done(target);
    }

    fn prim(&mut self) {
        let edges = self.state.edges.clone();
        let target = self.state.nodes - 1;
        self.state.visited[0] = true;
        self.snap("Starting from node 0".to_owned(), MstStep::Init);
        while self.state.tree.len() < target {
            let crossing = edges
                .iter()
                .enumerate()
                .filter(|(_, e)| self.state.visited[e.from] != self.state.visited[e.to])
                .min_by_key(|&(id, e)| (e.weight, id));
            let Some((id, &e)) = crossing else { break };
            self.state.current = Some(id);
            self.rec.count("edges_considered");
            self.snap(format!("Lightest edge crossing the cut is {e}"), MstStep::Consider);
            self.state.visited[e.from] = true;
            self.state.visited[e.to] = true;
            self.union(e.from, e.to);
            self.refresh_components();
            self.accept(id);
        }
        self.state.current = None;
        self.done(target);
    }

    fn done(&mut self, target: usize) {
        let total = self.state.total_weight;
        let got = self.state.tree.len();
        let description = if got == target {
            format!("Minimum spanning tree complete: {got} edges, total weight {total}")
        } else {
            format!("Graph is disconnected: spanning forest has {got} edges, total weight {total}")
        };
        self.snap(description, MstStep::Done);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn graph(nodes: usize, edges: &[&str]) -> Graph {
        Graph {
            nodes,
            edges: edges.iter().map(|e| e.parse().unwrap()).collect(),
        }
    }

    fn sample() -> Graph {
        graph(
            5,
            &["0-1:2", "0-3:6", "1-2:3", "1-3:8", "1-4:5", "2-4:7", "3-4:9"],
        )
    }

    #[test]
    fn kruskal_and_prim_agree_on_weight() {
        let k = MstExecutor::new(MstAlgorithm::Kruskal).run(&sample());
        let p = MstExecutor::new(MstAlgorithm::Prim).run(&sample());
        assert_eq!(k.final_state().total_weight, 16);
        assert_eq!(p.final_state().total_weight, 16);
        assert_eq!(k.final_state().tree, vec![0, 2, 4, 1]);
        assert_eq!(p.final_state().tree, vec![0, 2, 4, 1]);
    }

    #[test]
    fn kruskal_rejects_cycle_edges() {
        let t = MstExecutor::new(MstAlgorithm::Kruskal).run(&graph(3, &["0-1:1", "1-2:1", "0-2:1"]));
        assert_eq!(t.final_state().tree, vec![0, 1]);
        assert_eq!(t.last().metrics.get("edges_considered"), 2);
        let t = MstExecutor::new(MstAlgorithm::Kruskal)
            .run(&graph(4, &["0-1:1", "1-2:2", "0-2:1", "2-3:5"]));
        assert!(t.iter().any(|s| s.state.step == MstStep::Reject));
    }

    #[test]
    fn disconnected_graphs_are_reported() {
        let g = graph(4, &["0-1:1", "2-3:1"]);
        let k = MstExecutor::new(MstAlgorithm::Kruskal).run(&g);
        assert_eq!(k.final_state().tree.len(), 2);
        assert!(k.last().description.starts_with("Graph is disconnected"));
        let p = MstExecutor::new(MstAlgorithm::Prim).run(&g);
        assert_eq!(p.final_state().tree.len(), 1);
    }

    #[test]
    fn bad_graphs_are_rejected() {
        assert_eq!(MstExecutor::new(MstAlgorithm::Prim).run(&graph(3, &["0-0:1"])).len(), 1);
        let t = MstExecutor::new(MstAlgorithm::Prim).run(&graph(3, &["0-7:1"]));
        assert_eq!(t[0].description, "node 7 is out of range [0, 2]");
        assert!("0-1".parse::<Edge>().is_err());
    }
}
