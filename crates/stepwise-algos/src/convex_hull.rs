// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Convex hull of integer points: Graham scan and Jarvis march.
//!
//! All geometry is exact integer arithmetic. Orientation uses the y-up
//! convention; both algorithms emit the hull counter-clockwise. Collinear
//! points on a hull edge are dropped.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Most points accepted.
pub const MAX_POINTS: usize = 50;
/// Coordinates are limited to `-MAX_COORD..=MAX_COORD`.
pub const MAX_COORD: i64 = 10_000;

const COUNTERS: &[&str] = &["comparisons"];

/// A lattice point. Its id in snapshots is its input position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i64,
    /// Vertical coordinate (up is positive).
    pub y: i64,
}

impl Point {
    /// Point at `(x, y)`.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Turn direction of `p -> q -> r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Turn {
    Collinear,
    Clockwise,
    CounterClockwise,
}

fn cross(p: Point, q: Point, r: Point) -> i64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

fn turn(p: Point, q: Point, r: Point) -> Turn {
    match cross(p, q, r).cmp(&0) {
        Ordering::Equal => Turn::Collinear,
        Ordering::Less => Turn::Clockwise,
        Ordering::Greater => Turn::CounterClockwise,
    }
}

fn dist2(a: Point, b: Point) -> i64 {
    (a.x - b.x).pow(2) + (a.y - b.y).pow(2)
}

/// Hull construction strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HullAlgorithm {
    /// Sort by polar angle, then scan with a stack.
    Graham,
    /// Gift wrapping from the leftmost point.
    Jarvis,
}

impl HullAlgorithm {
    /// Every algorithm, in display order.
    pub const ALL: [Self; 2] = [Self::Graham, Self::Jarvis];

    /// Stable identifier used by executors and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Graham => "graham-scan",
            Self::Jarvis => "jarvis-march",
        }
    }
}

impl fmt::Display for HullAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HullAlgorithm {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == key || a.name().split('-').next() == Some(key.as_str()))
            .ok_or_else(|| InputError::Invalid(format!("Unknown convex hull algorithm `{s}`")))
    }
}

/// What a hull snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HullStep {
    /// Input as given.
    #[default]
    Init,
    /// Picked the starting point.
    Anchor,
    /// Sorted by polar angle.
    Sorted,
    /// Tested a candidate.
    Check,
    /// Pushed or selected a hull point.
    Add,
    /// Popped a point that made a non-left turn.
    Remove,
    /// Finished.
    Done,
}

/// Snapshot payload for hull traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HullState {
    /// Input points; ids are positions in this vector.
    pub points: Vec<Point>,
    /// Processing order (Graham: angle-sorted ids; Jarvis: input order).
    pub order: Vec<usize>,
    /// Current hull (or stack) ids.
    pub hull: Vec<usize>,
    /// Starting point id.
    pub anchor: Option<usize>,
    /// Point being processed.
    pub current: Option<usize>,
    /// Point being tested against the current one.
    pub checking: Option<usize>,
    /// Kind of step.
    pub step: HullStep,
}

/// Executor for one [`HullAlgorithm`] over a point list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvexHullExecutor {
    algorithm: HullAlgorithm,
}

impl ConvexHullExecutor {
    /// Executor for `algorithm`.
    #[must_use]
    pub fn new(algorithm: HullAlgorithm) -> Self {
        Self { algorithm }
    }
}

fn validate(points: &[Point]) -> Result<(), InputError> {
    if points.len() < 3 {
        return Err(InputError::TooFew {
            min: 3,
            what: "points",
            purpose: "convex hull",
        });
    }
    InputError::check_len("point set", points.len(), MAX_POINTS)?;
    for p in points {
        InputError::check_range("x", p.x, -MAX_COORD, MAX_COORD)?;
        InputError::check_range("y", p.y, -MAX_COORD, MAX_COORD)?;
    }
    for (i, p) in points.iter().enumerate() {
        if points[..i].contains(p) {
            return Err(InputError::Invalid(format!("Duplicate point {p}")));
        }
    }
    if points
        .iter()
        .all(|&r| turn(points[0], points[1], r) == Turn::Collinear)
    {
        return Err(InputError::Invalid(
            "All points are collinear; the hull has no area".to_owned(),
        ));
    }
    Ok(())
}

impl Executor for ConvexHullExecutor {
    type Input = Vec<Point>;
    type State = HullState;

    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn run(&self, input: &Vec<Point>) -> Trace<HullState> {
        if let Err(e) = validate(input) {
            return reject(&e, HullState::default());
        }
        let mut run = HullRun::new(input.clone());
        match self.algorithm {
            HullAlgorithm::Graham => run.graham(),
            HullAlgorithm::Jarvis => run.jarvis(),
        }
        run.rec.finish()
    }
}

struct HullRun {
    state: HullState,
    rec: TraceRecorder<HullState>,
}

impl HullRun {
    fn new(points: Vec<Point>) -> Self {
        let state = HullState {
            order: (0..points.len()).collect(),
            points,
            ..HullState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!("{} input points", state.points.len()),
            state.clone(),
            COUNTERS,
        );
        Self { state, rec }
    }

    fn snap(&mut self, description: String, step: HullStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn pt(&self, id: usize) -> Point {
        self.state.points[id]
    }

    /// Lowest `key`, first index on ties.
    fn extreme(&mut self, key: impl Fn(Point) -> (i64, i64)) -> usize {
        let mut best = 0;
        for i in 1..self.state.points.len() {
            self.rec.count("comparisons");
            if key(self.pt(i)) < key(self.pt(best)) {
                best = i;
            }
        }
        best
    }

    fn graham(&mut self) {
        let anchor = self.extreme(|p| (p.y, p.x));
        let a = self.pt(anchor);
        self.state.anchor = Some(anchor);
        self.snap(format!("Found bottom-most point P{anchor} at {a}"), HullStep::Anchor);

        let points = self.state.points.clone();
        let mut rest: Vec<usize> = (0..points.len()).filter(|&i| i != anchor).collect();
        let mut compared = 0_u64;
        // Every other point lies in the upper half-plane of the anchor, so
        // the cross product orders them by angle; ties go nearest first.
        rest.sort_by(|&i, &j| {
            compared += 1;
            let (p, q) = (points[i], points[j]);
            cross(a, q, p)
                .cmp(&0)
                .then_with(|| dist2(a, p).cmp(&dist2(a, q)))
        });
        self.rec.count_by("comparisons", compared);
        self.state.order = std::iter::once(anchor).chain(rest).collect();
        self.snap(
            "Sorted points by polar angle around the bottom-most point".to_owned(),
            HullStep::Sorted,
        );

        for k in 0..self.state.order.len() {
            let id = self.state.order[k];
            self.state.current = Some(id);
            while let [.., second, top] = self.state.hull[..] {
                self.rec.count("comparisons");
                if turn(self.pt(second), self.pt(top), self.pt(id)) == Turn::CounterClockwise {
                    break;
                }
                self.state.hull.pop();
                self.snap(
                    format!("Removed P{top}: P{second} -> P{top} -> P{id} is not a left turn"),
                    HullStep::Remove,
                );
            }
            self.state.hull.push(id);
            self.snap(format!("Added P{id} to hull"), HullStep::Add);
        }
        self.state.current = None;
        let n = self.state.hull.len();
        self.snap(format!("Graham scan complete; hull has {n} points"), HullStep::Done);
    }

    fn jarvis(&mut self) {
        let start = self.extreme(|p| (p.x, p.y));
        self.state.anchor = Some(start);
        let s = self.pt(start);
        self.snap(format!("Found leftmost point P{start} at {s}"), HullStep::Anchor);

        let n = self.state.points.len();
        let mut current = start;
        // A hull never has more than n vertices.
        for _ in 0..n {
            self.state.hull.push(current);
            self.state.current = Some(current);
            let mut next = usize::from(current == 0);
            for i in 0..n {
                if i == current || i == next {
                    continue;
                }
                self.rec.count("comparisons");
                let (c, nx, p) = (self.pt(current), self.pt(next), self.pt(i));
                let better = match turn(c, nx, p) {
                    Turn::Clockwise => true,
                    Turn::Collinear => dist2(c, p) > dist2(c, nx),
                    Turn::CounterClockwise => false,
                };
                if better {
                    next = i;
                }
                self.state.checking = Some(i);
                self.snap(
                    format!("From P{current}, checking P{i}; best candidate is P{next}"),
                    HullStep::Check,
                );
            }
            self.state.checking = None;
            current = next;
            if current == start {
                break;
            }
            self.state.current = Some(current);
            self.snap(format!("Selected P{current} as next hull point"), HullStep::Add);
        }
        self.state.current = None;
        let h = self.state.hull.len();
        self.snap(format!("Jarvis march complete; hull has {h} points"), HullStep::Done);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn square_with_centre() -> Vec<Point> {
        vec![
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(2, 2),
            Point::new(4, 4),
            Point::new(0, 4),
            Point::new(2, 0),
        ]
    }

    #[test]
    fn graham_drops_interior_and_edge_points() {
        let t = ConvexHullExecutor::new(HullAlgorithm::Graham).run(&square_with_centre());
        assert_eq!(t.final_state().hull, vec![0, 1, 3, 4]);
        assert_eq!(t.last().state.step, HullStep::Done);
    }

    #[test]
    fn jarvis_walks_counter_clockwise_from_leftmost() {
        let t = ConvexHullExecutor::new(HullAlgorithm::Jarvis).run(&square_with_centre());
        assert_eq!(t.final_state().hull, vec![0, 1, 3, 4]);
    }

    #[test]
    fn both_algorithms_agree_on_vertex_sets() {
        let pts: Vec<Point> = [(3, 1), (-2, 5), (7, -3), (0, 0), (4, 4), (-5, -1), (1, 8), (2, 2)]
            .into_iter()
            .map(|(x, y)| Point::new(x, y))
            .collect();
        let mut g = ConvexHullExecutor::new(HullAlgorithm::Graham).run(&pts).final_state().hull.clone();
        let mut j = ConvexHullExecutor::new(HullAlgorithm::Jarvis).run(&pts).final_state().hull.clone();
        g.sort_unstable();
        j.sort_unstable();
        assert_eq!(g, j);
    }

    #[test]
    fn fewer_than_three_points_is_rejected() {
        let t = ConvexHullExecutor::new(HullAlgorithm::Graham).run(&vec![Point::new(0, 0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].description, "Need at least 3 points for convex hull");
    }

    #[test]
    fn collinear_and_duplicate_inputs_are_rejected() {
        let line = vec![Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)];
        assert_eq!(ConvexHullExecutor::new(HullAlgorithm::Jarvis).run(&line).len(), 1);
        let dup = vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 0)];
        let t = ConvexHullExecutor::new(HullAlgorithm::Graham).run(&dup);
        assert_eq!(t[0].description, "Duplicate point (0, 0)");
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("graham".parse::<HullAlgorithm>().unwrap(), HullAlgorithm::Graham);
        assert_eq!("jarvis-march".parse::<HullAlgorithm>().unwrap(), HullAlgorithm::Jarvis);
    }
}
