// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face discovery over a half-edge graph.
//!
//! Every half-edge is traced into exactly one loop by always taking the
//! smallest clockwise turn at each junction, which keeps the face on the
//! left of the trace. Counter-clockwise loops are rooms (or the inside of
//! islands); clockwise loops are the outer boundaries of connected pieces.
//! After tracing, loops are nested: each counter-clockwise loop under the
//! smallest clockwise loop enclosing it, and each clockwise loop under the
//! smallest room it sits inside without touching. Island outlines thus end
//! up as children of their room, and only outermost boundaries stay roots.

use nalgebra::Point2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::config::LoopConfig;
use crate::geometry::{clockwise_angle, signed_area};
use crate::half_edge::HalfEdgeGraph;
use crate::keys::{EdgeId, HalfEdgeId, LoopId, NodeId};
use crate::loop_data::{set_loop_parent, LoopData};

/// Point rings of a room: its boundary and the islands cut out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipFace {
    pub outer: Vec<Point2<f64>>,
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl ClipFace {
    /// Area of the outer ring minus the areas of the holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| signed_area(h).abs()).sum();
        signed_area(&self.outer).abs() - holes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeClass {
    Inner,
    Outer,
    Isolate,
}

/// Partitions the half-edges of a graph into loops.
#[derive(Debug)]
pub struct LoopFinder {
    graph: HalfEdgeGraph,
    config: LoopConfig,
    out_half_edges: FxHashMap<NodeId, SmallVec<[HalfEdgeId; 4]>>,
    loops: Vec<LoopData>,
}

impl LoopFinder {
    /// Takes ownership of a graph and runs the search.
    ///
    /// Self-loop half-edges are left out of the outgoing map and never
    /// compete in next-edge selection.
    pub fn new(graph: HalfEdgeGraph, config: LoopConfig) -> Self {
        let mut out_half_edges: FxHashMap<NodeId, SmallVec<[HalfEdgeId; 4]>> = FxHashMap::default();
        for (_, pair) in graph.edges() {
            for &he in pair {
                out_half_edges
                    .entry(graph.half_edge(he).from)
                    .or_default()
                    .push(he);
            }
        }

        let mut finder = Self {
            graph,
            config,
            out_half_edges,
            loops: Vec::new(),
        };
        finder.search();
        finder
    }

    /// Traces every half-edge into a loop and assigns loop parents.
    ///
    /// Earlier results are discarded, so running it again on the same graph
    /// gives the same loops.
    pub fn search(&mut self) {
        self.graph.clear_loop_stamps();
        self.loops.clear();

        let starts: Vec<HalfEdgeId> = self
            .graph
            .edges()
            .iter()
            .flat_map(|(_, pair)| pair.iter().copied())
            .collect();
        for start in starts {
            if self.graph.half_edge(start).loop_id.is_none() {
                self.trace_loop(start);
            }
        }

        let self_loops: Vec<HalfEdgeId> = self
            .graph
            .self_loops()
            .iter()
            .flat_map(|(_, pair)| pair.iter().copied())
            .collect();
        for he in self_loops {
            let id = LoopId(self.loops.len());
            let mut lp = LoopData::new(id);
            lp.add_half_edge(he);
            lp.set_closed(true);
            self.graph.half_edge_mut(he).loop_id = Some(id);
            self.loops.push(lp);
        }

        for lp in &mut self.loops {
            lp.recompute_if_dirty(&self.graph);
        }
        self.update_loops_parent();

        debug!(
            loops = self.loops().count(),
            open = self.open_loops().count(),
            half_edges = self.graph.half_edge_count(),
            "loop search finished"
        );
    }

    fn trace_loop(&mut self, start: HalfEdgeId) {
        let id = LoopId(self.loops.len());
        let mut lp = LoopData::new(id);
        let mut current = start;

        loop {
            self.graph.half_edge_mut(current).loop_id = Some(id);
            lp.add_half_edge(current);

            let Some(next) = self.find_next_out_half_edge(current) else {
                warn!(%id, half_edge = %current, "trace stopped at a node without outgoing half-edges");
                break;
            };
            if next == start {
                lp.set_closed(true);
                break;
            }
            if let Some(owner) = self.graph.half_edge(next).loop_id {
                warn!(%id, %owner, half_edge = %next, "trace ran into an already traced half-edge");
                break;
            }
            current = next;
        }

        trace!(%id, len = lp.half_edges().len(), closed = lp.is_closed(), "traced loop");
        self.loops.push(lp);
    }

    /// Picks the outgoing half-edge making the smallest clockwise turn from
    /// the reversed direction of `current`.
    ///
    /// Turns are measured between the curve tangents at the junction; curves
    /// leaving along the same tangent are ordered by their chord directions,
    /// then by registration order. The partner of `current` is only taken
    /// when nothing else leaves the node.
    fn find_next_out_half_edge(&self, current: HalfEdgeId) -> Option<HalfEdgeId> {
        let he = self.graph.half_edge(current);
        let candidates = self.out_half_edges.get(&he.to)?;
        let tol = self.config.angle_tolerance;
        let reference = -he.direction_to;
        let chord_reference = -he.direction;

        let mut best: Option<(HalfEdgeId, f64, f64)> = None;
        for &cand in candidates {
            if Some(cand) == he.partner {
                continue;
            }
            let c = self.graph.half_edge(cand);
            let turn = clockwise_angle(&reference, &c.direction_from, tol);
            let chord_turn = clockwise_angle(&chord_reference, &c.direction, tol);

            let better = match best {
                None => true,
                Some((_, best_turn, best_chord)) => {
                    if (turn - best_turn).abs() > tol {
                        turn < best_turn
                    } else {
                        (chord_turn - best_chord).abs() > tol && chord_turn < best_chord
                    }
                }
            };
            if better {
                best = Some((cand, turn, chord_turn));
            }
        }

        best.map(|(id, _, _)| id)
            .or_else(|| he.partner.filter(|p| candidates.contains(p)))
    }

    /// Builds the nesting tree.
    ///
    /// A counter-clockwise loop takes the smallest clockwise loop enclosing
    /// it that shares no edge with it; if every enclosing clockwise loop
    /// shares edges (a room and the boundary it is drawn against), the
    /// smallest of those is used. A clockwise loop takes the smallest room
    /// enclosing it without sharing an edge. Equal areas resolve to the
    /// earlier loop.
    fn update_loops_parent(&mut self) {
        let assignments: Vec<(LoopId, Option<LoopId>)> = self
            .loops()
            .map(|child| {
                let parent = if child.is_ccw() {
                    self.smallest_container(child, false, true)
                } else {
                    self.smallest_container(child, true, false)
                };
                (child.id(), parent)
            })
            .collect();

        for (child, parent) in assignments {
            set_loop_parent(&mut self.loops, child, parent);
        }
    }

    /// Smallest closed loop of the given orientation enclosing `inner`.
    ///
    /// Containers sharing an edge with `inner` only count when `allow_shared`
    /// is set and no other container exists.
    fn smallest_container(&self, inner: &LoopData, ccw: bool, allow_shared: bool) -> Option<LoopId> {
        let tol = self.config.length_tolerance;
        let mut free: Option<(LoopId, f64)> = None;
        let mut shared: Option<(LoopId, f64)> = None;

        for candidate in self.loops().filter(|l| l.is_ccw() == ccw && l.id() != inner.id()) {
            if !inner.is_in_side_loop(candidate, tol) {
                continue;
            }
            let slot = if !candidate.is_share_some_edge(inner) {
                &mut free
            } else if allow_shared {
                &mut shared
            } else {
                continue;
            };
            let area = candidate.area().abs();
            if slot.map_or(true, |(_, a)| area < a) {
                *slot = Some((candidate.id(), area));
            }
        }
        free.or(shared).map(|(id, _)| id)
    }

    /// Closed loops, in discovery order.
    pub fn loops(&self) -> impl Iterator<Item = &LoopData> + '_ {
        self.loops.iter().filter(|l| l.is_closed())
    }

    /// Traces that never returned to their first half-edge.
    pub fn open_loops(&self) -> impl Iterator<Item = &LoopData> + '_ {
        self.loops.iter().filter(|l| !l.is_closed())
    }

    /// Looks up a loop by id, open or closed.
    pub fn loop_data(&self, id: LoopId) -> Option<&LoopData> {
        self.loops.get(id.index())
    }

    fn closed_loop(&self, id: LoopId) -> Option<&LoopData> {
        self.loop_data(id).filter(|l| l.is_closed())
    }

    /// Clockwise loops without a parent: the outermost boundaries.
    pub fn root_loops(&self) -> Vec<&LoopData> {
        self.loops()
            .filter(|l| l.is_cw() && l.parent().is_none())
            .collect()
    }

    /// Counter-clockwise loops: room and hole candidates.
    pub fn ccw_loops(&self) -> Vec<&LoopData> {
        self.loops().filter(|l| l.is_ccw()).collect()
    }

    fn classify_edges(&self, class: EdgeClass) -> Vec<EdgeId> {
        let orientation = |he: HalfEdgeId| {
            self.graph
                .half_edge(he)
                .loop_id
                .and_then(|id| self.closed_loop(id))
                .map(|l| l.is_ccw())
        };

        self.graph
            .edges()
            .iter()
            .chain(self.graph.self_loops())
            .filter_map(|&(edge_id, [a, b])| {
                let found = match (orientation(a)?, orientation(b)?) {
                    (true, true) => EdgeClass::Inner,
                    (false, false) => EdgeClass::Isolate,
                    _ => EdgeClass::Outer,
                };
                (found == class).then_some(edge_id)
            })
            .collect()
    }

    /// Edges with a room on both sides.
    pub fn inner_edges(&self) -> Vec<EdgeId> {
        self.classify_edges(EdgeClass::Inner)
    }

    /// Edges between a room and a boundary.
    pub fn outer_edges(&self) -> Vec<EdgeId> {
        self.classify_edges(EdgeClass::Outer)
    }

    /// Edges with no room on either side.
    pub fn isolate_edges(&self) -> Vec<EdgeId> {
        self.classify_edges(EdgeClass::Isolate)
    }

    /// Returns the closed loop owning the half-edge from `from` to `to`.
    pub fn half_edge_loop(&self, from: NodeId, to: NodeId) -> Option<&LoopData> {
        let he = self
            .out_half_edges
            .get(&from)?
            .iter()
            .copied()
            .find(|&he| self.graph.half_edge(he).to == to)?;
        self.graph
            .half_edge(he)
            .loop_id
            .and_then(|id| self.closed_loop(id))
    }

    /// Clockwise children of a counter-clockwise loop: the islands to cut
    /// out of the room. Empty if `ccw` is not a closed room loop.
    pub fn loop_holes(&self, ccw: LoopId) -> Vec<LoopId> {
        let Some(room) = self.closed_loop(ccw).filter(|l| l.is_ccw()) else {
            return Vec::new();
        };
        room.children()
            .iter()
            .filter_map(|&id| self.closed_loop(id))
            .filter(|h| h.is_cw())
            .map(|h| h.id())
            .collect()
    }

    /// Outer ring and hole rings of a room loop.
    pub fn clip_face(&self, ccw: LoopId) -> Option<ClipFace> {
        let room = self.closed_loop(ccw).filter(|l| l.is_ccw())?;
        let holes = self
            .loop_holes(ccw)
            .into_iter()
            .filter_map(|id| self.loop_data(id))
            .map(|h| h.discrete_points().to_vec())
            .collect();
        Some(ClipFace {
            outer: room.discrete_points().to_vec(),
            holes,
        })
    }

    pub fn graph(&self) -> &HalfEdgeGraph {
        &self.graph
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use approx::assert_relative_eq;

    /// Adds closed polygon rings to a graph; edge ids follow insertion order.
    fn graph_of(rings: &[&[(f64, f64)]], segments: &[((f64, f64), (f64, f64))]) -> HalfEdgeGraph {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let mut next_id = 0;
        let mut add = |graph: &mut HalfEdgeGraph, a: (f64, f64), b: (f64, f64)| {
            let from = graph.add_node_snapped(Point2::new(a.0, a.1));
            let to = graph.add_node_snapped(Point2::new(b.0, b.1));
            graph.add_edge(EdgeId(next_id), from, to, &Curve::Line, &config);
            next_id += 1;
        };
        for ring in rings {
            for i in 0..ring.len() {
                add(&mut graph, ring[i], ring[(i + 1) % ring.len()]);
            }
        }
        for &(a, b) in segments {
            add(&mut graph, a, b);
        }
        graph
    }

    fn finder(rings: &[&[(f64, f64)]], segments: &[((f64, f64), (f64, f64))]) -> LoopFinder {
        LoopFinder::new(graph_of(rings, segments), LoopConfig::default())
    }

    const RECT: &[(f64, f64)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)];

    #[test]
    fn rectangle_gives_room_and_boundary() {
        let f = finder(&[RECT], &[]);
        let loops: Vec<_> = f.loops().collect();
        assert_eq!(loops.len(), 2);

        let room = loops.iter().find(|l| l.is_ccw()).unwrap();
        let outer = loops.iter().find(|l| l.is_cw()).unwrap();
        assert_relative_eq!(room.area(), 12.0);
        assert_relative_eq!(outer.area(), -12.0);

        let roots = f.root_loops();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), outer.id());
        assert_eq!(outer.children().iter().copied().collect::<Vec<_>>(), vec![room.id()]);
        assert_eq!(room.parent(), Some(outer.id()));

        assert_eq!(f.outer_edges().len(), 4);
        assert!(f.inner_edges().is_empty());
        assert!(f.isolate_edges().is_empty());
        assert_eq!(f.open_loops().count(), 0);
    }

    #[test]
    fn dividing_wall_makes_two_rooms() {
        let split = finder(
            &[&[
                (0.0, 0.0),
                (2.0, 0.0),
                (4.0, 0.0),
                (4.0, 3.0),
                (2.0, 3.0),
                (0.0, 3.0),
            ]],
            &[((2.0, 0.0), (2.0, 3.0))],
        );
        let rooms = split.ccw_loops();
        assert_eq!(rooms.len(), 2);
        for room in &rooms {
            assert_relative_eq!(room.area(), 6.0);
        }
        assert_eq!(split.root_loops().len(), 1);
        assert_eq!(split.inner_edges(), vec![EdgeId(6)]);
        assert_eq!(split.outer_edges().len(), 6);

        let left = split.half_edge_loop(NodeId(0), NodeId(1)).unwrap();
        assert!(left.is_ccw());
        assert!(left.has_bound_edge(EdgeId(6)));
    }

    #[test]
    fn dangling_stub_is_cleaned_from_room() {
        let f = finder(&[RECT], &[((4.0, 3.0), (2.0, 1.5))]);
        let rooms = f.ccw_loops();
        assert_eq!(rooms.len(), 1);

        let room = rooms[0];
        assert_relative_eq!(room.area(), 12.0);
        assert_eq!(room.loop_edges().len(), 4);
        assert_eq!(room.half_edges().len(), 6);
        for pair in room.loop_edges().windows(2) {
            assert_ne!(f.graph().half_edge(pair[0]).partner, Some(pair[1]));
        }
        assert_eq!(f.inner_edges(), vec![EdgeId(4)]);
    }

    #[test]
    fn island_nests_under_outer_boundary() {
        let big: &[(f64, f64)] = &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let island: &[(f64, f64)] = &[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)];
        let f = finder(&[big, island], &[]);

        assert_eq!(f.loops().count(), 4);
        let ccw = f.ccw_loops();
        let room = ccw.iter().find(|l| l.area() > 50.0).unwrap();
        let island_in = ccw.iter().find(|l| l.area() < 50.0).unwrap();
        let outer = f.loops().find(|l| l.area() < -50.0).unwrap();
        let island_out = f.loops().find(|l| l.is_cw() && l.area() > -50.0).unwrap();

        assert_eq!(island_in.parent(), Some(outer.id()));
        assert!(!island_in.is_share_some_edge(room));
        assert_eq!(room.parent(), Some(outer.id()));
        assert_eq!(outer.children().len(), 2);
        assert_eq!(island_out.parent(), Some(room.id()));
        assert_eq!(room.children().iter().copied().collect::<Vec<_>>(), vec![island_out.id()]);

        let roots = f.root_loops();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), outer.id());

        assert_eq!(f.loop_holes(room.id()), vec![island_out.id()]);
        assert!(f.loop_holes(island_in.id()).is_empty());
        assert!(f.loop_holes(outer.id()).is_empty());

        let face = f.clip_face(room.id()).unwrap();
        assert_eq!(face.holes.len(), 1);
        assert_relative_eq!(face.area(), 96.0);
        assert!(f.clip_face(outer.id()).is_none());
    }

    #[test]
    fn lone_segment_is_isolated() {
        let f = finder(&[], &[((0.0, 0.0), (5.0, 0.0))]);
        let loops: Vec<_> = f.loops().collect();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_cw());
        assert!(loops[0].loop_edges().is_empty());
        assert_eq!(f.isolate_edges(), vec![EdgeId(0)]);
        assert_eq!(f.root_loops().len(), 1);
    }

    #[test]
    fn circle_inside_room() {
        let config = LoopConfig::default();
        let mut graph = graph_of(&[&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]], &[]);
        let start = graph.add_node(Point2::new(6.0, 5.0));
        let circle = Curve::Circle {
            center: Point2::new(5.0, 5.0),
            radius: 1.0,
        };
        graph.add_edge(EdgeId(4), start, start, &circle, &config).unwrap();
        let f = LoopFinder::new(graph, config);

        assert_eq!(f.loops().count(), 4);
        let disc = f.loops().find(|l| l.is_ccw() && l.area() < 50.0).unwrap();
        let outer = f.loops().find(|l| l.area() < -50.0).unwrap();
        assert_eq!(disc.parent(), Some(outer.id()));
        assert_relative_eq!(disc.area(), std::f64::consts::PI, epsilon = 0.05);

        let room = f.loops().find(|l| l.area() > 50.0).unwrap();
        let face = f.clip_face(room.id()).unwrap();
        assert_eq!(face.holes.len(), 1);
        assert_eq!(f.outer_edges(), vec![EdgeId(0), EdgeId(1), EdgeId(2), EdgeId(3), EdgeId(4)]);
    }

    #[test]
    fn lens_of_two_arcs_uses_tangents() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(-1.0, 0.0));
        let b = graph.add_node(Point2::new(1.0, 0.0));
        let upper = Curve::Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            clockwise: true,
        };
        let lower = Curve::Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            clockwise: false,
        };
        graph.add_edge(EdgeId(0), a, b, &upper, &config).unwrap();
        graph.add_edge(EdgeId(1), a, b, &lower, &config).unwrap();
        graph.add_edge(EdgeId(2), a, b, &Curve::Line, &config).unwrap();
        let f = LoopFinder::new(graph, config);

        // Two half discs and the outer boundary
        let rooms = f.ccw_loops();
        assert_eq!(rooms.len(), 2);
        for room in &rooms {
            assert_relative_eq!(room.area(), std::f64::consts::FRAC_PI_2, epsilon = 0.05);
            assert_eq!(room.bound_edge_ids().len(), 2);
        }
        assert_eq!(f.root_loops().len(), 1);
        assert_eq!(f.inner_edges(), vec![EdgeId(2)]);
    }

    #[test]
    fn tied_turns_leave_open_traces() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(0.0, 0.0));
        let b = graph.add_node(Point2::new(2.0, 0.0));
        // Three coincident edges: the two earlier ones pair up, and both
        // half-edges of the last run into already traced half-edges
        for i in 0..3 {
            graph.add_edge(EdgeId(i), a, b, &Curve::Line, &config).unwrap();
        }
        let f = LoopFinder::new(graph, config);

        let open: Vec<_> = f.open_loops().collect();
        assert_eq!(open.len(), 2);
        let open_ids: Vec<LoopId> = open.iter().map(|l| l.id()).collect();
        for lp in &open {
            assert!(!lp.is_closed());
            assert_eq!(lp.bound_edge_ids(), &[EdgeId(2)]);
        }

        assert_eq!(f.loops().count(), 2);
        assert!(f.loops().all(|l| l.is_closed() && !open_ids.contains(&l.id())));
        assert!(f.ccw_loops().is_empty());
        let roots = f.root_loops();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|l| !open_ids.contains(&l.id())));

        // The edge traced only by open loops belongs to no class
        assert!(f.inner_edges().is_empty());
        assert!(f.outer_edges().is_empty());
        assert_eq!(f.isolate_edges(), vec![EdgeId(0), EdgeId(1)]);
        assert!(f.loops().all(|l| !l.has_bound_edge(EdgeId(2))));
    }

    #[test]
    fn search_is_repeatable() {
        let mut f = finder(
            &[&[
                (0.0, 0.0),
                (2.0, 0.0),
                (4.0, 0.0),
                (4.0, 3.0),
                (2.0, 3.0),
                (0.0, 3.0),
            ]],
            &[((2.0, 0.0), (2.0, 3.0))],
        );
        let snapshot = |f: &LoopFinder| {
            f.loops()
                .map(|l| (l.bound_edge_ids().to_vec(), l.is_ccw()))
                .collect::<Vec<_>>()
        };

        let first = snapshot(&f);
        f.search();
        assert_eq!(snapshot(&f), first);

        for lp in f.loops() {
            assert!(lp.is_ccw() != lp.is_cw());
            assert!(lp.is_bound_loop() != lp.is_ccw());
        }
    }
}
