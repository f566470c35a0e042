// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Half-edge graph consumed by the loop search.
//!
//! A [`HalfEdgeGraph`] is built fresh for each search: nodes are junction
//! points, every undirected edge contributes two half-edges that are each
//! other's partners. Closed curves (circles) become self-loop pairs, kept in
//! a separate list because they never take part in next-edge selection.

use nalgebra::{Point2, Vector2};

use crate::config::LoopConfig;
use crate::curve::Curve;
use crate::geometry::normalize_or_zero;
use crate::keys::{EdgeId, HalfEdgeId, LoopId, NodeId};
use crate::spatial::PointIndex;

/// One directed traversal of a graph edge.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub edge_id: EdgeId,
    /// Unit chord from `from` to `to`. For a self-loop, the start tangent.
    pub direction: Vector2<f64>,
    /// Unit tangent leaving `from`.
    pub direction_from: Vector2<f64>,
    /// Unit tangent arriving at `to`.
    pub direction_to: Vector2<f64>,
    /// `true` for the half-edge running against its edge's curve.
    pub reversed: bool,
    pub partner: Option<HalfEdgeId>,
    /// Loop stamped on this half-edge by the last search.
    pub loop_id: Option<LoopId>,
    /// Curve samples strictly between `from` and `to`, in travel order.
    pub discrete_points: Vec<Point2<f64>>,
    pub self_loop: bool,
}

/// Nodes and half-edges of one planar arrangement.
#[derive(Debug)]
pub struct HalfEdgeGraph {
    nodes: Vec<Point2<f64>>,
    half_edges: Vec<HalfEdge>,
    edges: Vec<(EdgeId, [HalfEdgeId; 2])>,
    self_loops: Vec<(EdgeId, [HalfEdgeId; 2])>,
    snap: PointIndex<NodeId>,
    tolerance: f64,
}

impl HalfEdgeGraph {
    /// Creates an empty graph. `tolerance` is the snapping distance used by
    /// [`HalfEdgeGraph::add_node_snapped`].
    pub fn new(tolerance: f64) -> Self {
        Self {
            nodes: Vec::new(),
            half_edges: Vec::new(),
            edges: Vec::new(),
            self_loops: Vec::new(),
            snap: PointIndex::new(tolerance * 2.0),
            tolerance,
        }
    }

    /// Adds a node at `point`, even if another node already sits there.
    pub fn add_node(&mut self, point: Point2<f64>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(point);
        self.snap.insert(id, point);
        id
    }

    /// Returns the node within tolerance of `point`, adding one if none exists.
    pub fn add_node_snapped(&mut self, point: Point2<f64>) -> NodeId {
        match self.snap.find_near(&point, self.tolerance) {
            Some(id) => id,
            None => self.add_node(point),
        }
    }

    pub fn node(&self, id: NodeId) -> Point2<f64> {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.index()]
    }

    pub(crate) fn half_edge_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge {
        &mut self.half_edges[id.index()]
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    /// Iterates over every half-edge with its id, in creation order.
    pub fn half_edges(&self) -> impl Iterator<Item = (HalfEdgeId, &HalfEdge)> + '_ {
        self.half_edges
            .iter()
            .enumerate()
            .map(|(i, he)| (HalfEdgeId(i), he))
    }

    /// Regular edges and their half-edge pairs (forward first).
    pub fn edges(&self) -> &[(EdgeId, [HalfEdgeId; 2])] {
        &self.edges
    }

    /// Self-loop edges and their half-edge pairs (forward first).
    pub fn self_loops(&self) -> &[(EdgeId, [HalfEdgeId; 2])] {
        &self.self_loops
    }

    /// Adds an edge from `from` to `to` along `curve`.
    ///
    /// A closed curve on a single node becomes a self-loop pair. Returns
    /// `None` without adding anything for an open curve whose ends coincide.
    pub fn add_edge(
        &mut self,
        edge_id: EdgeId,
        from: NodeId,
        to: NodeId,
        curve: &Curve,
        config: &LoopConfig,
    ) -> Option<[HalfEdgeId; 2]> {
        if from == to {
            return curve
                .is_closed()
                .then(|| self.add_self_loop(edge_id, from, curve, config));
        }

        let p0 = self.node(from);
        let p1 = self.node(to);
        let direction = Curve::chord_direction(&p0, &p1);
        if direction == Vector2::zeros() {
            return None;
        }

        let points = curve.discrete_points(&p0, &p1, config);
        let pair = self.push_pair(edge_id, from, to, direction, &points, false);
        self.edges.push((edge_id, pair));
        Some(pair)
    }

    /// Adds a self-loop pair on `node` for a closed curve.
    pub fn add_self_loop(
        &mut self,
        edge_id: EdgeId,
        node: NodeId,
        curve: &Curve,
        config: &LoopConfig,
    ) -> [HalfEdgeId; 2] {
        let p = self.node(node);
        let points = curve.discrete_points(&p, &p, config);
        let direction = tangent(&points[0], &points[1]);
        let pair = self.push_pair(edge_id, node, node, direction, &points, true);
        self.self_loops.push((edge_id, pair));
        pair
    }

    fn push_pair(
        &mut self,
        edge_id: EdgeId,
        from: NodeId,
        to: NodeId,
        direction: Vector2<f64>,
        points: &[Point2<f64>],
        self_loop: bool,
    ) -> [HalfEdgeId; 2] {
        let n = points.len();
        let direction_from = tangent(&points[0], &points[1]);
        let direction_to = tangent(&points[n - 2], &points[n - 1]);
        let inner = points[1..n - 1].to_vec();

        let forward = HalfEdgeId(self.half_edges.len());
        let backward = HalfEdgeId(forward.index() + 1);

        self.half_edges.push(HalfEdge {
            from,
            to,
            edge_id,
            direction,
            direction_from,
            direction_to,
            reversed: false,
            partner: Some(backward),
            loop_id: None,
            discrete_points: inner.clone(),
            self_loop,
        });
        self.half_edges.push(HalfEdge {
            from: to,
            to: from,
            edge_id,
            direction: if self_loop { -direction_to } else { -direction },
            direction_from: -direction_to,
            direction_to: -direction_from,
            reversed: true,
            partner: Some(forward),
            loop_id: None,
            discrete_points: inner.into_iter().rev().collect(),
            self_loop,
        });

        [forward, backward]
    }

    /// Start node followed by the curve samples of a half-edge, excluding its
    /// end node.
    pub fn half_edge_points(&self, id: HalfEdgeId) -> impl Iterator<Item = Point2<f64>> + '_ {
        let he = self.half_edge(id);
        std::iter::once(self.node(he.from)).chain(he.discrete_points.iter().copied())
    }

    pub(crate) fn clear_loop_stamps(&mut self) {
        for he in &mut self.half_edges {
            he.loop_id = None;
        }
    }
}

fn tangent(a: &Point2<f64>, b: &Point2<f64>) -> Vector2<f64> {
    normalize_or_zero(b - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn line_edge_creates_partnered_pair() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(0.0, 0.0));
        let b = graph.add_node(Point2::new(3.0, 0.0));

        let [f, r] = graph.add_edge(EdgeId(0), a, b, &Curve::Line, &config).unwrap();
        let (fh, rh) = (graph.half_edge(f), graph.half_edge(r));

        assert_eq!((fh.from, fh.to), (a, b));
        assert_eq!((rh.from, rh.to), (b, a));
        assert_eq!(fh.partner, Some(r));
        assert_eq!(rh.partner, Some(f));
        assert!(!fh.reversed && rh.reversed);
        assert_relative_eq!(fh.direction.x, 1.0);
        assert_relative_eq!(rh.direction.x, -1.0);
        assert!(fh.discrete_points.is_empty());
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn arc_tangents_differ_from_chord() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(1.0, 0.0));
        let b = graph.add_node(Point2::new(-1.0, 0.0));
        let arc = Curve::Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            clockwise: false,
        };

        let [f, r] = graph.add_edge(EdgeId(0), a, b, &arc, &config).unwrap();
        let (fh, rh) = (graph.half_edge(f), graph.half_edge(r));

        assert_relative_eq!(fh.direction.x, -1.0);
        // Leaves (1, 0) heading up, arrives at (-1, 0) heading down
        assert!(fh.direction_from.y > 0.9);
        assert!(fh.direction_to.y < -0.9);
        assert_relative_eq!(rh.direction_from.x, -fh.direction_to.x);
        assert_relative_eq!(rh.direction_from.y, -fh.direction_to.y);
        assert_eq!(fh.discrete_points.len(), 17);
        assert_eq!(rh.discrete_points.first(), fh.discrete_points.last());
    }

    #[test]
    fn circle_becomes_self_loop() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(2.0, 0.0));
        let circle = Curve::Circle {
            center: Point2::new(0.0, 0.0),
            radius: 2.0,
        };

        let [f, _] = graph.add_edge(EdgeId(4), a, a, &circle, &config).unwrap();
        assert!(graph.edges().is_empty());
        assert_eq!(graph.self_loops().len(), 1);
        assert!(graph.half_edge(f).self_loop);
        assert_eq!(graph.half_edge_points(f).count(), 36);
    }

    #[test]
    fn degenerate_edges_are_skipped() {
        let config = LoopConfig::default();
        let mut graph = HalfEdgeGraph::new(config.length_tolerance);
        let a = graph.add_node(Point2::new(0.0, 0.0));
        let b = graph.add_node(Point2::new(0.0, 0.0));

        assert!(graph.add_edge(EdgeId(0), a, a, &Curve::Line, &config).is_none());
        assert!(graph.add_edge(EdgeId(1), a, b, &Curve::Line, &config).is_none());
        assert_eq!(graph.half_edge_count(), 0);
    }

    #[test]
    fn snapped_nodes_merge_within_tolerance() {
        let mut graph = HalfEdgeGraph::new(1e-3);
        let a = graph.add_node_snapped(Point2::new(1.0, 1.0));
        let b = graph.add_node_snapped(Point2::new(1.0005, 1.0));
        let c = graph.add_node_snapped(Point2::new(1.01, 1.0));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(graph.node_count(), 2);
    }
}
