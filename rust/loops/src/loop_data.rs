// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A cycle of half-edges with cached derived geometry.
//!
//! The cached fields (cleaned edge sequence, bound edge ids, points, area)
//! are only valid after [`LoopData::recompute_if_dirty`]; adding a half-edge
//! marks the loop dirty again. [`crate::LoopFinder`] recomputes every loop
//! before handing it out.
//!
//! Orientation follows the sign of the shoelace area: positive is
//! counter-clockwise (a room or hole candidate); zero or negative is
//! clockwise, a bound loop.

use std::collections::BTreeSet;

use nalgebra::Point2;
use rustc_hash::FxHashSet;

use crate::geometry::{point_in_polygon, signed_area};
use crate::half_edge::HalfEdgeGraph;
use crate::keys::{EdgeId, HalfEdgeId, LoopId};

/// One face boundary found by the loop search.
#[derive(Debug, Clone)]
pub struct LoopData {
    id: LoopId,
    half_edges: Vec<HalfEdgeId>,
    closed: bool,
    dirty: bool,

    loop_edges: Vec<HalfEdgeId>,
    bound_edge_ids: Vec<EdgeId>,
    bound_edge_set: FxHashSet<EdgeId>,
    loop_points: Vec<Point2<f64>>,
    discrete_points: Vec<Point2<f64>>,
    area: f64,

    parent: Option<LoopId>,
    children: BTreeSet<LoopId>,
}

impl LoopData {
    pub fn new(id: LoopId) -> Self {
        Self {
            id,
            half_edges: Vec::new(),
            closed: false,
            dirty: false,
            loop_edges: Vec::new(),
            bound_edge_ids: Vec::new(),
            bound_edge_set: FxHashSet::default(),
            loop_points: Vec::new(),
            discrete_points: Vec::new(),
            area: 0.0,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    /// Appends a half-edge to the trace.
    pub fn add_half_edge(&mut self, half_edge: HalfEdgeId) {
        self.half_edges.push(half_edge);
        self.dirty = true;
    }

    /// Half-edges in trace order, including back-and-forth pairs.
    pub fn half_edges(&self) -> &[HalfEdgeId] {
        &self.half_edges
    }

    /// `true` if the trace returned to its first half-edge.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the cached geometry if a half-edge was added since the last
    /// call.
    ///
    /// A half-edge immediately followed by its own partner marks a detour
    /// into a dead-end appendage; such pairs are removed, nested ones
    /// included, and so are pairs meeting across the start of the cycle.
    pub fn recompute_if_dirty(&mut self, graph: &HalfEdgeGraph) {
        if !self.dirty {
            return;
        }

        let is_partner_of = |a: HalfEdgeId, b: HalfEdgeId| {
            let he = graph.half_edge(a);
            !he.self_loop && he.partner == Some(b)
        };

        let mut cleaned: Vec<HalfEdgeId> = Vec::with_capacity(self.half_edges.len());
        for &he in &self.half_edges {
            match cleaned.last() {
                Some(&top) if is_partner_of(top, he) => {
                    cleaned.pop();
                }
                _ => cleaned.push(he),
            }
        }
        if self.closed {
            let mut start = 0;
            while cleaned.len() - start >= 2 {
                let last = cleaned[cleaned.len() - 1];
                if !is_partner_of(last, cleaned[start]) {
                    break;
                }
                cleaned.pop();
                start += 1;
            }
            cleaned.drain(..start);
        }

        self.bound_edge_ids.clear();
        self.bound_edge_set.clear();
        for &he in &cleaned {
            let edge_id = graph.half_edge(he).edge_id;
            if self.bound_edge_set.insert(edge_id) {
                self.bound_edge_ids.push(edge_id);
            }
        }

        self.loop_points = cleaned.iter().map(|&he| graph.node(graph.half_edge(he).from)).collect();
        self.discrete_points = cleaned.iter().flat_map(|&he| graph.half_edge_points(he)).collect();
        self.area = signed_area(&self.discrete_points);
        self.loop_edges = cleaned;
        self.dirty = false;
    }

    /// Half-edges after back-and-forth cleanup.
    pub fn loop_edges(&self) -> &[HalfEdgeId] {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        &self.loop_edges
    }

    /// Distinct edge ids of [`LoopData::loop_edges`], in first-seen order.
    pub fn bound_edge_ids(&self) -> &[EdgeId] {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        &self.bound_edge_ids
    }

    pub fn has_bound_edge(&self, edge_id: EdgeId) -> bool {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        self.bound_edge_set.contains(&edge_id)
    }

    /// Start node of each cleaned half-edge.
    pub fn loop_points(&self) -> &[Point2<f64>] {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        &self.loop_points
    }

    /// Loop path including curve samples.
    pub fn discrete_points(&self) -> &[Point2<f64>] {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        &self.discrete_points
    }

    /// Signed shoelace area of the loop path.
    pub fn area(&self) -> f64 {
        debug_assert!(!self.dirty, "loop {} read while dirty", self.id);
        self.area
    }

    pub fn is_ccw(&self) -> bool {
        self.area() > 0.0
    }

    pub fn is_cw(&self) -> bool {
        !self.is_ccw()
    }

    /// A bound loop is the outside of whatever it encloses: any loop that is
    /// not counter-clockwise.
    pub fn is_bound_loop(&self) -> bool {
        self.is_cw()
    }

    /// Returns `true` if every point of this loop's path lies inside `other`
    /// (boundary included). An empty loop is inside nothing.
    pub fn is_in_side_loop(&self, other: &LoopData, tolerance: f64) -> bool {
        let points = self.discrete_points();
        !points.is_empty()
            && points
                .iter()
                .all(|p| point_in_polygon(p, other.discrete_points(), tolerance))
    }

    /// Returns `true` if the two loops are bounded by a common edge.
    pub fn is_share_some_edge(&self, other: &LoopData) -> bool {
        debug_assert!(!self.dirty && !other.dirty, "loop read while dirty");
        let (small, large) = if self.bound_edge_set.len() <= other.bound_edge_set.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.bound_edge_set.iter().any(|e| large.bound_edge_set.contains(e))
    }

    pub fn parent(&self) -> Option<LoopId> {
        self.parent
    }

    pub fn children(&self) -> &BTreeSet<LoopId> {
        &self.children
    }
}

/// Makes `parent` the parent of `child` in a loop list indexed by [`LoopId`].
///
/// `child` leaves the children of its previous parent; `None` detaches it.
pub fn set_loop_parent(loops: &mut [LoopData], child: LoopId, parent: Option<LoopId>) {
    let old = loops[child.index()].parent;
    if old == parent {
        return;
    }
    if let Some(o) = old {
        loops[o.index()].children.remove(&child);
    }
    if let Some(p) = parent {
        loops[p.index()].children.insert(child);
    }
    loops[child.index()].parent = parent;
}
