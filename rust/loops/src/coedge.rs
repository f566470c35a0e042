// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge/coedge entity operations.
//!
//! Every link between coedges (`prev`/`next`, `partner`) and between a coedge
//! and its edge or loop is written through the setters below, which update
//! both ends of the link. The invariants they keep:
//!
//! - an edge has at most two coedges; the second is the partner of the first
//!   and has the opposite `reversed` flag,
//! - `a.next == Some(b)` iff `b.prev == Some(a)`; relinking clears the stale
//!   half-links on the old neighbors,
//! - a coedge belongs to at most one model loop, and the loop's member set
//!   agrees with the coedge's `loop_key`,
//! - an orphaned coedge (no loop) with a partner gives up both its partner
//!   and its edge.

use nalgebra::Point2;

use crate::arena::{CoEdgeData, EdgeData, TopologyArena};
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::keys::*;

const CURVE_MATCH_TOLERANCE: f64 = 1e-9;
const SPLIT_PARAM_EPS: f64 = 1e-9;

impl TopologyArena {
    /// Creates a coedge from `from` to `to` along `curve`.
    ///
    /// Reuses the edge already joining the two vertices with the same curve,
    /// so there is at most one edge per vertex pair and curve; otherwise a new
    /// edge is created. The coedge becomes the edge's first coedge or the
    /// partner of the existing one.
    pub fn create_coedge(&mut self, from: VertexKey, to: VertexKey, curve: Curve) -> Result<CoEdgeKey> {
        let edge = match self.find_edge(from, to, &curve, CURVE_MATCH_TOLERANCE) {
            Some(edge) => edge,
            None => self.add_edge(from, to, curve)?,
        };
        self.create_coedge_from_edge(edge)
    }

    /// Creates a coedge on an existing edge.
    pub fn create_coedge_from_edge(&mut self, edge: EdgeKey) -> Result<CoEdgeKey> {
        self.check_edge_has_room(edge, None)?;
        let key = self.coedges.insert(CoEdgeData::default());
        self.set_coedge_edge(key, edge)?;
        Ok(key)
    }

    fn check_edge_has_room(&self, edge: EdgeKey, incoming: Option<CoEdgeKey>) -> Result<()> {
        let data = self.edges.get(edge).ok_or(Error::EdgeNotFound(edge))?;
        if let Some(first) = data.coedge {
            if Some(first) == incoming {
                return Ok(());
            }
            if let Some(partner) = self.coedges.get(first).and_then(|c| c.partner) {
                if Some(partner) != incoming {
                    return Err(Error::EdgeSaturated(edge));
                }
            }
        }
        Ok(())
    }

    /// Attaches a coedge to an edge.
    ///
    /// If the edge already has a coedge, this one becomes its partner with the
    /// opposite `reversed` flag; otherwise it becomes the edge's only coedge
    /// and runs forward. The edge is also recorded among the coedge's child
    /// edges.
    pub fn set_coedge_edge(&mut self, key: CoEdgeKey, edge: EdgeKey) -> Result<()> {
        let current = self.coedges.get(key).ok_or(Error::CoEdgeNotFound(key))?.edge;
        if current == Some(edge) {
            return Ok(());
        }
        self.check_edge_has_room(edge, Some(key))?;

        if let Some(old) = current {
            self.detach_coedge_from_edge(key, old);
        }

        let data = &mut self.coedges[key];
        data.edge = Some(edge);
        if !data.child_edges.contains(&edge) {
            data.child_edges.push(edge);
        }

        match self.edges[edge].coedge {
            Some(first) if first != key && self.coedges.contains_key(first) => {
                self.set_coedge_partner(key, Some(first))?;
            }
            _ => {
                self.edges[edge].coedge = Some(key);
                self.coedges[key].reversed = false;
            }
        }
        Ok(())
    }

    fn detach_coedge_from_edge(&mut self, key: CoEdgeKey, edge: EdgeKey) {
        let partner = self.coedges.get(key).and_then(|c| c.partner);
        if let Some(data) = self.edges.get_mut(edge) {
            if data.coedge == Some(key) {
                data.coedge = partner;
            }
        }
        if let Some(p) = partner {
            if let Some(pd) = self.coedges.get_mut(p) {
                if pd.partner == Some(key) {
                    pd.partner = None;
                }
            }
        }
        if let Some(data) = self.coedges.get_mut(key) {
            data.partner = None;
            data.edge = None;
        }
    }

    /// Sets the partner of a coedge, symmetrically.
    ///
    /// A partner must run along the same edge; `key` then takes the opposite
    /// `reversed` flag. Both the old partner of `key` and the old partner of
    /// the new partner lose their back-links.
    pub fn set_coedge_partner(&mut self, key: CoEdgeKey, partner: Option<CoEdgeKey>) -> Result<()> {
        let current = self.coedges.get(key).ok_or(Error::CoEdgeNotFound(key))?;
        let (old, edge) = (current.partner, current.edge);
        if let Some(p) = partner {
            let other = self.coedges.get(p).ok_or(Error::CoEdgeNotFound(p))?;
            if p == key || edge.is_none() || other.edge != edge {
                return Err(Error::PartnerMismatch(key, p));
            }
            let reversed = !other.reversed;
            self.coedges[key].reversed = reversed;
        }
        if old == partner {
            return Ok(());
        }

        if let Some(o) = old {
            if let Some(od) = self.coedges.get_mut(o) {
                if od.partner == Some(key) {
                    od.partner = None;
                }
            }
        }
        if let Some(p) = partner {
            if let Some(pp) = self.coedges[p].partner {
                if pp != key {
                    if let Some(ppd) = self.coedges.get_mut(pp) {
                        if ppd.partner == Some(p) {
                            ppd.partner = None;
                        }
                    }
                }
            }
            self.coedges[p].partner = Some(key);
        }
        self.coedges[key].partner = partner;
        Ok(())
    }

    /// Sets the coedge preceding `key` in its loop.
    ///
    /// The old predecessor loses its `next` link to `key`, and the old
    /// successor of `prev` loses its `prev` link.
    pub fn set_coedge_prev(&mut self, key: CoEdgeKey, prev: Option<CoEdgeKey>) -> Result<()> {
        let old = self.coedges.get(key).ok_or(Error::CoEdgeNotFound(key))?.prev;
        if let Some(p) = prev {
            if !self.coedges.contains_key(p) {
                return Err(Error::CoEdgeNotFound(p));
            }
        }
        if old == prev {
            return Ok(());
        }

        if let Some(o) = old {
            if let Some(od) = self.coedges.get_mut(o) {
                if od.next == Some(key) {
                    od.next = None;
                }
            }
        }
        if let Some(p) = prev {
            if let Some(stale) = self.coedges[p].next {
                if stale != key {
                    if let Some(sd) = self.coedges.get_mut(stale) {
                        if sd.prev == Some(p) {
                            sd.prev = None;
                        }
                    }
                }
            }
            self.coedges[p].next = Some(key);
        }
        self.coedges[key].prev = prev;
        Ok(())
    }

    /// Sets the coedge following `key` in its loop.
    ///
    /// The old successor loses its `prev` link to `key`, and the old
    /// predecessor of `next` loses its `next` link.
    pub fn set_coedge_next(&mut self, key: CoEdgeKey, next: Option<CoEdgeKey>) -> Result<()> {
        let old = self.coedges.get(key).ok_or(Error::CoEdgeNotFound(key))?.next;
        if let Some(n) = next {
            if !self.coedges.contains_key(n) {
                return Err(Error::CoEdgeNotFound(n));
            }
        }
        if old == next {
            return Ok(());
        }

        if let Some(o) = old {
            if let Some(od) = self.coedges.get_mut(o) {
                if od.prev == Some(key) {
                    od.prev = None;
                }
            }
        }
        if let Some(n) = next {
            if let Some(stale) = self.coedges[n].prev {
                if stale != key {
                    if let Some(sd) = self.coedges.get_mut(stale) {
                        if sd.next == Some(n) {
                            sd.next = None;
                        }
                    }
                }
            }
            self.coedges[n].prev = Some(key);
        }
        self.coedges[key].next = next;
        Ok(())
    }

    /// Moves a coedge into a model loop, or out of any loop with `None`.
    ///
    /// A coedge left without a loop that still has a partner is orphaned: the
    /// partner link is torn down on both sides and the coedge drops its edge.
    pub fn set_coedge_loop(&mut self, key: CoEdgeKey, lp: Option<LoopKey>) -> Result<()> {
        let old = self.coedges.get(key).ok_or(Error::CoEdgeNotFound(key))?.loop_key;
        if let Some(l) = lp {
            if !self.loops.contains_key(l) {
                return Err(Error::LoopNotFound(l));
            }
        }
        if old == lp {
            return Ok(());
        }

        if let Some(o) = old {
            let next = self.coedges[key].next;
            if let Some(od) = self.loops.get_mut(o) {
                od.coedges.remove(&key);
                if od.root == Some(key) {
                    od.root = next
                        .filter(|n| od.coedges.contains(n))
                        .or_else(|| od.coedges.iter().copied().min());
                }
            }
        }
        if let Some(l) = lp {
            let ld = &mut self.loops[l];
            ld.coedges.insert(key);
            if ld.root.is_none() {
                ld.root = Some(key);
            }
        }
        self.coedges[key].loop_key = lp;

        if lp.is_none() && self.coedges[key].partner.is_some() {
            if let Some(edge) = self.coedges[key].edge {
                self.detach_coedge_from_edge(key, edge);
            } else {
                self.set_coedge_partner(key, None)?;
            }
        }
        Ok(())
    }

    /// Returns the vertex a coedge starts at.
    pub fn coedge_from(&self, key: CoEdgeKey) -> Option<VertexKey> {
        let co = self.coedges.get(key)?;
        let edge = self.edges.get(co.edge?)?;
        Some(if co.reversed { edge.to } else { edge.from })
    }

    /// Returns the vertex a coedge ends at.
    pub fn coedge_to(&self, key: CoEdgeKey) -> Option<VertexKey> {
        let co = self.coedges.get(key)?;
        let edge = self.edges.get(co.edge?)?;
        Some(if co.reversed { edge.from } else { edge.to })
    }

    /// Returns the point halfway along a coedge's curve.
    pub fn coedge_middle(&self, key: CoEdgeKey) -> Option<Point2<f64>> {
        let co = self.coedges.get(key)?;
        let edge = self.edges.get(co.edge?)?;
        let from = self.vertex_point(edge.from)?;
        let to = self.vertex_point(edge.to)?;
        Some(edge.curve.middle(&from, &to))
    }

    /// Checks a coedge's links.
    ///
    /// `edge`, `prev` and `next` must all be set and refer to live entities;
    /// a partner must share the edge and have the opposite `reversed` flag.
    /// With `auto_fix`, a missing edge is recovered from the coedge's child
    /// edges first. Failures are logged and reported as `false`.
    pub fn validate_coedge(&mut self, key: CoEdgeKey, auto_fix: bool) -> bool {
        let Some(co) = self.coedges.get(key) else {
            tracing::warn!(?key, "coedge validation: coedge does not exist");
            return false;
        };

        let edge_ok = co.edge.is_some_and(|e| self.edges.contains_key(e));
        if !edge_ok {
            let recovered = if auto_fix {
                co.child_edges
                    .iter()
                    .copied()
                    .find(|&e| self.edges.contains_key(e))
            } else {
                None
            };
            match recovered {
                Some(edge) => {
                    tracing::debug!(?key, ?edge, "coedge validation: recovered edge");
                    self.coedges[key].edge = Some(edge);
                }
                None => {
                    tracing::warn!(?key, "coedge validation: missing edge");
                    return false;
                }
            }
        }

        let co = &self.coedges[key];
        let linked = |link: Option<CoEdgeKey>| link.is_some_and(|k| self.coedges.contains_key(k));
        if !linked(co.prev) {
            tracing::warn!(?key, "coedge validation: missing prev");
            return false;
        }
        if !linked(co.next) {
            tracing::warn!(?key, "coedge validation: missing next");
            return false;
        }

        if let Some(partner) = co.partner {
            let consistent = self
                .coedges
                .get(partner)
                .is_some_and(|p| p.edge == co.edge && p.reversed != co.reversed);
            if !consistent {
                tracing::warn!(?key, ?partner, "coedge validation: partner mismatch");
                return false;
            }
        }

        true
    }

    /// Splits an edge at `point`, which must fall strictly between its ends.
    ///
    /// The edge keeps its start and ends on a new vertex; a tail edge with the
    /// same curve covers the rest. Each coedge of the edge gets a companion
    /// coedge on the tail, linked into the same loop so the cycle still
    /// visits the vertices in order. Returns the new vertex and the tail edge.
    pub fn split_edge(&mut self, edge: EdgeKey, point: Point2<f64>) -> Result<(VertexKey, EdgeKey)> {
        let data = self.edges.get(edge).ok_or(Error::EdgeNotFound(edge))?.clone();
        if data.curve.is_closed() {
            return Err(Error::SplitOutsideWall);
        }
        let from = self.vertex_point(data.from).ok_or(Error::VertexNotFound(data.from))?;
        let to = self.vertex_point(data.to).ok_or(Error::VertexNotFound(data.to))?;
        let t = data.curve.param_of(&from, &to, &point);
        if t <= SPLIT_PARAM_EPS || t >= 1.0 - SPLIT_PARAM_EPS {
            return Err(Error::SplitOutsideWall);
        }

        let middle = self.add_vertex(point.x, point.y);
        self.unlink_vertex_edge(data.to, edge);
        self.edges[edge].to = middle;
        self.link_vertex_edge(middle, edge);

        let tail = self.edges.insert(EdgeData {
            from: middle,
            to: data.to,
            curve: data.curve,
            coedge: None,
        });
        self.link_vertex_edge(middle, tail);
        self.link_vertex_edge(data.to, tail);

        let first = data.coedge.filter(|c| self.coedges.contains_key(*c));
        let second = first.and_then(|c| self.coedges[c].partner);

        for co in [first, second].into_iter().flatten() {
            let reversed = self.coedges[co].reversed;
            let lp = self.coedges[co].loop_key;

            let companion = self.coedges.insert(CoEdgeData {
                reversed,
                edge: Some(tail),
                ..CoEdgeData::default()
            });
            self.coedges[companion].child_edges.push(tail);
            match self.edges[tail].coedge {
                Some(existing) => self.set_coedge_partner(companion, Some(existing))?,
                None => self.edges[tail].coedge = Some(companion),
            }

            if reversed {
                // to → middle comes before middle → from
                if let Some(before) = self.coedges[co].prev {
                    self.set_coedge_next(before, Some(companion))?;
                }
                self.set_coedge_next(companion, Some(co))?;
            } else {
                let after = self.coedges[co].next;
                self.set_coedge_next(co, Some(companion))?;
                if let Some(after) = after {
                    self.set_coedge_next(companion, Some(after))?;
                }
            }

            if lp.is_some() {
                self.set_coedge_loop(companion, lp)?;
            }
        }

        Ok((middle, tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three vertices of a triangle and a closed coedge cycle around them.
    fn triangle(arena: &mut TopologyArena) -> (LoopKey, [CoEdgeKey; 3]) {
        let v = [
            arena.add_vertex(0.0, 0.0),
            arena.add_vertex(4.0, 0.0),
            arena.add_vertex(0.0, 3.0),
        ];
        let c = [
            arena.create_coedge(v[0], v[1], Curve::Line).unwrap(),
            arena.create_coedge(v[1], v[2], Curve::Line).unwrap(),
            arena.create_coedge(v[2], v[0], Curve::Line).unwrap(),
        ];
        for i in 0..3 {
            arena.set_coedge_next(c[i], Some(c[(i + 1) % 3])).unwrap();
        }
        let lp = arena.add_model_loop();
        for &ck in &c {
            arena.set_coedge_loop(ck, Some(lp)).unwrap();
        }
        (lp, c)
    }

    fn bare_coedges(arena: &mut TopologyArena, n: usize) -> Vec<CoEdgeKey> {
        (0..n).map(|_| arena.coedges.insert(CoEdgeData::default())).collect()
    }

    #[test]
    fn next_and_prev_stay_symmetric() {
        let mut arena = TopologyArena::new();
        let c = bare_coedges(&mut arena, 3);
        let (a, b, d) = (c[0], c[1], c[2]);

        arena.set_coedge_next(a, Some(b)).unwrap();
        assert_eq!(arena.coedge(b).unwrap().prev, Some(a));

        arena.set_coedge_next(a, Some(d)).unwrap();
        assert_eq!(arena.coedge(b).unwrap().prev, None);
        assert_eq!(arena.coedge(d).unwrap().prev, Some(a));
    }

    #[test]
    fn set_prev_clears_stale_next() {
        let mut arena = TopologyArena::new();
        let c = bare_coedges(&mut arena, 3);
        let (a, b, d) = (c[0], c[1], c[2]);

        arena.set_coedge_next(a, Some(b)).unwrap();
        // d takes b's place after a
        arena.set_coedge_prev(d, Some(a)).unwrap();
        assert_eq!(arena.coedge(a).unwrap().next, Some(d));
        assert_eq!(arena.coedge(b).unwrap().prev, None);

        arena.set_coedge_prev(d, None).unwrap();
        assert_eq!(arena.coedge(a).unwrap().next, None);
    }

    #[test]
    fn create_reuses_edge_and_pairs_partners() {
        let mut arena = TopologyArena::new();
        let v0 = arena.add_vertex(0.0, 0.0);
        let v1 = arena.add_vertex(2.0, 0.0);

        let forward = arena.create_coedge(v0, v1, Curve::Line).unwrap();
        let backward = arena.create_coedge(v1, v0, Curve::Line).unwrap();

        assert_eq!(arena.edge_count(), 1);
        let f = arena.coedge(forward).unwrap();
        let b = arena.coedge(backward).unwrap();
        assert_eq!(f.edge, b.edge);
        assert!(!f.reversed);
        assert!(b.reversed);
        assert_eq!(f.partner, Some(backward));
        assert_eq!(b.partner, Some(forward));
        assert_eq!(arena.coedge_from(backward), Some(v1));
        assert_eq!(arena.coedge_to(backward), Some(v0));

        assert!(matches!(
            arena.create_coedge(v0, v1, Curve::Line),
            Err(Error::EdgeSaturated(_))
        ));
    }

    #[test]
    fn different_curves_get_different_edges() {
        let mut arena = TopologyArena::new();
        let v0 = arena.add_vertex(1.0, 0.0);
        let v1 = arena.add_vertex(-1.0, 0.0);
        let arc = Curve::Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            clockwise: false,
        };

        let line = arena.create_coedge(v0, v1, Curve::Line).unwrap();
        let curved = arena.create_coedge(v0, v1, arc).unwrap();
        assert_eq!(arena.edge_count(), 2);
        assert_ne!(arena.coedge(line).unwrap().edge, arena.coedge(curved).unwrap().edge);

        let middle = arena.coedge_middle(curved).unwrap();
        assert!((middle.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn closed_cycle_validates() {
        let mut arena = TopologyArena::new();
        let (lp, c) = triangle(&mut arena);

        for &ck in &c {
            assert!(arena.validate_coedge(ck, false));
        }
        assert_eq!(arena.model_loop(lp).unwrap().coedges.len(), 3);
        assert_eq!(arena.loop_coedges(lp).unwrap(), c.to_vec());
    }

    #[test]
    fn validate_reports_broken_links() {
        let mut arena = TopologyArena::new();
        let (_, c) = triangle(&mut arena);

        arena.set_coedge_next(c[0], None).unwrap();
        assert!(!arena.validate_coedge(c[0], false));
        assert!(!arena.validate_coedge(c[1], false));
        assert!(arena.validate_coedge(c[2], false));
    }

    #[test]
    fn validate_detects_partner_mismatch() {
        let mut arena = TopologyArena::new();
        let (_, c) = triangle(&mut arena);

        arena.coedges[c[0]].partner = Some(c[1]);
        arena.coedges[c[1]].partner = Some(c[0]);
        assert!(!arena.validate_coedge(c[0], false));
    }

    #[test]
    fn partner_must_share_the_edge() {
        let mut arena = TopologyArena::new();
        let (_, c) = triangle(&mut arena);

        assert!(matches!(
            arena.set_coedge_partner(c[0], Some(c[1])),
            Err(Error::PartnerMismatch(_, _))
        ));
        assert!(matches!(
            arena.set_coedge_partner(c[0], Some(c[0])),
            Err(Error::PartnerMismatch(_, _))
        ));
        assert_eq!(arena.coedge(c[0]).unwrap().partner, None);
        assert_eq!(arena.coedge(c[1]).unwrap().partner, None);

        // A detached coedge on the same edge is accepted and flipped
        let edge = arena.coedge(c[0]).unwrap().edge;
        let twin = arena.coedges.insert(CoEdgeData {
            edge,
            reversed: false,
            ..CoEdgeData::default()
        });
        arena.set_coedge_partner(twin, Some(c[0])).unwrap();
        assert_eq!(arena.coedge(c[0]).unwrap().partner, Some(twin));
        assert_ne!(arena.coedge(twin).unwrap().reversed, arena.coedge(c[0]).unwrap().reversed);
        assert!(arena.validate_coedge(c[0], false));
    }

    #[test]
    fn auto_fix_recovers_lost_edge() {
        let mut arena = TopologyArena::new();
        let (_, c) = triangle(&mut arena);
        let edge = arena.coedge(c[0]).unwrap().edge;

        arena.coedges[c[0]].edge = None;
        assert!(!arena.validate_coedge(c[0], false));
        assert!(arena.validate_coedge(c[0], true));
        assert_eq!(arena.coedge(c[0]).unwrap().edge, edge);
    }

    #[test]
    fn orphaned_coedge_releases_partner() {
        let mut arena = TopologyArena::new();
        let v0 = arena.add_vertex(0.0, 0.0);
        let v1 = arena.add_vertex(2.0, 0.0);
        let a = arena.create_coedge(v0, v1, Curve::Line).unwrap();
        let b = arena.create_coedge(v1, v0, Curve::Line).unwrap();
        let edge = arena.coedge(a).unwrap().edge.unwrap();

        let lp = arena.add_model_loop();
        arena.set_coedge_loop(a, Some(lp)).unwrap();
        arena.set_coedge_loop(a, None).unwrap();

        assert_eq!(arena.coedge(a).unwrap().partner, None);
        assert_eq!(arena.coedge(a).unwrap().edge, None);
        assert_eq!(arena.coedge(b).unwrap().partner, None);
        assert_eq!(arena.edge(edge).unwrap().coedge, Some(b));
        assert!(arena.model_loop(lp).unwrap().coedges.is_empty());
        assert_eq!(arena.model_loop(lp).unwrap().root, None);
    }

    #[test]
    fn split_edge_keeps_both_cycles_closed() {
        let mut arena = TopologyArena::new();
        let (outer, c) = triangle(&mut arena);

        // A second loop running the other way over the same edges
        let d = [
            arena.create_coedge_from_edge(arena.coedge(c[0]).unwrap().edge.unwrap()).unwrap(),
            arena.create_coedge_from_edge(arena.coedge(c[2]).unwrap().edge.unwrap()).unwrap(),
            arena.create_coedge_from_edge(arena.coedge(c[1]).unwrap().edge.unwrap()).unwrap(),
        ];
        for i in 0..3 {
            arena.set_coedge_next(d[i], Some(d[(i + 1) % 3])).unwrap();
        }
        let inner = arena.add_model_loop();
        for &dk in &d {
            arena.set_coedge_loop(dk, Some(inner)).unwrap();
        }

        let edge = arena.coedge(c[0]).unwrap().edge.unwrap();
        let (middle, tail) = arena.split_edge(edge, Point2::new(2.0, 0.0)).unwrap();

        assert_eq!(arena.edge(edge).unwrap().to, middle);
        assert_eq!(arena.edge(tail).unwrap().from, middle);

        for lp in [outer, inner] {
            let cycle = arena.loop_coedges(lp).unwrap();
            assert_eq!(cycle.len(), 4);
            for (i, &ck) in cycle.iter().enumerate() {
                let next = cycle[(i + 1) % cycle.len()];
                assert_eq!(arena.coedge_to(ck), arena.coedge_from(next));
                assert!(arena.validate_coedge(ck, false));
            }
        }

        let points = arena.loop_points(outer).unwrap();
        assert_eq!(points[1], Point2::new(2.0, 0.0));
    }
}
