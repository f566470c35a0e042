// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal methods for navigating walls, edges and coedge cycles.
//!
//! Upward traversal (vertex → walls, vertex → edges) goes through the
//! adjacency index; loop traversal follows coedge `next` links.

use nalgebra::Point2;

use crate::arena::TopologyArena;
use crate::curve::Curve;
use crate::keys::*;

impl TopologyArena {
    /// Returns the walls owning a vertex, in key order.
    pub fn parent_walls(&self, vertex: VertexKey) -> Vec<WallKey> {
        let mut walls: Vec<WallKey> = self
            .vertex_to_walls
            .get(&vertex)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        walls.sort();
        walls
    }

    /// Returns the edges ending at a vertex, in key order.
    pub fn vertex_edges(&self, vertex: VertexKey) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self
            .vertex_to_edges
            .get(&vertex)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        edges.sort();
        edges
    }

    /// Returns the start and end vertex keys of a wall.
    pub fn wall_vertices(&self, key: WallKey) -> Option<(VertexKey, VertexKey)> {
        self.walls.get(key).map(|w| (w.from, w.to))
    }

    /// Returns the start and end vertex keys of an edge.
    pub fn edge_vertices(&self, key: EdgeKey) -> Option<(VertexKey, VertexKey)> {
        self.edges.get(key).map(|e| (e.from, e.to))
    }

    /// Finds the edge joining two vertices with the given curve.
    ///
    /// Candidates are the edges shared by both vertices. An edge stored in
    /// the opposite direction matches when its curve equals the reversed
    /// query curve.
    pub fn find_edge(&self, from: VertexKey, to: VertexKey, curve: &Curve, tolerance: f64) -> Option<EdgeKey> {
        let from_edges = self.vertex_to_edges.get(&from)?;
        let to_edges = self.vertex_to_edges.get(&to)?;

        let mut shared: Vec<EdgeKey> = from_edges.intersection(to_edges).copied().collect();
        shared.sort();

        shared.into_iter().find(|&ek| {
            let edge = &self.edges[ek];
            if edge.from == from && edge.to == to && edge.curve.is_same(curve, tolerance) {
                return true;
            }
            edge.from == to && edge.to == from && edge.curve.is_same(&curve.reversed(), tolerance)
        })
    }

    /// Returns the coedges of a model loop in cycle order, starting at its root.
    ///
    /// Stops early if the `next` chain is broken or leaves the loop.
    pub fn loop_coedges(&self, key: LoopKey) -> Option<Vec<CoEdgeKey>> {
        let lp = self.loops.get(key)?;
        let mut result = Vec::with_capacity(lp.coedges.len());
        let Some(root) = lp.root else {
            return Some(result);
        };

        let mut current = root;
        loop {
            result.push(current);
            match self.coedges.get(current).and_then(|c| c.next) {
                Some(next) if next != root && lp.coedges.contains(&next) => {
                    if result.len() > lp.coedges.len() {
                        break;
                    }
                    current = next;
                }
                _ => break,
            }
        }
        Some(result)
    }

    /// Returns the start point of each coedge of a model loop, in cycle order.
    pub fn loop_points(&self, key: LoopKey) -> Option<Vec<Point2<f64>>> {
        let coedges = self.loop_coedges(key)?;
        coedges
            .into_iter()
            .map(|ck| self.coedge_from(ck).and_then(|v| self.vertex_point(v)))
            .collect()
    }
}
