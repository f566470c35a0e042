// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and edit methods for vertices, walls, layers and edges.
//!
//! Each entity is created through the arena, which checks referential
//! integrity (all referenced vertices must exist) and maintains the upward
//! adjacency index. Wall edits (move, split, remove) keep that index and the
//! layer membership consistent.

use nalgebra::Point2;

use crate::arena::*;
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::keys::*;

const SPLIT_PARAM_EPS: f64 = 1e-9;

impl TopologyArena {
    /// Adds a vertex at the given 2D coordinates.
    pub fn add_vertex(&mut self, x: f64, y: f64) -> VertexKey {
        self.vertices.insert(VertexData { x, y })
    }

    /// Moves an existing vertex. Every wall and edge using it follows.
    pub fn move_vertex(&mut self, key: VertexKey, x: f64, y: f64) -> Result<()> {
        let v = self.vertices.get_mut(key).ok_or(Error::VertexNotFound(key))?;
        v.x = x;
        v.y = y;
        Ok(())
    }

    /// Creates an empty layer.
    pub fn add_layer(&mut self) -> LayerKey {
        self.layers.insert(LayerData::default())
    }

    fn check_curve_ends(&self, from: VertexKey, to: VertexKey, curve: &Curve) -> Result<()> {
        if !self.vertices.contains_key(from) {
            return Err(Error::VertexNotFound(from));
        }
        if !self.vertices.contains_key(to) {
            return Err(Error::VertexNotFound(to));
        }
        if (from == to) != curve.is_closed() {
            return Err(Error::DegenerateWall);
        }
        Ok(())
    }

    /// Creates a wall between two existing vertices, not assigned to a layer.
    ///
    /// Open curves need two distinct vertices; a circle starts and ends on
    /// the same vertex.
    pub fn add_wall(&mut self, from: VertexKey, to: VertexKey, curve: Curve) -> Result<WallKey> {
        self.check_curve_ends(from, to, &curve)?;

        let key = self.walls.insert(WallData {
            from,
            to,
            curve,
            layer: None,
        });
        self.link_vertex_wall(from, key);
        self.link_vertex_wall(to, key);
        Ok(key)
    }

    /// Creates a wall and appends it to a layer.
    pub fn add_layer_wall(
        &mut self,
        layer: LayerKey,
        from: VertexKey,
        to: VertexKey,
        curve: Curve,
    ) -> Result<WallKey> {
        if !self.layers.contains_key(layer) {
            return Err(Error::LayerNotFound(layer));
        }
        let key = self.add_wall(from, to, curve)?;
        self.walls[key].layer = Some(layer);
        self.layers[layer].walls.push(key);
        Ok(key)
    }

    /// Creates walls along a closed polyline on a layer, one per side.
    pub fn add_layer_polygon(&mut self, layer: LayerKey, points: &[[f64; 2]]) -> Result<Vec<WallKey>> {
        if points.len() < 3 {
            return Err(Error::DegenerateLoop(points.len()));
        }
        let vertices: Vec<VertexKey> = points.iter().map(|p| self.add_vertex(p[0], p[1])).collect();
        let mut walls = Vec::with_capacity(vertices.len());
        for i in 0..vertices.len() {
            let next = vertices[(i + 1) % vertices.len()];
            walls.push(self.add_layer_wall(layer, vertices[i], next, Curve::Line)?);
        }
        Ok(walls)
    }

    /// Splits a wall at `point`, which must fall strictly between its ends.
    ///
    /// The wall keeps its start and now ends on a new vertex at `point`; a
    /// second wall with the same curve runs from the new vertex to the old
    /// end and is placed right after the original in its layer.
    pub fn split_wall(&mut self, key: WallKey, point: Point2<f64>) -> Result<(VertexKey, WallKey)> {
        let wall = self.walls.get(key).ok_or(Error::WallNotFound(key))?.clone();
        if wall.curve.is_closed() {
            return Err(Error::SplitOutsideWall);
        }

        let from = self.vertex_point(wall.from).ok_or(Error::VertexNotFound(wall.from))?;
        let to = self.vertex_point(wall.to).ok_or(Error::VertexNotFound(wall.to))?;
        let t = wall.curve.param_of(&from, &to, &point);
        if t <= SPLIT_PARAM_EPS || t >= 1.0 - SPLIT_PARAM_EPS {
            return Err(Error::SplitOutsideWall);
        }

        let middle = self.add_vertex(point.x, point.y);

        self.unlink_vertex_wall(wall.to, key);
        self.walls[key].to = middle;
        self.link_vertex_wall(middle, key);

        let tail = self.walls.insert(WallData {
            from: middle,
            to: wall.to,
            curve: wall.curve,
            layer: wall.layer,
        });
        self.link_vertex_wall(middle, tail);
        self.link_vertex_wall(wall.to, tail);

        if let Some(layer) = wall.layer.and_then(|l| self.layers.get_mut(l)) {
            let pos = layer
                .walls
                .iter()
                .position(|&w| w == key)
                .map_or(layer.walls.len(), |p| p + 1);
            layer.walls.insert(pos, tail);
        }

        Ok((middle, tail))
    }

    /// Removes a wall, detaching it from its vertices and its layer.
    ///
    /// Vertices are left in place even when no wall uses them any more.
    pub fn remove_wall(&mut self, key: WallKey) -> Result<WallData> {
        let wall = self.walls.remove(key).ok_or(Error::WallNotFound(key))?;
        self.unlink_vertex_wall(wall.from, key);
        self.unlink_vertex_wall(wall.to, key);
        if let Some(layer) = wall.layer.and_then(|l| self.layers.get_mut(l)) {
            layer.walls.retain(|&w| w != key);
        }
        Ok(wall)
    }

    /// Creates an empty model loop; coedges join it through
    /// [`TopologyArena::set_coedge_loop`].
    pub fn add_model_loop(&mut self) -> LoopKey {
        self.loops.insert(ModelLoopData::default())
    }

    /// Creates an edge between two existing vertices.
    ///
    /// Prefer [`TopologyArena::create_coedge`], which reuses an existing edge
    /// with the same vertices and curve.
    pub fn add_edge(&mut self, from: VertexKey, to: VertexKey, curve: Curve) -> Result<EdgeKey> {
        self.check_curve_ends(from, to, &curve)?;

        let key = self.edges.insert(EdgeData {
            from,
            to,
            curve,
            coedge: None,
        });
        self.link_vertex_edge(from, key);
        self.link_vertex_edge(to, key);
        Ok(key)
    }
}
