// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for floorplan topology entities.
//!
//! The [`TopologyArena`] is the central owner of all persistent data. Every
//! entity (vertex, wall, layer, edge, coedge, model loop) lives inside slot
//! maps with stable, generational keys. Upward adjacency indices answer
//! "which walls use this vertex?" and "which edges end at this vertex?"
//! without scanning.
//!
//! ## Edges and coedges
//!
//! An [`EdgeData`] is one undirected segment. Its directed traversals are
//! [`CoEdgeData`] records: the first coedge attached to an edge runs forward,
//! a second one becomes its `partner` and runs reversed. Coedges also carry
//! `prev`/`next` links forming the closed cycle of a model loop. All links are
//! keys rather than references, so a removed entity leaves at worst a stale
//! key that lookups reject.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::curve::Curve;
use crate::keys::*;

/// Data stored for a vertex: a point in the plane.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub x: f64,
    pub y: f64,
}

/// Data stored for a wall: a curve between two vertices on a layer.
#[derive(Debug, Clone)]
pub struct WallData {
    pub from: VertexKey,
    pub to: VertexKey,
    pub curve: Curve,
    pub layer: Option<LayerKey>,
}

/// Data stored for a layer: the walls drawn on it, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LayerData {
    pub walls: Vec<WallKey>,
}

/// Data stored for an edge: an undirected curve between two vertices.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub from: VertexKey,
    pub to: VertexKey,
    pub curve: Curve,
    /// The first coedge attached to this edge. Its partner, if any, is the
    /// second.
    pub coedge: Option<CoEdgeKey>,
}

/// Data stored for a coedge: a directed use of an edge inside a loop.
#[derive(Debug, Clone, Default)]
pub struct CoEdgeData {
    pub edge: Option<EdgeKey>,
    /// `true` if the coedge runs from the edge's `to` vertex to its `from` vertex.
    pub reversed: bool,
    pub prev: Option<CoEdgeKey>,
    pub next: Option<CoEdgeKey>,
    pub partner: Option<CoEdgeKey>,
    pub loop_key: Option<LoopKey>,
    /// Edges this coedge has been attached to; used to recover a lost `edge`.
    pub child_edges: SmallVec<[EdgeKey; 1]>,
}

/// Data stored for a model loop: a closed cycle of coedges.
#[derive(Debug, Clone, Default)]
pub struct ModelLoopData {
    /// Coedge the cycle is read from.
    pub root: Option<CoEdgeKey>,
    pub coedges: FxHashSet<CoEdgeKey>,
}

/// The central arena that owns all topology entities and their adjacency indices.
///
/// # Example
///
/// ```
/// use floorplan_loops::{Curve, TopologyArena};
///
/// let mut arena = TopologyArena::new();
/// let v0 = arena.add_vertex(0.0, 0.0);
/// let v1 = arena.add_vertex(4.0, 0.0);
/// let wall = arena.add_wall(v0, v1, Curve::Line).unwrap();
///
/// assert_eq!(arena.vertex_count(), 2);
/// assert_eq!(arena.parent_walls(v0), vec![wall]);
/// ```
#[derive(Debug)]
pub struct TopologyArena {
    // Entity storage
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) walls: SlotMap<WallKey, WallData>,
    pub(crate) layers: SlotMap<LayerKey, LayerData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) coedges: SlotMap<CoEdgeKey, CoEdgeData>,
    pub(crate) loops: SlotMap<LoopKey, ModelLoopData>,

    // Upward adjacency: vertex → users
    pub(crate) vertex_to_walls: FxHashMap<VertexKey, FxHashSet<WallKey>>,
    pub(crate) vertex_to_edges: FxHashMap<VertexKey, FxHashSet<EdgeKey>>,
}

impl TopologyArena {
    /// Creates a new, empty topology arena.
    pub fn new() -> Self {
        Self {
            vertices: SlotMap::with_key(),
            walls: SlotMap::with_key(),
            layers: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            coedges: SlotMap::with_key(),
            loops: SlotMap::with_key(),

            vertex_to_walls: FxHashMap::default(),
            vertex_to_edges: FxHashMap::default(),
        }
    }

    // --- Vertex operations ---

    /// Returns the vertex data for the given key, or `None` if not found.
    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    /// Returns the number of vertices in the arena.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // --- Wall operations ---

    /// Returns the wall data for the given key, or `None` if not found.
    pub fn wall(&self, key: WallKey) -> Option<&WallData> {
        self.walls.get(key)
    }

    /// Returns the number of walls in the arena.
    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    // --- Layer operations ---

    /// Returns the layer data for the given key, or `None` if not found.
    pub fn layer(&self, key: LayerKey) -> Option<&LayerData> {
        self.layers.get(key)
    }

    // --- Edge operations ---

    /// Returns the edge data for the given key, or `None` if not found.
    pub fn edge(&self, key: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(key)
    }

    /// Returns the number of edges in the arena.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // --- CoEdge operations ---

    /// Returns the coedge data for the given key, or `None` if not found.
    pub fn coedge(&self, key: CoEdgeKey) -> Option<&CoEdgeData> {
        self.coedges.get(key)
    }

    /// Returns the number of coedges in the arena.
    pub fn coedge_count(&self) -> usize {
        self.coedges.len()
    }

    // --- Model loop operations ---

    /// Returns the model loop data for the given key, or `None` if not found.
    pub fn model_loop(&self, key: LoopKey) -> Option<&ModelLoopData> {
        self.loops.get(key)
    }

    /// Returns the number of model loops in the arena.
    pub fn model_loop_count(&self) -> usize {
        self.loops.len()
    }

    // --- Entity existence checks ---

    /// Returns `true` if the given topology key references a valid entity.
    pub fn contains(&self, key: TopologyKey) -> bool {
        match key {
            TopologyKey::Vertex(k) => self.vertices.contains_key(k),
            TopologyKey::Wall(k) => self.walls.contains_key(k),
            TopologyKey::Layer(k) => self.layers.contains_key(k),
            TopologyKey::Edge(k) => self.edges.contains_key(k),
            TopologyKey::CoEdge(k) => self.coedges.contains_key(k),
            TopologyKey::Loop(k) => self.loops.contains_key(k),
        }
    }

    // --- Adjacency index helpers ---

    /// Register that a wall uses a vertex (upward adjacency).
    pub(crate) fn link_vertex_wall(&mut self, vertex: VertexKey, wall: WallKey) {
        self.vertex_to_walls.entry(vertex).or_default().insert(wall);
    }

    /// Remove a wall from a vertex's upward adjacency.
    pub(crate) fn unlink_vertex_wall(&mut self, vertex: VertexKey, wall: WallKey) {
        if let Some(set) = self.vertex_to_walls.get_mut(&vertex) {
            set.remove(&wall);
            if set.is_empty() {
                self.vertex_to_walls.remove(&vertex);
            }
        }
    }

    /// Register that an edge uses a vertex (upward adjacency).
    pub(crate) fn link_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        self.vertex_to_edges.entry(vertex).or_default().insert(edge);
    }

    /// Remove an edge from a vertex's upward adjacency.
    pub(crate) fn unlink_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        if let Some(set) = self.vertex_to_edges.get_mut(&vertex) {
            set.remove(&edge);
            if set.is_empty() {
                self.vertex_to_edges.remove(&vertex);
            }
        }
    }
}

impl Default for TopologyArena {
    fn default() -> Self {
        Self::new()
    }
}
