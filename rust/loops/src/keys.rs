// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage.
//!
//! Persistent entities (vertices, walls, layers, edges, coedges, model loops)
//! get slotmap keys that stay valid while other entities are removed
//! (generational indices). Records that only live for one loop search
//! (graph nodes, half-edges, loops, graph edges) are addressed by plain
//! indices into the vectors that own them.

use std::fmt;

use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (2D point shared by walls and edges).
    pub struct VertexKey;

    /// Key for a wall (the external segment a floorplan is drawn with).
    pub struct WallKey;

    /// Key for a layer (an ordered group of walls on one storey).
    pub struct LayerKey;

    /// Key for an edge (undirected segment between two vertices).
    pub struct EdgeKey;

    /// Key for a coedge (one directed traversal of an edge).
    pub struct CoEdgeKey;

    /// Key for a model loop (closed coedge cycle persisted in the arena).
    pub struct LoopKey;
}

/// A key that can reference any persistent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyKey {
    Vertex(VertexKey),
    Wall(WallKey),
    Layer(LayerKey),
    Edge(EdgeKey),
    CoEdge(CoEdgeKey),
    Loop(LoopKey),
}

impl TopologyKey {
    /// Returns the entity type of this key.
    pub fn topology_type(&self) -> TopologyType {
        match self {
            TopologyKey::Vertex(_) => TopologyType::Vertex,
            TopologyKey::Wall(_) => TopologyType::Wall,
            TopologyKey::Layer(_) => TopologyType::Layer,
            TopologyKey::Edge(_) => TopologyType::Edge,
            TopologyKey::CoEdge(_) => TopologyType::CoEdge,
            TopologyKey::Loop(_) => TopologyType::Loop,
        }
    }
}

/// Discriminant for persistent entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopologyType {
    Vertex = 0,
    Wall = 1,
    Layer = 2,
    Edge = 3,
    CoEdge = 4,
    Loop = 5,
}

impl TopologyType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyType::Vertex => "Vertex",
            TopologyType::Wall => "Wall",
            TopologyType::Layer => "Layer",
            TopologyType::Edge => "Edge",
            TopologyType::CoEdge => "CoEdge",
            TopologyType::Loop => "Loop",
        }
    }
}

impl fmt::Display for TopologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VertexKey> for TopologyKey {
    fn from(k: VertexKey) -> Self {
        TopologyKey::Vertex(k)
    }
}

impl From<WallKey> for TopologyKey {
    fn from(k: WallKey) -> Self {
        TopologyKey::Wall(k)
    }
}

impl From<LayerKey> for TopologyKey {
    fn from(k: LayerKey) -> Self {
        TopologyKey::Layer(k)
    }
}

impl From<EdgeKey> for TopologyKey {
    fn from(k: EdgeKey) -> Self {
        TopologyKey::Edge(k)
    }
}

impl From<CoEdgeKey> for TopologyKey {
    fn from(k: CoEdgeKey) -> Self {
        TopologyKey::CoEdge(k)
    }
}

impl From<LoopKey> for TopologyKey {
    fn from(k: LoopKey) -> Self {
        TopologyKey::Loop(k)
    }
}

// Index types for per-search records
macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            /// Returns the raw index.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

index_id!(
    /// A junction point in a half-edge graph.
    NodeId
);
index_id!(
    /// A directed half-edge in a half-edge graph.
    HalfEdgeId
);
index_id!(
    /// A loop (closed or open trace) discovered by one search.
    LoopId
);
index_id!(
    /// Caller-chosen identity of an undirected graph edge, stable across rebuilds.
    EdgeId
);
