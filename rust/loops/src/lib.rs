// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorplan Loops
//!
//! Closed loop extraction (rooms, islands, outer boundaries) from the wall
//! graph of a 2D floorplan.
//!
//! Two layers live side by side:
//!
//! - A persistent entity model in a [`TopologyArena`]: vertices, walls and
//!   layers as drawn, plus `Edge`/`CoEdge` records whose `prev`/`next`/
//!   `partner` links form model loops. All links are slot map keys, and the
//!   setters keep both ends of every link in sync.
//! - A per-run half-edge graph ([`HalfEdgeGraph`]) and the [`LoopFinder`]
//!   that partitions it into [`LoopData`] faces by smallest clockwise turn,
//!   then nests counter-clockwise loops under the boundaries enclosing them.
//!
//! [`loop_util::layer_wall_loops`] connects the two: it cuts walls that
//! cross or touch without a shared vertex, snaps junctions, builds the graph
//! and runs the search.
//!
//! ```
//! use floorplan_loops::{loop_util, LoopConfig, TopologyArena};
//!
//! let mut arena = TopologyArena::new();
//! let layer = arena.add_layer();
//! arena
//!     .add_layer_polygon(layer, &[[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]])
//!     .unwrap();
//!
//! let loops = loop_util::layer_wall_loops(&arena, layer, &LoopConfig::default()).unwrap();
//! let rooms = loops.finder().ccw_loops();
//! assert_eq!(rooms.len(), 1);
//! assert_eq!(rooms[0].area(), 12.0);
//! ```

pub mod arena;
pub mod coedge;
pub mod config;
pub mod construction;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod half_edge;
pub mod keys;
pub mod loop_data;
pub mod loop_finder;
pub mod loop_util;
pub mod spatial;
pub mod traversal;

pub use arena::TopologyArena;
pub use config::LoopConfig;
pub use curve::Curve;
pub use error::{Error, Result};
pub use half_edge::{HalfEdge, HalfEdgeGraph};
pub use keys::{
    CoEdgeKey, EdgeId, EdgeKey, HalfEdgeId, LayerKey, LoopId, LoopKey, NodeId, TopologyKey,
    TopologyType, VertexKey, WallKey,
};
pub use loop_data::LoopData;
pub use loop_finder::{ClipFace, LoopFinder};
pub use loop_util::{EdgeSource, FakeConnectingWall, WallLoops};
