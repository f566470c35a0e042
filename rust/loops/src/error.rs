// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for topology and loop operations.

use crate::keys::*;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vertex key not found in the arena.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Wall key not found in the arena.
    #[error("wall not found: {0:?}")]
    WallNotFound(WallKey),

    /// Layer key not found in the arena.
    #[error("layer not found: {0:?}")]
    LayerNotFound(LayerKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// CoEdge key not found in the arena.
    #[error("coedge not found: {0:?}")]
    CoEdgeNotFound(CoEdgeKey),

    /// Loop key not found in the arena.
    #[error("loop not found: {0:?}")]
    LoopNotFound(LoopKey),

    /// The edge already owns a coedge and its partner.
    #[error("edge {0:?} already has two coedges")]
    EdgeSaturated(EdgeKey),

    /// Partner coedges must be distinct and run along the same edge.
    #[error("coedges {0:?} and {1:?} do not share an edge")]
    PartnerMismatch(CoEdgeKey, CoEdgeKey),

    /// A loop needs at least three distinct points.
    #[error("loop has {0} distinct points, at least 3 are required")]
    DegenerateLoop(usize),

    /// An open wall or edge must connect two distinct vertices.
    #[error("open curve must connect two distinct vertices")]
    DegenerateWall,

    /// The split point does not lie strictly inside the wall or edge.
    #[error("split point is not inside the curve")]
    SplitOutsideWall,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}
