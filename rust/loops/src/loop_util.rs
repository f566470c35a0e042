// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver turning the walls of a layer into loops.
//!
//! Walls that cross or touch without sharing a vertex are cut at the contact
//! points into fake connecting walls, so the half-edge graph is subdivided at
//! every real junction. Endpoints within tolerance snap onto one node, walls
//! drawn twice count once, and repeated edges with the same curve between
//! the same nodes collapse into one.
//!
//! The module also carries the helpers that write point rings back into
//! model loops made of coedges.

use nalgebra::Point2;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::arena::TopologyArena;
use crate::config::LoopConfig;
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::geometry::{bounds, segment_intersections};
use crate::half_edge::HalfEdgeGraph;
use crate::keys::*;
use crate::loop_finder::LoopFinder;

/// Removes consecutive duplicates, then drops trailing items equal to the
/// first so the ring is not closed twice.
///
/// ```
/// use floorplan_loops::loop_util::cleanup_loop_array;
///
/// assert_eq!(cleanup_loop_array(&['a', 'a', 'b', 'b', 'c', 'a']), vec!['a', 'b', 'c']);
/// ```
pub fn cleanup_loop_array<T: Clone + PartialEq>(items: &[T]) -> Vec<T> {
    cleanup_loop_array_by(items, |a, b| a == b)
}

/// [`cleanup_loop_array`] with a caller-supplied equality.
pub fn cleanup_loop_array_by<T, F>(items: &[T], eq: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if out.last().map_or(true, |last| !eq(last, item)) {
            out.push(item.clone());
        }
    }
    while out.len() > 1 && eq(&out[out.len() - 1], &out[0]) {
        out.pop();
    }
    out
}

/// A piece of a wall between two consecutive contact points.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeConnectingWall {
    pub source: WallKey,
    pub from: Point2<f64>,
    pub to: Point2<f64>,
    pub curve: Curve,
}

/// Where a graph edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSource {
    pub wall: WallKey,
    /// `true` if the edge is a piece of a wall cut at a contact point.
    pub fake: bool,
}

/// Loops of a wall layer together with the wall behind every graph edge.
#[derive(Debug)]
pub struct WallLoops {
    finder: LoopFinder,
    sources: Vec<EdgeSource>,
}

impl WallLoops {
    pub fn finder(&self) -> &LoopFinder {
        &self.finder
    }

    pub fn into_finder(self) -> LoopFinder {
        self.finder
    }

    pub fn edge_source(&self, id: EdgeId) -> Option<&EdgeSource> {
        self.sources.get(id.index())
    }

    pub fn edge_count(&self) -> usize {
        self.sources.len()
    }

    pub fn fake_edge_count(&self) -> usize {
        self.sources.iter().filter(|s| s.fake).count()
    }

    /// Distinct walls bounding a loop, in the order the loop meets them.
    pub fn loop_walls(&self, id: LoopId) -> Vec<WallKey> {
        let Some(lp) = self.finder.loop_data(id) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        lp.bound_edge_ids()
            .iter()
            .filter_map(|&e| self.edge_source(e))
            .map(|s| s.wall)
            .filter(|w| seen.insert(*w))
            .collect()
    }
}

struct WallPolyline {
    key: WallKey,
    curve: Curve,
    from: Point2<f64>,
    to: Point2<f64>,
    points: Vec<Point2<f64>>,
    bounds: (Point2<f64>, Point2<f64>),
}

impl WallPolyline {
    fn is_end(&self, p: &Point2<f64>, tolerance: f64) -> bool {
        (p - self.from).norm() <= tolerance || (p - self.to).norm() <= tolerance
    }

    fn overlaps(&self, other: &WallPolyline, tolerance: f64) -> bool {
        let (a_min, a_max) = self.bounds;
        let (b_min, b_max) = other.bounds;
        a_min.x <= b_max.x + tolerance
            && b_min.x <= a_max.x + tolerance
            && a_min.y <= b_max.y + tolerance
            && b_min.y <= a_max.y + tolerance
    }

    /// Same ends and same shape, in either direction.
    fn coincides(&self, other: &WallPolyline, tolerance: f64) -> bool {
        let near = |p: &Point2<f64>, q: &Point2<f64>| (p - q).norm() <= tolerance;
        let forward = near(&self.from, &other.from)
            && near(&self.to, &other.to)
            && self.curve.is_same(&other.curve, tolerance);
        forward
            || (near(&self.from, &other.to)
                && near(&self.to, &other.from)
                && self.curve.is_same(&other.curve.reversed(), tolerance))
    }
}

/// Samples the walls, keeping only the first of any coincident walls.
fn wall_polylines(arena: &TopologyArena, walls: &[WallKey], config: &LoopConfig) -> Result<Vec<WallPolyline>> {
    let tol = config.length_tolerance;
    let mut polylines: Vec<WallPolyline> = Vec::with_capacity(walls.len());

    for &key in walls {
        let wall = arena.wall(key).ok_or(Error::WallNotFound(key))?;
        let from = arena.vertex_point(wall.from).ok_or(Error::VertexNotFound(wall.from))?;
        let to = arena.vertex_point(wall.to).ok_or(Error::VertexNotFound(wall.to))?;
        let points = arena
            .wall_discrete_points(key, config)
            .ok_or(Error::WallNotFound(key))?;
        let bounds = bounds(&points).unwrap_or((from, to));
        let polyline = WallPolyline {
            key,
            curve: wall.curve,
            from,
            to,
            points,
            bounds,
        };

        if let Some(kept) = polylines.iter().find(|p| p.coincides(&polyline, tol)) {
            trace!(wall = ?key, kept = ?kept.key, "skipped coincident wall");
            continue;
        }
        polylines.push(polyline);
    }
    Ok(polylines)
}

fn cut_at_contacts(polylines: &[WallPolyline], tol: f64) -> Vec<FakeConnectingWall> {
    let mut contacts: Vec<Vec<Point2<f64>>> = vec![Vec::new(); polylines.len()];
    for i in 0..polylines.len() {
        for j in (i + 1)..polylines.len() {
            let (a, b) = (&polylines[i], &polylines[j]);
            if !a.overlaps(b, tol) {
                continue;
            }
            for sa in a.points.windows(2) {
                for sb in b.points.windows(2) {
                    for p in segment_intersections(&sa[0], &sa[1], &sb[0], &sb[1], tol) {
                        if !a.is_end(&p, tol) {
                            contacts[i].push(p);
                        }
                        if !b.is_end(&p, tol) {
                            contacts[j].push(p);
                        }
                    }
                }
            }
        }
    }

    let mut fakes = Vec::new();
    for (wall, mut cuts) in polylines.iter().zip(contacts) {
        if cuts.is_empty() {
            continue;
        }
        cuts.sort_by(|p, q| {
            let tp = wall.curve.param_of(&wall.from, &wall.to, p);
            let tq = wall.curve.param_of(&wall.from, &wall.to, q);
            tp.total_cmp(&tq)
        });
        let cuts = cleanup_loop_array_by(&cuts, |p, q| (p - q).norm() <= tol);

        let curve = match wall.curve {
            Curve::Circle { center, radius } => Curve::Arc {
                center,
                radius,
                clockwise: false,
            },
            other => other,
        };
        let mut stops = Vec::with_capacity(cuts.len() + 2);
        stops.push(wall.from);
        stops.extend(cuts);
        stops.push(wall.to);

        trace!(wall = ?wall.key, pieces = stops.len() - 1, "cut wall at contacts");
        for pair in stops.windows(2) {
            fakes.push(FakeConnectingWall {
                source: wall.key,
                from: pair[0],
                to: pair[1],
                curve,
            });
        }
    }
    fakes
}

/// Cuts walls at the points where they touch or cross another wall away
/// from their own ends.
///
/// Walls with no such point are left out of the result; every other wall is
/// replaced by the pieces between its ends and its contact points, in order
/// along the wall. Pieces of a circle are arcs. A wall coinciding with an
/// earlier one is ignored, so redrawn walls do not cut each other.
pub fn fake_connecting_walls(
    arena: &TopologyArena,
    walls: &[WallKey],
    config: &LoopConfig,
) -> Result<Vec<FakeConnectingWall>> {
    let polylines = wall_polylines(arena, walls, config)?;
    Ok(cut_at_contacts(&polylines, config.length_tolerance))
}

struct GraphBuilder<'a> {
    graph: HalfEdgeGraph,
    sources: Vec<EdgeSource>,
    /// Curves already added per node pair, oriented from the lower node.
    curves: FxHashMap<(NodeId, NodeId), Vec<Curve>>,
    config: &'a LoopConfig,
}

impl<'a> GraphBuilder<'a> {
    fn new(config: &'a LoopConfig) -> Self {
        Self {
            graph: HalfEdgeGraph::new(config.length_tolerance),
            sources: Vec::new(),
            curves: FxHashMap::default(),
            config,
        }
    }

    fn add(&mut self, source: EdgeSource, from: Point2<f64>, to: Point2<f64>, curve: &Curve) {
        let a = self.graph.add_node_snapped(from);
        let b = if curve.is_closed() {
            a
        } else {
            self.graph.add_node_snapped(to)
        };

        let oriented = if a <= b { *curve } else { curve.reversed() };
        let known = self.curves.entry((a.min(b), a.max(b))).or_default();
        if known.iter().any(|c| c.is_same(&oriented, self.config.length_tolerance)) {
            trace!(wall = ?source.wall, %a, %b, "skipped repeated edge");
            return;
        }

        let edge_id = EdgeId(self.sources.len());
        if self.graph.add_edge(edge_id, a, b, curve, self.config).is_some() {
            known.push(oriented);
            self.sources.push(source);
        }
    }
}

/// Builds the half-edge graph of a layer's walls and runs the loop search.
pub fn layer_wall_loops(arena: &TopologyArena, layer: LayerKey, config: &LoopConfig) -> Result<WallLoops> {
    config.validate()?;
    let walls = &arena.layer(layer).ok_or(Error::LayerNotFound(layer))?.walls;
    let polylines = wall_polylines(arena, walls, config)?;
    let fakes = cut_at_contacts(&polylines, config.length_tolerance);

    let mut pieces: FxHashMap<WallKey, Vec<&FakeConnectingWall>> = FxHashMap::default();
    for fake in &fakes {
        pieces.entry(fake.source).or_default().push(fake);
    }

    let mut builder = GraphBuilder::new(config);
    for wall in &polylines {
        match pieces.get(&wall.key) {
            Some(list) => {
                let source = EdgeSource {
                    wall: wall.key,
                    fake: true,
                };
                for piece in list {
                    builder.add(source, piece.from, piece.to, &piece.curve);
                }
            }
            None => {
                let source = EdgeSource {
                    wall: wall.key,
                    fake: false,
                };
                builder.add(source, wall.from, wall.to, &wall.curve);
            }
        }
    }

    debug!(
        walls = walls.len(),
        distinct = polylines.len(),
        fake_pieces = fakes.len(),
        edges = builder.sources.len(),
        nodes = builder.graph.node_count(),
        "built layer graph"
    );

    let finder = LoopFinder::new(builder.graph, config.clone());
    Ok(WallLoops {
        finder,
        sources: builder.sources,
    })
}

/// Returns the walls owning a vertex.
pub fn parent_walls(arena: &TopologyArena, vertex: VertexKey) -> Vec<WallKey> {
    arena.parent_walls(vertex)
}

fn cleanup_points(points: &[Point2<f64>], config: &LoopConfig) -> Result<Vec<Point2<f64>>> {
    let tol = config.length_tolerance;
    let cleaned = cleanup_loop_array_by(points, |p, q| (p - q).norm() <= tol);
    if cleaned.len() < 3 {
        return Err(Error::DegenerateLoop(cleaned.len()));
    }
    Ok(cleaned)
}

/// Creates a model loop of straight coedges through `points`.
///
/// Each point gets a new vertex; the coedges are linked into one closed
/// `next` cycle rooted at the coedge leaving the first point.
pub fn create_model_loop(
    arena: &mut TopologyArena,
    points: &[Point2<f64>],
    config: &LoopConfig,
) -> Result<LoopKey> {
    let points = cleanup_points(points, config)?;
    let vertices: Vec<VertexKey> = points.iter().map(|p| arena.add_vertex(p.x, p.y)).collect();
    let n = vertices.len();

    let mut coedges = Vec::with_capacity(n);
    for i in 0..n {
        coedges.push(arena.create_coedge(vertices[i], vertices[(i + 1) % n], Curve::Line)?);
    }
    for i in 0..n {
        arena.set_coedge_next(coedges[i], Some(coedges[(i + 1) % n]))?;
    }

    let lp = arena.add_model_loop();
    for &ck in &coedges {
        arena.set_coedge_loop(ck, Some(lp))?;
    }
    debug!(?lp, coedges = n, "created model loop");
    Ok(lp)
}

/// Writes a new point ring into a model loop.
///
/// With as many points as the loop has coedges the vertices move in place
/// and the same loop is returned. A different count is a structural change:
/// a new loop is created and returned, the old one is left untouched.
pub fn update_loop_by_points(
    arena: &mut TopologyArena,
    lp: LoopKey,
    points: &[Point2<f64>],
    config: &LoopConfig,
) -> Result<LoopKey> {
    let points = cleanup_points(points, config)?;
    let coedges = arena.loop_coedges(lp).ok_or(Error::LoopNotFound(lp))?;

    if coedges.len() != points.len() {
        debug!(?lp, old = coedges.len(), new = points.len(), "point count changed, creating new loop");
        return create_model_loop(arena, &points, config);
    }

    for (&ck, p) in coedges.iter().zip(&points) {
        let vertex = arena.coedge_from(ck).ok_or(Error::CoEdgeNotFound(ck))?;
        arena.move_vertex(vertex, p.x, p.y)?;
    }
    Ok(lp)
}
