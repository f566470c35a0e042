// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for tolerance-based point lookup.
//!
//! Uses a grid-based spatial hash for O(1) average-case nearest-point queries.
//! Graph construction uses it to snap wall endpoints and intersection points
//! that lie within tolerance onto a single junction.

use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// A spatial hash grid mapping 2D positions to caller keys.
///
/// The grid divides the plane into square cells of side `cell_size`. Lookups
/// check the 3x3 neighborhood of cells for candidates within tolerance.
#[derive(Debug)]
pub struct PointIndex<K> {
    cell_size: f64,
    grid: FxHashMap<(i64, i64), Vec<(K, Point2<f64>)>>,
}

impl<K: Copy> PointIndex<K> {
    /// Creates a new index with the given cell size.
    ///
    /// `cell_size` should be >= the tolerance used for queries.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-12),
            grid: FxHashMap::default(),
        }
    }

    /// Inserts a key at the given position.
    pub fn insert(&mut self, key: K, point: Point2<f64>) {
        let cell = self.cell_coords(&point);
        self.grid.entry(cell).or_default().push((key, point));
    }

    /// Finds the first key within `tolerance` of `point`.
    pub fn find_near(&self, point: &Point2<f64>, tolerance: f64) -> Option<K> {
        let (cx, cy) = self.cell_coords(point);
        let tol_sq = tolerance * tolerance;

        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(entries) = self.grid.get(&(cx + dx, cy + dy)) {
                    for (key, p) in entries {
                        if (p - point).norm_squared() <= tol_sq {
                            return Some(*key);
                        }
                    }
                }
            }
        }

        None
    }

    fn cell_coords(&self, point: &Point2<f64>) -> (i64, i64) {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_near_within_tolerance() {
        let mut index = PointIndex::new(0.01);
        index.insert(1usize, Point2::new(0.0, 0.0));
        index.insert(2usize, Point2::new(5.0, 5.0));

        assert_eq!(index.find_near(&Point2::new(0.001, 0.0), 0.01), Some(1));
        assert_eq!(index.find_near(&Point2::new(5.0, 5.005), 0.01), Some(2));
        assert_eq!(index.find_near(&Point2::new(1.0, 1.0), 0.01), None);
    }

    #[test]
    fn finds_across_cell_boundaries() {
        let mut index = PointIndex::new(1.0);
        index.insert('a', Point2::new(0.999, 0.999));

        // Neighbor cell (1, 1)
        assert_eq!(index.find_near(&Point2::new(1.001, 1.001), 0.01), Some('a'));
    }

    #[test]
    fn empty_index() {
        let index: PointIndex<u32> = PointIndex::new(1.0);
        assert_eq!(index.find_near(&Point2::new(0.0, 0.0), 1.0), None);
    }
}
