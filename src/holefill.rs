//! Flood-fill hole detection for a way/relation's tile set (spec §4.3).
//!
//! Only triggered for element tile sets of 8 or more tiles: below that no
//! interior hole can exist under 4-connectivity.

use std::collections::HashSet;

use crate::tile::TileCoord;

/// Minimum tile-set size before hole-fill is worth attempting.
pub const HOLE_FILL_THRESHOLD: usize = 8;

/// Compute the interior "hole" tiles of `tiles` and return them, without
/// mutating the input. Callers add the result to both the element's tile
/// set and the modified-tile set (spec §4.3 step 4).
///
/// Returns an empty vector if `tiles.len() < `[`HOLE_FILL_THRESHOLD`].
#[must_use]
pub fn fill_holes(tiles: &[TileCoord]) -> Vec<TileCoord> {
    if tiles.len() < HOLE_FILL_THRESHOLD {
        return Vec::new();
    }

    let min_x = tiles.iter().map(|t| t.x).min().unwrap();
    let max_x = tiles.iter().map(|t| t.x).max().unwrap();
    let min_y = tiles.iter().map(|t| t.y).min().unwrap();
    let max_y = tiles.iter().map(|t| t.y).max().unwrap();

    // Enlarge the bounding box by 2 in each direction so the flood has
    // room to wrap around the shape's outer edge (spec step 1).
    let origin_x = min_x as i64 - 2;
    let origin_y = min_y as i64 - 2;
    let width = (max_x as i64 - min_x as i64 + 1 + 4) as usize;
    let height = (max_y as i64 - min_y as i64 + 1 + 4) as usize;

    let mut set = vec![false; width * height];
    let cell = |x: i64, y: i64| ((y - origin_y) as usize) * width + (x - origin_x) as usize;

    let occupied: HashSet<(i64, i64)> = tiles.iter().map(|t| (i64::from(t.x), i64::from(t.y))).collect();
    for &(x, y) in &occupied {
        set[cell(x, y)] = true;
    }

    let mut exterior = vec![false; width * height];
    exterior[cell(origin_x, origin_y)] = true;

    // Iterative 4-neighbour flood fill over unset cells strictly inside
    // the frame; the outermost row/column is the seed ring itself and is
    // never flooded past the bounding box (spec step 3).
    let mut frontier = vec![(origin_x, origin_y)];
    while let Some((x, y)) = frontier.pop() {
        for (dx, dy) in [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx < origin_x
                || ny < origin_y
                || nx >= origin_x + width as i64
                || ny >= origin_y + height as i64
            {
                continue;
            }
            let idx = cell(nx, ny);
            if exterior[idx] || set[idx] {
                continue;
            }
            exterior[idx] = true;
            frontier.push((nx, ny));
        }
    }

    let mut holes = Vec::new();
    for gy in 0..height as i64 {
        for gx in 0..width as i64 {
            let x = origin_x + gx;
            let y = origin_y + gy;
            let idx = cell(x, y);
            if !set[idx] && !exterior[idx] && x >= 0 && y >= 0 {
                holes.push(TileCoord::new(x as u32, y as u32));
            }
        }
    }
    holes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(min: i64, max: i64) -> Vec<TileCoord> {
        let mut tiles = Vec::new();
        for x in min..=max {
            tiles.push(TileCoord::new(x as u32, min as u32));
            tiles.push(TileCoord::new(x as u32, max as u32));
        }
        for y in (min + 1)..max {
            tiles.push(TileCoord::new(min as u32, y as u32));
            tiles.push(TileCoord::new(max as u32, y as u32));
        }
        tiles
    }

    #[test]
    fn below_threshold_returns_nothing() {
        let tiles = vec![TileCoord::new(0, 0), TileCoord::new(1, 0)];
        assert!(fill_holes(&tiles).is_empty());
    }

    #[test]
    fn simple_ring_fills_its_interior() {
        let tiles = ring(10, 14); // a 5x5 ring: 16 boundary tiles, 9 interior
        let holes = fill_holes(&tiles);
        let mut expected: Vec<TileCoord> = (11..=13)
            .flat_map(|x| (11..=13).map(move |y| TileCoord::new(x, y)))
            .collect();
        let mut holes_sorted = holes.clone();
        holes_sorted.sort();
        expected.sort();
        assert_eq!(holes_sorted, expected);
    }

    #[test]
    fn solid_block_has_no_holes() {
        let tiles: Vec<TileCoord> = (0..3).flat_map(|x| (0..3).map(move |y| TileCoord::new(x, y))).collect();
        assert!(fill_holes(&tiles).is_empty());
    }

    #[test]
    fn holes_never_fall_outside_the_bounding_box() {
        let tiles = ring(100, 104);
        let holes = fill_holes(&tiles);
        for t in &holes {
            assert!(t.x >= 100 && t.x <= 104 && t.y >= 100 && t.y <= 104);
        }
    }

    #[test]
    fn is_symmetric_under_translation() {
        let a = ring(10, 14);
        let b = ring(1000, 1004);
        let mut holes_a: Vec<(u32, u32)> = fill_holes(&a).iter().map(|t| (t.x - 10, t.y - 10)).collect();
        let mut holes_b: Vec<(u32, u32)> = fill_holes(&b).iter().map(|t| (t.x - 1000, t.y - 1000)).collect();
        holes_a.sort();
        holes_b.sort();
        assert_eq!(holes_a, holes_b);
    }
}
