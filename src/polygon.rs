//! The `.poly` multi-ring polygon file format and ray-casting containment
//! test used by the clip pass (spec §4.6, §6 "Polygon file").
//!
//! ```text
//! <ignored header line>
//! <ring name>
//!    <lon> <lat>
//!    ...
//! END
//! !<hole ring name>
//!    <lon> <lat>
//!    ...
//! END
//! END
//! ```

use std::io::BufRead;

use crate::error::Error;

/// A single closed ring of (lon, lat) vertices.
#[derive(Debug, Clone)]
pub struct Ring {
    pub points: Vec<(f64, f64)>,
    /// `true` for a `!`-prefixed subtractive (outside/hole) ring.
    pub is_hole: bool,
}

impl Ring {
    /// Ray-casting point-in-polygon test (spec §4.6).
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let mut inside = false;
        let points = &self.points;
        let n = points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = points[i];
            let (xj, yj) = points[j];
            let crosses = (yi > lat) != (yj > lat);
            if crosses {
                let x_intersect = xi + (lat - yi) / (yj - yi) * (xj - xi);
                if lon < x_intersect {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// A parsed polygon specification: inside rings plus hole rings.
#[derive(Debug, Clone, Default)]
pub struct PolygonSpec {
    pub inside: Vec<Ring>,
    pub outside: Vec<Ring>,
}

impl PolygonSpec {
    /// A tile is kept iff at least one corner is inside some inside-ring
    /// and no corner is inside any outside-ring (spec §4.6).
    #[must_use]
    pub fn keeps(&self, corners: &[(f64, f64)]) -> bool {
        let any_inside = corners
            .iter()
            .any(|&(lon, lat)| self.inside.iter().any(|r| r.contains(lon, lat)));
        if !any_inside {
            return false;
        }
        let any_in_hole = corners
            .iter()
            .any(|&(lon, lat)| self.outside.iter().any(|r| r.contains(lon, lat)));
        !any_in_hole
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut lines = reader.lines();
        // Header line, ignored per spec.
        lines
            .next()
            .ok_or_else(|| Error::DataFormat("polygon file is empty".into()))??;

        let mut spec = PolygonSpec::default();
        loop {
            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "END" {
                break;
            }

            let is_hole = trimmed.starts_with('!');
            let mut points = Vec::new();
            for body_line in lines.by_ref() {
                let body_line = body_line?;
                let body_trimmed = body_line.trim();
                if body_trimmed == "END" {
                    break;
                }
                let mut parts = body_trimmed.split_whitespace();
                let lon: f64 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::DataFormat(format!("malformed polygon vertex: {body_line}")))?;
                let lat: f64 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::DataFormat(format!("malformed polygon vertex: {body_line}")))?;
                points.push((lon, lat));
            }

            let ring = Ring { points, is_hole };
            if is_hole {
                spec.outside.push(ring);
            } else {
                spec.inside.push(ring);
            }
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn square(min: f64, max: f64) -> Ring {
        Ring {
            points: vec![(min, min), (max, min), (max, max), (min, max)],
            is_hole: false,
        }
    }

    #[test]
    fn ray_cast_detects_interior_point() {
        let ring = square(0.0, 10.0);
        assert!(ring.contains(5.0, 5.0));
        assert!(!ring.contains(20.0, 20.0));
    }

    #[test]
    fn parses_inside_and_hole_rings() {
        let text = "header\nouter\n0 0\n10 0\n10 10\n0 10\nEND\n!hole\n2 2\n4 2\n4 4\n2 4\nEND\nEND\n";
        let spec = PolygonSpec::parse(Cursor::new(text)).unwrap();
        assert_eq!(spec.inside.len(), 1);
        assert_eq!(spec.outside.len(), 1);
    }

    #[test]
    fn keeps_tile_inside_outer_but_not_in_hole() {
        let text = "header\nouter\n0 0\n10 0\n10 10\n0 10\nEND\n!hole\n2 2\n4 2\n4 4\n2 4\nEND\nEND\n";
        let spec = PolygonSpec::parse(Cursor::new(text)).unwrap();
        assert!(spec.keeps(&[(1.0, 1.0)]));
        assert!(!spec.keeps(&[(3.0, 3.0)]));
        assert!(!spec.keeps(&[(20.0, 20.0)]));
    }
}
