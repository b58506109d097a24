//! Turns a lane's two boundary polylines into a set of filled triangles
//! approximating the drivable corridor.
//!
//! The approach: throw both boundaries into one Delaunay triangulation,
//! then keep only triangles spanning the corridor (two vertices on one
//! boundary, one on the other). Triangles entirely on a single boundary are
//! degenerate slivers at the corridor ends, not road surface.

use delaunator::{triangulate, Point};
use glam::DVec2;

use crate::map::{Lane, Map};

/// World-space triangles covering the lane surface, ready for filled
/// rendering. Cheap enough to recompute per full-map render; the result
/// never changes for a given map.
pub fn lane_triangles(map: &Map, lane: &Lane) -> Vec<[DVec2; 3]> {
    let mut points = map.way_points(&map.ways[&lane.left]);
    let num_left = points.len();
    points.extend(map.way_points(&map.ways[&lane.right]));

    corridor_triangles(&points, num_left)
        .into_iter()
        .map(|[a, b, c]| [points[a], points[b], points[c]])
        .collect()
}

/// Index triples into `points` (left boundary points first). Fewer than 3
/// points, or fully collinear input, yields no triangles; that's fine.
fn corridor_triangles(points: &[DVec2], num_left: usize) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }

    let input: Vec<Point> = points.iter().map(|p| Point { x: p.x, y: p.y }).collect();
    let triangulation = triangulate(&input);

    let mut result = Vec::new();
    for tri in triangulation.triangles.chunks_exact(3) {
        let left_vertices = tri.iter().filter(|&&idx| idx < num_left).count();
        if left_vertices == 1 || left_vertices == 2 {
            result.push([tri[0], tri[1], tri[2]]);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<DVec2> {
        raw.iter().map(|&(x, y)| DVec2::new(x, y)).collect()
    }

    #[test]
    fn two_points_is_empty_not_an_error() {
        assert!(corridor_triangles(&pts(&[(0.0, 0.0), (0.0, 1.0)]), 1).is_empty());
    }

    #[test]
    fn collinear_points_dont_crash() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        // Degenerate input; empty or partial output is acceptable
        corridor_triangles(&points, 2);
    }

    #[test]
    fn straight_corridor_spans_both_boundaries() {
        // Left boundary at y=1, right boundary at y=0
        let points = pts(&[
            (0.0, 1.0),
            (1.0, 1.0),
            (2.0, 1.0),
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
        ]);
        let triangles = corridor_triangles(&points, 3);
        assert!(!triangles.is_empty());
        for tri in &triangles {
            let left_vertices = tri.iter().filter(|&&idx| idx < 3).count();
            assert!(
                left_vertices == 1 || left_vertices == 2,
                "triangle {:?} doesn't span the corridor",
                tri
            );
        }
    }

    #[test]
    fn curved_corridor_keeps_the_spanning_filter() {
        let mut points = Vec::new();
        for i in 0..8 {
            let theta = 0.2 * i as f64;
            points.push(DVec2::new(10.0 * theta.cos(), 10.0 * theta.sin()));
        }
        let num_left = points.len();
        for i in 0..8 {
            let theta = 0.2 * i as f64;
            points.push(DVec2::new(7.0 * theta.cos(), 7.0 * theta.sin()));
        }

        for tri in corridor_triangles(&points, num_left) {
            let left_vertices = tri.iter().filter(|&&idx| idx < num_left).count();
            assert!(left_vertices == 1 || left_vertices == 2);
        }
    }
}
