//! Geometry primitives shared by hit-testing and the gesture engine.

use kurbo::{Point, Rect, Vec2};

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    distance(point, proj)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
///
/// A single-sample polyline degenerates to the distance to that sample.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => distance(point, *only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Whether `p` lies on segment a→b, using the triangle-equality test
/// `|d(a,b) - (d(a,p) + d(p,b))| < tolerance`.
pub fn is_on_segment(a: Point, b: Point, p: Point, tolerance: f64) -> bool {
    let offset = distance(a, b) - (distance(a, p) + distance(p, b));
    offset.abs() < tolerance
}

/// Axis-aligned proximity test: both |dx| and |dy| are under `tolerance`.
pub fn near_point(p: Point, target: Point, tolerance: f64) -> bool {
    (p.x - target.x).abs() < tolerance && (p.y - target.y).abs() < tolerance
}

/// Inclusive containment in the box spanned by two corners, in any order.
pub fn point_in_rect(p: Point, a: Point, b: Point) -> bool {
    let rect = Rect::from_points(a, b);
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Whether `p` lies within `tolerance` of the rim of a circle.
pub fn point_on_circle_band(p: Point, center: Point, radius: f64, tolerance: f64) -> bool {
    (distance(p, center) - radius).abs() < tolerance
}

/// Whether `p` lies inside (or on) a circle.
pub fn point_in_circle(p: Point, center: Point, radius: f64) -> bool {
    distance(p, center) <= radius
}

/// Min/max fold over a point sequence.
pub fn bounding_fold(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    let mut rect = Rect::from_points(*first, *first);
    for p in rest {
        rect = rect.union_pt(*p);
    }
    Some(rect)
}

/// Offsets of every point relative to `origin`.
pub fn offsets_from(origin: Point, points: &[Point]) -> Vec<Vec2> {
    points.iter().map(|p| origin - *p).collect()
}
