/// Ear-clipping triangulation of simple polygons
///
/// Works on a polygon already projected to 2D. Triangles come back as
/// index triples into the input slice and keep the input's winding, so the
/// caller does not need to know whether the polygon was clockwise.
use nalgebra::Point2;

/// Orientation threshold below which a corner counts as degenerate or
/// reflex
const EAR_EPSILON: f64 = 1e-10;

/// Twice the signed area of the polygon. Positive for counter-clockwise
/// input.
pub fn signed_area(points: &[Point2<f32>]) -> f64 {
    let Some(last) = points.last() else {
        return 0.0;
    };
    let mut previous = last;
    let mut area = 0.0;
    for point in points {
        area += f64::from(previous.x) * f64::from(point.y)
            - f64::from(point.x) * f64::from(previous.y);
        previous = point;
    }
    area
}

/// Triangulate a simple polygon.
///
/// Returns `n - 2` triangles for an `n`-gon, or `None` when no complete
/// triangulation exists (fewer than three points, all points collinear, or
/// a self-intersecting outline).
pub fn triangulate(points: &[Point2<f32>]) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let ccw = signed_area(points) > 0.0;
    let mut remaining: Vec<usize> = if ccw {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut len = n;
    let mut budget = 2 * len;
    let mut v = len - 1;

    while len > 2 {
        if budget == 0 {
            return None;
        }
        budget -= 1;

        let u = if v >= len { 0 } else { v };
        v = if u + 1 >= len { 0 } else { u + 1 };
        let w = if v + 1 >= len { 0 } else { v + 1 };

        if is_ear(points, &remaining[..len], u, v, w) {
            triangles.push([remaining[u], remaining[v], remaining[w]]);
            remaining.remove(v);
            len -= 1;
            budget = 2 * len;
        }
    }

    if !ccw {
        triangles.reverse();
        for triangle in &mut triangles {
            triangle.reverse();
        }
    }
    Some(triangles)
}

fn as_f64(point: &Point2<f32>) -> (f64, f64) {
    (f64::from(point.x), f64::from(point.y))
}

/// Whether the corner at `v` can be clipped: it turns counter-clockwise and
/// no other remaining point lies inside or on the candidate triangle
fn is_ear(points: &[Point2<f32>], remaining: &[usize], u: usize, v: usize, w: usize) -> bool {
    let (ax, ay) = as_f64(&points[remaining[u]]);
    let (bx, by) = as_f64(&points[remaining[v]]);
    let (cx, cy) = as_f64(&points[remaining[w]]);

    if (bx - ax) * (cy - ay) - (by - ay) * (cx - ax) < EAR_EPSILON {
        return false;
    }

    remaining
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != u && i != v && i != w)
        .all(|(_, &index)| {
            let (px, py) = as_f64(&points[index]);
            let ca = (cx - bx) * (py - by) - (cy - by) * (px - bx);
            let cb = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
            let cc = (ax - cx) * (py - cy) - (ay - cy) * (px - cx);
            !(ca >= 0.0 && cb >= 0.0 && cc >= 0.0)
        })
}
