/// Face normals, polygon projection and crease-angle smoothing
use std::collections::HashMap;

use nalgebra::{Point2, Point3, Vector3};

use crate::geometry::{FaceNormal, Surface};

/// Face normals at or below this length mark a degenerate polygon
pub const DEGENERATE_EPSILON: f32 = 1e-10;

/// Unnormalized normal of the plane through the first three referenced
/// vertices, or `None` if there are fewer than three references or the
/// normal is degenerate.
pub fn face_normal(vertices: &[Point3<f32>], indices: &[usize]) -> Option<FaceNormal> {
    let [i0, i1, i2] = match indices {
        [a, b, c, ..] => [*a, *b, *c],
        _ => return None,
    };
    let v0 = vertices.get(i0)?;
    let edge1 = vertices.get(i1)? - v0;
    let edge2 = vertices.get(i2)? - v0;

    let vector = edge1.cross(&edge2);
    let magnitude = vector.norm();
    if magnitude > DEGENERATE_EPSILON {
        Some(FaceNormal { vector, magnitude })
    } else {
        None
    }
}

/// The two coordinate axes kept when projecting a polygon with this normal
/// onto a plane: the axis with the largest normal component is dropped.
pub fn projection_axes(normal: &Vector3<f32>) -> (usize, usize) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let max = ax.max(ay).max(az);
    if max == ax {
        (1, 2)
    } else if max == ay {
        (0, 2)
    } else {
        (0, 1)
    }
}

/// Project the referenced vertices onto the plane chosen by
/// [`projection_axes`]
pub fn project(
    vertices: &[Point3<f32>],
    indices: &[usize],
    normal: &Vector3<f32>,
) -> Vec<Point2<f32>> {
    let (x, y) = projection_axes(normal);
    indices
        .iter()
        .map(|&i| Point2::new(vertices[i][x], vertices[i][y]))
        .collect()
}

/// Surfaces of one object that reference each vertex index
#[derive(Debug, Default, Clone)]
pub struct SharedVertices {
    adjacency: HashMap<usize, Vec<usize>>,
}

impl SharedVertices {
    pub fn build(surfaces: &[Surface]) -> Self {
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        for (surface_id, surface) in surfaces.iter().enumerate() {
            for &index in &surface.indices {
                let adjacent = adjacency.entry(index).or_default();
                if !adjacent.contains(&surface_id) {
                    adjacent.push(surface_id);
                }
            }
        }
        Self { adjacency }
    }

    /// Surfaces touching `vertex`, in surface order
    pub fn adjacent(&self, vertex: usize) -> &[usize] {
        self.adjacency.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct vertices referenced by any surface
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

/// Whether two faces meet at less than the crease angle. Compares the dot
/// product of the raw normals against their scaled lengths.
fn within_crease(a: &FaceNormal, b: &FaceNormal, cos_crease: f32) -> bool {
    a.vector.dot(&b.vector) >= cos_crease * a.magnitude * b.magnitude
}

/// Fill the per-reference normal list of every surface.
///
/// Shaded surfaces get, at each vertex reference, their own face normal
/// plus the face normal of every other surface sharing that vertex whose
/// orientation is within `crease` degrees. The sum is left unnormalized.
/// Unshaded surfaces repeat their face normal.
pub fn smooth_normals(surfaces: &mut [Surface], shared: &SharedVertices, crease: f32) {
    let cos_crease = crease.to_radians().cos();
    let faces: Vec<FaceNormal> = surfaces.iter().map(|s| s.normal).collect();

    for (surface_id, surface) in surfaces.iter_mut().enumerate() {
        let own = faces[surface_id];
        if !surface.shaded {
            surface.normals = vec![own.vector; surface.indices.len()];
            continue;
        }

        surface.normals = surface
            .indices
            .iter()
            .map(|&index| {
                shared
                    .adjacent(index)
                    .iter()
                    .filter(|&&other| other != surface_id)
                    .map(|&other| &faces[other])
                    .filter(|other| within_crease(&own, other, cos_crease))
                    .fold(own.vector, |sum, other| sum + other.vector)
            })
            .collect();
    }
}
