/// Node transforms and their composition down the object tree
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Local placement of an object node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl NodeTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build a rotation from the nine values of a `rot` field, which list
    /// the matrix column by column
    pub fn rotation_from_columns(values: &[f32; 9]) -> Matrix3<f32> {
        Matrix3::from_column_slice(values)
    }

    /// The 4x4 homogeneous matrix of this node alone
    pub fn local_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation) * self.rotation.to_homogeneous()
    }

    /// Compose this node under an accumulated parent transform. The result
    /// maps the node's local coordinates straight to root space.
    pub fn accumulate(&self, parent: &Matrix4<f32>) -> Matrix4<f32> {
        parent * self.local_matrix()
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply an accumulated transform to a raw vertex
pub fn transform_vertex(matrix: &Matrix4<f32>, raw: [f32; 3]) -> Point3<f32> {
    matrix.transform_point(&Point3::new(raw[0], raw[1], raw[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_noop() {
        let matrix = NodeTransform::identity().accumulate(&Matrix4::identity());
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
        let p = transform_vertex(&matrix, [1.0, 2.0, 3.0]);
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rotation_is_column_major() {
        // First column maps x to y: a quarter turn about z.
        let rotation =
            NodeTransform::rotation_from_columns(&[0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let node = NodeTransform {
            rotation,
            translation: Vector3::zeros(),
        };
        let p = transform_vertex(&node.accumulate(&Matrix4::identity()), [1.0, 0.0, 0.0]);
        assert!((p - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_parent_applies_after_child() {
        let parent = NodeTransform {
            rotation: NodeTransform::rotation_from_columns(&[
                0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ]),
            translation: Vector3::new(10.0, 0.0, 0.0),
        };
        let child = NodeTransform {
            rotation: Matrix3::identity(),
            translation: Vector3::new(1.0, 0.0, 0.0),
        };
        let accumulated = child.accumulate(&parent.accumulate(&Matrix4::identity()));
        // Child offset (1,0,0) is rotated by the parent to (0,1,0), then moved.
        let p = transform_vertex(&accumulated, [0.0, 0.0, 0.0]);
        assert!((p - Point3::new(10.0, 1.0, 0.0)).norm() < 1e-6);
    }
}
