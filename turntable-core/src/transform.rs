//! Local node transforms

use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of a scene node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl NodeTransform {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Create a translation transformation
    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Create from glTF-style decomposed arrays (quaternion is `[x, y, z, w]`)
    pub fn from_parts(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation;
        Self {
            translation: Vector3::from(translation),
            rotation: UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z)),
            scale: Vector3::from(scale),
        }
    }

    /// Homogeneous matrix `T * R * S`
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Translation3::from(self.translation).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let scaled = point.coords.component_mul(&self.scale);
        Point3::from(self.rotation * scaled + self.translation)
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f32) -> bool {
        (self.to_matrix() - Matrix4::identity()).norm() < epsilon
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn matrix_and_point_paths_agree() {
        let transform = NodeTransform {
            translation: Vector3::new(1.0, 2.0, 3.0),
            rotation: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let p = Point3::new(1.0, 0.0, 0.0);

        let direct = transform.transform_point(&p);
        let via_matrix = transform.to_matrix().transform_point(&p);

        assert_relative_eq!(direct, via_matrix, epsilon = 1e-5);
        assert_relative_eq!(direct, Point3::new(1.0, 2.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn from_parts_reads_xyzw_quaternion() {
        let half = FRAC_PI_2 / 2.0;
        let t = NodeTransform::from_parts([0.0; 3], [0.0, half.sin(), 0.0, half.cos()], [1.0; 3]);
        let rotated = t.transform_point(&Point3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(rotated, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn default_is_identity() {
        assert!(NodeTransform::default().is_identity(1e-6));
    }
}
