//! Axis-aligned boxes and bounding spheres

use crate::point::Point3f;
use nalgebra::Matrix4;

/// Axis-aligned bounding box.
///
/// The empty box has `min > max` on every axis, so expanding it by any point
/// yields that point and unioning with it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

/// Sphere enclosing a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3f,
    pub radius: f32,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points; empty for an empty iterator
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3f>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand(&mut self, point: &Point3f) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> nalgebra::Vector3<f32> {
        self.max - self.min
    }

    /// Box of the eight transformed corners
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3f::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand(&matrix.transform_point(&corner));
        }
        out
    }

    /// Sphere centred on the box with the half-diagonal as radius
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        if self.is_empty() {
            return None;
        }
        Some(BoundingSphere {
            center: self.center(),
            radius: self.size().norm() * 0.5,
        })
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
