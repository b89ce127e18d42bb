//! Plane defined by a unit normal and an offset

use crate::foundation::math::Vec3;
use super::AABB;

/// Plane `dot(normal, p) = distance`
///
/// A point is on the positive ("inside") side when
/// `dot(normal, p) >= distance`. Every plane set in this crate (frustum
/// planes, portal clip planes, BSP splits) uses this convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Offset along the normal from the origin
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance, normalizing both
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.norm();
        if length > 0.0 {
            Self { normal: normal / length, distance: distance / length }
        } else {
            Self { normal, distance }
        }
    }
    
    /// Create from raw `[a, b, c, d]` coefficients (`a*x + b*y + c*z = d`)
    ///
    /// Returns `None` if the normal is zero or any value is not finite.
    pub fn from_coefficients(values: [f32; 4]) -> Option<Self> {
        if values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let normal = Vec3::new(values[0], values[1], values[2]);
        if normal.norm_squared() <= f32::EPSILON {
            return None;
        }
        Some(Self::new(normal, values[3]))
    }
    
    /// Plane through `point` with the given normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, distance: normal.dot(&point) }
    }
    
    /// Same plane, opposite orientation
    pub fn flipped(&self) -> Self {
        Self { normal: -self.normal, distance: -self.distance }
    }
    
    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) - self.distance
    }
    
    /// Corner of `aabb` farthest along the normal
    pub fn farthest_corner(&self, aabb: &AABB) -> Vec3 {
        Vec3::new(
            if self.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if self.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if self.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        )
    }
    
    /// Corner of `aabb` least far along the normal
    pub fn nearest_corner(&self, aabb: &AABB) -> Vec3 {
        Vec3::new(
            if self.normal.x >= 0.0 { aabb.min.x } else { aabb.max.x },
            if self.normal.y >= 0.0 { aabb.min.y } else { aabb.max.y },
            if self.normal.z >= 0.0 { aabb.min.z } else { aabb.max.z },
        )
    }
    
    /// Largest signed distance reached by any point of `aabb`
    ///
    /// This is the conservative depth used for near-plane distances: a box
    /// is only ever measured by its farthest corner.
    pub fn max_distance_aabb(&self, aabb: &AABB) -> f32 {
        self.distance_to_point(self.farthest_corner(aabb))
    }
    
    /// Smallest signed distance reached by any point of `aabb`
    pub fn min_distance_aabb(&self, aabb: &AABB) -> f32 {
        self.distance_to_point(self.nearest_corner(aabb))
    }
}
