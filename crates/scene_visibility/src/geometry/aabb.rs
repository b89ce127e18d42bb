//! Axis-Aligned Bounding Box

use crate::foundation::math::{Mat4, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
    
    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }
    
    /// Create an AABB from the packed `[min_x, min_y, min_z, max_x, max_y, max_z]` layout
    pub fn from_array(values: [f32; 6]) -> Self {
        Self {
            min: Vec3::new(values[0], values[1], values[2]),
            max: Vec3::new(values[3], values[4], values[5]),
        }
    }
    
    /// Pack into `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub fn to_array(&self) -> [f32; 6] {
        [self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
    }
    
    /// Smallest AABB containing every point, `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut result = Self::new(first, first);
        for point in iter {
            result.grow_point(point);
        }
        Some(result)
    }
    
    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
    
    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
    
    /// Surface area, used as the insertion cost of tree nodes
    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }
    
    /// True when min <= max on every axis and all values are finite
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }
    
    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
    
    /// Check if `other` lies entirely inside this AABB
    pub fn contains(&self, other: &AABB) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }
    
    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
    
    /// Overlapping region of two boxes, `None` when they are disjoint
    pub fn intersection(&self, other: &AABB) -> Option<AABB> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        })
    }
    
    /// Smallest AABB containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }
    
    /// Grow in place to contain `other`
    pub fn grow(&mut self, other: &AABB) {
        *self = self.union(other);
    }
    
    /// Grow in place to contain `point`
    pub fn grow_point(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }
    
    /// Copy expanded by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }
    
    /// World-space box of this box transformed by an affine matrix
    ///
    /// Uses the absolute-value matrix trick: the transformed half-extents
    /// are `|M3| * extents`, exact for the eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let center = self.center();
        let half = self.extents();
        
        let new_center = matrix.transform_point(&center.into()).coords;
        let linear = matrix.fixed_view::<3, 3>(0, 0).abs();
        let new_half = linear * half;
        
        Self::from_center_extents(new_center, new_half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform};
    use approx::assert_relative_eq;
    
    #[test]
    fn test_aabb_contains_point() {
        let aabb = AABB::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        );
        
        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }
    
    #[test]
    fn test_aabb_intersects_and_intersection() {
        let aabb1 = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        let aabb2 = AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let aabb3 = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));
        
        assert!(aabb1.intersects(&aabb2));
        assert!(!aabb1.intersects(&aabb3));
        
        let overlap = aabb1.intersection(&aabb2).unwrap();
        assert_eq!(overlap, AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0)));
        assert!(aabb1.intersection(&aabb3).is_none());
    }
    
    #[test]
    fn test_array_layout() {
        let aabb = AABB::from_array([-1.0, -2.0, -3.0, 1.0, 2.0, 3.0]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.to_array(), [-1.0, -2.0, -3.0, 1.0, 2.0, 3.0]);
    }
    
    #[test]
    fn test_transformed_rotated_box() {
        let aabb = AABB::new(Vec3::new(-1.0, -0.5, -0.5), Vec3::new(1.0, 0.5, 0.5));
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let transform = Transform::from_position_rotation(Vec3::new(10.0, 0.0, 0.0), rotation);
        
        let world = aabb.transformed(&transform.to_matrix());
        
        assert_relative_eq!(world.min, Vec3::new(9.5, -1.0, -0.5), epsilon = 1e-5);
        assert_relative_eq!(world.max, Vec3::new(10.5, 1.0, 0.5), epsilon = 1e-5);
    }
    
    #[test]
    fn test_from_points_and_union() {
        let aabb = AABB::from_points([Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 2.0, 3.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(AABB::from_points(std::iter::empty()).is_none());
        
        let other = AABB::new(Vec3::new(4.0, 4.0, 4.0), Vec3::new(5.0, 5.0, 5.0));
        let merged = aabb.union(&other);
        assert!(merged.contains(&aabb));
        assert!(merged.contains(&other));
    }
}
