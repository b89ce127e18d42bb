//! # 3D Camera
//!
//! The visibility resolver only needs a handful of things from a camera:
//! its view-projection matrix, its world position, its near/far distances
//! and the bounding box of its frustum at an arbitrary depth. Those are the
//! `ViewCamera` trait; `Camera` is the perspective implementation shipped
//! with the crate.
//!
//! ## Coordinate System
//! Right-handed, Y-up world. In view space the camera looks down -Z; the
//! clip transform flips Y and Z so projected depth grows away from the
//! camera and lands in [0, 1] between the near and far planes.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::geometry::AABB;

/// Camera contract consumed by `Scene::update_visible_nodes`
pub trait ViewCamera {
    /// Combined projection x view matrix
    fn view_projection_matrix(&self) -> Mat4;
    
    /// Camera-to-world matrix; its translation is the camera position
    fn world_matrix(&self) -> Mat4;
    
    /// Distance to the near clipping plane
    fn near_plane(&self) -> f32;
    
    /// Distance to the far clipping plane
    fn far_plane(&self) -> f32;
    
    /// World-space bounding box of the frustum cut off at `far`
    fn frustum_extents(&self, far: f32) -> AABB;
    
    /// Camera position in world space
    fn position(&self) -> Vec3 {
        utils::translation(&self.world_matrix())
    }
}

/// 3D perspective camera
///
/// Represents a camera in 3D space with position, orientation, and
/// projection parameters. Matrices are computed on demand.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    
    /// Point the camera is looking at in world space
    pub target: Vec3,
    
    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,
    
    /// Vertical field of view in radians
    pub fov: f32,
    
    /// Aspect ratio (width / height)
    pub aspect: f32,
    
    /// Distance to near clipping plane
    pub near: f32,
    
    /// Distance to far clipping plane  
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// The camera initially looks at the origin; use `look_at` to aim it.
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }
    
    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }
    
    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }
    
    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }
    
    /// Move the camera and aim it along `direction`
    pub fn place(&mut self, position: Vec3, direction: Vec3) {
        self.position = position;
        self.target = position + direction;
    }
    
    /// Normalized viewing direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }
    
    /// Orthonormal (right, up, forward) basis of the camera
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.forward();
        let right = forward.cross(&self.up).normalize();
        let up = right.cross(&forward);
        (right, up, forward)
    }
    
    /// Generate view matrix for world-to-camera space transformation
    pub fn get_view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }
    
    /// Generate perspective projection matrix  
    pub fn get_projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }
    
    /// Generate combined view-projection matrix: P × X × V
    ///
    /// X is the clip coordinate transform that turns the -Z-forward view
    /// space into +Z-forward before projection.
    pub fn get_view_projection_matrix(&self) -> Mat4 {
        let view_matrix = self.get_view_matrix();
        let coord_transform = Mat4::clip_coordinate_transform();
        let projection_matrix = self.get_projection_matrix();
        
        projection_matrix * coord_transform * view_matrix
    }
}

impl ViewCamera for Camera {
    fn view_projection_matrix(&self) -> Mat4 {
        self.get_view_projection_matrix()
    }
    
    fn world_matrix(&self) -> Mat4 {
        let (right, up, forward) = self.basis();
        Mat4::new(
            right.x, up.x, -forward.x, self.position.x,
            right.y, up.y, -forward.y, self.position.y,
            right.z, up.z, -forward.z, self.position.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }
    
    fn near_plane(&self) -> f32 {
        self.near
    }
    
    fn far_plane(&self) -> f32 {
        self.far
    }
    
    fn frustum_extents(&self, far: f32) -> AABB {
        let (right, up, forward) = self.basis();
        let tan_half = (self.fov * 0.5).tan();
        
        let corners = [self.near, far].into_iter().flat_map(|depth| {
            let center = self.position + forward * depth;
            let half_h = up * (depth * tan_half);
            let half_w = right * (depth * tan_half * self.aspect);
            [
                center - half_w - half_h,
                center + half_w - half_h,
                center - half_w + half_h,
                center + half_w + half_h,
            ]
        });
        
        // Eight corners, never empty
        AABB::from_points(corners).unwrap_or_else(|| AABB::new(self.position, self.position))
    }
    
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Default for Camera {
    /// Default perspective camera: at (0, 3, 3) looking at the origin,
    /// 45 degree FOV, 16:9, near 0.1, far 1000
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 3.0),
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}
