//! Frustum extraction and plane-set containment tests

use crate::camera::ViewCamera;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use super::{Plane, AABB};

/// Planes extracted from a view-projection matrix
///
/// All normals point into the visible volume.
#[derive(Debug, Clone, Copy)]
pub struct FrustumPlanes {
    /// Left, right, bottom, top
    pub sides: [Plane; 4],
    /// Near plane, at the camera's near distance
    pub near: Plane,
    /// Far plane
    pub far: Plane,
}

impl FrustumPlanes {
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for a clip space with `-w <= x, y <= w`
    /// and `0 <= z <= w`, the depth range `Mat4Ext::perspective` produces.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row = |i: usize| vp.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        
        // a*x + b*y + c*z + w >= 0  <=>  dot(n, p) >= -w
        let plane = |c: Vec4| {
            Plane::new(Vec3::new(c.x, c.y, c.z), -c.w)
        };
        
        Self {
            sides: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
            ],
            near: plane(r2),
            far: plane(r3 - r2),
        }
    }
}

/// Build the camera's culling plane set
///
/// Clears `planes` and fills it with the four side planes, plus the far
/// plane when `include_far` is set (the portal path leaves it out, portals
/// already bound depth). The near plane is returned separately so callers
/// can measure signed distances against it.
pub fn extract_frustum_planes<C: ViewCamera + ?Sized>(
    camera: &C,
    include_far: bool,
    planes: &mut Vec<Plane>,
) -> Plane {
    let frustum = FrustumPlanes::from_view_projection(&camera.view_projection_matrix());
    
    planes.clear();
    planes.extend_from_slice(&frustum.sides);
    if include_far {
        planes.push(frustum.far);
    }
    
    frustum.near
}

/// True if `extents` is at least partially on the positive side of every plane
///
/// One corner per plane: the corner farthest along the plane normal. An
/// empty plane set accepts everything.
pub fn is_inside_planes_aabb(extents: &AABB, planes: &[Plane]) -> bool {
    planes
        .iter()
        .all(|plane| plane.max_distance_aabb(extents) >= 0.0)
}

/// True if `extents` is entirely on the positive side of every plane
pub fn is_fully_inside_planes_aabb(extents: &AABB, planes: &[Plane]) -> bool {
    planes
        .iter()
        .all(|plane| plane.min_distance_aabb(extents) >= 0.0)
}
