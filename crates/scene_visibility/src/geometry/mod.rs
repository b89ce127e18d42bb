//! Geometry primitives for visibility queries
//!
//! Axis-aligned bounding boxes, planes, and the plane-set containment
//! tests every culling path in the crate is built on.

mod aabb;
mod plane;
mod frustum;

pub use aabb::AABB;
pub use plane::Plane;
pub use frustum::{
    extract_frustum_planes, is_inside_planes_aabb, is_fully_inside_planes_aabb,
    FrustumPlanes,
};
