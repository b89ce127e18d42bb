//! Spatial partitioning data structures
//!
//! AABB indices over scene nodes, queried by frustum plane sets and by
//! box overlap. A scene owns two of them: a static map rebuilt (and
//! frozen) on `finalize`, and a dynamic map that accepts continuous
//! insert/update/remove.

mod spatial_map;
mod aabb_tree;
mod linear_map;

pub use spatial_map::SpatialMap;
pub use aabb_tree::{AabbTree, AabbTreeMode};
pub use linear_map::LinearSpatialMap;
