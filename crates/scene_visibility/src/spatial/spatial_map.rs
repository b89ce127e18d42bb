//! Abstract spatial map interface
//!
//! This abstraction allows swapping different spatial partitioning schemes
//! (AABB tree, grid, linear list) without changing the visibility code.

use crate::geometry::{Plane, AABB};
use crate::scene::NodeKey;

/// AABB-indexed collection of scene nodes
///
/// Query methods append to `out` and return how many keys they appended,
/// so callers can fill one reusable buffer from several maps in a row.
/// Queries are only guaranteed to reflect adds/updates/removes after
/// `finalize` has been called.
pub trait SpatialMap: Send + Sync {
    /// Register a node with its world extents
    fn add(&mut self, node: NodeKey, extents: &AABB);
    
    /// Update a registered node's extents (after a transform change)
    fn update(&mut self, node: NodeKey, extents: &AABB);
    
    /// Remove a node; unknown keys are ignored
    fn remove(&mut self, node: NodeKey);
    
    /// Commit queued changes so queries see a consistent index
    fn finalize(&mut self);
    
    /// Append every node whose extents touch the positive side of all planes
    fn get_visible_nodes(&self, planes: &[Plane], out: &mut Vec<NodeKey>) -> usize;
    
    /// Append every node whose extents overlap `extents`
    fn get_overlapping_nodes(&self, extents: &AABB, out: &mut Vec<NodeKey>) -> usize;
    
    /// Union of all registered extents, `None` when empty
    fn get_extents(&self) -> Option<AABB>;
    
    /// Whether `node` is registered
    fn contains(&self, node: NodeKey) -> bool;
    
    /// Number of registered nodes
    fn len(&self) -> usize;
    
    /// True when no nodes are registered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    
    /// Remove every node
    fn clear(&mut self);
}
