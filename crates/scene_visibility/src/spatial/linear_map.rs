//! Simple list-based spatial map (no spatial optimization)
//!
//! Performs a linear scan for every query. Sufficient for small scenes and
//! useful as a reference when checking tree-based maps.

use crate::geometry::{is_inside_planes_aabb, Plane, AABB};
use crate::scene::NodeKey;
use super::SpatialMap;

/// Linear spatial map
#[derive(Debug, Default)]
pub struct LinearSpatialMap {
    /// List of nodes with their bounding volumes
    entries: Vec<(NodeKey, AABB)>,
}

impl LinearSpatialMap {
    /// Create a new empty map
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl SpatialMap for LinearSpatialMap {
    fn add(&mut self, node: NodeKey, extents: &AABB) {
        debug_assert!(!self.contains(node), "node registered twice");
        self.entries.push((node, *extents));
    }
    
    fn update(&mut self, node: NodeKey, extents: &AABB) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == node) {
            entry.1 = *extents;
        }
    }
    
    fn remove(&mut self, node: NodeKey) {
        self.entries.retain(|(n, _)| *n != node);
    }
    
    fn finalize(&mut self) {}
    
    fn get_visible_nodes(&self, planes: &[Plane], out: &mut Vec<NodeKey>) -> usize {
        let start = out.len();
        out.extend(
            self.entries
                .iter()
                .filter(|(_, extents)| is_inside_planes_aabb(extents, planes))
                .map(|(node, _)| *node),
        );
        out.len() - start
    }
    
    fn get_overlapping_nodes(&self, extents: &AABB, out: &mut Vec<NodeKey>) -> usize {
        let start = out.len();
        out.extend(
            self.entries
                .iter()
                .filter(|(_, bounds)| bounds.intersects(extents))
                .map(|(node, _)| *node),
        );
        out.len() - start
    }
    
    fn get_extents(&self) -> Option<AABB> {
        self.entries
            .iter()
            .map(|(_, extents)| *extents)
            .reduce(|a, b| a.union(&b))
    }
    
    fn contains(&self, node: NodeKey) -> bool {
        self.entries.iter().any(|(n, _)| *n == node)
    }
    
    fn len(&self) -> usize {
        self.entries.len()
    }
    
    fn clear(&mut self) {
        self.entries.clear();
    }
}
