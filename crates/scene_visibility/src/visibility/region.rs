//! On-demand region overlap queries
//!
//! Not tied to a camera or a frame: given an origin and a box, return the
//! nodes or renderables the box overlaps. With areas, the box is routed
//! from the origin's area through the portals it reaches; otherwise both
//! spatial maps are asked directly. Disabled nodes and renderables are
//! never returned.

use crate::areas::PortalFlood;
use crate::foundation::math::Vec3;
use crate::geometry::{is_inside_planes_aabb, AABB};
use crate::scene::{NodeKey, RenderableKey};
use super::SceneAccess;

/// Scratch for region queries
#[derive(Debug, Default)]
pub struct RegionQuery {
    flood: PortalFlood,
    nodes: Vec<NodeKey>,
}

impl RegionQuery {
    /// Create empty scratch
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Clear `out` and fill it with every enabled node overlapping `extents`
    pub(crate) fn find_overlapping_nodes(
        &mut self,
        scene: &mut SceneAccess<'_>,
        origin: Vec3,
        extents: &AABB,
        out: &mut Vec<NodeKey>,
    ) {
        out.clear();
        let query = scene.counter.next();
        
        let start = scene.areas.as_deref().and_then(|areas| areas.find_area_index(origin));
        let (Some(areas), Some(start)) = (scene.areas.as_deref_mut(), start) else {
            scene.static_map.get_overlapping_nodes(extents, out);
            scene.dynamic_map.get_overlapping_nodes(extents, out);
            let graph = &*scene.graph;
            out.retain(|&key| graph.nodes.get(key).map_or(false, |node| !node.is_disabled()));
            return;
        };
        
        self.flood.find_overlapping_portals(&mut areas.areas, start, origin, extents, query);
        for item in self.flood.items() {
            areas.populate_dynamic_nodes(item.area, scene.dynamic_map, &item.bounds, query);
            let planes = self.flood.planes(item);
            
            for &key in &areas.areas[item.area].nodes {
                let Some(node) = scene.graph.nodes.get_mut(key) else {
                    continue;
                };
                if node.query_counter == query || node.is_disabled() {
                    continue;
                }
                let Some(node_extents) = node.world_extents else {
                    continue;
                };
                if !node_extents.intersects(extents) || !is_inside_planes_aabb(&node_extents, planes) {
                    continue;
                }
                node.query_counter = query;
                out.push(key);
            }
        }
    }
    
    /// Clear `out` and fill it with every enabled renderable overlapping
    /// `extents`
    ///
    /// All renderables of a node whose box lies inside `extents` are taken
    /// without further tests; renderables of partially overlapping nodes
    /// are tested one by one.
    pub(crate) fn find_overlapping_renderables(
        &mut self,
        scene: &mut SceneAccess<'_>,
        origin: Vec3,
        extents: &AABB,
        out: &mut Vec<RenderableKey>,
    ) {
        out.clear();
        let mut nodes = std::mem::take(&mut self.nodes);
        self.find_overlapping_nodes(scene, origin, extents, &mut nodes);
        
        let graph = &*scene.graph;
        for &key in &nodes {
            let Some(node) = graph.nodes.get(key) else {
                continue;
            };
            let fully_inside = node.world_extents.map_or(false, |node_extents| extents.contains(&node_extents));
            
            out.extend(node.renderables.iter().copied().filter(|&renderable_key| {
                graph.renderables.get(renderable_key).map_or(false, |renderable| {
                    !renderable.disabled && (fully_inside || renderable.world_extents.intersects(extents))
                })
            }));
        }
        
        self.nodes = nodes;
    }
}
