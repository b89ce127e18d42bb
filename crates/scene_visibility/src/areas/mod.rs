//! Area / portal / BSP partitioning
//!
//! An optional partition of the level into convex areas connected by
//! one-way portals, with a BSP locating the area containing a point.
//! Static nodes are assigned to areas once per change of the static set;
//! dynamic nodes are appended per query from the dynamic spatial map.

mod area;
mod bsp;
mod data;
mod flood;
mod portal_clip;

pub use area::{Area, Portal};
pub use bsp::{BspChild, BspNode};
pub use data::{AreaData, AreaLoadError, AreasData, BspNodeData, PortalData};
pub use flood::{PortalFlood, PortalItem};
pub use portal_clip::{build_portal_planes, ClipScratch};

use crate::foundation::math::Vec3;
use crate::geometry::AABB;
use crate::scene::{LightKind, MapMembership, Node, NodeKey, QueryCounter, SceneGraph};
use crate::spatial::SpatialMap;

/// Loaded areas and BSP plus traversal scratch
#[derive(Debug)]
pub struct AreaSystem {
    pub(crate) areas: Vec<Area>,
    bsp: Vec<BspNode>,
    bsp_stack: Vec<usize>,
    reached: Vec<usize>,
}

impl AreaSystem {
    /// Validate and convert decoded level data
    pub fn from_data(data: &AreasData) -> Result<Self, AreaLoadError> {
        let bsp = data::build_bsp(data)?;
        let areas = data::build_areas(data)?;
        
        let portal_count: usize = areas.iter().map(|area| area.portals.len()).sum();
        log::info!(
            "Loaded {} areas, {} portals, {} BSP nodes",
            areas.len(),
            portal_count,
            bsp.len()
        );
        
        Ok(Self {
            areas,
            bsp,
            bsp_stack: Vec::new(),
            reached: Vec::new(),
        })
    }
    
    /// All areas
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }
    
    /// Area by index
    pub fn area(&self, index: usize) -> Option<&Area> {
        self.areas.get(index)
    }
    
    /// BSP nodes, root first
    pub fn bsp_nodes(&self) -> &[BspNode] {
        &self.bsp
    }
    
    /// Area containing `point`
    pub fn find_area_index(&self, point: Vec3) -> Option<usize> {
        bsp::find_area_index(&self.bsp, point)
    }
    
    /// Append every area whose BSP leaf `extents` touches
    pub fn find_area_indices_aabb(&mut self, extents: &AABB, out: &mut Vec<usize>) {
        bsp::find_area_indices_aabb(&self.bsp, extents, &mut self.bsp_stack, out);
    }
    
    /// Areas `extents` reaches through portals from `start`, start first
    pub fn find_overlapping_areas(
        &mut self,
        start: usize,
        extents: &AABB,
        avoid_disabled: bool,
        query: u32,
        out: &mut Vec<usize>,
    ) {
        flood::find_overlapping_areas(&mut self.areas, start, extents, avoid_disabled, query, out);
    }
    
    /// Open or close a portal, `false` if it does not exist
    pub fn set_portal_disabled(&mut self, area: usize, portal: usize, disabled: bool) -> bool {
        match self.areas.get_mut(area).and_then(|a| a.portals.get_mut(portal)) {
            Some(portal) => {
                portal.disabled = disabled;
                true
            }
            None => false,
        }
    }
    
    /// Whether a portal is closed, `None` if it does not exist
    pub fn portal_disabled(&self, area: usize, portal: usize) -> Option<bool> {
        self.areas.get(area)?.portals.get(portal).map(|p| p.disabled)
    }
    
    /// Drop dynamic nodes appended by earlier queries from every area
    pub(crate) fn reset_dynamic_nodes(&mut self) {
        for area in &mut self.areas {
            area.reset_dynamic_nodes();
        }
    }
    
    /// Append dynamic nodes overlapping `bounds` to an area, once per query
    pub(crate) fn populate_dynamic_nodes(
        &mut self,
        area: usize,
        dynamic_map: &dyn SpatialMap,
        bounds: &AABB,
        query: u32,
    ) {
        let area = &mut self.areas[area];
        if area.dynamic_stamp == query {
            return;
        }
        area.dynamic_stamp = query;
        area.reset_dynamic_nodes();
        if let Some(region) = area.extents.intersection(bounds) {
            dynamic_map.get_overlapping_nodes(&region, &mut area.nodes);
        }
    }
    
    /// Reassign every static node of `graph` to the areas it belongs to
    ///
    /// A node goes to the area containing its reference point (a spot
    /// light's origin, otherwise its extents centre) and to every area its
    /// extents reach from there through portals, open or closed. Nodes
    /// whose reference point is in no area fall back to every BSP leaf
    /// their padded extents touch. Area extents only ever grow.
    pub(crate) fn initialize(&mut self, graph: &SceneGraph, counter: &mut QueryCounter, padding: f32) {
        for area in &mut self.areas {
            area.nodes.clear();
            area.num_static_nodes = 0;
            area.dynamic_stamp = 0;
        }
        
        let mut reached = std::mem::take(&mut self.reached);
        let mut assigned = 0usize;
        let mut unassigned = 0usize;
        
        for (key, node) in &graph.nodes {
            if node.membership != Some(MapMembership::Static) {
                continue;
            }
            let Some(extents) = node.world_extents else {
                continue;
            };
            
            reached.clear();
            match self.find_area_index(reference_point(graph, node, &extents)) {
                Some(area) => {
                    let query = counter.next();
                    flood::find_overlapping_areas(&mut self.areas, area, &extents, false, query, &mut reached);
                }
                None => {
                    let padded = extents.expanded(padding);
                    bsp::find_area_indices_aabb(&self.bsp, &padded, &mut self.bsp_stack, &mut reached);
                }
            }
            
            if reached.is_empty() {
                unassigned += 1;
                log::warn!("Static node '{}' is outside every area", node.name);
                continue;
            }
            
            assigned += 1;
            for &index in &reached {
                let area = &mut self.areas[index];
                area.nodes.push(key);
                area.extents.grow(&extents);
            }
        }
        
        for area in &mut self.areas {
            area.num_static_nodes = area.nodes.len();
        }
        self.reached = reached;
        
        log::info!(
            "Initialized {} areas: {} static nodes assigned, {} unassigned",
            self.areas.len(),
            assigned,
            unassigned
        );
    }
}

/// Point used to locate a node's area
fn reference_point(graph: &SceneGraph, node: &Node, extents: &AABB) -> Vec3 {
    node.lights
        .iter()
        .filter_map(|&key| graph.lights.get(key))
        .find(|light| matches!(light.kind, LightKind::Spot { .. }))
        .map_or_else(|| extents.center(), |light| light.origin)
}
