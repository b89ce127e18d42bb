//! Per-frame visibility resolution
//!
//! Without areas (or with the camera outside all of them) both spatial
//! maps are queried with the full camera frustum. With areas, the camera's
//! area and everything flooded through visible portals are walked instead,
//! each area tested against the planes it is seen through. Both paths end
//! with the optional far-plane refinement pass.

use crate::areas::{AreaSystem, PortalFlood};
use crate::camera::ViewCamera;
use crate::geometry::{extract_frustum_planes, Plane};
use crate::scene::{NodeKey, SceneGraph};
use crate::spatial::SpatialMap;
use super::{SceneAccess, VisibleSet};

/// Owns the visible set and the scratch of the per-frame pass
#[derive(Debug, Default)]
pub struct VisibilityResolver {
    visible: VisibleSet,
    flood: PortalFlood,
    planes: Vec<Plane>,
    candidates: Vec<NodeKey>,
    frame_index: u32,
    camera_area: Option<usize>,
    reported_outside: bool,
}

impl VisibilityResolver {
    /// Create a resolver with empty results
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Results of the last pass
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }
    
    /// Index of the last pass, `0` before the first one
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }
    
    /// Area the camera was in during the last pass
    pub fn camera_area(&self) -> Option<usize> {
        self.camera_area
    }
    
    /// Portals crossed by the last pass
    pub fn visible_portal_count(&self) -> usize {
        self.flood.portal_count()
    }
    
    /// Rebuild the visible set for `camera`
    pub(crate) fn update<C: ViewCamera + ?Sized>(&mut self, camera: &C, scene: &mut SceneAccess<'_>) {
        debug_assert!(
            !scene.graph.has_pending_updates(),
            "visibility queried with unflushed graph edits, call Scene::update first"
        );
        
        self.frame_index = self.frame_index.wrapping_add(1).max(1);
        let frame = self.frame_index;
        let query = scene.counter.next();
        
        self.visible.clear();
        self.flood.clear();
        self.camera_area = None;
        
        let position = camera.position();
        let camera_area = scene
            .areas
            .as_deref()
            .and_then(|areas| areas.find_area_index(position));
        
        match (scene.areas.as_deref_mut(), camera_area) {
            (Some(areas), Some(area_index)) => {
                self.reported_outside = false;
                self.camera_area = Some(area_index);
                self.resolve_with_areas(camera, scene.graph, scene.dynamic_map, areas, area_index, frame, query);
            }
            (areas, _) => {
                if areas.is_some() && !self.reported_outside {
                    log::debug!("Camera at {:?} is outside every area, using spatial maps", position);
                    self.reported_outside = true;
                }
                self.resolve_with_maps(camera, scene.graph, scene.static_map, scene.dynamic_map, frame, query);
            }
        }
        
        let refined = if scene.config.far_plane_refinement {
            self.visible.refine_far_plane(camera, scene.graph)
        } else {
            0
        };
        
        log::trace!(
            "Frame {}: {} nodes, {} renderables, {} lights visible ({} portals, {} refined away)",
            frame,
            self.visible.nodes.len(),
            self.visible.renderables.len(),
            self.visible.lights.len(),
            self.flood.portal_count(),
            refined
        );
    }
    
    fn resolve_with_maps<C: ViewCamera + ?Sized>(
        &mut self,
        camera: &C,
        graph: &mut SceneGraph,
        static_map: &dyn SpatialMap,
        dynamic_map: &dyn SpatialMap,
        frame: u32,
        query: u32,
    ) {
        let near = extract_frustum_planes(camera, true, &mut self.planes);
        
        self.candidates.clear();
        static_map.get_visible_nodes(&self.planes, &mut self.candidates);
        dynamic_map.get_visible_nodes(&self.planes, &mut self.candidates);
        
        for &key in &self.candidates {
            self.visible.visit_node(graph, key, &self.planes, &near, frame, query);
        }
    }
    
    #[allow(clippy::too_many_arguments)]
    fn resolve_with_areas<C: ViewCamera + ?Sized>(
        &mut self,
        camera: &C,
        graph: &mut SceneGraph,
        dynamic_map: &dyn SpatialMap,
        areas: &mut AreaSystem,
        camera_area: usize,
        frame: u32,
        query: u32,
    ) {
        let near = extract_frustum_planes(camera, false, &mut self.planes);
        let position = camera.position();
        let frustum_extents = camera.frustum_extents(camera.far_plane());
        
        // Culls portal geometry behind the camera
        self.planes.push(Plane::from_point_normal(position, near.normal));
        
        areas.reset_dynamic_nodes();
        self.flood.find_visible_portals(
            &mut areas.areas,
            camera_area,
            position,
            camera.near_plane(),
            &self.planes,
            frustum_extents,
            query,
        );
        
        for item in self.flood.items() {
            areas.populate_dynamic_nodes(item.area, dynamic_map, &item.bounds, query);
            let planes = self.flood.planes(item);
            for &key in &areas.areas[item.area].nodes {
                self.visible.visit_node(graph, key, planes, &near, frame, query);
            }
        }
    }
}
