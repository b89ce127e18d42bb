//! Scene: graph, spatial maps, areas and the queries over them

use crate::areas::{AreaLoadError, AreaSystem, AreasData};
use crate::camera::ViewCamera;
use crate::core::SceneConfig;
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::geometry::AABB;
use crate::spatial::{AabbTree, SpatialMap};
use crate::visibility::{RegionQuery, SceneAccess, VisibilityResolver, VisibleSet};
use super::node::{
    LightInstance, LightKey, LightKind, MapMembership, Node, NodeKey, QueryCounter, Renderable,
    RenderableKey,
};
use super::scene_graph::{SceneError, SceneGraph};

/// Scene with visibility and region queries
///
/// Call `update` once per frame after editing the graph, then
/// `update_visible_nodes` for each camera.
pub struct Scene {
    config: SceneConfig,
    graph: SceneGraph,
    static_map: Box<dyn SpatialMap>,
    dynamic_map: Box<dyn SpatialMap>,
    areas: Option<AreaSystem>,
    resolver: VisibilityResolver,
    region: RegionQuery,
    counter: QueryCounter,
    global_lights: Vec<LightKey>,
    /// Bumped on every static node registration, update or removal
    static_change_counter: u64,
    /// Static change counter the areas were last initialized for
    areas_built_for: Option<u64>,
    scene_extents: Option<AABB>,
    changed: Vec<NodeKey>,
    removed: Vec<(NodeKey, Option<MapMembership>)>,
}

impl Scene {
    /// Create a scene backed by AABB trees
    pub fn new(config: SceneConfig) -> Self {
        let margin = config.dynamic_map_margin;
        Self::with_spatial_maps(
            config,
            Box::new(AabbTree::new_static()),
            Box::new(AabbTree::new_dynamic(margin)),
        )
    }
    
    /// Create a scene with custom spatial map implementations
    pub fn with_spatial_maps(
        config: SceneConfig,
        static_map: Box<dyn SpatialMap>,
        dynamic_map: Box<dyn SpatialMap>,
    ) -> Self {
        Self {
            config,
            graph: SceneGraph::new(),
            static_map,
            dynamic_map,
            areas: None,
            resolver: VisibilityResolver::new(),
            region: RegionQuery::new(),
            counter: QueryCounter::default(),
            global_lights: Vec::new(),
            static_change_counter: 0,
            areas_built_for: None,
            scene_extents: None,
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }
    
    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
    
    /// Node hierarchy
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }
    
    /// Look up a node
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.graph.node(key)
    }
    
    /// Look up a renderable
    pub fn renderable(&self, key: RenderableKey) -> Option<&Renderable> {
        self.graph.renderable(key)
    }
    
    /// Look up a light instance
    pub fn light(&self, key: LightKey) -> Option<&LightInstance> {
        self.graph.light(key)
    }
    
    fn access(&mut self) -> (SceneAccess<'_>, &mut VisibilityResolver, &mut RegionQuery) {
        let access = SceneAccess {
            graph: &mut self.graph,
            static_map: &*self.static_map,
            dynamic_map: &*self.dynamic_map,
            areas: self.areas.as_mut(),
            counter: &mut self.counter,
            config: &self.config,
        };
        (access, &mut self.resolver, &mut self.region)
    }
    
    // Graph editing
    
    /// Create a detached node
    pub fn create_node(&mut self, name: impl Into<String>, local_transform: Transform) -> NodeKey {
        self.graph.create_node(name, local_transform)
    }
    
    /// Attach a detached node under `parent`
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        self.graph.add_child(parent, child)
    }
    
    /// Make a detached node (and its subtree) part of the scene
    pub fn add_root_node(&mut self, key: NodeKey) -> Result<(), SceneError> {
        self.graph.add_root(key)
    }
    
    /// Destroy a root and its subtree, unregistering every node
    pub fn remove_root_node(&mut self, key: NodeKey) -> Result<(), SceneError> {
        let mut removed = std::mem::take(&mut self.removed);
        removed.clear();
        let result = self.graph.remove_root(key, &mut removed);
        
        for &(node, membership) in &removed {
            match membership {
                Some(MapMembership::Static) => {
                    self.static_map.remove(node);
                    self.static_change_counter += 1;
                }
                Some(MapMembership::Dynamic) => self.dynamic_map.remove(node),
                None => {}
            }
        }
        if !removed.is_empty() {
            let lights = &self.graph.lights;
            self.global_lights.retain(|&light| lights.contains_key(light));
            log::debug!("Removed root {:?}: {} nodes", key, removed.len());
        }
        
        self.removed = removed;
        result
    }
    
    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, key: NodeKey, transform: Transform) -> Result<(), SceneError> {
        self.graph.set_local_transform(key, transform)
    }
    
    /// Choose the spatial map for a node, before it is first registered
    pub fn set_dynamic(&mut self, key: NodeKey, dynamic: bool) -> Result<(), SceneError> {
        self.graph.set_dynamic(key, dynamic)
    }
    
    /// Enable or disable a node's contribution to visibility
    pub fn set_node_disabled(&mut self, key: NodeKey, disabled: bool) -> Result<(), SceneError> {
        self.graph.set_node_disabled(key, disabled)
    }
    
    /// Attach a renderable with extents in the node's space
    pub fn add_renderable(&mut self, node: NodeKey, local_extents: AABB) -> Result<RenderableKey, SceneError> {
        self.graph.add_renderable(node, local_extents)
    }
    
    /// Attach a light at `offset` in the node's space
    pub fn add_light(&mut self, node: NodeKey, kind: LightKind, offset: Vec3) -> Result<LightKey, SceneError> {
        let key = self.graph.add_light(node, kind, offset)?;
        if kind.is_global() {
            self.global_lights.push(key);
        }
        Ok(key)
    }
    
    /// Enable or disable a single renderable
    pub fn set_renderable_disabled(&mut self, key: RenderableKey, disabled: bool) -> Result<(), SceneError> {
        self.graph.set_renderable_disabled(key, disabled)
    }
    
    /// Enable or disable a single light instance
    pub fn set_light_disabled(&mut self, key: LightKey, disabled: bool) -> Result<(), SceneError> {
        self.graph.set_light_disabled(key, disabled)
    }
    
    /// World matrix as of the last update
    pub fn world_matrix(&self, key: NodeKey) -> Option<Mat4> {
        self.graph.node(key).map(|node| node.world_matrix)
    }
    
    /// World extents as of the last update
    pub fn world_extents(&self, key: NodeKey) -> Option<AABB> {
        self.graph.node(key).and_then(|node| node.world_extents)
    }
    
    // Maintenance
    
    /// Apply pending graph edits and bring the spatial maps and areas up
    /// to date
    ///
    /// Nodes are registered on their first update with extents, in the map
    /// their dynamic flag selects. Areas are reinitialized only when the
    /// static set changed since they were last built.
    pub fn update(&mut self) {
        let mut changed = std::mem::take(&mut self.changed);
        changed.clear();
        let flushed = self.graph.flush(&mut changed);
        
        let mut static_changes = 0u64;
        for &key in &changed {
            let Some(node) = self.graph.nodes.get_mut(key) else {
                continue;
            };
            let Some(extents) = node.world_extents else {
                continue;
            };
            
            match node.membership {
                None if node.is_dynamic() => {
                    self.dynamic_map.add(key, &extents);
                    node.membership = Some(MapMembership::Dynamic);
                }
                None => {
                    self.static_map.add(key, &extents);
                    node.membership = Some(MapMembership::Static);
                    static_changes += 1;
                }
                Some(MapMembership::Static) => {
                    self.static_map.update(key, &extents);
                    static_changes += 1;
                }
                Some(MapMembership::Dynamic) => self.dynamic_map.update(key, &extents),
            }
            debug_assert!(
                !(self.static_map.contains(key) && self.dynamic_map.contains(key)),
                "node registered in both spatial maps"
            );
        }
        
        if flushed > 0 {
            log::debug!(
                "Flushed {} dirty roots: {} nodes changed, {} static",
                flushed,
                changed.len(),
                static_changes
            );
        }
        self.changed = changed;
        self.static_change_counter += static_changes;
        
        self.static_map.finalize();
        self.dynamic_map.finalize();
        self.scene_extents = match (self.static_map.get_extents(), self.dynamic_map.get_extents()) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
        
        if let Some(areas) = self.areas.as_mut() {
            if self.areas_built_for != Some(self.static_change_counter) {
                areas.initialize(&self.graph, &mut self.counter, self.config.area_assignment_padding);
                self.areas_built_for = Some(self.static_change_counter);
            }
        }
    }
    
    /// Number of static node changes seen so far
    pub fn static_change_counter(&self) -> u64 {
        self.static_change_counter
    }
    
    /// Union of both spatial maps' extents as of the last update
    pub fn scene_extents(&self) -> Option<AABB> {
        self.scene_extents
    }
    
    // Visibility
    
    /// Rebuild the visible node, renderable and light lists for `camera`
    pub fn update_visible_nodes<C: ViewCamera + ?Sized>(&mut self, camera: &C) {
        let (mut access, resolver, _) = self.access();
        resolver.update(camera, &mut access);
    }
    
    /// Results of the last visibility pass
    pub fn visible(&self) -> &VisibleSet {
        self.resolver.visible()
    }
    
    /// Nodes accepted by the last visibility pass
    pub fn visible_nodes(&self) -> &[NodeKey] {
        self.resolver.visible().nodes()
    }
    
    /// Renderables accepted by the last visibility pass
    pub fn visible_renderables(&self) -> &[RenderableKey] {
        self.resolver.visible().renderables()
    }
    
    /// Non-global lights accepted by the last visibility pass
    pub fn visible_lights(&self) -> &[LightKey] {
        self.resolver.visible().lights()
    }
    
    /// Directional and ambient lights that are currently on
    ///
    /// Never culled, so they are not part of `visible_lights`. Lights
    /// switched off with `set_light_disabled` or owned by a disabled node
    /// are left out.
    pub fn global_lights(&self) -> Vec<LightKey> {
        self.global_lights
            .iter()
            .copied()
            .filter(|&key| {
                self.graph.light(key).map_or(false, |light| {
                    !light.disabled && self.graph.node(light.node).map_or(false, |node| !node.is_disabled())
                })
            })
            .collect()
    }
    
    /// Index of the last visibility pass
    pub fn frame_index(&self) -> u32 {
        self.resolver.frame_index()
    }
    
    /// Area the camera was in during the last visibility pass
    pub fn camera_area_index(&self) -> Option<usize> {
        self.resolver.camera_area()
    }
    
    /// Portals crossed by the last visibility pass
    pub fn visible_portal_count(&self) -> usize {
        self.resolver.visible_portal_count()
    }
    
    // Region queries
    
    /// Enabled nodes overlapping `extents`, routed from `origin`'s area
    pub fn find_overlapping_nodes(&mut self, origin: Vec3, extents: &AABB) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.find_overlapping_nodes_into(origin, extents, &mut out);
        out
    }
    
    /// `find_overlapping_nodes` into a caller-owned buffer
    pub fn find_overlapping_nodes_into(&mut self, origin: Vec3, extents: &AABB, out: &mut Vec<NodeKey>) {
        let (mut access, _, region) = self.access();
        region.find_overlapping_nodes(&mut access, origin, extents, out);
    }
    
    /// Enabled renderables overlapping `extents`, routed from `origin`'s area
    pub fn find_overlapping_renderables(&mut self, origin: Vec3, extents: &AABB) -> Vec<RenderableKey> {
        let mut out = Vec::new();
        self.find_overlapping_renderables_into(origin, extents, &mut out);
        out
    }
    
    /// `find_overlapping_renderables` into a caller-owned buffer
    pub fn find_overlapping_renderables_into(&mut self, origin: Vec3, extents: &AABB, out: &mut Vec<RenderableKey>) {
        let (mut access, _, region) = self.access();
        region.find_overlapping_renderables(&mut access, origin, extents, out);
    }
    
    // Areas
    
    /// Replace the area partition; static nodes are assigned at the next
    /// `update`
    pub fn load_areas(&mut self, data: &AreasData) -> Result<(), AreaLoadError> {
        self.areas = Some(AreaSystem::from_data(data)?);
        self.areas_built_for = None;
        Ok(())
    }
    
    /// Load the area partition from a `.ron` or `.toml` file
    pub fn load_areas_from_file(&mut self, path: &str) -> Result<(), AreaLoadError> {
        let data = AreasData::load(path)?;
        self.load_areas(&data)
    }
    
    /// Drop the area partition and use the spatial maps alone
    pub fn clear_areas(&mut self) {
        if self.areas.take().is_some() {
            log::info!("Area data cleared");
        }
        self.areas_built_for = None;
    }
    
    /// Loaded area partition
    pub fn areas(&self) -> Option<&AreaSystem> {
        self.areas.as_ref()
    }
    
    /// Open or close a portal
    pub fn set_portal_disabled(&mut self, area: usize, portal: usize, disabled: bool) -> Result<(), SceneError> {
        let found = self
            .areas
            .as_mut()
            .map_or(false, |areas| areas.set_portal_disabled(area, portal, disabled));
        if found {
            Ok(())
        } else {
            Err(SceneError::PortalNotFound { area, portal })
        }
    }
    
    /// Whether a portal is closed, `None` if it does not exist
    pub fn portal_disabled(&self, area: usize, portal: usize) -> Option<bool> {
        self.areas.as_ref()?.portal_disabled(area, portal)
    }
    
    /// Area containing `point`
    pub fn find_area_index(&self, point: Vec3) -> Option<usize> {
        self.areas.as_ref()?.find_area_index(point)
    }
    
    /// Every area whose BSP leaf `extents` touches
    pub fn find_area_indices_aabb(&mut self, extents: &AABB) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(areas) = self.areas.as_mut() {
            areas.find_area_indices_aabb(extents, &mut out);
        }
        out
    }
    
    /// Nodes of an area as of the last query
    pub fn area_nodes(&self, area: usize) -> Option<&[NodeKey]> {
        self.areas.as_ref()?.area(area).map(|area| area.nodes())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.graph.node_count())
            .field("static_nodes", &self.static_map.len())
            .field("dynamic_nodes", &self.dynamic_map.len())
            .field("areas", &self.areas.as_ref().map(|areas| areas.areas().len()))
            .field("frame_index", &self.resolver.frame_index())
            .finish()
    }
}
