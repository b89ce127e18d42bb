//! Visible-set accumulation
//!
//! The three result lists are cleared, not reallocated, at the start of
//! each pass, so a steady-state frame does not allocate.

use crate::camera::ViewCamera;
use crate::geometry::{is_fully_inside_planes_aabb, is_inside_planes_aabb, Plane};
use crate::scene::{LightKey, NodeKey, RenderableKey, SceneGraph};

/// Visible nodes, renderables and lights of one pass
#[derive(Debug, Default)]
pub struct VisibleSet {
    pub(crate) nodes: Vec<NodeKey>,
    pub(crate) renderables: Vec<RenderableKey>,
    pub(crate) lights: Vec<LightKey>,
    /// Largest near-plane distance among accepted renderables and lights
    pub(crate) max_distance: f32,
}

impl VisibleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Visible nodes
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }
    
    /// Visible renderables, each at most once
    pub fn renderables(&self) -> &[RenderableKey] {
        &self.renderables
    }
    
    /// Visible non-global lights, each at most once
    pub fn lights(&self) -> &[LightKey] {
        &self.lights
    }
    
    /// Farthest accepted distance from the near plane
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }
    
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.renderables.clear();
        self.lights.clear();
        self.max_distance = 0.0;
    }
    
    /// Test one node against `planes` and collect what it contributes
    ///
    /// A node is handled once per `query`. Disabled nodes are stamped but
    /// never contribute; a node rejected by `planes` is left unstamped so
    /// another plane set may still accept it. Distances are measured from
    /// `near` to the farthest corner of each box.
    pub(crate) fn visit_node(
        &mut self,
        graph: &mut SceneGraph,
        key: NodeKey,
        planes: &[Plane],
        near: &Plane,
        frame: u32,
        query: u32,
    ) {
        let Some(node) = graph.nodes.get_mut(key) else {
            return;
        };
        if node.query_counter == query {
            return;
        }
        let Some(extents) = node.world_extents else {
            node.query_counter = query;
            return;
        };
        if node.is_disabled() {
            node.query_counter = query;
            return;
        }
        if !is_inside_planes_aabb(&extents, planes) {
            return;
        }
        node.query_counter = query;
        
        let distance = near.max_distance_aabb(&extents);
        if distance <= 0.0 {
            return;
        }
        node.distance = distance;
        
        if node.renderables.len() == 1 && node.lights.is_empty() {
            // Sole renderable shares the node's box
            let renderable_key = node.renderables[0];
            if let Some(renderable) = graph.renderables.get_mut(renderable_key) {
                if !renderable.disabled && renderable.frame_visible != frame {
                    renderable.frame_visible = frame;
                    renderable.distance = distance;
                    self.renderables.push(renderable_key);
                    self.max_distance = self.max_distance.max(distance);
                }
            }
        } else {
            let fully_inside = is_fully_inside_planes_aabb(&extents, planes);
            
            for &renderable_key in &node.renderables {
                let Some(renderable) = graph.renderables.get_mut(renderable_key) else {
                    continue;
                };
                if renderable.disabled || renderable.frame_visible == frame {
                    continue;
                }
                if !fully_inside && !is_inside_planes_aabb(&renderable.world_extents, planes) {
                    continue;
                }
                let distance = near.max_distance_aabb(&renderable.world_extents);
                if distance <= 0.0 {
                    continue;
                }
                renderable.frame_visible = frame;
                renderable.distance = distance;
                self.renderables.push(renderable_key);
                self.max_distance = self.max_distance.max(distance);
            }
            
            for &light_key in &node.lights {
                let Some(light) = graph.lights.get_mut(light_key) else {
                    continue;
                };
                if light.disabled || light.frame_visible == frame {
                    continue;
                }
                // Global lights have no extents and are tracked separately
                let Some(light_extents) = light.world_extents else {
                    continue;
                };
                if !fully_inside && !is_inside_planes_aabb(&light_extents, planes) {
                    continue;
                }
                let distance = near.max_distance_aabb(&light_extents);
                if distance <= 0.0 {
                    continue;
                }
                light.frame_visible = frame;
                light.distance = distance;
                self.lights.push(light_key);
                self.max_distance = self.max_distance.max(distance);
            }
        }
        
        if node.frame_visible != frame {
            node.frame_visible = frame;
            self.nodes.push(key);
        }
    }
    
    /// Drop accepted entries outside the camera box clamped to the
    /// farthest accepted distance, when that is tighter than the far plane
    ///
    /// Only filters what was already accepted; nothing is re-queried.
    /// Returns the number of entries removed.
    pub(crate) fn refine_far_plane<C: ViewCamera + ?Sized>(&mut self, camera: &C, graph: &mut SceneGraph) -> usize {
        if self.max_distance <= 0.0 {
            return 0;
        }
        let far = self.max_distance + camera.near_plane();
        if far >= camera.far_plane() {
            return 0;
        }
        
        let bounds = camera.frustum_extents(far);
        let before = self.nodes.len() + self.renderables.len() + self.lights.len();
        
        self.renderables.retain(|&key| {
            graph.renderables.get_mut(key).map_or(false, |renderable| {
                let keep = renderable.world_extents.intersects(&bounds);
                if !keep {
                    renderable.frame_visible = 0;
                }
                keep
            })
        });
        self.lights.retain(|&key| {
            graph.lights.get_mut(key).map_or(false, |light| {
                let keep = light.world_extents.map_or(false, |extents| extents.intersects(&bounds));
                if !keep {
                    light.frame_visible = 0;
                }
                keep
            })
        });
        self.nodes.retain(|&key| {
            graph.nodes.get_mut(key).map_or(false, |node| {
                let keep = node.world_extents.map_or(false, |extents| extents.intersects(&bounds));
                if !keep {
                    node.frame_visible = 0;
                }
                keep
            })
        });
        
        before - (self.nodes.len() + self.renderables.len() + self.lights.len())
    }
}
