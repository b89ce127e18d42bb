//! Node hierarchy with per-root dirty tracking
//!
//! Transform or hierarchy edits only mark the owning root dirty. World
//! matrices and extents of the whole dirty subtree are recomputed in one
//! pass by `flush`, which the scene runs at the start of every update.

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::geometry::AABB;
use super::node::{
    LightInstance, LightKey, LightKind, MapMembership, Node, NodeFlags, NodeKey, Renderable,
    RenderableKey,
};

/// Errors returned by graph edits
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Key does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeKey),
    
    /// Operation requires a scene root
    #[error("Node is not a scene root: {0:?}")]
    NotARoot(NodeKey),
    
    /// Node already has a parent or is already a root
    #[error("Node is already attached: {0:?}")]
    AlreadyAttached(NodeKey),
    
    /// Child is an ancestor of the requested parent
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Requested parent
        parent: NodeKey,
        /// Requested child
        child: NodeKey,
    },
    
    /// Spatial map membership can no longer change
    #[error("Node is already registered in a spatial map: {0:?}")]
    AlreadyRegistered(NodeKey),
    
    /// Key does not refer to a live renderable
    #[error("Renderable not found: {0:?}")]
    RenderableNotFound(RenderableKey),
    
    /// Key does not refer to a live light instance
    #[error("Light not found: {0:?}")]
    LightNotFound(LightKey),
    
    /// Area or portal index out of range (or no areas loaded)
    #[error("Portal {portal} of area {area} not found")]
    PortalNotFound {
        /// Owning area index
        area: usize,
        /// Portal index within the area
        portal: usize,
    },
}

/// Owner of every node, renderable and light instance in a scene
#[derive(Debug, Default)]
pub struct SceneGraph {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    pub(crate) renderables: SlotMap<RenderableKey, Renderable>,
    pub(crate) lights: SlotMap<LightKey, LightInstance>,
    roots: Vec<NodeKey>,
    dirty_roots: Vec<NodeKey>,
    /// Traversal scratch: node and its parent's world matrix
    stack: Vec<(NodeKey, Mat4)>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Look up a node
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }
    
    /// Look up a renderable
    pub fn renderable(&self, key: RenderableKey) -> Option<&Renderable> {
        self.renderables.get(key)
    }
    
    /// Look up a light instance
    pub fn light(&self, key: LightKey) -> Option<&LightInstance> {
        self.lights.get(key)
    }
    
    /// Scene roots in insertion order
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }
    
    /// Number of live nodes, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    
    /// True when some root has edits that `flush` has not applied yet
    pub fn has_pending_updates(&self) -> bool {
        !self.dirty_roots.is_empty()
    }
    
    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound(key))
    }
    
    /// Create a detached node
    pub fn create_node(&mut self, name: impl Into<String>, local_transform: Transform) -> NodeKey {
        self.nodes.insert(Node::new(name, local_transform))
    }
    
    /// Attach a detached node under `parent`
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let child_node = self.nodes.get(child).ok_or(SceneError::NodeNotFound(child))?;
        if child_node.parent.is_some() || child_node.is_root() {
            return Err(SceneError::AlreadyAttached(child));
        }
        
        let mut ancestor = Some(parent);
        while let Some(key) = ancestor {
            if key == child {
                return Err(SceneError::WouldCreateCycle { parent, child });
            }
            ancestor = self.nodes.get(key).and_then(|node| node.parent);
        }
        
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mark_dirty(parent);
        Ok(())
    }
    
    /// Promote a detached node to a scene root
    pub(crate) fn add_root(&mut self, key: NodeKey) -> Result<(), SceneError> {
        let node = self.node_mut(key)?;
        if node.parent.is_some() || node.is_root() {
            return Err(SceneError::AlreadyAttached(key));
        }
        node.flags.insert(NodeFlags::ROOT);
        self.roots.push(key);
        self.mark_dirty(key);
        Ok(())
    }
    
    /// Destroy a root and its whole subtree
    ///
    /// Appends every destroyed node and its map membership to `removed` so
    /// the caller can unregister them.
    pub(crate) fn remove_root(
        &mut self,
        key: NodeKey,
        removed: &mut Vec<(NodeKey, Option<MapMembership>)>,
    ) -> Result<(), SceneError> {
        let node = self.nodes.get(key).ok_or(SceneError::NodeNotFound(key))?;
        if !node.is_root() {
            return Err(SceneError::NotARoot(key));
        }
        
        self.roots.retain(|&root| root != key);
        self.dirty_roots.retain(|&root| root != key);
        
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            for renderable in &node.renderables {
                self.renderables.remove(*renderable);
            }
            for light in &node.lights {
                self.lights.remove(*light);
            }
            pending.extend_from_slice(&node.children);
            removed.push((current, node.membership));
        }
        
        Ok(())
    }
    
    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, key: NodeKey, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(key)?.local_transform = transform;
        self.mark_dirty(key);
        Ok(())
    }
    
    /// Choose the spatial map a node will be registered in
    ///
    /// Only allowed before the node's first registration.
    pub fn set_dynamic(&mut self, key: NodeKey, dynamic: bool) -> Result<(), SceneError> {
        let node = self.node_mut(key)?;
        if node.membership.is_some() {
            return Err(SceneError::AlreadyRegistered(key));
        }
        node.flags.set(NodeFlags::DYNAMIC, dynamic);
        Ok(())
    }
    
    /// Enable or disable a node's contribution to visibility
    pub fn set_node_disabled(&mut self, key: NodeKey, disabled: bool) -> Result<(), SceneError> {
        self.node_mut(key)?.flags.set(NodeFlags::DISABLED, disabled);
        Ok(())
    }
    
    /// Attach a renderable with extents in the node's space
    pub fn add_renderable(&mut self, node: NodeKey, local_extents: AABB) -> Result<RenderableKey, SceneError> {
        if !self.nodes.contains_key(node) {
            return Err(SceneError::NodeNotFound(node));
        }
        let key = self.renderables.insert(Renderable::new(node, local_extents));
        self.node_mut(node)?.renderables.push(key);
        self.mark_dirty(node);
        Ok(key)
    }
    
    /// Attach a light at `offset` in the node's space
    pub fn add_light(&mut self, node: NodeKey, kind: LightKind, offset: Vec3) -> Result<LightKey, SceneError> {
        if !self.nodes.contains_key(node) {
            return Err(SceneError::NodeNotFound(node));
        }
        let key = self.lights.insert(LightInstance::new(node, kind, offset));
        self.node_mut(node)?.lights.push(key);
        self.mark_dirty(node);
        Ok(key)
    }
    
    /// Enable or disable a single renderable
    pub fn set_renderable_disabled(&mut self, key: RenderableKey, disabled: bool) -> Result<(), SceneError> {
        let renderable = self.renderables.get_mut(key).ok_or(SceneError::RenderableNotFound(key))?;
        renderable.disabled = disabled;
        Ok(())
    }
    
    /// Enable or disable a single light instance
    pub fn set_light_disabled(&mut self, key: LightKey, disabled: bool) -> Result<(), SceneError> {
        let light = self.lights.get_mut(key).ok_or(SceneError::LightNotFound(key))?;
        light.disabled = disabled;
        Ok(())
    }
    
    /// Mark the root owning `key` dirty; edits under detached nodes wait
    /// until their tree is attached to a root
    fn mark_dirty(&mut self, key: NodeKey) {
        let mut top = key;
        while let Some(parent) = self.nodes.get(top).and_then(|node| node.parent) {
            top = parent;
        }
        
        if let Some(root) = self.nodes.get_mut(top) {
            if root.is_root() && !root.flags.contains(NodeFlags::DIRTY) {
                root.flags.insert(NodeFlags::DIRTY);
                self.dirty_roots.push(top);
            }
        }
    }
    
    /// Recompute world matrices and extents under every dirty root
    ///
    /// Appends each node that ends up with extents to `changed` and returns
    /// the number of roots flushed.
    pub(crate) fn flush(&mut self, changed: &mut Vec<NodeKey>) -> usize {
        let dirty_roots = std::mem::take(&mut self.dirty_roots);
        let mut stack = std::mem::take(&mut self.stack);
        
        for &root in &dirty_roots {
            let Some(node) = self.nodes.get_mut(root) else {
                continue;
            };
            node.flags.remove(NodeFlags::DIRTY);
            stack.push((root, Mat4::identity()));
            
            while let Some((key, parent_world)) = stack.pop() {
                let Some(node) = self.nodes.get_mut(key) else {
                    continue;
                };
                let world = parent_world * node.local_transform.to_matrix();
                node.world_matrix = world;
                
                let mut extents: Option<AABB> = None;
                for &renderable_key in &node.renderables {
                    if let Some(renderable) = self.renderables.get_mut(renderable_key) {
                        renderable.world_extents = renderable.local_extents.transformed(&world);
                        extents = Some(match extents {
                            Some(current) => current.union(&renderable.world_extents),
                            None => renderable.world_extents,
                        });
                    }
                }
                for &light_key in &node.lights {
                    if let Some(light) = self.lights.get_mut(light_key) {
                        light.update_world(&world);
                        if let Some(light_extents) = light.world_extents {
                            extents = Some(match extents {
                                Some(current) => current.union(&light_extents),
                                None => light_extents,
                            });
                        }
                    }
                }
                node.world_extents = extents;
                
                if extents.is_some() {
                    changed.push(key);
                }
                stack.extend(node.children.iter().map(|&child| (child, world)));
            }
        }
        
        let flushed = dirty_roots.len();
        self.stack = stack;
        // Keep the allocation for the next round of edits
        self.dirty_roots = dirty_roots;
        self.dirty_roots.clear();
        flushed
    }
}
