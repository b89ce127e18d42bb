//! Scene nodes and the payloads attached to them
//!
//! Nodes, renderables and light instances live in slot maps owned by the
//! `SceneGraph` and refer to each other by key. Per-query bookkeeping
//! (query counter, frame-visible stamp, distance) is stored as plain fields
//! and starts at the "never" sentinel `0`.

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::foundation::math::{utils, Mat4, Point3, Transform, Vec3};
use crate::geometry::AABB;

new_key_type! {
    /// Handle to a scene node
    pub struct NodeKey;
    /// Handle to a renderable attached to a node
    pub struct RenderableKey;
    /// Handle to a light instance attached to a node
    pub struct LightKey;
}

bitflags! {
    /// Per-node state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Registered in the dynamic spatial map instead of the static one
        const DYNAMIC = 1 << 0;
        /// Never contributes renderables or lights
        const DISABLED = 1 << 1;
        /// Root whose subtree has pending transform changes
        const DIRTY = 1 << 2;
        /// Registered as a scene root
        const ROOT = 1 << 3;
    }
}

/// Which spatial map a node was registered in
///
/// Chosen once, on first registration, and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMembership {
    /// Static map, frozen between updates
    Static,
    /// Dynamic map, incrementally maintained
    Dynamic,
}

/// Monotonic stamp used to mark entities visited by a single traversal
///
/// `0` is reserved for "never visited" and is skipped on wrap-around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounter(u32);

impl QueryCounter {
    /// Advance and return the new stamp
    pub fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }
    
    /// Last stamp handed out
    pub fn current(&self) -> u32 {
        self.0
    }
}

/// Spatial graph entity
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) local_transform: Transform,
    pub(crate) flags: NodeFlags,
    pub(crate) world_matrix: Mat4,
    /// Union of the node's own renderable and local-light extents
    pub(crate) world_extents: Option<AABB>,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) renderables: Vec<RenderableKey>,
    pub(crate) lights: Vec<LightKey>,
    pub(crate) membership: Option<MapMembership>,
    pub(crate) frame_visible: u32,
    pub(crate) query_counter: u32,
    pub(crate) distance: f32,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, local_transform: Transform) -> Self {
        Self {
            name: name.into(),
            local_transform,
            flags: NodeFlags::empty(),
            world_matrix: Mat4::identity(),
            world_extents: None,
            parent: None,
            children: Vec::new(),
            renderables: Vec::new(),
            lights: Vec::new(),
            membership: None,
            frame_visible: 0,
            query_counter: 0,
            distance: 0.0,
        }
    }
    
    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }
    
    /// Transform relative to the parent
    pub fn local_transform(&self) -> &Transform {
        &self.local_transform
    }
    
    /// State bits
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }
    
    /// Whether the node goes into the dynamic spatial map
    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(NodeFlags::DYNAMIC)
    }
    
    /// Whether the node is excluded from visibility results
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED)
    }
    
    /// Whether the node is a scene root
    pub fn is_root(&self) -> bool {
        self.flags.contains(NodeFlags::ROOT)
    }
    
    /// World transform as of the last graph update
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }
    
    /// World extents as of the last graph update, `None` without payload
    pub fn world_extents(&self) -> Option<&AABB> {
        self.world_extents.as_ref()
    }
    
    /// Parent node, `None` for roots and detached nodes
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }
    
    /// Child nodes
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
    
    /// Attached renderables
    pub fn renderables(&self) -> &[RenderableKey] {
        &self.renderables
    }
    
    /// Attached light instances
    pub fn lights(&self) -> &[LightKey] {
        &self.lights
    }
    
    /// Spatial map the node is registered in, if any
    pub fn membership(&self) -> Option<MapMembership> {
        self.membership
    }
    
    /// Frame index of the last visibility pass that accepted this node
    pub fn frame_visible(&self) -> u32 {
        self.frame_visible
    }
    
    /// Conservative distance from the camera near plane, last time visible
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Drawable surface attached to a node
#[derive(Debug, Clone)]
pub struct Renderable {
    pub(crate) node: NodeKey,
    pub(crate) local_extents: AABB,
    pub(crate) world_extents: AABB,
    pub(crate) disabled: bool,
    pub(crate) frame_visible: u32,
    pub(crate) distance: f32,
}

impl Renderable {
    pub(crate) fn new(node: NodeKey, local_extents: AABB) -> Self {
        Self {
            node,
            local_extents,
            world_extents: local_extents,
            disabled: false,
            frame_visible: 0,
            distance: 0.0,
        }
    }
    
    /// Owning node
    pub fn node(&self) -> NodeKey {
        self.node
    }
    
    /// Extents in the owning node's space
    pub fn local_extents(&self) -> &AABB {
        &self.local_extents
    }
    
    /// Extents in world space
    pub fn world_extents(&self) -> &AABB {
        &self.world_extents
    }
    
    /// Whether this renderable is skipped by visibility
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
    
    /// Frame index of the last visibility pass that accepted it
    pub fn frame_visible(&self) -> u32 {
        self.frame_visible
    }
    
    /// Conservative distance from the near plane, last time visible
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Shape of a light's influence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omni light with a finite radius
    Point {
        /// Influence radius
        radius: f32,
    },
    /// Cone light, `direction` in the owning node's space
    Spot {
        /// Cone axis
        direction: Vec3,
        /// Length of the cone along its axis
        range: f32,
        /// Half opening angle in degrees
        half_angle: f32,
    },
    /// Infinitely distant light
    Directional {
        /// Light travel direction
        direction: Vec3,
    },
    /// Constant fill light
    Ambient,
}

impl LightKind {
    /// Global lights affect everything and are never frustum tested
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Directional { .. } | Self::Ambient)
    }
}

/// Light attached to a node
#[derive(Debug, Clone)]
pub struct LightInstance {
    pub(crate) node: NodeKey,
    pub(crate) kind: LightKind,
    /// Position in the owning node's space
    pub(crate) offset: Vec3,
    pub(crate) origin: Vec3,
    pub(crate) world_extents: Option<AABB>,
    pub(crate) disabled: bool,
    pub(crate) frame_visible: u32,
    pub(crate) distance: f32,
}

impl LightInstance {
    pub(crate) fn new(node: NodeKey, kind: LightKind, offset: Vec3) -> Self {
        let mut light = Self {
            node,
            kind,
            offset,
            origin: offset,
            world_extents: None,
            disabled: false,
            frame_visible: 0,
            distance: 0.0,
        };
        light.update_world(&Mat4::identity());
        light
    }
    
    /// Owning node
    pub fn node(&self) -> NodeKey {
        self.node
    }
    
    /// Light shape
    pub fn kind(&self) -> &LightKind {
        &self.kind
    }
    
    /// Whether the light is tracked in the global list
    pub fn is_global(&self) -> bool {
        self.kind.is_global()
    }
    
    /// World position
    pub fn origin(&self) -> Vec3 {
        self.origin
    }
    
    /// World extents, `None` for global lights
    pub fn world_extents(&self) -> Option<&AABB> {
        self.world_extents.as_ref()
    }
    
    /// Whether the light is skipped by visibility
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
    
    /// Frame index of the last visibility pass that accepted it
    pub fn frame_visible(&self) -> u32 {
        self.frame_visible
    }
    
    /// Conservative distance from the near plane, last time visible
    pub fn distance(&self) -> f32 {
        self.distance
    }
    
    /// Recompute origin and extents from the owning node's world matrix
    pub(crate) fn update_world(&mut self, world: &Mat4) {
        self.origin = world.transform_point(&Point3::from(self.offset)).coords;
        self.world_extents = match self.kind {
            LightKind::Point { radius } => {
                Some(AABB::from_center_extents(self.origin, Vec3::repeat(radius.abs())))
            }
            LightKind::Spot { direction, range, half_angle } => {
                let axis = world.transform_vector(&direction);
                Some(spot_extents(self.origin, axis, range.abs(), half_angle))
            }
            LightKind::Directional { .. } | LightKind::Ambient => None,
        };
    }
}

/// Bounds of a cone with apex `origin`, axis `axis` and axial length `range`
fn spot_extents(origin: Vec3, axis: Vec3, range: f32, half_angle: f32) -> AABB {
    let Some(axis) = axis.try_normalize(f32::EPSILON) else {
        return AABB::from_center_extents(origin, Vec3::repeat(range));
    };
    
    let half_angle = utils::deg_to_rad(half_angle.clamp(0.0, 89.0));
    let cap_center = origin + axis * range;
    let cap_radius = range * half_angle.tan();
    
    // Extent of a disc with normal `axis` along each world axis
    let disc = Vec3::new(
        cap_radius * (1.0 - axis.x * axis.x).max(0.0).sqrt(),
        cap_radius * (1.0 - axis.y * axis.y).max(0.0).sqrt(),
        cap_radius * (1.0 - axis.z * axis.z).max(0.0).sqrt(),
    );
    
    let mut extents = AABB::from_center_extents(cap_center, disc);
    extents.grow_point(origin);
    extents
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;
    
    fn node_key() -> NodeKey {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        keys.insert(())
    }
    
    #[test]
    fn test_query_counter_skips_zero() {
        let mut counter = QueryCounter(u32::MAX - 1);
        assert_eq!(counter.next(), u32::MAX);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.current(), 1);
    }
    
    #[test]
    fn test_point_light_extents_follow_node() {
        let mut light = LightInstance::new(node_key(), LightKind::Point { radius: 2.0 }, Vec3::new(1.0, 0.0, 0.0));
        light.update_world(&Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)));
        
        assert_relative_eq!(light.origin(), Vec3::new(1.0, 5.0, 0.0));
        let extents = light.world_extents().copied().unwrap();
        assert_relative_eq!(extents.min, Vec3::new(-1.0, 3.0, -2.0));
        assert_relative_eq!(extents.max, Vec3::new(3.0, 7.0, 2.0));
    }
    
    #[test]
    fn test_spot_light_extents_cover_cone() {
        let light = LightInstance::new(
            node_key(),
            LightKind::Spot { direction: Vec3::new(0.0, 0.0, -1.0), range: 10.0, half_angle: 45.0 },
            Vec3::zeros(),
        );
        let extents = light.world_extents().copied().unwrap();
        
        assert!(extents.contains_point(Vec3::zeros()));
        assert!(extents.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert_relative_eq!(extents.min.z, -10.0, epsilon = 1e-4);
        assert_relative_eq!(extents.max.z, 0.0, epsilon = 1e-4);
        assert_relative_eq!(extents.max.x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(extents.min.y, -10.0, epsilon = 1e-3);
    }
    
    #[test]
    fn test_global_lights_have_no_extents() {
        let directional = LightInstance::new(
            node_key(),
            LightKind::Directional { direction: Vec3::new(0.0, -1.0, 0.0) },
            Vec3::zeros(),
        );
        assert!(directional.is_global());
        assert!(directional.world_extents().is_none());
        assert!(LightKind::Ambient.is_global());
        assert!(!LightKind::Point { radius: 1.0 }.is_global());
    }
}
