//! Areas and the portals that connect them

use crate::foundation::math::Vec3;
use crate::geometry::{Plane, AABB};
use crate::scene::NodeKey;

/// Convex region of the level
#[derive(Debug, Clone)]
pub struct Area {
    /// Grown to cover every node ever assigned, never shrunk
    pub(crate) extents: AABB,
    pub(crate) portals: Vec<Portal>,
    /// Static nodes first, then dynamic nodes appended on demand
    pub(crate) nodes: Vec<NodeKey>,
    pub(crate) num_static_nodes: usize,
    pub(crate) query_counter: u32,
    /// Query that last appended dynamic nodes
    pub(crate) dynamic_stamp: u32,
}

impl Area {
    pub(crate) fn new(extents: AABB, portals: Vec<Portal>) -> Self {
        Self {
            extents,
            portals,
            nodes: Vec::new(),
            num_static_nodes: 0,
            query_counter: 0,
            dynamic_stamp: 0,
        }
    }
    
    /// World extents
    pub fn extents(&self) -> &AABB {
        &self.extents
    }
    
    /// Outgoing portals
    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }
    
    /// Nodes considered by the last query: static prefix plus any dynamic
    /// nodes that query appended
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }
    
    /// Nodes assigned by the last area initialisation
    pub fn static_nodes(&self) -> &[NodeKey] {
        &self.nodes[..self.num_static_nodes]
    }
    
    /// Drop dynamic nodes appended by an earlier query
    pub(crate) fn reset_dynamic_nodes(&mut self) {
        self.nodes.truncate(self.num_static_nodes);
    }
}

/// One-way opening from its owning area into `area`
#[derive(Debug, Clone)]
pub struct Portal {
    /// Target area index
    pub(crate) area: usize,
    /// Convex polygon, counter-clockwise seen from the owning area
    pub(crate) points: Vec<Vec3>,
    /// Normal faces the owning area
    pub(crate) plane: Plane,
    pub(crate) extents: AABB,
    pub(crate) disabled: bool,
    pub(crate) query_counter: u32,
}

impl Portal {
    pub(crate) fn new(area: usize, points: Vec<Vec3>, plane: Plane, disabled: bool) -> Self {
        let extents = AABB::from_points(points.iter().copied())
            .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));
        Self {
            area,
            points,
            plane,
            extents,
            disabled,
            query_counter: 0,
        }
    }
    
    /// Index of the area on the other side
    pub fn target_area(&self) -> usize {
        self.area
    }
    
    /// Polygon vertices
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
    
    /// Portal plane, normal facing the owning area
    pub fn plane(&self) -> &Plane {
        &self.plane
    }
    
    /// Bounds of the polygon
    pub fn extents(&self) -> &AABB {
        &self.extents
    }
    
    /// Closed portals block every traversal
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
