//! Portal floods
//!
//! Breadth-first traversals from a start area through open portals. Every
//! portal is stamped with the query counter before anything is pushed
//! behind it, so each portal is crossed at most once per query and cyclic
//! portal graphs terminate.

use std::ops::Range;

use crate::foundation::math::Vec3;
use crate::geometry::{Plane, AABB};
use super::area::Area;
use super::portal_clip::{build_portal_planes, ClipScratch};

/// Area reached by a flood and the planes bounding what is seen of it
#[derive(Debug, Clone)]
pub struct PortalItem {
    /// Area index
    pub area: usize,
    /// Range of the flood's plane pool
    pub planes: Range<usize>,
    /// Box candidates of this area are drawn from
    pub bounds: AABB,
}

/// Reusable flood state: the item queue and a shared plane pool
#[derive(Debug, Default)]
pub struct PortalFlood {
    items: Vec<PortalItem>,
    planes: Vec<Plane>,
    parent: Vec<Plane>,
    scratch: ClipScratch,
}

impl PortalFlood {
    /// Create an empty flood
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Items of the last flood, start area first
    pub fn items(&self) -> &[PortalItem] {
        &self.items
    }
    
    /// Clip planes of an item
    pub fn planes(&self, item: &PortalItem) -> &[Plane] {
        &self.planes[item.planes.clone()]
    }
    
    /// Number of portals crossed by the last flood
    pub fn portal_count(&self) -> usize {
        self.items.len().saturating_sub(1)
    }
    
    /// Forget the last flood
    pub fn clear(&mut self) {
        self.items.clear();
        self.planes.clear();
    }
    
    fn reset(&mut self, start: usize, initial: &[Plane], bounds: AABB) {
        self.items.clear();
        self.planes.clear();
        self.planes.extend_from_slice(initial);
        self.items.push(PortalItem { area: start, planes: 0..initial.len(), bounds });
    }
    
    /// Flood visibility from `start` as seen from `viewer`
    ///
    /// `initial` bounds what is seen of the start area. Each open portal
    /// the viewer is in front of is clipped against the planes it is seen
    /// through, and the target area is queued with the resulting edge
    /// planes. Areas already reached are not queued again. A viewer within
    /// `near_distance` of a portal, inside its bounds, passes the parent
    /// planes through unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn find_visible_portals(
        &mut self,
        areas: &mut [Area],
        start: usize,
        viewer: Vec3,
        near_distance: f32,
        initial: &[Plane],
        bounds: AABB,
        query: u32,
    ) {
        self.reset(start, initial, bounds);
        areas[start].query_counter = query;
        
        let mut head = 0;
        while head < self.items.len() {
            let item = self.items[head].clone();
            head += 1;
            
            for portal_index in 0..areas[item.area].portals.len() {
                let portal = &mut areas[item.area].portals[portal_index];
                if portal.query_counter == query {
                    continue;
                }
                portal.query_counter = query;
                if portal.disabled {
                    continue;
                }
                
                let portal = &areas[item.area].portals[portal_index];
                let target = portal.area;
                if areas[target].query_counter == query {
                    continue;
                }
                let distance = portal.plane.distance_to_point(viewer);
                let straddling = distance.abs() < near_distance
                    && portal.extents.expanded(near_distance).contains_point(viewer);
                
                let first_plane = self.planes.len();
                if straddling {
                    self.planes.extend_from_within(item.planes.clone());
                } else {
                    if distance <= 0.0 {
                        continue;
                    }
                    self.parent.clear();
                    self.parent.extend_from_slice(&self.planes[item.planes.clone()]);
                    if !build_portal_planes(&portal.points, viewer, &self.parent, &mut self.scratch, &mut self.planes) {
                        continue;
                    }
                }
                
                areas[target].query_counter = query;
                self.items.push(PortalItem {
                    area: target,
                    planes: first_plane..self.planes.len(),
                    bounds: item.bounds,
                });
            }
        }
    }
    
    /// Flood the areas a box reaches from the area containing `origin`
    ///
    /// A portal is crossed when it is open, its bounds overlap `extents`,
    /// `origin` is on the owning side and the box reaches past the portal
    /// plane. Each crossed portal adds its flipped plane to the chain
    /// inherited by the target area, and every area is queued once.
    pub fn find_overlapping_portals(
        &mut self,
        areas: &mut [Area],
        start: usize,
        origin: Vec3,
        extents: &AABB,
        query: u32,
    ) {
        let bounds = areas[start].extents.intersection(extents).unwrap_or(*extents);
        self.reset(start, &[], bounds);
        areas[start].query_counter = query;
        
        let mut head = 0;
        while head < self.items.len() {
            let item = self.items[head].clone();
            head += 1;
            
            for portal_index in 0..areas[item.area].portals.len() {
                let portal = &mut areas[item.area].portals[portal_index];
                if portal.query_counter == query {
                    continue;
                }
                portal.query_counter = query;
                
                let crossed = !portal.disabled
                    && portal.extents.intersects(extents)
                    && portal.plane.distance_to_point(origin) >= 0.0
                    && portal.plane.min_distance_aabb(extents) < 0.0;
                let target = portal.area;
                let beyond = portal.plane.flipped();
                if !crossed || areas[target].query_counter == query {
                    continue;
                }
                
                let first_plane = self.planes.len();
                self.planes.extend_from_within(item.planes.clone());
                self.planes.push(beyond);
                
                areas[target].query_counter = query;
                self.items.push(PortalItem {
                    area: target,
                    planes: first_plane..self.planes.len(),
                    bounds: areas[target].extents.intersection(extents).unwrap_or(*extents),
                });
            }
        }
    }
}

/// Areas a box reaches through portals, starting from `start`
///
/// Clears `out` and fills it with `start` followed by every area reached,
/// each once. The box crosses a portal when it overlaps the portal bounds
/// and reaches past its plane.
pub fn find_overlapping_areas(
    areas: &mut [Area],
    start: usize,
    extents: &AABB,
    avoid_disabled: bool,
    query: u32,
    out: &mut Vec<usize>,
) {
    out.clear();
    if start >= areas.len() {
        return;
    }
    
    areas[start].query_counter = query;
    out.push(start);
    
    let mut head = 0;
    while head < out.len() {
        let current = out[head];
        head += 1;
        
        for portal_index in 0..areas[current].portals.len() {
            let portal = &mut areas[current].portals[portal_index];
            if portal.query_counter == query {
                continue;
            }
            portal.query_counter = query;
            
            if avoid_disabled && portal.disabled {
                continue;
            }
            if !portal.extents.intersects(extents) || portal.plane.min_distance_aabb(extents) >= 0.0 {
                continue;
            }
            
            let target = portal.area;
            if areas[target].query_counter != query {
                areas[target].query_counter = query;
                out.push(target);
            }
        }
    }
}
