//! Serialized area, portal and BSP data
//!
//! This is the already-decoded form a level loader hands over. Loading
//! validates every index and plane so that traversal code can rely on
//! them without further checks.

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::geometry::{Plane, AABB};
use super::area::{Area, Portal};
use super::bsp::{BspChild, BspNode};

/// Area data validation errors
#[derive(thiserror::Error, Debug)]
pub enum AreaLoadError {
    /// BSP child index does not point forward into the node array
    #[error("BSP node {node} has out-of-range child {child}")]
    BspChildOutOfRange {
        /// Node index
        node: usize,
        /// Raw child value
        child: i32,
    },
    
    /// BSP leaf decodes to an area that does not exist
    #[error("BSP node {node} refers to missing area {area}")]
    BspAreaOutOfRange {
        /// Node index
        node: usize,
        /// Decoded area index
        area: usize,
    },
    
    /// Portal leads to an area that does not exist
    #[error("Portal {portal} of area {area} targets missing area {target}")]
    PortalTargetOutOfRange {
        /// Owning area index
        area: usize,
        /// Portal index
        portal: usize,
        /// Target area index
        target: usize,
    },
    
    /// Portal polygon has fewer than three points
    #[error("Portal {portal} of area {area} has {count} points, at least 3 are required")]
    TooFewPortalPoints {
        /// Owning area index
        area: usize,
        /// Portal index
        portal: usize,
        /// Number of points found
        count: usize,
    },
    
    /// Plane, point or extents value that is NaN, infinite or degenerate
    #[error("Invalid geometry in {0}")]
    InvalidGeometry(String),
    
    /// Reading the data file failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Entire area set of a level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreasData {
    /// Areas, indexed by position
    pub areas: Vec<AreaData>,
    /// BSP nodes, root first
    pub bsp_nodes: Vec<BspNodeData>,
}

/// One convex area
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaData {
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub extents: [f32; 6],
    /// Outgoing portals
    pub portals: Vec<PortalData>,
}

/// One outgoing portal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalData {
    /// Target area index
    pub area: usize,
    /// Convex polygon, counter-clockwise seen from the owning area
    pub points: Vec<[f32; 3]>,
    /// `[a, b, c, d]` with `a*x + b*y + c*z = d`, normal facing the owning
    /// area; derived from the winding when absent
    pub plane: Option<[f32; 4]>,
    /// Start closed
    pub disabled: bool,
}

/// One BSP node in packed form
///
/// Node 0 is the root. Node children must have a higher index than their
/// parent, as in a pre-order layout; any other ordering is rejected with
/// `AreaLoadError::BspChildOutOfRange` even when it has no cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BspNodeData {
    /// `[a, b, c, d]`, points with `a*x + b*y + c*z < d` go negative
    pub plane: [f32; 4],
    /// Positive child: node index if `> 0`, otherwise `-(area + 1)`
    pub pos: i32,
    /// Negative child, same encoding
    pub neg: i32,
}

impl Config for AreasData {}

impl AreasData {
    /// Load from a `.ron` or `.toml` file
    pub fn load(path: &str) -> Result<Self, AreaLoadError> {
        Ok(Self::load_from_file(path)?)
    }
}

/// Plane normal of a polygon by Newell's method, facing the side the
/// polygon winds counter-clockwise around
fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::zeros();
    for (i, current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

fn decode_child(raw: i32, node: usize, node_count: usize, area_count: usize) -> Result<BspChild, AreaLoadError> {
    let child = BspChild::decode(raw);
    match child {
        BspChild::Node(index) if index <= node || index >= node_count => {
            Err(AreaLoadError::BspChildOutOfRange { node, child: raw })
        }
        BspChild::Area(area) if area >= area_count => {
            Err(AreaLoadError::BspAreaOutOfRange { node, area })
        }
        _ => Ok(child),
    }
}

/// Validate and convert the BSP
pub(crate) fn build_bsp(data: &AreasData) -> Result<Vec<BspNode>, AreaLoadError> {
    let node_count = data.bsp_nodes.len();
    let area_count = data.areas.len();
    
    data.bsp_nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let plane = Plane::from_coefficients(node.plane)
                .ok_or_else(|| AreaLoadError::InvalidGeometry(format!("plane of BSP node {index}")))?;
            Ok(BspNode {
                plane,
                positive: decode_child(node.pos, index, node_count, area_count)?,
                negative: decode_child(node.neg, index, node_count, area_count)?,
            })
        })
        .collect()
}

/// Validate and convert the areas and their portals
///
/// Portals without a plane whose winding is degenerate are skipped with a
/// warning rather than failing the whole load.
pub(crate) fn build_areas(data: &AreasData) -> Result<Vec<Area>, AreaLoadError> {
    let area_count = data.areas.len();
    let mut areas = Vec::with_capacity(area_count);
    
    for (area_index, area) in data.areas.iter().enumerate() {
        let extents = AABB::from_array(area.extents);
        if !extents.is_valid() {
            return Err(AreaLoadError::InvalidGeometry(format!("extents of area {area_index}")));
        }
        
        let mut portals = Vec::with_capacity(area.portals.len());
        for (portal_index, portal) in area.portals.iter().enumerate() {
            if portal.area >= area_count {
                return Err(AreaLoadError::PortalTargetOutOfRange {
                    area: area_index,
                    portal: portal_index,
                    target: portal.area,
                });
            }
            if portal.points.len() < 3 {
                return Err(AreaLoadError::TooFewPortalPoints {
                    area: area_index,
                    portal: portal_index,
                    count: portal.points.len(),
                });
            }
            if portal.points.iter().flatten().any(|v| !v.is_finite()) {
                return Err(AreaLoadError::InvalidGeometry(format!(
                    "points of portal {portal_index} in area {area_index}"
                )));
            }
            
            let points: Vec<Vec3> = portal.points.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect();
            let plane = match portal.plane {
                Some(coefficients) => Plane::from_coefficients(coefficients).ok_or_else(|| {
                    AreaLoadError::InvalidGeometry(format!("plane of portal {portal_index} in area {area_index}"))
                })?,
                None => {
                    let normal = newell_normal(&points);
                    if normal.norm_squared() <= f32::EPSILON {
                        log::warn!(
                            "Skipping degenerate portal {} of area {} (zero-area polygon)",
                            portal_index,
                            area_index
                        );
                        continue;
                    }
                    let centroid = points.iter().sum::<Vec3>() / points.len() as f32;
                    Plane::from_point_normal(centroid, normal)
                }
            };
            
            portals.push(Portal::new(portal.area, points, plane, portal.disabled));
        }
        
        areas.push(Area::new(extents, portals));
    }
    
    Ok(areas)
}
