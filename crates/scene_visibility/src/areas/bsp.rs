//! Binary space partition locating the area that contains a point

use crate::foundation::math::Vec3;
use crate::geometry::{Plane, AABB};

/// Decoded child reference of a BSP node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspChild {
    /// Continue at this node index
    Node(usize),
    /// Leaf inside this area
    Area(usize),
    /// Leaf outside every area
    Solid,
}

impl BspChild {
    /// Decode the packed form: positive values are node indices, other
    /// values are leaves encoded as `-(area + 1)`, so `0` is solid space
    pub fn decode(raw: i32) -> Self {
        if raw > 0 {
            Self::Node(raw as usize)
        } else if raw < 0 {
            Self::Area((-(raw + 1)) as usize)
        } else {
            Self::Solid
        }
    }
}

/// Split plane and the two half-spaces below it
///
/// Points with `dot(normal, p) < distance` continue into `negative`.
#[derive(Debug, Clone, Copy)]
pub struct BspNode {
    /// Splitting plane
    pub plane: Plane,
    /// Child on the positive side
    pub positive: BspChild,
    /// Child on the negative side
    pub negative: BspChild,
}

/// Area index containing `point`, `None` in solid space or without a BSP
///
/// Children are validated at load to point strictly forward, so the
/// descent always terminates.
pub fn find_area_index(nodes: &[BspNode], point: Vec3) -> Option<usize> {
    let mut index = 0;
    loop {
        let node = nodes.get(index)?;
        let child = if node.plane.normal.dot(&point) < node.plane.distance {
            node.negative
        } else {
            node.positive
        };
        match child {
            BspChild::Node(next) => index = next,
            BspChild::Area(area) => return Some(area),
            BspChild::Solid => return None,
        }
    }
}

/// Append every area whose leaf `extents` touches, without duplicates
///
/// Descends into both children when the box straddles a split plane.
/// `stack` is traversal scratch.
pub fn find_area_indices_aabb(
    nodes: &[BspNode],
    extents: &AABB,
    stack: &mut Vec<usize>,
    out: &mut Vec<usize>,
) {
    if nodes.is_empty() {
        return;
    }
    
    stack.clear();
    stack.push(0);
    while let Some(index) = stack.pop() {
        let node = &nodes[index];
        let sides = [
            (node.plane.min_distance_aabb(extents) < 0.0, node.negative),
            (node.plane.max_distance_aabb(extents) >= 0.0, node.positive),
        ];
        for (touched, child) in sides {
            if !touched {
                continue;
            }
            match child {
                BspChild::Node(next) => stack.push(next),
                BspChild::Area(area) => {
                    if !out.contains(&area) {
                        out.push(area);
                    }
                }
                BspChild::Solid => {}
            }
        }
    }
}
