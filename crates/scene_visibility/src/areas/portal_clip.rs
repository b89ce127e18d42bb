//! Portal polygon clipping and clip-plane construction
//!
//! A portal seen from the camera is clipped against the plane set it is
//! viewed through, and the visible part becomes a pyramid of edge planes
//! with its apex at the camera. Areas behind the portal are then tested
//! against that pyramid.

use crate::foundation::math::Vec3;
use crate::geometry::Plane;

/// Squared length below which an edge plane normal is degenerate
const DEGENERATE_NORMAL: f32 = 1e-10;

/// Squared distance below which clipped vertices are merged
const MERGE_DISTANCE: f32 = 1e-10;

/// Ping-pong polygon buffers reused across clips
#[derive(Debug, Default)]
pub struct ClipScratch {
    front: Vec<Vec3>,
    back: Vec<Vec3>,
}

impl ClipScratch {
    /// Create empty scratch buffers
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_merged(output: &mut Vec<Vec3>, point: Vec3) {
    if output.last().map_or(true, |prev| (prev - point).norm_squared() > MERGE_DISTANCE) {
        output.push(point);
    }
}

/// Clip `input` to the positive side of `plane` (Sutherland-Hodgman)
fn clip_polygon(input: &[Vec3], plane: &Plane, output: &mut Vec<Vec3>) {
    output.clear();
    let Some(&last) = input.last() else {
        return;
    };
    
    let mut previous = last;
    let mut previous_distance = plane.distance_to_point(previous);
    for &current in input {
        let current_distance = plane.distance_to_point(current);
        if current_distance >= 0.0 {
            if previous_distance < 0.0 {
                let t = previous_distance / (previous_distance - current_distance);
                push_merged(output, previous + (current - previous) * t);
            }
            push_merged(output, current);
        } else if previous_distance >= 0.0 {
            let t = previous_distance / (previous_distance - current_distance);
            push_merged(output, previous + (current - previous) * t);
        }
        previous = current;
        previous_distance = current_distance;
    }
    
    // Closing vertex may duplicate the first one
    if output.len() > 1 {
        if let (Some(first), Some(end)) = (output.first(), output.last()) {
            if (first - end).norm_squared() <= MERGE_DISTANCE {
                output.pop();
            }
        }
    }
}

/// Build the clip planes of `points` seen from `viewer` through `parent`
///
/// Appends the edge planes to `out` and returns `true` when some part of
/// the portal is visible. Returns `false` (leaving `out` untouched) when
/// the portal is entirely outside one parent plane, clips away to less
/// than a triangle, or yields a degenerate edge plane.
pub fn build_portal_planes(
    points: &[Vec3],
    viewer: Vec3,
    parent: &[Plane],
    scratch: &mut ClipScratch,
    out: &mut Vec<Plane>,
) -> bool {
    let mut fully_visible = true;
    for plane in parent {
        let mut any_inside = false;
        let mut all_inside = true;
        for &point in points {
            if plane.distance_to_point(point) >= 0.0 {
                any_inside = true;
            } else {
                all_inside = false;
            }
        }
        if !any_inside {
            return false;
        }
        fully_visible &= all_inside;
    }
    
    let polygon: &[Vec3] = if fully_visible {
        points
    } else {
        scratch.front.clear();
        scratch.front.extend_from_slice(points);
        for plane in parent {
            clip_polygon(&scratch.front, plane, &mut scratch.back);
            std::mem::swap(&mut scratch.front, &mut scratch.back);
            if scratch.front.len() < 3 {
                return false;
            }
        }
        &scratch.front
    };
    
    if polygon.len() < 3 {
        return false;
    }
    
    let centroid = polygon.iter().sum::<Vec3>() / polygon.len() as f32;
    let start = out.len();
    for (i, &p0) in polygon.iter().enumerate() {
        let p1 = polygon[(i + 1) % polygon.len()];
        let normal = (p0 - viewer).cross(&(p1 - viewer));
        if normal.norm_squared() <= DEGENERATE_NORMAL {
            out.truncate(start);
            return false;
        }
        
        let plane = Plane::from_point_normal(viewer, normal);
        out.push(if plane.distance_to_point(centroid) < 0.0 {
            plane.flipped()
        } else {
            plane
        });
    }
    
    true
}
