//! Scenario tests for `Scene`
//!
//! Levels are built from small hand-written area sets: a corridor of
//! rooms along -z and a four-room ring around the origin.

mod area_scenarios;
mod visibility_scenarios;

use std::fmt::Debug;

use crate::areas::{AreaData, AreasData, BspNodeData, PortalData};
use crate::camera::Camera;
use crate::core::SceneConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::geometry::AABB;
use super::{NodeKey, RenderableKey, Scene};

/// Camera at `position` looking along `direction`, 60 degree FOV, square
fn camera_at(position: Vec3, direction: Vec3) -> Camera {
    let mut camera = Camera::perspective(position, 60.0, 1.0, 0.1, 200.0);
    camera.place(position, direction);
    camera
}

/// Camera in the first corridor room looking down the corridor
fn corridor_camera() -> Camera {
    camera_at(Vec3::new(0.0, 1.0, -5.0), Vec3::new(0.0, 0.0, -1.0))
}

fn cube(half: f32) -> AABB {
    AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(half))
}

/// Root node at `center` carrying one cube renderable
fn add_box(scene: &mut Scene, name: &str, center: Vec3, half: f32) -> (NodeKey, RenderableKey) {
    let node = scene.create_node(name, Transform::from_position(center));
    let renderable = scene.add_renderable(node, cube(half)).unwrap();
    scene.add_root_node(node).unwrap();
    (node, renderable)
}

/// Same as `add_box`, registered in the dynamic map
fn add_dynamic_box(scene: &mut Scene, name: &str, center: Vec3, half: f32) -> (NodeKey, RenderableKey) {
    let node = scene.create_node(name, Transform::from_position(center));
    scene.set_dynamic(node, true).unwrap();
    let renderable = scene.add_renderable(node, cube(half)).unwrap();
    scene.add_root_node(node).unwrap();
    (node, renderable)
}

/// Rectangular doorway polygon in a wall
fn doorway(points: [[f32; 3]; 4], target: usize, plane: [f32; 4]) -> PortalData {
    PortalData {
        area: target,
        points: points.to_vec(),
        plane: Some(plane),
        disabled: false,
    }
}

/// `rooms` rooms along -z, room `i` spanning `z` in `[-10(i+1), -10i]`,
/// joined by 2x2 doorways centred on the z axis
fn corridor_level(rooms: usize) -> AreasData {
    assert!(rooms >= 2);
    let mut areas: Vec<AreaData> = (0..rooms)
        .map(|i| {
            let z0 = -(i as f32) * 10.0;
            AreaData {
                extents: [-5.0, 0.0, z0 - 10.0, 5.0, 4.0, z0],
                portals: Vec::new(),
            }
        })
        .collect();
    
    let mut bsp_nodes = Vec::new();
    for i in 0..rooms - 1 {
        let z = -((i + 1) as f32) * 10.0;
        let points = [[-1.0, 0.0, z], [1.0, 0.0, z], [1.0, 2.0, z], [-1.0, 2.0, z]];
        areas[i].portals.push(doorway(points, i + 1, [0.0, 0.0, 1.0, z]));
        areas[i + 1].portals.push(doorway(points, i, [0.0, 0.0, -1.0, -z]));
        
        // z >= wall stays in room i, the rest continues down the corridor
        let neg = if i + 2 < rooms { (i + 1) as i32 } else { -(rooms as i32) };
        bsp_nodes.push(BspNodeData { plane: [0.0, 0.0, 1.0, z], pos: -(i as i32 + 1), neg });
    }
    
    AreasData { areas, bsp_nodes }
}

/// Four quadrant rooms of the square `[-10, 10]` in x and z, each joined
/// to its two neighbours, forming a cycle 0 -> 1 -> 2 -> 3 -> 0
///
/// Quadrants: 0 is (-x, -z), 1 is (+x, -z), 2 is (+x, +z), 3 is (-x, +z).
fn ring_level() -> AreasData {
    let quadrant = |x0: f32, z0: f32| AreaData {
        extents: [x0, 0.0, z0, x0 + 10.0, 4.0, z0 + 10.0],
        portals: Vec::new(),
    };
    let mut areas = vec![
        quadrant(-10.0, -10.0),
        quadrant(0.0, -10.0),
        quadrant(0.0, 0.0),
        quadrant(-10.0, 0.0),
    ];
    
    // Doorways in the x = 0 walls span z, those in the z = 0 walls span x
    let x_wall = |z: f32| [[0.0, 0.0, z - 1.0], [0.0, 0.0, z + 1.0], [0.0, 2.0, z + 1.0], [0.0, 2.0, z - 1.0]];
    let z_wall = |x: f32| [[x - 1.0, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 1.0, 2.0, 0.0], [x - 1.0, 2.0, 0.0]];
    
    areas[0].portals.push(doorway(x_wall(-5.0), 1, [-1.0, 0.0, 0.0, 0.0]));
    areas[1].portals.push(doorway(x_wall(-5.0), 0, [1.0, 0.0, 0.0, 0.0]));
    areas[1].portals.push(doorway(z_wall(5.0), 2, [0.0, 0.0, -1.0, 0.0]));
    areas[2].portals.push(doorway(z_wall(5.0), 1, [0.0, 0.0, 1.0, 0.0]));
    areas[2].portals.push(doorway(x_wall(5.0), 3, [1.0, 0.0, 0.0, 0.0]));
    areas[3].portals.push(doorway(x_wall(5.0), 2, [-1.0, 0.0, 0.0, 0.0]));
    areas[3].portals.push(doorway(z_wall(-5.0), 0, [0.0, 0.0, 1.0, 0.0]));
    areas[0].portals.push(doorway(z_wall(-5.0), 3, [0.0, 0.0, -1.0, 0.0]));
    
    let bsp_nodes = vec![
        BspNodeData { plane: [1.0, 0.0, 0.0, 0.0], pos: 1, neg: 2 },
        BspNodeData { plane: [0.0, 0.0, 1.0, 0.0], pos: -3, neg: -2 },
        BspNodeData { plane: [0.0, 0.0, 1.0, 0.0], pos: -4, neg: -1 },
    ];
    
    AreasData { areas, bsp_nodes }
}

/// One area covering everything, no portals
fn single_area_level() -> AreasData {
    AreasData {
        areas: vec![AreaData {
            extents: [-100.0, -100.0, -100.0, 100.0, 100.0, 100.0],
            portals: Vec::new(),
        }],
        bsp_nodes: vec![BspNodeData { plane: [0.0, 1.0, 0.0, 0.0], pos: -1, neg: -1 }],
    }
}

fn scene_with_areas(data: &AreasData) -> Scene {
    let mut scene = Scene::new(SceneConfig::default());
    scene.load_areas(data).unwrap();
    scene
}

fn sorted<T: Ord + Copy>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_unstable();
    items
}

fn assert_unique<T: Ord + Copy + Debug>(items: &[T]) {
    let mut deduped = sorted(items);
    deduped.dedup();
    assert_eq!(deduped.len(), items.len(), "duplicate entries in {items:?}");
}
