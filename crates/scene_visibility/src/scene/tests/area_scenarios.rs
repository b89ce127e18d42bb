//! Area partition, assignment and portal flood scenarios

use crate::areas::{AreaLoadError, AreaSystem, PortalFlood};
use crate::geometry::Plane;
use crate::scene::{LightKind, SceneError};
use super::*;

fn static_nodes(scene: &Scene, area: usize) -> Vec<NodeKey> {
    scene.areas().unwrap().area(area).unwrap().static_nodes().to_vec()
}

#[test]
fn test_every_point_maps_to_one_area() {
    let scene = scene_with_areas(&ring_level());
    for i in 0..20 {
        for j in 0..20 {
            let x = i as f32 - 9.5;
            let z = j as f32 - 9.5;
            let expected = match (x < 0.0, z < 0.0) {
                (true, true) => 0,
                (false, true) => 1,
                (false, false) => 2,
                (true, false) => 3,
            };
            assert_eq!(scene.find_area_index(Vec3::new(x, 1.0, z)), Some(expected), "at ({x}, {z})");
        }
    }
    
    let scene = scene_with_areas(&corridor_level(3));
    for step in 0..30 {
        let z = -(step as f32) - 0.5;
        let area = scene.find_area_index(Vec3::new(0.0, 1.0, z)).unwrap();
        assert_eq!(area, step / 10);
    }
}

#[test]
fn test_ring_flood_reaches_each_area_once() {
    let mut system = AreaSystem::from_data(&ring_level()).unwrap();
    let bounds = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(100.0));
    let mut flood = PortalFlood::new();
    let viewers = [
        Vec3::new(-5.0, 1.0, -5.0),
        Vec3::new(-0.5, 1.0, -5.0),
        Vec3::new(5.0, 1.0, -0.5),
        Vec3::new(3.0, 1.5, 7.0),
    ];
    
    for (query, viewer) in (1u32..).zip(viewers) {
        let start = system.find_area_index(viewer).unwrap();
        let initial: [Plane; 0] = [];
        flood.find_visible_portals(&mut system.areas, start, viewer, 0.1, &initial, bounds, query);
        
        let reached: Vec<usize> = flood.items().iter().map(|item| item.area).collect();
        assert_eq!(reached[0], start);
        assert_unique(&reached);
        assert!(reached.len() <= 4);
        assert!(flood.portal_count() <= 8);
    }
}

#[test]
fn test_walking_around_the_ring() {
    let mut scene = scene_with_areas(&ring_level());
    for (x, z) in [(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)] {
        add_box(&mut scene, "pillar", Vec3::new(x, 1.0, z), 0.5);
        add_dynamic_box(&mut scene, "bat", Vec3::new(x + 2.0, 2.5, z + 2.0), 0.3);
    }
    scene.update();
    
    let path = [
        (Vec3::new(-8.0, 1.0, -5.0), Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::new(5.0, 1.0, -8.0), Vec3::new(0.0, 0.0, 1.0)),
        (Vec3::new(8.0, 1.0, 5.0), Vec3::new(-1.0, 0.0, 0.0)),
        (Vec3::new(-5.0, 1.0, 8.0), Vec3::new(0.0, 0.0, -1.0)),
        (Vec3::new(-5.0, 1.0, -0.05), Vec3::new(0.0, 0.0, 1.0)),
    ];
    for (position, direction) in path {
        scene.update_visible_nodes(&camera_at(position, direction));
        assert!(scene.camera_area_index().is_some());
        assert!(scene.visible_portal_count() <= 8);
        assert!(!scene.visible_renderables().is_empty());
        assert_unique(scene.visible_nodes());
        assert_unique(scene.visible_renderables());
    }
}

#[test]
fn test_static_nodes_follow_moves() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (node, _) = add_box(&mut scene, "crate", Vec3::new(0.0, 1.0, -5.0), 0.5);
    scene.update();
    assert_eq!(static_nodes(&scene, 0), vec![node]);
    assert!(static_nodes(&scene, 1).is_empty());
    let counter = scene.static_change_counter();
    
    scene
        .set_local_transform(node, Transform::from_position(Vec3::new(0.0, 1.0, -15.0)))
        .unwrap();
    scene.update();
    assert!(scene.static_change_counter() > counter);
    assert!(static_nodes(&scene, 0).is_empty());
    assert_eq!(static_nodes(&scene, 1), vec![node]);
}

#[test]
fn test_node_in_a_doorway_belongs_to_both_rooms() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (doorway_node, _) = add_box(&mut scene, "doorway", Vec3::new(0.0, 1.0, -10.0), 0.5);
    // Same wall, but not in the opening
    let (wall_node, _) = add_box(&mut scene, "wall", Vec3::new(4.0, 1.0, -10.0), 0.5);
    scene.update();
    
    assert_eq!(sorted(&static_nodes(&scene, 0)), sorted(&[doorway_node, wall_node]));
    assert_eq!(static_nodes(&scene, 1), vec![doorway_node]);
}

#[test]
fn test_spot_light_origin_locates_its_node() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let node = scene.create_node("lamp", Transform::from_position(Vec3::new(3.0, 1.0, -9.0)));
    // Cone reaches deep into the second room, beside the doorway
    scene
        .add_light(
            node,
            LightKind::Spot { direction: Vec3::new(0.0, 0.0, -1.0), range: 6.0, half_angle: 10.0 },
            Vec3::zeros(),
        )
        .unwrap();
    scene.add_root_node(node).unwrap();
    scene.update();
    
    let extents = scene.world_extents(node).unwrap();
    assert_eq!(scene.find_area_index(extents.center()), Some(1));
    assert_eq!(static_nodes(&scene, 0), vec![node]);
    assert!(static_nodes(&scene, 1).is_empty());
}

#[test]
fn test_area_extents_only_grow() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (node, _) = add_box(&mut scene, "tall", Vec3::new(0.0, 5.0, -5.0), 2.0);
    scene.update();
    let grown = *scene.areas().unwrap().area(0).unwrap().extents();
    assert!(grown.max.y >= 7.0);
    
    scene
        .set_local_transform(node, Transform::from_position(Vec3::new(0.0, 1.0, -5.0)))
        .unwrap();
    scene.update();
    let after = *scene.areas().unwrap().area(0).unwrap().extents();
    assert!(after.contains(&grown));
}

#[test]
fn test_removed_root_leaves_every_list() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (node, renderable) = add_box(&mut scene, "crate", Vec3::new(0.0, 1.0, -8.0), 0.5);
    let child = scene.create_node("label", Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
    scene.add_renderable(child, cube(0.2)).unwrap();
    scene.add_child(node, child).unwrap();
    scene.update();
    
    let camera = corridor_camera();
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_renderables().contains(&renderable));
    
    assert_eq!(scene.remove_root_node(child), Err(SceneError::NotARoot(child)));
    let counter = scene.static_change_counter();
    scene.remove_root_node(node).unwrap();
    assert!(scene.static_change_counter() > counter);
    assert!(scene.node(node).is_none());
    assert!(scene.node(child).is_none());
    
    scene.update();
    assert!(static_nodes(&scene, 0).is_empty());
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_renderables().is_empty());
    let region = AABB::from_center_extents(Vec3::new(0.0, 1.0, -8.0), Vec3::repeat(2.0));
    assert!(scene.find_overlapping_nodes(region.center(), &region).is_empty());
}

#[test]
fn test_portal_toggle_errors() {
    let mut scene = Scene::new(SceneConfig::default());
    assert_eq!(
        scene.set_portal_disabled(0, 0, true),
        Err(SceneError::PortalNotFound { area: 0, portal: 0 })
    );
    assert_eq!(scene.portal_disabled(0, 0), None);
    
    scene.load_areas(&corridor_level(2)).unwrap();
    assert_eq!(scene.portal_disabled(0, 0), Some(false));
    assert_eq!(
        scene.set_portal_disabled(0, 1, true),
        Err(SceneError::PortalNotFound { area: 0, portal: 1 })
    );
    assert_eq!(
        scene.set_portal_disabled(7, 0, true),
        Err(SceneError::PortalNotFound { area: 7, portal: 0 })
    );
    scene.set_portal_disabled(1, 0, true).unwrap();
    assert_eq!(scene.portal_disabled(1, 0), Some(true));
    assert_eq!(scene.portal_disabled(0, 0), Some(false));
}

#[test]
fn test_bad_area_data_keeps_previous_partition() {
    let mut scene = scene_with_areas(&corridor_level(2));
    
    let mut broken = corridor_level(3);
    broken.areas[2].portals[0].area = 9;
    let error = scene.load_areas(&broken).unwrap_err();
    assert!(matches!(error, AreaLoadError::PortalTargetOutOfRange { area: 2, portal: 0, target: 9 }));
    
    let mut broken = corridor_level(2);
    broken.bsp_nodes[0].neg = -5;
    assert!(matches!(scene.load_areas(&broken), Err(AreaLoadError::BspAreaOutOfRange { node: 0, .. })));
    
    assert_eq!(scene.areas().unwrap().areas().len(), 2);
}

#[test]
fn test_area_file_round_trip() {
    use crate::config::Config;
    
    let path = std::env::temp_dir().join(format!("scene_visibility_ring_{}.ron", std::process::id()));
    let path = path.to_str().unwrap().to_string();
    ring_level().save_to_file(&path).unwrap();
    
    let mut scene = Scene::new(SceneConfig::default());
    scene.load_areas_from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    
    assert_eq!(scene.areas().unwrap().areas().len(), 4);
    assert_eq!(scene.find_area_index(Vec3::new(3.0, 1.0, 3.0)), Some(2));
    assert!(matches!(
        scene.load_areas_from_file("does/not/exist.ron"),
        Err(AreaLoadError::Config(_))
    ));
}

#[test]
fn test_box_queries_against_the_partition() {
    let mut scene = scene_with_areas(&ring_level());
    let across = AABB::new(Vec3::new(-1.0, 0.0, -6.0), Vec3::new(1.0, 2.0, -4.0));
    assert_eq!(sorted(&scene.find_area_indices_aabb(&across)), vec![0, 1]);
    
    let middle = AABB::from_center_extents(Vec3::new(0.0, 1.0, 0.0), Vec3::repeat(1.0));
    assert_eq!(sorted(&scene.find_area_indices_aabb(&middle)), vec![0, 1, 2, 3]);
}

#[test]
fn test_membership_is_fixed_once_registered() {
    let mut scene = Scene::new(SceneConfig::default());
    let (node, _) = add_box(&mut scene, "crate", Vec3::zeros(), 0.5);
    scene.update();
    assert_eq!(scene.set_dynamic(node, true), Err(SceneError::AlreadyRegistered(node)));
}
