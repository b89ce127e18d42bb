//! Per-frame visibility scenarios

use approx::assert_relative_eq;

use crate::camera::ViewCamera;
use crate::geometry::{extract_frustum_planes, is_fully_inside_planes_aabb, is_inside_planes_aabb, Plane};
use crate::scene::LightKind;
use super::*;

#[test]
fn test_renderable_behind_open_portal_is_visible() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (_, r) = add_box(&mut scene, "R", Vec3::new(0.0, 1.0, -15.0), 0.5);
    scene.update();
    
    let camera = corridor_camera();
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.camera_area_index(), Some(0));
    assert_eq!(scene.visible_portal_count(), 1);
    assert!(scene.visible_renderables().contains(&r));
    
    scene.set_portal_disabled(0, 0, true).unwrap();
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_portal_count(), 0);
    assert!(!scene.visible_renderables().contains(&r));
    
    scene.set_portal_disabled(0, 0, false).unwrap();
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_renderables().contains(&r));
}

#[test]
fn test_walls_hide_what_the_frustum_would_show() {
    let mut scene = scene_with_areas(&corridor_level(2));
    // In the frustum, but not in line of sight through the doorway
    let (_, hidden) = add_box(&mut scene, "hidden", Vec3::new(3.5, 1.0, -12.0), 0.4);
    scene.update();
    
    let camera = corridor_camera();
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_renderables().is_empty());
    
    // Spatial maps alone only know the frustum
    scene.clear_areas();
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_renderables(), &[hidden]);
}

#[test]
fn test_no_duplicate_visibility_across_areas() {
    let mut scene = scene_with_areas(&corridor_level(2));
    
    // Straddles the doorway, so it is listed in both rooms
    let door_node = scene.create_node("door", Transform::from_position(Vec3::new(0.0, 1.0, -10.0)));
    scene.add_renderable(door_node, cube(0.4)).unwrap();
    scene
        .add_renderable(door_node, AABB::from_center_extents(Vec3::new(0.0, 0.0, -1.0), Vec3::repeat(0.3)))
        .unwrap();
    let lamp = scene.add_light(door_node, LightKind::Point { radius: 0.5 }, Vec3::zeros()).unwrap();
    let sun = scene
        .add_light(door_node, LightKind::Directional { direction: Vec3::new(0.0, -1.0, 0.0) }, Vec3::zeros())
        .unwrap();
    scene.add_root_node(door_node).unwrap();
    add_dynamic_box(&mut scene, "drone", Vec3::new(0.5, 1.0, -10.0), 0.3);
    scene.update();
    
    assert!(scene.area_nodes(0).unwrap().contains(&door_node));
    assert!(scene.area_nodes(1).unwrap().contains(&door_node));
    
    let camera = corridor_camera();
    for _ in 0..3 {
        scene.update_visible_nodes(&camera);
        assert_unique(scene.visible_nodes());
        assert_unique(scene.visible_renderables());
        assert_unique(scene.visible_lights());
        
        assert_eq!(scene.visible_nodes().len(), 2);
        assert_eq!(scene.visible_renderables().len(), 3);
        assert_eq!(scene.visible_lights(), &[lamp]);
        assert_eq!(scene.global_lights(), &[sun]);
    }
}

#[test]
fn test_containment_in_frustum() {
    let mut scene = Scene::new(SceneConfig::default());
    let (node, renderable) = add_box(&mut scene, "box", Vec3::new(0.0, 0.0, -10.0), 1.0);
    scene.update();
    
    let camera = camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
    let mut planes = Vec::new();
    extract_frustum_planes(&camera, true, &mut planes);
    let extents = scene.world_extents(node).unwrap();
    assert!(is_fully_inside_planes_aabb(&extents, &planes));
    
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_nodes(), &[node]);
    assert_eq!(scene.visible_renderables(), &[renderable]);
    
    // Entirely behind the left plane
    scene
        .set_local_transform(node, Transform::from_position(Vec3::new(-50.0, 0.0, -10.0)))
        .unwrap();
    scene.update();
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_nodes().is_empty());
    assert!(scene.visible_renderables().is_empty());
}

/// Inward-facing planes of the box `[-half, half]` on every axis
fn box_planes(half: f32) -> Vec<Plane> {
    let axes = [Vec3::x(), Vec3::y(), Vec3::z()];
    axes.iter()
        .flat_map(|&axis| [Plane::new(axis, -half), Plane::new(-axis, -half)])
        .collect()
}

#[test]
fn test_node_against_identity_box_planes() {
    let mut scene = Scene::new(SceneConfig::default());
    let (node, _) = add_box(&mut scene, "N", Vec3::zeros(), 1.0);
    scene.update();
    let extents = scene.world_extents(node).unwrap();
    assert_eq!(extents.to_array(), [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
    
    assert!(is_inside_planes_aabb(&extents, &box_planes(1.0)));
    assert!(is_fully_inside_planes_aabb(&extents, &box_planes(1.0)));
    
    // Shrunk camera box: the node now pokes out of every plane
    assert!(!is_fully_inside_planes_aabb(&extents, &box_planes(0.5)));
}

#[test]
fn test_distance_is_measured_to_the_farthest_corner() {
    let mut scene = Scene::new(SceneConfig::default());
    let (node, renderable) = add_box(&mut scene, "box", Vec3::new(0.0, 0.0, -10.0), 1.0);
    scene.update();
    
    let camera = camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
    scene.update_visible_nodes(&camera);
    
    // Far face at z = -11, near plane at z = -0.1
    assert_relative_eq!(scene.node(node).unwrap().distance(), 10.9, epsilon = 1e-3);
    assert_relative_eq!(scene.renderable(renderable).unwrap().distance(), 10.9, epsilon = 1e-3);
    assert_relative_eq!(scene.visible().max_distance(), 10.9, epsilon = 1e-3);
    assert_eq!(scene.renderable(renderable).unwrap().frame_visible(), scene.frame_index());
}

#[test]
fn test_box_behind_near_plane_is_rejected() {
    let mut scene = Scene::new(SceneConfig::default());
    // Surrounds the eye but ends before the near plane
    add_box(&mut scene, "eye", Vec3::zeros(), 0.05);
    scene.update();
    
    let camera = camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_nodes().is_empty());
}

#[test]
fn test_disabled_entities_never_contribute() {
    let mut scene = Scene::new(SceneConfig::default());
    let (a, ra) = add_box(&mut scene, "a", Vec3::new(-1.0, 0.0, -10.0), 0.5);
    let (_, rb) = add_box(&mut scene, "b", Vec3::new(1.0, 0.0, -10.0), 0.5);
    scene.update();
    let camera = camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
    
    scene.set_node_disabled(a, true).unwrap();
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_renderables(), &[rb]);
    
    scene.set_node_disabled(a, false).unwrap();
    scene.set_renderable_disabled(rb, true).unwrap();
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_renderables(), &[ra]);
    // The node itself is still in view
    assert_eq!(scene.visible_nodes().len(), 2);
}

#[test]
fn test_lights_are_tested_individually() {
    let mut scene = Scene::new(SceneConfig::default());
    let node = scene.create_node("lamp post", Transform::from_position(Vec3::new(0.0, 0.0, -10.0)));
    let near_light = scene.add_light(node, LightKind::Point { radius: 1.0 }, Vec3::zeros()).unwrap();
    // Far off to the side, out of view
    let side_light = scene
        .add_light(node, LightKind::Point { radius: 1.0 }, Vec3::new(60.0, 0.0, 0.0))
        .unwrap();
    let ambient = scene.add_light(node, LightKind::Ambient, Vec3::zeros()).unwrap();
    scene.add_root_node(node).unwrap();
    scene.update();
    
    let camera = camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.visible_lights(), &[near_light]);
    assert!(!scene.visible_lights().contains(&side_light));
    assert_eq!(scene.global_lights(), &[ambient]);
}

#[test]
fn test_switched_off_global_lights_are_not_reported() {
    let mut scene = Scene::new(SceneConfig::default());
    let sky = scene.create_node("sky", Transform::identity());
    let sun = scene
        .add_light(sky, LightKind::Directional { direction: Vec3::new(0.0, -1.0, 0.0) }, Vec3::zeros())
        .unwrap();
    let ambient = scene.add_light(sky, LightKind::Ambient, Vec3::zeros()).unwrap();
    let cave = scene.create_node("cave", Transform::identity());
    let glow = scene.add_light(cave, LightKind::Ambient, Vec3::zeros()).unwrap();
    scene.add_root_node(sky).unwrap();
    scene.add_root_node(cave).unwrap();
    scene.update();
    assert_eq!(sorted(&scene.global_lights()), sorted(&[sun, ambient, glow]));
    
    scene.set_light_disabled(sun, true).unwrap();
    scene.set_node_disabled(cave, true).unwrap();
    assert_eq!(scene.global_lights(), &[ambient]);
    
    scene.set_light_disabled(sun, false).unwrap();
    scene.set_node_disabled(cave, false).unwrap();
    assert_eq!(sorted(&scene.global_lights()), sorted(&[sun, ambient, glow]));
}

#[test]
fn test_far_refinement_keeps_results() {
    let build = |refine: bool| {
        let mut scene = Scene::new(SceneConfig::default().with_far_plane_refinement(refine));
        for i in 0..5 {
            add_box(&mut scene, "box", Vec3::new(i as f32 - 2.0, 0.0, -5.0 - i as f32 * 3.0), 0.5);
        }
        scene.update();
        scene.update_visible_nodes(&camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)));
        sorted(scene.visible_renderables()).len()
    };
    assert_eq!(build(true), 5);
    assert_eq!(build(false), 5);
}

#[test]
fn test_far_refinement_drops_entries_past_the_content() {
    let build = |refine: bool| {
        let mut scene = Scene::new(SceneConfig::default().with_far_plane_refinement(refine));
        let (_, near) = add_box(&mut scene, "near", Vec3::new(0.0, 0.0, -5.0), 0.5);
        // Listed by the frustum but contributes nothing that sets the depth
        let (far, hidden) = add_box(&mut scene, "far", Vec3::new(0.0, 0.0, -100.0), 0.5);
        scene.set_renderable_disabled(hidden, true).unwrap();
        scene.update();
        scene.update_visible_nodes(&camera_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)));
        assert_eq!(scene.visible_renderables(), &[near]);
        (scene, far)
    };
    
    let (scene, far) = build(true);
    assert_eq!(scene.visible_nodes().len(), 1);
    assert!(!scene.visible_nodes().contains(&far));
    assert_eq!(scene.node(far).unwrap().frame_visible(), 0);
    
    let (scene, far) = build(false);
    assert_eq!(scene.visible_nodes().len(), 2);
    assert!(scene.visible_nodes().contains(&far));
    assert_eq!(scene.node(far).unwrap().frame_visible(), scene.frame_index());
}

#[test]
fn test_dynamic_node_visibility_follows_movement() {
    let mut scene = scene_with_areas(&corridor_level(2));
    let (node, renderable) = add_dynamic_box(&mut scene, "drone", Vec3::new(0.0, 1.0, -15.0), 0.5);
    scene.update();
    let camera = corridor_camera();
    
    scene.update_visible_nodes(&camera);
    assert!(scene.visible_renderables().contains(&renderable));
    
    // Into the corner of the far room, out of line of sight
    scene
        .set_local_transform(node, Transform::from_position(Vec3::new(4.0, 1.0, -19.0)))
        .unwrap();
    scene.update();
    scene.update_visible_nodes(&camera);
    assert!(!scene.visible_renderables().contains(&renderable));
    
    // Dynamic moves never touch the static set
    assert_eq!(scene.static_change_counter(), 0);
}

#[test]
fn test_camera_outside_every_area_uses_spatial_maps() {
    // Everything below y = 0 is solid
    let data = AreasData {
        areas: vec![AreaData { extents: [-50.0, 0.0, -50.0, 50.0, 10.0, 50.0], portals: Vec::new() }],
        bsp_nodes: vec![BspNodeData { plane: [0.0, 1.0, 0.0, 0.0], pos: -1, neg: 0 }],
    };
    let mut scene = scene_with_areas(&data);
    let (_, renderable) = add_box(&mut scene, "box", Vec3::new(0.0, -3.0, -10.0), 0.5);
    scene.update();
    
    let camera = camera_at(Vec3::new(0.0, -3.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
    scene.update_visible_nodes(&camera);
    assert_eq!(scene.camera_area_index(), None);
    assert_eq!(scene.visible_renderables(), &[renderable]);
}

#[test]
fn test_disabling_a_portal_never_grows_the_visible_set() {
    let mut scene = scene_with_areas(&corridor_level(3));
    for room in 0..3 {
        let z = -(room as f32) * 10.0;
        for (x, dz) in [(0.0, -3.0), (-3.0, -6.0), (2.5, -8.0), (0.5, -9.5)] {
            add_box(&mut scene, "crate", Vec3::new(x, 1.0, z + dz), 0.4);
        }
    }
    add_dynamic_box(&mut scene, "drone", Vec3::new(0.0, 1.5, -21.0), 0.3);
    scene.update();
    
    let cameras = [
        corridor_camera(),
        camera_at(Vec3::new(2.0, 1.0, -2.0), Vec3::new(-0.2, 0.0, -1.0)),
        camera_at(Vec3::new(0.0, 1.0, -15.0), Vec3::new(0.0, 0.0, -1.0)),
        camera_at(Vec3::new(0.0, 1.0, -28.0), Vec3::new(0.0, 0.0, 1.0)),
    ];
    let portals: Vec<(usize, usize)> = (0..3)
        .flat_map(|area| (0..scene.areas().unwrap().areas()[area].portals().len()).map(move |p| (area, p)))
        .collect();
    
    for camera in &cameras {
        scene.update_visible_nodes(camera);
        let open = sorted(scene.visible_renderables());
        
        for &(area, portal) in &portals {
            scene.set_portal_disabled(area, portal, true).unwrap();
            scene.update_visible_nodes(camera);
            let closed = sorted(scene.visible_renderables());
            assert!(
                closed.iter().all(|r| open.contains(r)),
                "closing portal {portal} of area {area} revealed something from {:?}",
                camera.position()
            );
            scene.set_portal_disabled(area, portal, false).unwrap();
        }
    }
}
