//! Walkthrough demo
//!
//! Headless tour of a four-room ring level. A camera walks a loop through
//! the rooms while the door between the east rooms opens and closes, and
//! the visible counts are logged as it goes.
//!
//! Usage: `walkthrough [scene_config.toml|.ron] [areas.ron|.toml]`

use scene_visibility::foundation::logging;
use scene_visibility::prelude::*;
use thiserror::Error;

/// Walkthrough errors
#[derive(Error, Debug)]
enum WalkthroughError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Area data error: {0}")]
    Areas(#[from] AreaLoadError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

const FRAMES: usize = 240;
const FRAMES_PER_LEG: usize = 60;
const DOOR_TOGGLE_FRAMES: usize = 45;
const EYE_HEIGHT: f32 = 1.2;

/// Both sides of the doorway between rooms 1 and 2
const EAST_DOOR: [(usize, usize); 2] = [(1, 1), (2, 0)];

/// Room centres in walking order, one per quadrant
const WAYPOINTS: [(f32, f32); 4] = [(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)];

/// Four quadrant rooms around the origin joined in a ring
///
/// Room 0 is (-x, -z), 1 is (+x, -z), 2 is (+x, +z), 3 is (-x, +z).
fn ring_areas() -> AreasData {
    let room = |x0: f32, z0: f32| AreaData {
        extents: [x0, 0.0, z0, x0 + 10.0, 3.0, z0 + 10.0],
        portals: Vec::new(),
    };
    let door = |points: [[f32; 3]; 4], area: usize, plane: [f32; 4]| PortalData {
        area,
        points: points.to_vec(),
        plane: Some(plane),
        disabled: false,
    };
    let x_wall = |z: f32| [[0.0, 0.0, z - 1.0], [0.0, 0.0, z + 1.0], [0.0, 2.2, z + 1.0], [0.0, 2.2, z - 1.0]];
    let z_wall = |x: f32| [[x - 1.0, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 1.0, 2.2, 0.0], [x - 1.0, 2.2, 0.0]];

    let mut areas = vec![room(-10.0, -10.0), room(0.0, -10.0), room(0.0, 0.0), room(-10.0, 0.0)];
    areas[0].portals.push(door(x_wall(-5.0), 1, [-1.0, 0.0, 0.0, 0.0]));
    areas[0].portals.push(door(z_wall(-5.0), 3, [0.0, 0.0, -1.0, 0.0]));
    areas[1].portals.push(door(x_wall(-5.0), 0, [1.0, 0.0, 0.0, 0.0]));
    areas[1].portals.push(door(z_wall(5.0), 2, [0.0, 0.0, -1.0, 0.0]));
    areas[2].portals.push(door(z_wall(5.0), 1, [0.0, 0.0, 1.0, 0.0]));
    areas[2].portals.push(door(x_wall(5.0), 3, [1.0, 0.0, 0.0, 0.0]));
    areas[3].portals.push(door(x_wall(5.0), 2, [-1.0, 0.0, 0.0, 0.0]));
    areas[3].portals.push(door(z_wall(-5.0), 0, [0.0, 0.0, 1.0, 0.0]));

    AreasData {
        areas,
        bsp_nodes: vec![
            BspNodeData { plane: [1.0, 0.0, 0.0, 0.0], pos: 1, neg: 2 },
            BspNodeData { plane: [0.0, 0.0, 1.0, 0.0], pos: -3, neg: -2 },
            BspNodeData { plane: [0.0, 0.0, 1.0, 0.0], pos: -4, neg: -1 },
        ],
    }
}

/// Running totals over the walk
#[derive(Debug, Default)]
struct WalkStats {
    frames: usize,
    renderables: usize,
    max_renderables: usize,
    frames_outside_areas: usize,
}

struct WalkthroughApp {
    scene: Scene,
    camera: Camera,
    bat: Option<NodeKey>,
    door_closed: bool,
    stats: WalkStats,
}

impl WalkthroughApp {
    fn new(config: SceneConfig) -> Self {
        let camera = Camera::perspective(Vec3::zeros(), 70.0, 16.0 / 9.0, 0.1, 60.0);
        Self {
            scene: Scene::new(config),
            camera,
            bat: None,
            door_closed: false,
            stats: WalkStats::default(),
        }
    }

    fn initialize(&mut self, areas_path: Option<&str>) -> Result<(), WalkthroughError> {
        match areas_path {
            Some(path) => {
                log::info!("Loading areas from {}", path);
                self.scene.load_areas_from_file(path)?;
            }
            None => self.scene.load_areas(&ring_areas())?,
        }

        for (room, &(x, z)) in WAYPOINTS.iter().enumerate() {
            // Pillars in the corners, away from the walking line
            for (dx, dz) in [(-3.5, -3.5), (3.5, 3.5)] {
                let pillar = self.scene.create_node(
                    format!("pillar {room}"),
                    Transform::from_position(Vec3::new(x + dx, 1.5, z + dz)),
                );
                self.scene
                    .add_renderable(pillar, AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.4, 1.5, 0.4)))?;
                self.scene.add_root_node(pillar)?;
            }

            let table = self
                .scene
                .create_node(format!("table {room}"), Transform::from_position(Vec3::new(x + 2.0, 0.4, z - 2.0)));
            self.scene
                .add_renderable(table, AABB::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 0.4, 0.6)))?;
            // Lamp on the table
            let lamp = self.scene.create_node(format!("lamp {room}"), Transform::from_position(Vec3::new(0.0, 0.6, 0.0)));
            self.scene
                .add_renderable(lamp, AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.1, 0.2, 0.1)))?;
            self.scene.add_light(lamp, LightKind::Point { radius: 3.0 }, Vec3::zeros())?;
            self.scene.add_child(table, lamp)?;
            self.scene.add_root_node(table)?;
        }

        let spot = self
            .scene
            .create_node("spot", Transform::from_position(Vec3::new(-8.0, 2.8, 8.0)));
        self.scene.add_light(
            spot,
            LightKind::Spot { direction: Vec3::new(0.3, -1.0, -0.3), range: 4.0, half_angle: 25.0 },
            Vec3::zeros(),
        )?;
        self.scene.add_root_node(spot)?;

        let sky = self.scene.create_node("sky", Transform::identity());
        self.scene.add_light(sky, LightKind::Directional { direction: Vec3::new(-0.2, -1.0, 0.1) }, Vec3::zeros())?;
        self.scene.add_light(sky, LightKind::Ambient, Vec3::zeros())?;
        self.scene.add_root_node(sky)?;

        let bat = self.scene.create_node("bat", Transform::from_position(Vec3::new(5.0, 2.5, 5.0)));
        self.scene.set_dynamic(bat, true)?;
        self.scene
            .add_renderable(bat, AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.25)))?;
        self.scene.add_root_node(bat)?;
        self.bat = Some(bat);

        self.scene.update();
        log::info!(
            "Walkthrough scene ready: {} nodes, {} global lights",
            self.scene.graph().node_count(),
            self.scene.global_lights().len()
        );
        Ok(())
    }

    /// Camera position and walking direction on the loop
    fn camera_pose(frame: usize) -> (Vec3, Vec3) {
        let leg = (frame / FRAMES_PER_LEG) % WAYPOINTS.len();
        let t = (frame % FRAMES_PER_LEG) as f32 / FRAMES_PER_LEG as f32;
        let (x0, z0) = WAYPOINTS[leg];
        let (x1, z1) = WAYPOINTS[(leg + 1) % WAYPOINTS.len()];

        let from = Vec3::new(x0, EYE_HEIGHT, z0);
        let to = Vec3::new(x1, EYE_HEIGHT, z1);
        (from + (to - from) * t, to - from)
    }

    fn update(&mut self, frame: usize) -> Result<(), WalkthroughError> {
        if frame > 0 && frame % DOOR_TOGGLE_FRAMES == 0 {
            self.door_closed = !self.door_closed;
            for (area, portal) in EAST_DOOR {
                // Custom area files may not have this door
                if let Err(e) = self.scene.set_portal_disabled(area, portal, self.door_closed) {
                    log::warn!("Cannot toggle east door: {}", e);
                }
            }
            log::info!("Frame {}: east door {}", frame, if self.door_closed { "closed" } else { "opened" });
        }

        if let Some(bat) = self.bat {
            let angle = frame as f32 * 0.05;
            let position = Vec3::new(5.0 + 3.0 * angle.cos(), 2.5, 5.0 + 3.0 * angle.sin());
            self.scene.set_local_transform(bat, Transform::from_position(position))?;
        }

        self.scene.update();
        Ok(())
    }

    fn render(&mut self, frame: usize) {
        let (position, direction) = Self::camera_pose(frame);
        self.camera.place(position, direction);
        self.scene.update_visible_nodes(&self.camera);

        let visible = self.scene.visible_renderables().len();
        self.stats.frames += 1;
        self.stats.renderables += visible;
        self.stats.max_renderables = self.stats.max_renderables.max(visible);
        if self.scene.camera_area_index().is_none() {
            self.stats.frames_outside_areas += 1;
        }

        log::debug!(
            "Frame {}: area {:?}, {} portals, {} nodes, {} renderables, {} lights",
            frame,
            self.scene.camera_area_index(),
            self.scene.visible_portal_count(),
            self.scene.visible_nodes().len(),
            visible,
            self.scene.visible_lights().len()
        );

        if frame % FRAMES_PER_LEG == FRAMES_PER_LEG / 2 {
            let nearby = AABB::from_center_extents(position, Vec3::repeat(3.0));
            let nodes = self.scene.find_overlapping_nodes(position, &nearby);
            log::info!("Frame {}: {} nodes within 3 units of the camera", frame, nodes.len());
        }
    }

    fn run(&mut self) -> Result<(), WalkthroughError> {
        log::info!("Starting walkthrough: {} frames", FRAMES);

        for frame in 0..FRAMES {
            self.update(frame)?;
            self.render(frame);
        }

        let average = self.stats.renderables as f32 / self.stats.frames.max(1) as f32;
        log::info!(
            "Walkthrough finished: {} frames, {:.1} renderables per frame (max {}), {} frames outside areas",
            self.stats.frames,
            average,
            self.stats.max_renderables,
            self.stats.frames_outside_areas
        );
        Ok(())
    }
}

fn main() -> Result<(), WalkthroughError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SceneConfig::load_from_file(&path)?,
        None => SceneConfig::default(),
    };

    logging::init_with_level(&config.log_level);
    config.validate()?;

    let areas_path = args.next();
    let mut app = WalkthroughApp::new(config);
    app.initialize(areas_path.as_deref())?;
    app.run()
}
