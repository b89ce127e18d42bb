//! # Scene Visibility
//!
//! Visibility and spatial-query engine for 3D scenes.
//!
//! ## Features
//!
//! - **Spatial Maps**: Static (rebuilt on finalize) and dynamic AABB trees
//! - **Scene Graph**: Node hierarchy with per-root dirty tracking
//! - **Areas & Portals**: BSP-indexed convex areas with portal culling
//! - **Visibility**: Per-frame visible node, renderable and light lists
//! - **Region Queries**: Box overlap queries routed through areas
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_visibility::prelude::*;
//!
//! let mut scene = Scene::new(SceneConfig::default());
//! let crate_node = scene.create_node("crate", Transform::from_position(Vec3::new(0.0, 0.0, -10.0)));
//! scene
//!     .add_renderable(crate_node, AABB::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)))
//!     .unwrap();
//! scene.add_root_node(crate_node).unwrap();
//! scene.update();
//!
//! let mut camera = Camera::perspective(Vec3::zeros(), 60.0, 16.0 / 9.0, 0.1, 100.0);
//! camera.place(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
//! scene.update_visible_nodes(&camera);
//! assert_eq!(scene.visible_renderables().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod core;
pub mod foundation;
pub mod config;

// Geometry and spatial indexing
pub mod geometry;
pub mod camera;
pub mod spatial;

// Scene, areas and queries
pub mod scene;
pub mod areas;
pub mod visibility;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        areas::{AreaData, AreaLoadError, AreasData, BspNodeData, PortalData},
        camera::{Camera, ViewCamera},
        core::{Config, ConfigError, SceneConfig},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        geometry::{Plane, AABB},
        scene::{LightKey, LightKind, NodeKey, RenderableKey, Scene, SceneError},
        spatial::{AabbTree, SpatialMap},
    };
}
