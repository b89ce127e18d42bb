//! Scene graph and the visibility-aware scene built on it
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (nodes, renderables, lights)
//!      ↓ update(): flush dirty roots
//! Static / dynamic SpatialMap      AreaSystem (optional)
//!      ↓                                ↓
//! VisibilityResolver / RegionQuery
//! ```
//!
//! The `Scene`:
//! - Registers nodes in the static or dynamic spatial map by their flag
//! - Reassigns static nodes to areas whenever the static set changes
//! - Produces the per-frame visible node, renderable and light lists
//! - Answers region overlap queries

mod node;
mod scene_graph;
mod scene_manager;

#[cfg(test)]
mod tests;

pub use node::{
    LightInstance, LightKey, LightKind, MapMembership, Node, NodeFlags, NodeKey, QueryCounter,
    Renderable, RenderableKey,
};
pub use scene_graph::{SceneError, SceneGraph};
pub use scene_manager::Scene;
