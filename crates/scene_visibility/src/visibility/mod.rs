//! Per-frame visibility and on-demand region queries
//!
//! Both resolvers work on a borrowed view of the scene's parts, so the
//! `Scene` can hand out its graph, maps and areas at once while keeping
//! the resolvers' scratch buffers separate.

mod buffers;
mod region;
mod resolver;

pub use buffers::VisibleSet;
pub use region::RegionQuery;
pub use resolver::VisibilityResolver;

use crate::areas::AreaSystem;
use crate::core::SceneConfig;
use crate::scene::{QueryCounter, SceneGraph};
use crate::spatial::SpatialMap;

/// Mutable view of everything a query reads or stamps
pub(crate) struct SceneAccess<'a> {
    pub graph: &'a mut SceneGraph,
    pub static_map: &'a dyn SpatialMap,
    pub dynamic_map: &'a dyn SpatialMap,
    pub areas: Option<&'a mut AreaSystem>,
    pub counter: &'a mut QueryCounter,
    pub config: &'a SceneConfig,
}
