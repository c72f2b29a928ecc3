//! Geometry, routing and layered layout of flow graphs.

pub mod curve;
pub mod engine;
pub mod geometry;
pub mod graph;
pub mod pathfinder;
pub mod routing;
pub mod sizing;
pub mod sugiyama;

pub use curve::catmull_rom_to_bezier_path;
pub use engine::{LayoutCache, LayoutEngine, LayoutResult, Viewport};
pub use geometry::{Point, Rect};
pub use graph::FlowGraphIR;
pub use routing::{
    CleanupOptions, Route, RouteRequest, cleanup_orthogonal_polyline, merge_fan_in,
    route_orthogonal_avoiding, route_orthogonal_visio_like,
};
pub use sugiyama::SugiyamaLayout;
