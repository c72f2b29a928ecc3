pub mod dot;
pub mod graphviz;
pub mod svg;

pub use dot::to_dot;
pub use graphviz::{GraphvizCli, RenderBackend, RenderCache, RenderError, RenderFormat};
pub use svg::{SvgOptions, render_svg};
