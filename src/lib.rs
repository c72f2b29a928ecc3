//! pyflow: Python-subset to flowchart synthesis with layered layout and
//! orthogonal edge routing.
//!
//! Public API: `validate_python_strict()`, `code_to_flow()`,
//! `flow_to_python()`, `LayoutEngine::layout()`.
//!
//! Pipeline: source → block IR (`parsers`) → strict checks (`validate`) →
//! flow graph (`flow`) → positions and routes (`layout`) → SVG/DOT
//! (`renderers`). Flow graphs convert back to source with `flow_to_python`.

pub mod cache;
pub mod config;
pub mod flow;
pub mod layout;
pub mod parsers;
pub mod renderers;
pub mod syntax;
pub mod validate;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{BeautifyReport, RuleSet, beautify_report};
pub use flow::{CodegenError, FlowEdge, FlowGraph, FlowNode, Shape, flow_to_python};
pub use layout::{LayoutCache, LayoutEngine, LayoutResult, Viewport};
pub use validate::{Validated, ValidationFailure, validate_python_strict};

/// Validate `code` and convert it to a unified flow graph (main first,
/// then one namespaced component per function).
pub fn code_to_flow(code: &str) -> Result<FlowGraph, ValidationFailure> {
    let validated = validate_python_strict(code)?;
    Ok(flow::convert_program(&validated.ir))
}

/// Regenerate source from `graph` and re-run the strict validator on it, so
/// only code that parses back is returned.
pub fn flow_to_checked_python(graph: &FlowGraph, rules: &RuleSet) -> Result<String, String> {
    let code = flow_to_python(graph, rules.tidy.rewrite_counting_loops).map_err(|e| e.to_string())?;
    validate_python_strict(&code).map_err(|f| f.to_string())?;
    Ok(code)
}
