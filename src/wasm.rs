//! WASM bindings for pyflow.
//!
//! Graphs cross the boundary as JSON strings (`{nodes, edges}`, camelCase).
//! Layout goes through a `FlowLayout` object that owns its cache, so each
//! JS caller decides the cache lifetime.

use std::sync::Arc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::layout::{LayoutCache, LayoutEngine, Viewport};
use crate::renderers::{SvgOptions, render_svg};
use crate::{FlowGraph, RuleSet, code_to_flow, flow_to_checked_python, validate_python_strict};

#[derive(Serialize)]
struct CheckResult<'a> {
    ok: bool,
    errors: &'a [String],
    warnings: &'a [String],
}

fn to_json(value: &impl Serialize) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&e.to_string()))
}

fn parse_graph(json: &str) -> Result<FlowGraph, JsError> {
    serde_json::from_str(json).map_err(|e| JsError::new(&e.to_string()))
}

fn parse_rules(json: &str) -> Result<RuleSet, JsError> {
    if json.trim().is_empty() {
        return Ok(RuleSet::default());
    }
    RuleSet::from_json(json).map_err(|e| JsError::new(&e.to_string()))
}

/// Validate source; returns `{ok, errors, warnings}` JSON.
#[wasm_bindgen]
pub fn validate(code: &str) -> Result<String, JsError> {
    match validate_python_strict(code) {
        Ok(v) => to_json(&CheckResult {
            ok: true,
            errors: &[],
            warnings: &v.warnings,
        }),
        Err(f) => to_json(&CheckResult {
            ok: false,
            errors: &f.errors,
            warnings: &f.warnings,
        }),
    }
}

/// Convert source to a flow graph JSON (positions not yet assigned).
#[wasm_bindgen(js_name = "codeToFlow")]
pub fn code_to_flow_json(code: &str) -> Result<String, JsError> {
    let graph = code_to_flow(code).map_err(|f| JsError::new(&f.to_string()))?;
    to_json(&graph)
}

/// Regenerate Python from a flow graph JSON. `rules` may be empty.
#[wasm_bindgen(js_name = "flowToPython")]
pub fn flow_to_python_json(graph: &str, rules: &str) -> Result<String, JsError> {
    let graph = parse_graph(graph)?;
    let rules = parse_rules(rules)?;
    flow_to_checked_python(&graph, &rules).map_err(|e| JsError::new(&e))
}

#[wasm_bindgen]
pub struct FlowLayout {
    engine: LayoutEngine,
}

#[wasm_bindgen]
impl FlowLayout {
    #[wasm_bindgen(constructor)]
    pub fn new(capacity: usize, rules: &str) -> Result<FlowLayout, JsError> {
        let rules = parse_rules(rules)?;
        let engine = LayoutEngine::new(Arc::new(LayoutCache::new(capacity))).with_rules(rules.tidy);
        Ok(FlowLayout { engine })
    }

    /// Lay out a flow graph JSON; returns the positioned graph JSON.
    pub fn layout(&self, graph: &str, width: i64, height: i64) -> Result<String, JsError> {
        let graph = parse_graph(graph)?;
        let result = self.engine.layout(&graph, Viewport { width, height });
        to_json(&result.graph)
    }

    /// Lay out and render source straight to SVG.
    #[wasm_bindgen(js_name = "renderSvg")]
    pub fn render_svg(&self, code: &str, width: i64, height: i64, curved: bool) -> Result<String, JsError> {
        let graph = code_to_flow(code).map_err(|f| JsError::new(&f.to_string()))?;
        let result = self.engine.layout(&graph, Viewport { width, height });
        Ok(render_svg(&result.graph, SvgOptions { curved }))
    }

    #[wasm_bindgen(js_name = "clearCache")]
    pub fn clear_cache(&self) {
        self.engine.cache().clear();
    }
}
