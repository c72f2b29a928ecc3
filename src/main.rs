//! pyflow CLI entry point.

use std::fs;
use std::io::{self, Read, Write};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pyflow::renderers::graphviz::{DEFAULT_ENGINE, DEFAULT_RENDER_CACHE_CAPACITY};
use pyflow::renderers::{RenderCache, RenderFormat, SvgOptions, render_svg, to_dot};
use pyflow::{
    BeautifyReport, FlowGraph, LayoutCache, LayoutEngine, RuleSet, Viewport, beautify_report,
    code_to_flow, validate_python_strict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Validate only
    Check,
    /// Laid-out flow graph as JSON
    Json,
    /// Regenerated Python
    Python,
    /// Graphviz DOT source
    Dot,
    /// Built-in SVG renderer
    Svg,
    /// SVG rendered by Graphviz
    GraphvizSvg,
    /// Graphviz plain-text layout
    GraphvizPlain,
}

/// Python subset to flowchart: validate, lay out and render.
#[derive(Parser, Debug)]
#[command(name = "pyflow", version = env!("PYFLOW_VERSION"), about)]
struct Cli {
    /// Input file: Python source or flow graph JSON (reads stdin if omitted)
    input: Option<String>,

    #[arg(short = 'f', long = "format", value_enum, default_value = "svg")]
    format: Format,

    /// Viewport width used when packing components
    #[arg(long = "width", default_value_t = 1200)]
    width: i64,

    /// Viewport height
    #[arg(long = "height", default_value_t = 800)]
    height: i64,

    /// Rule-set JSON file (tidy toggles, beautify thresholds)
    #[arg(long = "rules")]
    rules: Option<String>,

    /// Draw SVG edges as curves
    #[arg(long = "curved")]
    curved: bool,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    #[serde(flatten)]
    graph: &'a FlowGraph,
    degraded_edges: &'a [String],
    report: &'a BeautifyReport,
}

fn read_input(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}")),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

/// Flow graph JSON is recognised by its leading brace; anything else is
/// treated as Python source.
fn load_graph(text: &str) -> Result<FlowGraph, String> {
    if text.trim_start().starts_with('{') {
        return serde_json::from_str(text).map_err(|e| format!("invalid flow graph JSON: {e}"));
    }
    code_to_flow(text).map_err(|f| f.errors.join("\n"))
}

fn run(cli: &Cli) -> Result<String, String> {
    let text = read_input(cli.input.as_deref())?;
    let rules = match &cli.rules {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;
            RuleSet::from_json(&raw).map_err(|e| e.to_string())?
        }
        None => RuleSet::default(),
    };

    if cli.format == Format::Check {
        return match validate_python_strict(&text) {
            Ok(v) => {
                for w in &v.warnings {
                    eprintln!("warning: {w}");
                }
                Ok("ok\n".to_string())
            }
            Err(f) => {
                for w in &f.warnings {
                    eprintln!("hint: {w}");
                }
                Err(f.errors.join("\n"))
            }
        };
    }

    let graph = load_graph(&text)?;
    match cli.format {
        Format::Python => return pyflow::flow_to_checked_python(&graph, &rules),
        Format::Dot => return Ok(to_dot(&graph)),
        Format::GraphvizSvg | Format::GraphvizPlain => {
            let format = if cli.format == Format::GraphvizSvg {
                RenderFormat::Svg
            } else {
                RenderFormat::Plain
            };
            let cache = RenderCache::graphviz(DEFAULT_RENDER_CACHE_CAPACITY);
            return cache
                .render(&to_dot(&graph), format, DEFAULT_ENGINE)
                .map_err(|e| e.to_string());
        }
        Format::Check | Format::Json | Format::Svg => {}
    }

    let engine = LayoutEngine::new(Arc::new(LayoutCache::default())).with_rules(rules.tidy);
    let viewport = Viewport {
        width: cli.width,
        height: cli.height,
    };
    let result = engine.layout(&graph, viewport);
    for id in &result.degraded_edges {
        eprintln!("warning: edge {id} could not avoid every node");
    }
    let report = beautify_report(&result.graph, &rules.beautify);
    for v in &report.violations {
        eprintln!("warning: {v}");
    }

    if cli.format == Format::Json {
        let out = JsonOutput {
            graph: &result.graph,
            degraded_edges: &result.degraded_edges,
            report: &report,
        };
        let mut json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        json.push('\n');
        return Ok(json);
    }
    let mut svg = render_svg(&result.graph, SvgOptions { curved: cli.curved });
    svg.push('\n');
    Ok(svg)
}

fn main() {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
    }
    let cli = Cli::parse();

    let rendered = match run(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if let Some(ref path) = cli.output {
        if let Err(e) = fs::write(path, rendered) {
            eprintln!("error: cannot write '{path}': {e}");
            process::exit(1);
        }
    } else {
        print!("{rendered}");
        if let Err(e) = io::stdout().flush() {
            eprintln!("error: cannot flush stdout: {e}");
            process::exit(1);
        }
    }
}
