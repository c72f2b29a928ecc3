//! Graphviz render pathway with a memoising result cache.
//!
//! The backend is created lazily on first use, at most once; concurrent
//! first callers block on the same initialisation. Rendered output is kept
//! in an LRU keyed by `(format, engine, source)`.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::cache::LruCache;

pub const DEFAULT_RENDER_CACHE_CAPACITY: usize = 32;
pub const DEFAULT_ENGINE: &str = "dot";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphviz unavailable: {0}")]
    Unavailable(String),
    #[error("failed to run graphviz: {0}")]
    Io(#[from] std::io::Error),
    #[error("graphviz exited with {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("graphviz produced non-UTF-8 output")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unknown layout engine `{0}`")]
    UnknownEngine(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderFormat {
    Svg,
    Plain,
}

impl RenderFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderFormat::Svg => "svg",
            RenderFormat::Plain => "plain",
        }
    }
}

const ENGINES: [&str; 7] = ["dot", "neato", "fdp", "sfdp", "circo", "twopi", "osage"];

pub trait RenderBackend: Send + Sync {
    fn render(&self, source: &str, format: RenderFormat, engine: &str)
    -> Result<String, RenderError>;
}

// ─── Graphviz CLI ─────────────────────────────────────────────────────────────

/// Runs the `dot` executable.
#[derive(Debug, Clone)]
pub struct GraphvizCli {
    program: PathBuf,
}

impl GraphvizCli {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate `dot` on `PATH` by asking for its version.
    pub fn detect() -> Result<Self, RenderError> {
        let cli = Self::with_program("dot");
        let probe = Command::new(&cli.program)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        if !probe.status.success() {
            return Err(RenderError::Unavailable(
                String::from_utf8_lossy(&probe.stderr).trim().to_string(),
            ));
        }
        debug!(version = %String::from_utf8_lossy(&probe.stderr).trim(), "graphviz detected");
        Ok(cli)
    }
}

impl RenderBackend for GraphvizCli {
    fn render(
        &self,
        source: &str,
        format: RenderFormat,
        engine: &str,
    ) -> Result<String, RenderError> {
        let mut child = Command::new(&self.program)
            .arg(format!("-K{engine}"))
            .arg(format!("-T{}", format.as_str()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

type BackendInit<B> = Box<dyn Fn() -> Result<B, RenderError> + Send + Sync>;
type RenderKey = (RenderFormat, String, String);

pub struct RenderCache<B> {
    init: BackendInit<B>,
    backend: OnceCell<B>,
    results: Mutex<LruCache<RenderKey, String>>,
}

impl<B: RenderBackend> RenderCache<B> {
    pub fn new(
        capacity: usize,
        init: impl Fn() -> Result<B, RenderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            init: Box::new(init),
            backend: OnceCell::new(),
            results: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.get().is_some()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Drop cached results; the backend stays initialised.
    pub fn clear(&self) {
        self.results.lock().clear();
    }

    pub fn render(
        &self,
        source: &str,
        format: RenderFormat,
        engine: &str,
    ) -> Result<String, RenderError> {
        if !ENGINES.contains(&engine) {
            return Err(RenderError::UnknownEngine(engine.to_string()));
        }
        let key = (format, engine.to_string(), source.to_string());
        if let Some(hit) = self.results.lock().get(&key) {
            debug!(format = format.as_str(), engine, "render cache hit");
            return Ok(hit);
        }
        let backend = self.backend.get_or_try_init(|| (self.init)())?;
        debug!(format = format.as_str(), engine, "render cache miss");
        let rendered = backend.render(source, format, engine)?;
        self.results.lock().insert(key, rendered.clone());
        Ok(rendered)
    }
}

impl RenderCache<GraphvizCli> {
    pub fn graphviz(capacity: usize) -> Self {
        Self::new(capacity, GraphvizCli::detect)
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_renderers_graphviz.rs"]
mod tests;
