use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

/// Backend that echoes its input and counts calls.
struct Echo {
    calls: Arc<AtomicUsize>,
}

impl RenderBackend for Echo {
    fn render(
        &self,
        source: &str,
        format: RenderFormat,
        engine: &str,
    ) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}:{engine}:{source}", format.as_str()))
    }
}

struct Counters {
    inits: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

fn echo_cache(capacity: usize) -> (RenderCache<Echo>, Counters) {
    let inits = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let (i, c) = (inits.clone(), calls.clone());
    let cache = RenderCache::new(capacity, move || {
        i.fetch_add(1, Ordering::SeqCst);
        Ok(Echo { calls: c.clone() })
    });
    (cache, Counters { inits, calls })
}

// ── Formats ──────────────────────────────────────────────────────────────

#[test]
fn test_format_names() {
    assert_eq!(RenderFormat::Svg.as_str(), "svg");
    assert_eq!(RenderFormat::Plain.as_str(), "plain");
}

// ── Lazy backend ─────────────────────────────────────────────────────────

#[test]
fn test_backend_not_created_until_first_render() {
    let (cache, counters) = echo_cache(4);
    assert!(!cache.is_initialized());
    assert_eq!(counters.inits.load(Ordering::SeqCst), 0);
    cache.render("digraph {}", RenderFormat::Svg, "dot").unwrap();
    assert!(cache.is_initialized());
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backend_created_once() {
    let (cache, counters) = echo_cache(4);
    for src in ["a", "b", "c"] {
        cache.render(src, RenderFormat::Svg, "dot").unwrap();
    }
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_failed_init_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let cache: RenderCache<Echo> = RenderCache::new(4, move || {
        let n = a.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Err(RenderError::Unavailable("not installed".to_string()))
        } else {
            Ok(Echo {
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    });
    let err = cache.render("x", RenderFormat::Svg, "dot").unwrap_err();
    assert!(matches!(err, RenderError::Unavailable(_)));
    assert!(!cache.is_initialized());
    assert_eq!(cache.render("x", RenderFormat::Svg, "dot").unwrap(), "svg:dot:x");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_first_use_initialises_once() {
    let (cache, counters) = echo_cache(16);
    let cache = Arc::new(cache);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                cache
                    .render(&format!("g{i}"), RenderFormat::Svg, "dot")
                    .unwrap()
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 8);
}

// ── Result cache ─────────────────────────────────────────────────────────

#[test]
fn test_repeated_render_is_memoised() {
    let (cache, counters) = echo_cache(4);
    let first = cache.render("digraph {}", RenderFormat::Svg, "dot").unwrap();
    let second = cache.render("digraph {}", RenderFormat::Svg, "dot").unwrap();
    assert_eq!(first, second);
    assert_eq!(counters.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_key_includes_format_and_engine() {
    let (cache, counters) = echo_cache(8);
    cache.render("g", RenderFormat::Svg, "dot").unwrap();
    cache.render("g", RenderFormat::Plain, "dot").unwrap();
    assert_eq!(cache.render("g", RenderFormat::Svg, "neato").unwrap(), "svg:neato:g");
    assert_eq!(counters.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_results_evicted_past_capacity() {
    let (cache, counters) = echo_cache(1);
    cache.render("a", RenderFormat::Svg, "dot").unwrap();
    cache.render("b", RenderFormat::Svg, "dot").unwrap();
    cache.render("a", RenderFormat::Svg, "dot").unwrap();
    assert_eq!(counters.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear_keeps_backend() {
    let (cache, counters) = echo_cache(4);
    cache.render("a", RenderFormat::Svg, "dot").unwrap();
    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.is_initialized());
    cache.render("a", RenderFormat::Svg, "dot").unwrap();
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unknown_engine_rejected_before_init() {
    let (cache, counters) = echo_cache(4);
    let err = cache.render("g", RenderFormat::Svg, "magic").unwrap_err();
    assert!(matches!(err, RenderError::UnknownEngine(ref e) if e == "magic"));
    assert_eq!(counters.inits.load(Ordering::SeqCst), 0);
}

// ── CLI backend ──────────────────────────────────────────────────────────

#[test]
fn test_missing_program_reports_io_error() {
    let cli = GraphvizCli::with_program("/nonexistent/pyflow-test-dot");
    let err = cli.render("digraph {}", RenderFormat::Svg, "dot").unwrap_err();
    assert!(matches!(err, RenderError::Io(_)));
}

#[cfg(unix)]
#[test]
fn test_program_exiting_before_reading_input_is_an_io_error() {
    // `true` never reads stdin, so a source larger than the pipe buffer
    // fails mid-write.
    let cli = GraphvizCli::with_program("true");
    let source = "x".repeat(1 << 20);
    let err = cli.render(&source, RenderFormat::Svg, "dot").unwrap_err();
    assert!(matches!(err, RenderError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
}

#[test]
fn test_error_messages() {
    assert_eq!(
        RenderError::UnknownEngine("x".to_string()).to_string(),
        "unknown layout engine `x`"
    );
    assert_eq!(
        RenderError::Failed {
            status: 1,
            stderr: "syntax error".to_string()
        }
        .to_string(),
        "graphviz exited with 1: syntax error"
    );
}
