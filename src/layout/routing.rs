//! Orthogonal edge routing.
//!
//! Every edge leaves its source port and enters its target port through a
//! short perpendicular stub; only the part between the two stub ends is
//! searched. Strategies are tried cheapest first:
//!
//! 1. a direct one-bend route,
//! 2. a corridor route (one intermediate vertical or horizontal run found by
//!    stepping outward in grid steps),
//! 3. sparse-grid A* (see `pathfinder`).
//!
//! When all three fail the route falls back to a direct route that ignores
//! obstacles and is flagged `degraded`.

use tracing::warn;

use crate::flow::types::Port;

use super::geometry::{
    CLEARANCE, Dir, GRID, MIN_SEGMENT, Point, Rect, bend_count, first_leg_direction,
    horizontal_overlap, is_orthogonal, path_clear, path_length, segment_clear, simplify_path, snap,
    tiny_segment_count,
};
use super::pathfinder::{SearchRequest, a_star};
use super::sizing::port_normal;

/// Length of the perpendicular stub at both ends of a route.
pub const STUB: i64 = 20;
const MAX_CORRIDOR_STEPS: i64 = 80;
const MAX_CLEANUP_PASSES: usize = 8;

/// Extra shared trunk (px) a merged route must gain to win outright.
pub const MERGE_MIN_SHARED_GAIN: i64 = 20;
/// Allowed length growth of a merged route, in percent.
pub const MERGE_MAX_LENGTH_GROWTH_PCT: i64 = 15;

// ─── Requests and results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequest {
    pub from: Point,
    pub from_port: Port,
    pub to: Point,
    pub to_port: Port,
    /// Preferred x for an intermediate vertical run.
    pub corridor_x: Option<i64>,
}

impl RouteRequest {
    pub fn new(from: Point, from_port: Port, to: Point, to_port: Port) -> Self {
        Self {
            from,
            from_port,
            to,
            to_port,
            corridor_x: None,
        }
    }

    fn start_stub(&self) -> Point {
        stub_point(self.from, self.from_port)
    }

    fn end_stub(&self) -> Point {
        stub_point(self.to, self.to_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub points: Vec<Point>,
    /// Best-effort fallback: may cross obstacles.
    pub degraded: bool,
}

/// Tidy toggles applied to every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    pub snap_to_grid: bool,
    pub fix_tiny_segments: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            fix_tiny_segments: true,
        }
    }
}

pub fn port_dir(port: Port) -> Dir {
    match port {
        Port::Top => Dir::Up,
        Port::Bottom => Dir::Down,
        Port::Left => Dir::Left,
        Port::Right => Dir::Right,
    }
}

pub fn stub_point(p: Point, port: Port) -> Point {
    let (dx, dy) = port_normal(port);
    Point::new(p.x + dx * STUB, p.y + dy * STUB)
}

/// Obstacles that matter between two stub ends: rectangles whose clearance
/// zone already contains an endpoint are skipped.
fn relevant_obstacles(obstacles: &[Rect], a: Point, b: Point) -> Vec<Rect> {
    obstacles
        .iter()
        .filter(|r| {
            let zone = r.inflate(CLEARANCE);
            !zone.contains(a) && !zone.contains(b)
        })
        .copied()
        .collect()
}

/// Clearance check that ignores the first and last (stub) segments.
pub fn inner_clear(path: &[Point], obstacles: &[Rect]) -> bool {
    if path.len() < 3 {
        return true;
    }
    path_clear(&path[1..path.len() - 1], obstacles, CLEARANCE)
}

fn with_stubs(req: &RouteRequest, middle: &[Point]) -> Vec<Point> {
    let mut full = Vec::with_capacity(middle.len() + 2);
    full.push(req.from);
    full.extend_from_slice(middle);
    full.push(req.to);
    simplify_path(&full)
}

// ─── Strategies ───────────────────────────────────────────────────────────────

fn direct_route(a: Point, b: Point, obstacles: &[Rect]) -> Option<Vec<Point>> {
    if a.x == b.x || a.y == b.y {
        return segment_clear(a, b, obstacles, CLEARANCE).then(|| vec![a, b]);
    }
    let horizontal_first = vec![a, Point::new(b.x, a.y), b];
    let vertical_first = vec![a, Point::new(a.x, b.y), b];
    let ordered = if (b.x - a.x).abs() >= (b.y - a.y).abs() {
        [horizontal_first, vertical_first]
    } else {
        [vertical_first, horizontal_first]
    };
    ordered
        .into_iter()
        .find(|p| path_clear(p, obstacles, CLEARANCE))
}

fn prefers_right(req: &RouteRequest, a: Point, b: Point) -> bool {
    match (req.from_port, req.to_port) {
        (Port::Left, _) | (_, Port::Left) => false,
        (Port::Right, _) | (_, Port::Right) => true,
        _ => b.x >= a.x,
    }
}

fn vertical_corridor(
    req: &RouteRequest,
    a: Point,
    b: Point,
    obstacles: &[Rect],
) -> Option<Vec<Point>> {
    let right = prefers_right(req, a, b);
    let (near, far) = if right {
        (a.x.max(b.x), a.x.min(b.x))
    } else {
        (a.x.min(b.x), a.x.max(b.x))
    };
    let sign = if right { 1 } else { -1 };
    let preferred_start = req.corridor_x.unwrap_or(snap(near));
    let sides = [
        (preferred_start, sign),
        (snap(far), -sign),
    ];
    for (start, step) in sides {
        for k in 0..MAX_CORRIDOR_STEPS {
            let cx = start + step * k * GRID;
            let path = vec![a, Point::new(cx, a.y), Point::new(cx, b.y), b];
            if path_clear(&path, obstacles, CLEARANCE) {
                return Some(simplify_path(&path));
            }
        }
    }
    None
}

fn horizontal_corridor(a: Point, b: Point, obstacles: &[Rect]) -> Option<Vec<Point>> {
    let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
    // Between the stubs first, nearest the source, then outside the span.
    let between = (0..)
        .map(|k| snap(lo) + k * GRID)
        .filter(|&y| y >= lo)
        .take_while(|&y| y <= hi);
    let below = (1..MAX_CORRIDOR_STEPS).map(|k| snap(hi) + k * GRID);
    let above = (1..MAX_CORRIDOR_STEPS).map(|k| snap(lo) - k * GRID);
    let ordered: Vec<i64> = if a.y <= b.y {
        between.chain(below).chain(above).collect()
    } else {
        let mut ys: Vec<i64> = between.collect();
        ys.reverse();
        ys.into_iter().chain(above).chain(below).collect()
    };
    ordered.into_iter().find_map(|cy| {
        let path = vec![a, Point::new(a.x, cy), Point::new(b.x, cy), b];
        path_clear(&path, obstacles, CLEARANCE).then(|| simplify_path(&path))
    })
}

fn corridor_route(
    req: &RouteRequest,
    a: Point,
    b: Point,
    obstacles: &[Rect],
) -> Option<Vec<Point>> {
    let vertical_run_first = matches!(req.from_port, Port::Left | Port::Right)
        && matches!(req.to_port, Port::Left | Port::Right);
    if vertical_run_first {
        vertical_corridor(req, a, b, obstacles).or_else(|| horizontal_corridor(a, b, obstacles))
    } else {
        horizontal_corridor(a, b, obstacles).or_else(|| vertical_corridor(req, a, b, obstacles))
    }
}

fn astar_route(req: &RouteRequest, a: Point, b: Point, obstacles: &[Rect]) -> Option<Vec<Point>> {
    a_star(&SearchRequest {
        start: a,
        goal: b,
        start_dir: Some(port_dir(req.from_port)),
        goal_dir: Some(port_dir(req.to_port).opposite()),
        obstacles,
        corridor_x: req.corridor_x,
    })
}

fn fallback_route(req: &RouteRequest, a: Point, b: Point) -> Route {
    warn!(from = ?req.from, to = ?req.to, "no clear route found, using degraded fallback");
    let middle = if a.x == b.x || a.y == b.y {
        vec![a, b]
    } else {
        vec![a, Point::new(a.x, b.y), b]
    };
    Route {
        points: with_stubs(req, &middle),
        degraded: true,
    }
}

fn finish(
    req: &RouteRequest,
    middle: Vec<Point>,
    obstacles: &[Rect],
    options: CleanupOptions,
) -> Route {
    let raw = with_stubs(req, &middle);
    let cleaned = cleanup_orthogonal_polyline(&raw, obstacles, options);
    Route {
        points: cleaned,
        degraded: false,
    }
}

/// Route one edge: direct, then corridor, then A*, then degraded fallback.
pub fn route_orthogonal_visio_like(
    req: &RouteRequest,
    obstacles: &[Rect],
    options: CleanupOptions,
) -> Route {
    let (a, b) = (req.start_stub(), req.end_stub());
    let obstacles = relevant_obstacles(obstacles, a, b);
    let found = direct_route(a, b, &obstacles)
        .or_else(|| corridor_route(req, a, b, &obstacles))
        .or_else(|| astar_route(req, a, b, &obstacles));
    match found {
        Some(middle) => finish(req, middle, &obstacles, options),
        None => fallback_route(req, a, b),
    }
}

/// Route one edge with A* only.
pub fn route_orthogonal_avoiding(
    req: &RouteRequest,
    obstacles: &[Rect],
    options: CleanupOptions,
) -> Route {
    let (a, b) = (req.start_stub(), req.end_stub());
    let obstacles = relevant_obstacles(obstacles, a, b);
    match astar_route(req, a, b, &obstacles) {
        Some(middle) => finish(req, middle, &obstacles, options),
        None => fallback_route(req, a, b),
    }
}

// ─── Cleanup ──────────────────────────────────────────────────────────────────

/// Snap interior coordinates to the grid. Values shared with an endpoint
/// stay fixed so the route still meets its ports; the mapping is applied per
/// coordinate value, which keeps every segment axis-aligned.
fn snap_interior(path: &[Point]) -> Vec<Point> {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return Vec::new();
    };
    let map_x = |x: i64| {
        if x == first.x || x == last.x { x } else { snap(x) }
    };
    let map_y = |y: i64| {
        if y == first.y || y == last.y { y } else { snap(y) }
    };
    path.iter()
        .map(|p| Point::new(map_x(p.x), map_y(p.y)))
        .collect()
}

/// Replace the tiny segment `path[i] → path[i+1]` by one of the two
/// single-bend detours, if either is clear and improves the tiny count.
fn fix_tiny_segment(path: &[Point], i: usize, obstacles: &[Rect]) -> Option<Vec<Point>> {
    let (p0, p1, p2, p3) = (path[i - 1], path[i], path[i + 1], path[i + 2]);
    let corners = if p1.y == p2.y {
        // Horizontal jog between two vertical runs.
        [Point::new(p1.x, p3.y), Point::new(p2.x, p0.y)]
    } else {
        [Point::new(p3.x, p1.y), Point::new(p0.x, p2.y)]
    };
    let current_tiny = tiny_segment_count(path, MIN_SEGMENT);

    corners
        .into_iter()
        .filter_map(|q| {
            let mut candidate = path[..i].to_vec();
            candidate.push(q);
            candidate.extend_from_slice(&path[i + 2..]);
            let candidate = simplify_path(&candidate);
            if !is_orthogonal(&candidate) || !inner_clear(&candidate, obstacles) {
                return None;
            }
            let tiny = tiny_segment_count(&candidate, MIN_SEGMENT);
            if tiny >= current_tiny {
                return None;
            }
            let shorter_leg = p0.manhattan(q).min(q.manhattan(p3));
            Some((tiny, -shorter_leg, candidate))
        })
        .min_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .map(|(_, _, c)| c)
}

/// Grid snap, collinear collapse and tiny-segment removal. The first and
/// last points never move; if the tidied path loses clearance the simplified
/// input is returned instead.
pub fn cleanup_orthogonal_polyline(
    path: &[Point],
    obstacles: &[Rect],
    options: CleanupOptions,
) -> Vec<Point> {
    let simplified = simplify_path(path);
    if simplified.len() < 3 {
        return simplified;
    }
    let mut out = if options.snap_to_grid {
        simplify_path(&snap_interior(&simplified))
    } else {
        simplified.clone()
    };

    if options.fix_tiny_segments {
        for _ in 0..MAX_CLEANUP_PASSES {
            let n = out.len();
            // Segment i spans out[i] → out[i+1]; stubs (first/last) are kept.
            let fixed = (1..n.saturating_sub(2))
                .filter(|&i| out[i].manhattan(out[i + 1]) < MIN_SEGMENT)
                .find_map(|i| fix_tiny_segment(&out, i, obstacles));
            match fixed {
                Some(next) => out = next,
                None => break,
            }
        }
    }

    if is_orthogonal(&out) && inner_clear(&out, obstacles) {
        out
    } else {
        simplified
    }
}

// ─── Fan-in trunk merging ─────────────────────────────────────────────────────

/// Route comparison figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteScore {
    pub tiny: usize,
    pub bends: usize,
    pub length: i64,
    pub shared: i64,
}

impl RouteScore {
    pub fn of(path: &[Point], shared: i64) -> Self {
        Self {
            tiny: tiny_segment_count(path, MIN_SEGMENT),
            bends: bend_count(path),
            length: path_length(path),
            shared,
        }
    }

    fn key(&self) -> (usize, usize, i64, i64) {
        (self.tiny, self.bends, self.length, -self.shared)
    }
}

/// Direction of the first leg past the port stub.
fn leg_after_stub(path: &[Point]) -> Option<Dir> {
    let mut travelled = 0;
    for (i, w) in path.windows(2).enumerate() {
        travelled += w[0].manhattan(w[1]);
        if travelled > STUB {
            return first_leg_direction(&path[i..]);
        }
    }
    None
}

/// True when `merged` should replace `independent`. A merged route that
/// doubles back once it leaves the stub never wins.
pub fn choose_by_priority(
    independent: &[Point],
    independent_shared: i64,
    merged: &[Point],
    merged_shared: i64,
) -> bool {
    if let (Some(a), Some(b)) = (leg_after_stub(independent), leg_after_stub(merged)) {
        if a.opposite() == b {
            return false;
        }
    }
    let cur = RouteScore::of(independent, independent_shared);
    let cand = RouteScore::of(merged, merged_shared);
    let within_length = cand.length * 100 <= cur.length * (100 + MERGE_MAX_LENGTH_GROWTH_PCT);
    if cand.shared - cur.shared >= MERGE_MIN_SHARED_GAIN
        && within_length
        && cand.bends <= cur.bends + 1
    {
        return true;
    }
    cand.key() < cur.key()
}

/// One edge entering the fan-in target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanInEdge {
    pub from: Point,
    pub from_port: Port,
    pub route: Route,
}

fn merged_path(edge: &FanInEdge, target: Point, trunk_y: i64) -> Vec<Point> {
    let a = stub_point(edge.from, edge.from_port);
    vec![
        edge.from,
        a,
        Point::new(a.x, trunk_y),
        Point::new(target.x, trunk_y),
        Point::new(target.x, target.y - STUB),
        target,
    ]
}

/// Search a shared horizontal trunk for edges entering `target` (a top port)
/// from above and, per edge, keep whichever of the merged or independent
/// route wins `choose_by_priority`. Returns the trunk y when one was found.
pub fn merge_fan_in(target: Point, edges: &mut [FanInEdge], obstacles: &[Rect]) -> Option<i64> {
    if edges.len() < 2 {
        return None;
    }
    let stubs: Vec<Point> = edges
        .iter()
        .map(|e| stub_point(e.from, e.from_port))
        .collect();
    let lowest = stubs.iter().map(|p| p.y).max()?;
    let highest_trunk = snap(target.y - STUB);
    if lowest >= highest_trunk {
        return None;
    }

    let clear_for_all = |ty: i64| {
        edges.iter().all(|e| {
            let path = merged_path(e, target, ty);
            // Skip the source stub and the final port segment.
            path_clear(&path[1..path.len() - 1], obstacles, CLEARANCE)
        })
    };
    let mut ty = highest_trunk;
    let trunk_y = loop {
        if ty <= lowest {
            return None;
        }
        if clear_for_all(ty) {
            break ty;
        }
        ty -= GRID;
    };

    let xs = stubs.iter().map(|p| p.x).chain([target.x]);
    let (x0, x1) = (
        xs.clone().min().unwrap_or(target.x),
        xs.max().unwrap_or(target.x),
    );
    let mut any_merged = false;
    for edge in edges.iter_mut() {
        let merged = simplify_path(&merged_path(edge, target, trunk_y));
        let merged_shared = horizontal_overlap(&merged, trunk_y, x0, x1);
        let current_shared = horizontal_overlap(&edge.route.points, trunk_y, x0, x1);
        if edge.route.degraded
            || choose_by_priority(&edge.route.points, current_shared, &merged, merged_shared)
        {
            edge.route = Route {
                points: merged,
                degraded: false,
            };
            any_merged = true;
        }
    }
    any_merged.then_some(trunk_y)
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_routing.rs"]
mod tests;
