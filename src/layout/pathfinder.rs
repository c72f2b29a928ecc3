//! Direction-aware A* over a sparse visibility grid.
//!
//! The grid is built from the union of obstacle edge coordinates (inflated by
//! the routing clearance, ±1 grid step) plus the endpoints, so only a few
//! hundred candidate points exist even for large diagrams. Every grid point
//! carries five search states: the four directions of arrival and "none" for
//! the start, which lets the cost function charge for turns.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::trace;

use super::geometry::{CLEARANCE, Dir, GRID, Point, Rect, segment_clear, simplify_path};

/// Cost added for every change of direction.
pub const TURN_PENALTY: i64 = 40;
/// Cost added when the final approach does not match the goal direction.
pub const GOAL_DIR_PENALTY: i64 = 30;
/// Cost added for leaving the start against its port direction.
pub const REVERSE_START_PENALTY: i64 = 200;
/// Per-grid-step cost of running vertically away from the corridor x.
pub const CORRIDOR_PULL: i64 = 1;
const MAX_EXPANSIONS: usize = 200_000;
const DIR_STATES: usize = 5;

/// One A* query.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub start: Point,
    pub goal: Point,
    /// Direction the route should leave `start` in.
    pub start_dir: Option<Dir>,
    /// Direction the route should travel in when it reaches `goal`.
    pub goal_dir: Option<Dir>,
    pub obstacles: &'a [Rect],
    /// Preferred x for vertical runs.
    pub corridor_x: Option<i64>,
}

// ─── Sparse grid ──────────────────────────────────────────────────────────────

struct SparseGrid {
    xs: Vec<i64>,
    ys: Vec<i64>,
}

impl SparseGrid {
    fn build(req: &SearchRequest<'_>) -> Self {
        let mut xs = vec![req.start.x, req.goal.x];
        let mut ys = vec![req.start.y, req.goal.y];
        if let Some(cx) = req.corridor_x {
            xs.push(cx);
        }
        xs.push((req.start.x + req.goal.x) / 2);
        ys.push((req.start.y + req.goal.y) / 2);
        for r in req.obstacles {
            let ir = r.inflate(CLEARANCE);
            xs.extend([ir.x - GRID, ir.x, ir.right(), ir.right() + GRID]);
            ys.extend([ir.y - GRID, ir.y, ir.bottom(), ir.bottom() + GRID]);
        }
        let (min_x, max_x) = bounds(&xs);
        let (min_y, max_y) = bounds(&ys);
        xs.extend([min_x - 2 * GRID, max_x + 2 * GRID]);
        ys.extend([min_y - 2 * GRID, max_y + 2 * GRID]);
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();
        Self { xs, ys }
    }

    fn point(&self, xi: usize, yi: usize) -> Point {
        Point::new(self.xs[xi], self.ys[yi])
    }

    fn locate(&self, p: Point) -> Option<(usize, usize)> {
        let xi = self.xs.binary_search(&p.x).ok()?;
        let yi = self.ys.binary_search(&p.y).ok()?;
        Some((xi, yi))
    }

    fn neighbor(&self, xi: usize, yi: usize, dir: Dir) -> Option<(usize, usize)> {
        match dir {
            Dir::Up => yi.checked_sub(1).map(|y| (xi, y)),
            Dir::Down => (yi + 1 < self.ys.len()).then_some((xi, yi + 1)),
            Dir::Left => xi.checked_sub(1).map(|x| (x, yi)),
            Dir::Right => (xi + 1 < self.xs.len()).then_some((xi + 1, yi)),
        }
    }
}

fn bounds(v: &[i64]) -> (i64, i64) {
    let min = v.iter().copied().min().unwrap_or(0);
    let max = v.iter().copied().max().unwrap_or(0);
    (min, max)
}

// ─── State arena ──────────────────────────────────────────────────────────────

fn dir_slot(dir: Option<Dir>) -> usize {
    match dir {
        None => 0,
        Some(Dir::Up) => 1,
        Some(Dir::Down) => 2,
        Some(Dir::Left) => 3,
        Some(Dir::Right) => 4,
    }
}

fn slot_dir(slot: usize) -> Option<Dir> {
    match slot {
        1 => Some(Dir::Up),
        2 => Some(Dir::Down),
        3 => Some(Dir::Left),
        4 => Some(Dir::Right),
        _ => None,
    }
}

/// Parallel arrays indexed by `(yi * nx + xi) * 5 + dir`.
struct Arena {
    nx: usize,
    cost: Vec<i64>,
    parent: Vec<usize>,
    closed: Vec<bool>,
}

const NO_PARENT: usize = usize::MAX;

impl Arena {
    fn new(nx: usize, ny: usize) -> Self {
        let n = nx * ny * DIR_STATES;
        Self {
            nx,
            cost: vec![i64::MAX; n],
            parent: vec![NO_PARENT; n],
            closed: vec![false; n],
        }
    }

    fn index(&self, xi: usize, yi: usize, slot: usize) -> usize {
        (yi * self.nx + xi) * DIR_STATES + slot
    }

    fn decode(&self, state: usize) -> (usize, usize, usize) {
        let cell = state / DIR_STATES;
        (cell % self.nx, cell / self.nx, state % DIR_STATES)
    }
}

// ─── Heuristic ────────────────────────────────────────────────────────────────

/// Manhattan distance plus one turn when the points are not aligned.
fn heuristic(a: Point, b: Point) -> i64 {
    let d = a.manhattan(b);
    if a.x == b.x || a.y == b.y {
        d
    } else {
        d + TURN_PENALTY
    }
}

fn step_cost(req: &SearchRequest<'_>, from: Point, to: Point, prev: Option<Dir>, dir: Dir) -> i64 {
    let mut cost = from.manhattan(to);
    match prev {
        Some(p) if p != dir => cost += TURN_PENALTY,
        None if req.start_dir.is_some_and(|s| s.opposite() == dir) => {
            cost += REVERSE_START_PENALTY;
        }
        None if req.start_dir.is_some_and(|s| s != dir) => cost += TURN_PENALTY,
        _ => {}
    }
    if let (Some(cx), false) = (req.corridor_x, dir.is_horizontal()) {
        cost += (from.x - cx).abs() / GRID * CORRIDOR_PULL * (from.manhattan(to) / GRID).max(1);
    }
    if to == req.goal && req.goal_dir.is_some_and(|g| g != dir) {
        cost += GOAL_DIR_PENALTY;
    }
    cost
}

// ─── A* search ────────────────────────────────────────────────────────────────

/// Shortest obstacle-clear orthogonal route from `start` to `goal`, or `None`
/// when the goal is unreachable on the sparse grid.
pub fn a_star(req: &SearchRequest<'_>) -> Option<Vec<Point>> {
    let grid = SparseGrid::build(req);
    let (sx, sy) = grid.locate(req.start)?;
    let (gx, gy) = grid.locate(req.goal)?;
    let mut arena = Arena::new(grid.xs.len(), grid.ys.len());

    // Min-heap: (Reverse(priority), Reverse(counter), state)
    let mut counter: u64 = 0;
    let mut open_set: BinaryHeap<(Reverse<i64>, Reverse<u64>, usize)> = BinaryHeap::new();
    let start_state = arena.index(sx, sy, 0);
    arena.cost[start_state] = 0;
    open_set.push((Reverse(heuristic(req.start, req.goal)), Reverse(counter), start_state));

    let mut expanded = 0usize;
    while let Some((_, _, state)) = open_set.pop() {
        if arena.closed[state] {
            continue;
        }
        arena.closed[state] = true;
        expanded += 1;
        if expanded > MAX_EXPANSIONS {
            break;
        }

        let (xi, yi, slot) = arena.decode(state);
        if (xi, yi) == (gx, gy) {
            trace!(expanded, "a* reached goal");
            return Some(reconstruct(&grid, &arena, state));
        }
        let here = grid.point(xi, yi);
        let prev = slot_dir(slot);

        for dir in Dir::ALL {
            let Some((nx, ny)) = grid.neighbor(xi, yi, dir) else {
                continue;
            };
            let there = grid.point(nx, ny);
            if !segment_clear(here, there, req.obstacles, CLEARANCE) {
                continue;
            }
            let next = arena.index(nx, ny, dir_slot(Some(dir)));
            if arena.closed[next] {
                continue;
            }
            let new_cost = arena.cost[state] + step_cost(req, here, there, prev, dir);
            if new_cost < arena.cost[next] {
                arena.cost[next] = new_cost;
                arena.parent[next] = state;
                counter += 1;
                let priority = new_cost + heuristic(there, req.goal);
                open_set.push((Reverse(priority), Reverse(counter), next));
            }
        }
    }

    trace!(expanded, "a* exhausted without reaching goal");
    None
}

fn reconstruct(grid: &SparseGrid, arena: &Arena, goal_state: usize) -> Vec<Point> {
    let mut path = Vec::new();
    let mut cur = goal_state;
    loop {
        let (xi, yi, _) = arena.decode(cur);
        path.push(grid.point(xi, yi));
        let parent = arena.parent[cur];
        if parent == NO_PARENT {
            break;
        }
        cur = parent;
    }
    path.reverse();
    simplify_path(&path)
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_pathfinder.rs"]
mod tests;
