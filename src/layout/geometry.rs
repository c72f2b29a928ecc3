//! Geometry primitives for routing: points, rectangles, directions, and the
//! polyline metrics used to compare candidate routes.

use serde::{Deserialize, Serialize};

// ─── Constants ────────────────────────────────────────────────────────────────

/// Routing grid step in pixels.
pub const GRID: i64 = 10;
/// Minimum gap kept between a route and any obstacle rectangle.
pub const CLEARANCE: i64 = 10;
/// Segments shorter than this are "tiny".
pub const MIN_SEGMENT: i64 = 12;

// ─── Point ────────────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Round `v` to the nearest multiple of `GRID`.
pub fn snap(v: i64) -> i64 {
    (v as f64 / GRID as f64).round() as i64 * GRID
}

// ─── Rect ─────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn inflate(&self, margin: i64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.w + 2 * margin,
            self.h + 2 * margin,
        )
    }

    /// Strict interior containment.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }

    /// True if the open interiors of the two rectangles overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True if segment `a → b` enters the interior of this rectangle.
    /// Diagonal segments are tested by their bounding box.
    pub fn hits_segment(&self, a: Point, b: Point) -> bool {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        if x0 == x1 {
            return x0 > self.x && x0 < self.right() && y1 > self.y && y0 < self.bottom();
        }
        if y0 == y1 {
            return y0 > self.y && y0 < self.bottom() && x1 > self.x && x0 < self.right();
        }
        x1 > self.x && x0 < self.right() && y1 > self.y && y0 < self.bottom()
    }
}

// ─── Dir ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (i64, i64) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }

    /// Direction of an axis-aligned, non-empty segment.
    pub fn of_segment(a: Point, b: Point) -> Option<Dir> {
        match (b.x - a.x, b.y - a.y) {
            (0, 0) => None,
            (0, dy) if dy < 0 => Some(Dir::Up),
            (0, _) => Some(Dir::Down),
            (dx, 0) if dx < 0 => Some(Dir::Left),
            (_, 0) => Some(Dir::Right),
            _ => None,
        }
    }
}

// ─── Obstacle checks ──────────────────────────────────────────────────────────

/// True if segment `a → b` keeps `clearance` from every obstacle.
pub fn segment_clear(a: Point, b: Point, obstacles: &[Rect], clearance: i64) -> bool {
    obstacles
        .iter()
        .all(|r| !r.inflate(clearance).hits_segment(a, b))
}

pub fn path_clear(path: &[Point], obstacles: &[Rect], clearance: i64) -> bool {
    path.windows(2)
        .all(|w| segment_clear(w[0], w[1], obstacles, clearance))
}

pub fn is_orthogonal(path: &[Point]) -> bool {
    path.windows(2)
        .all(|w| w[0].x == w[1].x || w[0].y == w[1].y)
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

pub fn path_length(path: &[Point]) -> i64 {
    path.windows(2).map(|w| w[0].manhattan(w[1])).sum()
}

/// Number of direction changes along the path.
pub fn bend_count(path: &[Point]) -> usize {
    let dirs: Vec<Dir> = path
        .windows(2)
        .filter_map(|w| Dir::of_segment(w[0], w[1]))
        .collect();
    dirs.windows(2).filter(|d| d[0] != d[1]).count()
}

/// Number of non-empty segments shorter than `min_len`.
pub fn tiny_segment_count(path: &[Point], min_len: i64) -> usize {
    path.windows(2)
        .map(|w| w[0].manhattan(w[1]))
        .filter(|&len| len > 0 && len < min_len)
        .count()
}

pub fn first_leg_direction(path: &[Point]) -> Option<Dir> {
    path.windows(2).find_map(|w| Dir::of_segment(w[0], w[1]))
}

/// Total length of horizontal segments of `path` lying on row `y` within
/// `[x0, x1]`.
pub fn horizontal_overlap(path: &[Point], y: i64, x0: i64, x1: i64) -> i64 {
    path.windows(2)
        .filter(|w| w[0].y == y && w[1].y == y)
        .map(|w| {
            let lo = w[0].x.min(w[1].x).max(x0);
            let hi = w[0].x.max(w[1].x).min(x1);
            (hi - lo).max(0)
        })
        .sum()
}

/// Drop repeated points and merge collinear runs.
pub fn simplify_path(path: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(path.len());
    for &p in path {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let collinear = (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y);
            if collinear {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_geometry.rs"]
mod tests;
