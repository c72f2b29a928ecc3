//! Node sizes, title wrapping, ports and outlines.

use crate::flow::types::{Port, Shape, is_start_title};

use super::geometry::{Point, Rect};

/// Pixel width of one narrow (ASCII) glyph; wide glyphs count double.
pub const CHAR_WIDTH: i64 = 7;
pub const LINE_HEIGHT: i64 = 16;
pub const MAX_TITLE_LINES: usize = 4;
pub const MAX_NODE_WIDTH: i64 = 260;
const TEXT_PADDING: i64 = 24;
const ELLIPSIS: char = '…';

/// Base size of an empty node of `shape`.
pub fn node_size(shape: Shape) -> (i64, i64) {
    match shape {
        Shape::StartEnd => (120, 40),
        Shape::Process => (140, 50),
        Shape::Decision => (110, 60),
        Shape::Io => (140, 50),
        Shape::Subroutine => (160, 50),
        Shape::Connector => (16, 16),
    }
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

/// Display width of `c` in narrow-glyph units.
pub fn char_units(c: char) -> usize {
    if is_wide(c) { 2 } else { 1 }
}

pub fn text_units(text: &str) -> usize {
    text.chars().map(char_units).sum()
}

/// Wrap `title` into lines of at most `max_units`, breaking at spaces when a
/// word fits and mid-word otherwise. More than `max_lines` lines are cut and
/// the last kept line ends in an ellipsis.
pub fn wrap_title(title: &str, max_units: usize, max_lines: usize) -> Vec<String> {
    let max_units = max_units.max(2);
    let mut lines: Vec<String> = Vec::new();
    for raw in title.lines() {
        let mut line = String::new();
        let mut units = 0usize;
        for word in raw.split(' ') {
            let wu = text_units(word);
            let sep = usize::from(!line.is_empty());
            if units + sep + wu <= max_units {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                units += sep + wu;
                continue;
            }
            if !line.is_empty() && wu <= max_units {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
                units = wu;
                continue;
            }
            // Word longer than a line: break it by glyph.
            if sep == 1 && units + 1 < max_units {
                line.push(' ');
                units += 1;
            }
            for c in word.chars() {
                let cu = char_units(c);
                if units + cu > max_units {
                    lines.push(std::mem::take(&mut line));
                    units = 0;
                }
                line.push(c);
                units += cu;
            }
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && text_units(last) + 1 > max_units {
                last.pop();
            }
            last.push(ELLIPSIS);
        }
    }
    lines
}

fn round_up_even(v: i64) -> i64 {
    v + (v & 1)
}

/// Lines a node title is drawn with.
pub fn title_lines(title: &str) -> Vec<String> {
    let max_units = ((MAX_NODE_WIDTH - TEXT_PADDING) / CHAR_WIDTH) as usize;
    wrap_title(title, max_units, MAX_TITLE_LINES)
}

/// Size of a node showing `title`, grown to fit the wrapped text.
pub fn node_size_for_title(shape: Shape, title: &str) -> (i64, i64) {
    let (base_w, base_h) = node_size(shape);
    if shape == Shape::Connector {
        return (base_w, base_h);
    }
    let lines = title_lines(title);
    let longest = lines.iter().map(|l| text_units(l)).max().unwrap_or(0) as i64;
    let text_w = longest * CHAR_WIDTH + TEXT_PADDING;
    let extra_lines = lines.len().saturating_sub(1) as i64;

    let (w, h) = match shape {
        // Text must fit the inscribed rectangle of the diamond.
        Shape::Decision => (
            (text_w + text_w / 2).max(base_w),
            base_h + extra_lines * LINE_HEIGHT * 3 / 2,
        ),
        Shape::Io => (text_w + 20, base_h + extra_lines * LINE_HEIGHT),
        _ => (text_w, base_h + extra_lines * LINE_HEIGHT),
    };
    (
        round_up_even(w.clamp(base_w, MAX_NODE_WIDTH + base_w / 2)),
        round_up_even(h),
    )
}

/// The single port a start/end node uses: starts leave from the bottom,
/// ends are entered from the top.
pub fn fixed_port_for_start_end(title: &str) -> Port {
    if is_start_title(title) {
        Port::Bottom
    } else {
        Port::Top
    }
}

/// Ports an edge may attach to. Start/end nodes have exactly one, in their
/// flow direction.
pub fn allowed_ports_for_shape(shape: Shape, title: &str) -> &'static [Port] {
    match shape {
        Shape::StartEnd => match fixed_port_for_start_end(title) {
            Port::Bottom => &[Port::Bottom],
            _ => &[Port::Top],
        },
        Shape::Io => &[Port::Top, Port::Bottom],
        Shape::Process | Shape::Decision | Shape::Subroutine | Shape::Connector => &Port::ALL,
    }
}

/// Attachment point of `port` on `rect` (edge midpoints).
pub fn port_point(rect: &Rect, port: Port) -> Point {
    let c = rect.center();
    match port {
        Port::Top => Point::new(c.x, rect.y),
        Port::Bottom => Point::new(c.x, rect.bottom()),
        Port::Left => Point::new(rect.x, c.y),
        Port::Right => Point::new(rect.right(), c.y),
    }
}

/// Outward unit direction of a port.
pub fn port_normal(port: Port) -> (i64, i64) {
    match port {
        Port::Top => (0, -1),
        Port::Bottom => (0, 1),
        Port::Left => (-1, 0),
        Port::Right => (1, 0),
    }
}

/// Closed outline polygon of a node, clockwise from the top.
pub fn node_outline(shape: Shape, rect: &Rect) -> Vec<Point> {
    let (x, y, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    let c = rect.center();
    match shape {
        Shape::Decision => vec![
            Point::new(c.x, y),
            Point::new(r, c.y),
            Point::new(c.x, b),
            Point::new(x, c.y),
        ],
        Shape::Io => {
            let skew = (rect.h / 3).min(rect.w / 6);
            vec![
                Point::new(x + skew, y),
                Point::new(r, y),
                Point::new(r - skew, b),
                Point::new(x, b),
            ]
        }
        Shape::StartEnd | Shape::Connector => {
            let k = (rect.h.min(rect.w) * 3 / 10).max(1);
            vec![
                Point::new(x + k, y),
                Point::new(r - k, y),
                Point::new(r, y + k),
                Point::new(r, b - k),
                Point::new(r - k, b),
                Point::new(x + k, b),
                Point::new(x, b - k),
                Point::new(x, y + k),
            ]
        }
        Shape::Process | Shape::Subroutine => vec![
            Point::new(x, y),
            Point::new(r, y),
            Point::new(r, b),
            Point::new(x, b),
        ],
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_sizing.rs"]
mod tests;
