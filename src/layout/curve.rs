//! Catmull-Rom → cubic Bézier conversion for curved edge rendering.

use super::geometry::Point;

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// SVG path data through `points`. Two points give a straight line; longer
/// polylines become a uniform Catmull-Rom spline (tension 1/6 control
/// offsets) with clamped end tangents.
pub fn catmull_rom_to_bezier_path(points: &[Point]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {} {}", first.x, first.y);
    if points.len() == 2 {
        d.push_str(&format!(" L {} {}", points[1].x, points[1].y));
        return d;
    }

    let pt = |i: usize| {
        let p = points[i];
        (p.x as f64, p.y as f64)
    };
    let n = points.len();
    for i in 0..n.saturating_sub(1) {
        let p0 = pt(i.saturating_sub(1));
        let p1 = pt(i);
        let p2 = pt(i + 1);
        let p3 = pt((i + 2).min(n - 1));
        let c1 = (p1.0 + (p2.0 - p0.0) / 6.0, p1.1 + (p2.1 - p0.1) / 6.0);
        let c2 = (p2.0 - (p3.0 - p1.0) / 6.0, p2.1 - (p3.1 - p1.1) / 6.0);
        d.push_str(&format!(
            " C {} {}, {} {}, {} {}",
            fmt_num(c1.0),
            fmt_num(c1.1),
            fmt_num(c2.0),
            fmt_num(c2.1),
            fmt_num(p2.0),
            fmt_num(p2.1)
        ));
    }
    d
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_curve.rs"]
mod tests;
