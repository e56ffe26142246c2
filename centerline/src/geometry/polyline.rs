use crate::geometry::tolerance::{clamp01, EPS_LEN};
use crate::model::Vec2;

/// Running arc length at every vertex; the first entry is 0.
pub fn cumulative_lengths(points: &[Vec2]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += p.distance(points[i - 1]);
        }
        out.push(acc);
    }
    out
}

/// Point at arc length `s` along the polyline. `cum` must come from
/// [`cumulative_lengths`] on the same points. Out-of-range lengths clamp to
/// the ends.
pub fn point_at_length(points: &[Vec2], cum: &[f64], s: f64) -> Vec2 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return Vec2::ZERO,
    };
    if s <= 0.0 {
        return first;
    }
    // first vertex at or past s
    let hi = cum.partition_point(|&c| c < s);
    if hi >= points.len() {
        return last;
    }
    if hi == 0 {
        return first;
    }
    let seg = cum[hi] - cum[hi - 1];
    if seg <= EPS_LEN {
        return points[hi];
    }
    let t = clamp01((s - cum[hi - 1]) / seg);
    points[hi - 1].lerp(points[hi], t)
}

/// Unit direction at every vertex: central difference inside, one-sided at
/// the ends. A zero difference gives the zero vector.
pub fn unit_tangents(points: &[Vec2]) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            if n < 2 {
                return Vec2::ZERO;
            }
            let d = if i == 0 {
                points[1].sub(points[0])
            } else if i == n - 1 {
                points[n - 1].sub(points[n - 2])
            } else {
                points[i + 1].sub(points[i - 1])
            };
            normalize_or_zero(d)
        })
        .collect()
}

#[inline]
pub fn normalize_or_zero(d: Vec2) -> Vec2 {
    let len = d.length();
    if len == 0.0 {
        d
    } else {
        d.scale(1.0 / len)
    }
}
