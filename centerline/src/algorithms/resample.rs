use crate::algorithms::assignment;
use crate::geometry::bezier::Curve;
use crate::geometry::polyline::cumulative_lengths;
use crate::geometry::tolerance::{linspace, EPS_ARC};
use crate::model::Vec2;

/// Pick one dense sample per arc-length target so the summed distance between
/// target and sample arc length is minimal, each sample used at most once.
/// Returned indices are in target order.
///
/// Targets beyond the number of samples fall back to the closest sample.
pub fn assign_to_targets(cum: &[f64], targets: &[f64]) -> Vec<usize> {
    if cum.is_empty() {
        return Vec::new();
    }
    let cost: Vec<Vec<f64>> = targets
        .iter()
        .map(|t| cum.iter().map(|s| (t - s).abs()).collect())
        .collect();
    assignment::solve(&cost)
        .into_iter()
        .zip(targets)
        .map(|(pick, &t)| pick.unwrap_or_else(|| closest(cum, t)))
        .collect()
}

fn closest(cum: &[f64], t: f64) -> usize {
    let mut best = 0;
    for (j, s) in cum.iter().enumerate() {
        if (t - s).abs() < (t - cum[best]).abs() {
            best = j;
        }
    }
    best
}

/// Indices of `k` samples spread evenly by arc length over `points`.
pub fn even_indices(points: &[Vec2], k: usize) -> Vec<usize> {
    let cum = cumulative_lengths(points);
    let total = cum.last().copied().unwrap_or(0.0);
    assign_to_targets(&cum, &linspace(0.0, total, k))
}

/// Points along `curve` spaced `step` apart in arc length, starting at the
/// curve start. A curve shorter than `step` gives its two endpoints.
pub fn pixels_along(curve: &Curve, step: f64, dense: usize) -> Vec<Vec2> {
    let start = curve.start();
    let end = curve.end();
    if !(step.is_finite() && step > 0.0) {
        return vec![start, end];
    }
    let points = curve.sample(dense.max(2));
    let cum = cumulative_lengths(&points);
    let total = cum.last().copied().unwrap_or(0.0);
    if total < step {
        return vec![start, end];
    }
    let mut targets = Vec::new();
    while (targets.len() as f64) * step < total - EPS_ARC {
        targets.push(targets.len() as f64 * step);
    }
    // enough dense samples for every target to get its own
    let (points, cum) = if targets.len() > points.len() {
        let pts = curve.sample(targets.len() * 2);
        let c = cumulative_lengths(&pts);
        (pts, c)
    } else {
        (points, cum)
    };
    assign_to_targets(&cum, &targets)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Handle;

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2 { x, y }
    }

    #[test]
    fn even_indices_on_uniform_line() {
        let pts: Vec<Vec2> = (0..=10).map(|i| v(i as f64, 0.0)).collect();
        assert_eq!(even_indices(&pts, 3), vec![0, 5, 10]);
        assert_eq!(even_indices(&pts, 1), vec![0]);
        assert!(even_indices(&pts, 0).is_empty());
    }

    #[test]
    fn even_indices_follow_arc_length_not_index() {
        // samples bunched at the start
        let pts = [v(0.0, 0.0), v(0.1, 0.0), v(0.2, 0.0), v(5.0, 0.0), v(10.0, 0.0)];
        assert_eq!(even_indices(&pts, 3), vec![0, 3, 4]);
    }

    #[test]
    fn indices_are_distinct_when_enough_samples() {
        let pts = [v(0.0, 0.0), v(0.0, 0.0), v(0.0, 0.0), v(1.0, 0.0)];
        let idx = even_indices(&pts, 4);
        let mut sorted = idx.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn pixels_along_line() {
        let c = Curve::new(v(0.0, 0.0), Handle::Quadratic(v(5.0, 0.0)), v(10.0, 0.0));
        let px = pixels_along(&c, 2.5, 50);
        assert_eq!(px.len(), 4);
        assert_eq!(px[0], v(0.0, 0.0));
        for (i, p) in px.iter().enumerate() {
            assert!((p.x - 2.5 * i as f64).abs() < 0.2, "{} at {}", p.x, i);
        }
    }

    #[test]
    fn short_curve_gives_endpoints() {
        let c = Curve::new(v(0.0, 0.0), Handle::Quadratic(v(0.5, 0.0)), v(1.0, 0.0));
        assert_eq!(pixels_along(&c, 4.0, 50), vec![v(0.0, 0.0), v(1.0, 0.0)]);
        assert_eq!(pixels_along(&c, 0.0, 50), vec![v(0.0, 0.0), v(1.0, 0.0)]);
    }
}
