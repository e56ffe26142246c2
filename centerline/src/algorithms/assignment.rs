//! Minimum-cost one-to-one assignment (Hungarian method with potentials).
//!
//! Rows are matched to distinct columns so the summed cost is minimal. When
//! there are more rows than columns the problem is solved on the transpose
//! and the surplus rows stay unassigned.

// Stand-in for non-finite costs so the potentials stay finite.
const BIG: f64 = 1e18;

/// `cost[i][j]` is the price of giving column `j` to row `i`. All rows must
/// have the same length. Returns the column picked for each row.
pub fn solve(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let n = cost.len();
    let m = cost.first().map_or(0, |r| r.len());
    if n == 0 || m == 0 {
        return vec![None; n];
    }
    let at = |i: usize, j: usize| -> f64 {
        let c = cost[i].get(j).copied().unwrap_or(BIG);
        if c.is_finite() { c } else { BIG }
    };
    if n <= m {
        hungarian(n, m, at)
    } else {
        let cols = hungarian(m, n, |i, j| at(j, i));
        let mut rows = vec![None; n];
        for (col, row) in cols.into_iter().enumerate() {
            if let Some(r) = row {
                rows[r] = Some(col);
            }
        }
        rows
    }
}

// Requires n <= m. Indices are 1-based inside; slot 0 is the virtual column.
fn hungarian(n: usize, m: usize, a: impl Fn(usize, usize) -> f64) -> Vec<Option<usize>> {
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = a(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            if j1 == 0 {
                // every column used; cannot happen while n <= m
                break;
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut rows = vec![None; n];
    for j in 1..=m {
        if p[j] != 0 {
            rows[p[j] - 1] = Some(j - 1);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(cost: &[Vec<f64>], rows: &[Option<usize>]) -> f64 {
        rows.iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|j| cost[i][j]))
            .sum()
    }

    #[test]
    fn square_known_optimum() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let rows = solve(&cost);
        assert_eq!(rows, vec![Some(1), Some(0), Some(2)]);
        assert_eq!(total(&cost, &rows), 5.0);
    }

    #[test]
    fn rectangular_rows_get_distinct_columns() {
        // targets 0, 5, 10 against positions 0..=10
        let pos: Vec<f64> = (0..=10).map(|x| x as f64).collect();
        let cost: Vec<Vec<f64>> = [0.0, 5.0, 10.0]
            .iter()
            .map(|t| pos.iter().map(|p| (t - p).abs()).collect())
            .collect();
        assert_eq!(solve(&cost), vec![Some(0), Some(5), Some(10)]);
    }

    #[test]
    fn contested_column_goes_to_cheaper_total() {
        // both rows prefer column 0
        let cost = vec![vec![0.0, 10.0, 10.0], vec![1.0, 2.0, 10.0]];
        let rows = solve(&cost);
        assert_eq!(rows, vec![Some(0), Some(1)]);
    }

    #[test]
    fn more_rows_than_columns_leaves_some_unassigned() {
        let cost = vec![vec![5.0], vec![1.0], vec![3.0]];
        assert_eq!(solve(&cost), vec![None, Some(0), None]);
    }

    #[test]
    fn brute_force_agrees_on_small_matrices() {
        let mut seed: u64 = 0x5EED_1234_ABCD_0001;
        let mut rnd = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((seed >> 33) % 100) as f64
        };
        for _ in 0..50 {
            let cost: Vec<Vec<f64>> = (0..3).map(|_| (0..4).map(|_| rnd()).collect()).collect();
            let rows = solve(&cost);
            let got = total(&cost, &rows);
            let mut best = f64::INFINITY;
            for a in 0..4 {
                for b in 0..4 {
                    for c in 0..4 {
                        if a != b && b != c && a != c {
                            best = best.min(cost[0][a] + cost[1][b] + cost[2][c]);
                        }
                    }
                }
            }
            assert_eq!(got, best);
        }
    }

    #[test]
    fn empty_and_non_finite_inputs() {
        assert!(solve(&[]).is_empty());
        let rows = solve(&[vec![f64::NAN, 1.0]]);
        assert_eq!(rows, vec![Some(1)]);
    }
}
