//! Minimum-cost bipartite matching (Hungarian / Munkres algorithm).
//!
//! Given an `m × n` cost matrix, [`solve`] returns the `(row, column)` pairs of
//! a one-to-one matching of `min(m, n)` pairs with the lowest total cost.
//! Rows or columns beyond that are left out.
//!
//! The implementation is the shortest-augmenting-path form with row and column
//! potentials, `O(k² · K)` for `k = min(m, n)` and `K = max(m, n)`. It is
//! exact and deterministic: ties resolve by matrix iteration order.

use thiserror::Error;

/// Solver contract violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error("Cost matrix row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid cost {value} at ({row}, {col}): costs must be finite and non-negative")]
    InvalidCost { row: usize, col: usize, value: f64 },
}

/// Dense row-major cost matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Build a matrix by evaluating `cost(row, col)` for every cell.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        mut cost: impl FnMut(usize, usize) -> f64,
    ) -> Result<Self, AssignmentError> {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(cost(row, col));
            }
        }
        Self::validated(rows, cols, data)
    }

    /// Build a matrix from nested rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, AssignmentError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let count = rows.len();
        let mut data = Vec::with_capacity(count * cols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != cols {
                return Err(AssignmentError::RaggedRow {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            data.extend(values);
        }
        Self::validated(count, cols, data)
    }

    fn validated(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, AssignmentError> {
        if let Some(index) = data.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(AssignmentError::InvalidCost {
                row: index / cols,
                col: index % cols,
                value: data[index],
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Total cost of a set of pairs.
    pub fn total(&self, pairs: &[(usize, usize)]) -> f64 {
        pairs.iter().map(|&(r, c)| self.get(r, c)).sum()
    }
}

/// Minimum-cost assignment of rows to columns, sorted by row.
///
/// Returns an empty assignment when the matrix has no rows or no columns.
pub fn solve(matrix: &CostMatrix) -> Vec<(usize, usize)> {
    if matrix.rows == 0 || matrix.cols == 0 {
        return Vec::new();
    }

    let mut pairs = if matrix.rows <= matrix.cols {
        hungarian(matrix.rows, matrix.cols, |r, c| matrix.get(r, c))
    } else {
        // Solve the transpose so the shorter side is always the row side
        hungarian(matrix.cols, matrix.rows, |r, c| matrix.get(c, r))
            .into_iter()
            .map(|(c, r)| (r, c))
            .collect()
    };

    pairs.sort_unstable();
    pairs
}

/// Core solver for `n <= m`, indices 1-based internally with slot 0 as sentinel.
fn hungarian(n: usize, m: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<(usize, usize)> {
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    // p[j] = row matched to column j (0 = none)
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
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
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

        // Flip the augmenting path
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> CostMatrix {
        CostMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_empty_inputs() {
        assert!(solve(&matrix(vec![])).is_empty());
        assert!(solve(&matrix(vec![vec![], vec![]])).is_empty());
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(solve(&matrix(vec![vec![0.3]])), vec![(0, 0)]);
    }

    #[test]
    fn test_prefers_direct_pairing() {
        let m = matrix(vec![vec![0.1, 0.9], vec![0.8, 0.2]]);
        assert_eq!(solve(&m), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_prefers_crossed_pairing_when_cheaper() {
        let m = matrix(vec![vec![0.9, 0.1], vec![0.2, 0.8]]);
        assert_eq!(solve(&m), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_classic_three_by_three() {
        let m = matrix(vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ]);
        let pairs = solve(&m);
        assert_eq!(m.total(&pairs), 5.0);
        assert_eq!(pairs, vec![(0, 1), (1, 0), (2, 2)]);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let m = matrix(vec![vec![0.5], vec![0.1], vec![0.9]]);
        assert_eq!(solve(&m), vec![(1, 0)]);
    }

    #[test]
    fn test_more_columns_than_rows() {
        let m = matrix(vec![vec![0.7, 0.2, 0.4], vec![0.1, 0.3, 0.9]]);
        assert_eq!(solve(&m), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = CostMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3]]).unwrap_err();
        assert_eq!(
            err,
            AssignmentError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_invalid_costs_rejected() {
        assert!(matches!(
            CostMatrix::from_rows(vec![vec![0.1, f64::NAN]]),
            Err(AssignmentError::InvalidCost { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            CostMatrix::from_fn(2, 2, |r, c| if r == 1 && c == 0 { -1.0 } else { 0.0 }),
            Err(AssignmentError::InvalidCost { row: 1, col: 0, .. })
        ));
    }
}
