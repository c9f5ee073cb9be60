//! Minimum-cost bipartite assignment.

use ndarray::{Array2, ArrayView2};
use pathfinding::prelude::{Matrix, kuhn_munkres_min};

use crate::error::{AssocError, Result};
use crate::tracker::cost::INFEASIBLE_COST;

/// A solver for the rectangular linear assignment problem.
///
/// Implementations return `min(m, n)` `(row, col)` pairs sorted by row, with
/// no row or column repeated, and must be deterministic.
pub trait AssignmentSolver: Send + Sync {
    fn solve(&self, cost: ArrayView2<'_, f64>) -> Result<Vec<(usize, usize)>>;
}

/// Jonker-Volgenant on a square-padded matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct LapjvSolver;

impl AssignmentSolver for LapjvSolver {
    fn solve(&self, cost: ArrayView2<'_, f64>) -> Result<Vec<(usize, usize)>> {
        let (num_rows, num_cols) = cost.dim();
        if num_rows == 0 || num_cols == 0 {
            return Ok(Vec::new());
        }
        check_finite(cost)?;

        // Dummy rows/columns add the same constant to every complete
        // assignment, so the optimum over the real block is unchanged.
        let size = num_rows.max(num_cols);
        let mut padded = Array2::<f64>::from_elem((size, size), INFEASIBLE_COST);
        padded
            .slice_mut(ndarray::s![..num_rows, ..num_cols])
            .assign(&cost);

        let (row_to_col, _) =
            lapjv::lapjv(&padded).map_err(|e| AssocError::Assignment(format!("{e:?}")))?;

        Ok(row_to_col
            .into_iter()
            .enumerate()
            .filter(|&(row, col)| row < num_rows && col < num_cols)
            .collect())
    }
}

/// Hungarian (Kuhn-Munkres) on a fixed-point copy of the matrix.
#[derive(Debug, Clone, Copy)]
pub struct KuhnMunkresSolver {
    /// Multiplier applied before rounding costs to integers.
    pub scale: f64,
}

impl Default for KuhnMunkresSolver {
    fn default() -> Self {
        Self { scale: 1e4 }
    }
}

impl AssignmentSolver for KuhnMunkresSolver {
    fn solve(&self, cost: ArrayView2<'_, f64>) -> Result<Vec<(usize, usize)>> {
        let (num_rows, num_cols) = cost.dim();
        if num_rows == 0 || num_cols == 0 {
            return Ok(Vec::new());
        }
        check_finite(cost)?;

        // kuhn_munkres_min needs rows <= columns.
        let transposed = num_rows > num_cols;
        let oriented = if transposed { cost.reversed_axes() } else { cost };
        let (rows, cols) = oriented.dim();
        let values: Vec<i64> = oriented
            .iter()
            .map(|&c| (c * self.scale).round() as i64)
            .collect();
        let weights = Matrix::from_vec(rows, cols, values)
            .map_err(|e| AssocError::Assignment(format!("{e:?}")))?;

        let (_, row_to_col) = kuhn_munkres_min(&weights);

        let mut pairs: Vec<(usize, usize)> = row_to_col
            .into_iter()
            .enumerate()
            .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
            .collect();
        pairs.sort_unstable();
        Ok(pairs)
    }
}

/// Solve with the default solver.
pub fn solve_assignment(cost: &Array2<f64>) -> Result<Vec<(usize, usize)>> {
    LapjvSolver.solve(cost.view())
}

fn check_finite(cost: ArrayView2<'_, f64>) -> Result<()> {
    if let Some(((i, j), c)) = cost.indexed_iter().find(|(_, c)| !c.is_finite()) {
        return Err(AssocError::Assignment(format!(
            "non-finite cost {c} at ({i}, {j})"
        )));
    }
    Ok(())
}

/// Solved pairs split by an acceptance test, plus the leftovers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// Solved pairs that passed the acceptance test.
    pub matches: Vec<(usize, usize)>,
    /// Solved pairs that did not.
    pub rejected: Vec<(usize, usize)>,
    /// Rows the solver left without a column.
    pub unmatched_rows: Vec<usize>,
    /// Columns the solver left without a row.
    pub unmatched_cols: Vec<usize>,
}

impl AssignmentResult {
    pub fn all_unmatched(num_rows: usize, num_cols: usize) -> Self {
        Self {
            matches: Vec::new(),
            rejected: Vec::new(),
            unmatched_rows: (0..num_rows).collect(),
            unmatched_cols: (0..num_cols).collect(),
        }
    }

    /// Solved pairs in row order, tagged with whether they were accepted.
    pub fn solved_pairs(&self) -> Vec<(usize, usize, bool)> {
        let mut pairs: Vec<(usize, usize, bool)> = self
            .matches
            .iter()
            .map(|&(r, c)| (r, c, true))
            .chain(self.rejected.iter().map(|&(r, c)| (r, c, false)))
            .collect();
        pairs.sort_unstable_by_key(|&(r, c, _)| (r, c));
        pairs
    }
}

/// Solve `cost` and classify each pair with `accept`.
pub fn linear_assignment<F>(
    solver: &dyn AssignmentSolver,
    cost: &Array2<f64>,
    accept: F,
) -> Result<AssignmentResult>
where
    F: Fn(f64) -> bool,
{
    let (num_rows, num_cols) = cost.dim();
    if num_rows == 0 || num_cols == 0 {
        return Ok(AssignmentResult::all_unmatched(num_rows, num_cols));
    }

    let pairs = solver.solve(cost.view())?;
    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut result = AssignmentResult::default();

    for (row, col) in pairs {
        row_used[row] = true;
        col_used[col] = true;
        if accept(cost[[row, col]]) {
            result.matches.push((row, col));
        } else {
            result.rejected.push((row, col));
        }
    }

    result.unmatched_rows = (0..num_rows).filter(|&i| !row_used[i]).collect();
    result.unmatched_cols = (0..num_cols).filter(|&j| !col_used[j]).collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn total(cost: &Array2<f64>, pairs: &[(usize, usize)]) -> f64 {
        pairs.iter().map(|&(r, c)| cost[[r, c]]).sum()
    }

    #[test]
    fn test_lapjv_square() {
        let cost = array![[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let pairs = solve_assignment(&cost).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!((total(&cost, &pairs) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_rectangular_sizes() {
        let wide = array![[0.14, 28.3]];
        assert_eq!(solve_assignment(&wide).unwrap(), vec![(0, 0)]);

        let tall = array![[5.0], [1.0], [3.0]];
        assert_eq!(solve_assignment(&tall).unwrap(), vec![(1, 0)]);
        assert_eq!(
            KuhnMunkresSolver::default().solve(tall.view()).unwrap(),
            vec![(1, 0)]
        );

        let empty = Array2::<f64>::zeros((0, 4));
        assert!(solve_assignment(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_solvers_agree_on_total_cost() {
        let cost = array![
            [7.0, 2.0, 1.0, 9.0],
            [3.0, 8.0, 6.0, 2.0],
            [4.0, 4.0, 5.0, 7.5],
        ];
        let a = LapjvSolver.solve(cost.view()).unwrap();
        let b = KuhnMunkresSolver::default().solve(cost.view()).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);
        assert!((total(&cost, &a) - total(&cost, &b)).abs() < 1e-6);

        let tall = cost.t().to_owned();
        let c = KuhnMunkresSolver::default().solve(tall.view()).unwrap();
        assert_eq!(c.len(), 3);
        assert!((total(&tall, &c) - total(&cost, &a)).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_rejected() {
        let cost = array![[1.0, f64::NAN]];
        assert!(matches!(
            solve_assignment(&cost),
            Err(AssocError::Assignment(_))
        ));
    }

    #[test]
    fn test_linear_assignment_classifies() {
        let cost = array![
            [0.2, INFEASIBLE_COST],
            [INFEASIBLE_COST, INFEASIBLE_COST],
            [INFEASIBLE_COST, 0.3],
        ];
        let result = linear_assignment(&LapjvSolver, &cost, |c| c < 1.0).unwrap();
        assert_eq!(result.matches, vec![(0, 0), (2, 1)]);
        assert!(result.rejected.is_empty());
        assert_eq!(result.unmatched_rows, vec![1]);
        assert!(result.unmatched_cols.is_empty());
    }
}
