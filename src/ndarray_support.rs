//! ndarray adapters for the exact subproblem solver.
//!
//! Accepts dynamic-rank arrays so that rank errors (a matrix passed as the
//! gradient, a 3-D "Hessian") surface as [`ShapeError`]s instead of panics.

use ndarray::{Array1, ArrayViewD, Axis};
use num_traits::Float;

use crate::error::{CubicError, ShapeError};
use crate::solvers::exact::{solve_cubic_subproblem, ExactConfig};

/// Solve the cubic subproblem for a rank-1 gradient and a rank-2 Hessian.
///
/// Returns the step `x*` as an `Array1`.
///
/// # Errors
///
/// - [`ShapeError::GradientNotVector`] if `c` is not rank 1.
/// - [`ShapeError::HessianNotMatrix`] if `a` is not rank 2.
/// - [`ShapeError::DimensionMismatch`] if the first dimensions differ.
/// - Everything [`solve_cubic_subproblem`] returns.
pub fn solve_cubic_subproblem_ndarray<F: Float>(
    c: ArrayViewD<'_, F>,
    a: ArrayViewD<'_, F>,
    l: F,
    config: &ExactConfig<F>,
) -> Result<Array1<F>, CubicError> {
    if c.ndim() != 1 {
        return Err(ShapeError::GradientNotVector { ndim: c.ndim() }.into());
    }
    if a.ndim() != 2 {
        return Err(ShapeError::HessianNotMatrix { ndim: a.ndim() }.into());
    }
    if c.len() != a.shape()[0] {
        return Err(ShapeError::DimensionMismatch {
            gradient: c.len(),
            hessian: a.shape()[0],
        }
        .into());
    }

    let grad: Vec<F> = c.iter().copied().collect();
    let hess: Vec<Vec<F>> = a
        .axis_iter(Axis(0))
        .map(|row| row.iter().copied().collect())
        .collect();

    let sol = solve_cubic_subproblem(&grad, &hess, l, config)?;
    Ok(Array1::from_vec(sol.step))
}
