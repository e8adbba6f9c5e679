use std::fmt;

/// Shape violations in solver inputs.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeError {
    /// The gradient is not a rank-1 array.
    GradientNotVector {
        /// Rank of the array that was passed.
        ndim: usize,
    },
    /// The Hessian is not a rank-2 array.
    HessianNotMatrix {
        /// Rank of the array that was passed.
        ndim: usize,
    },
    /// A Hessian row does not have the expected length.
    NonSquareHessian {
        /// Index of the offending row.
        row: usize,
        /// Length of that row.
        len: usize,
        /// Number of rows (the expected row length).
        expected: usize,
    },
    /// Gradient and Hessian disagree on the first dimension.
    DimensionMismatch {
        /// Length of the gradient.
        gradient: usize,
        /// Number of rows of the Hessian.
        hessian: usize,
    },
    /// The objective returned a gradient, Hessian or Hessian-vector product
    /// whose length differs from the number of parameters.
    OracleOutput {
        /// Number of parameters the objective was evaluated at.
        expected: usize,
        /// Length of the returned vector (or Hessian row).
        got: usize,
    },
    /// A flat vector does not match the parameter layout it is split by.
    LayoutMismatch {
        /// Total length recorded by the layout.
        expected: usize,
        /// Length of the vector that was passed.
        got: usize,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::GradientNotVector { ndim } => {
                write!(f, "gradient must be a vector, got an array of rank {ndim}")
            }
            ShapeError::HessianNotMatrix { ndim } => {
                write!(f, "Hessian must be a matrix, got an array of rank {ndim}")
            }
            ShapeError::NonSquareHessian { row, len, expected } => write!(
                f,
                "Hessian row {row} has length {len}, expected {expected}"
            ),
            ShapeError::DimensionMismatch { gradient, hessian } => write!(
                f,
                "gradient and Hessian must have the same first dimension ({gradient} vs {hessian})"
            ),
            ShapeError::OracleOutput { expected, got } => write!(
                f,
                "objective returned a vector of length {got} for {expected} parameters"
            ),
            ShapeError::LayoutMismatch { expected, got } => write!(
                f,
                "flat vector has length {got}, parameter layout expects {expected}"
            ),
        }
    }
}

/// Errors raised by the cubic Newton solvers and optimizer.
///
/// All variants are structural: they are raised immediately and never
/// retried. An inner solve that stops short of its tolerance is not an
/// error; see [`IterativeResult::converged`](crate::IterativeResult).
#[derive(Clone, Debug, PartialEq)]
pub enum CubicError {
    /// The regularization constant `L` is not strictly positive.
    InvalidRegularization {
        /// The rejected value.
        l: f64,
    },
    /// Any other invalid configuration value.
    InvalidConfig(&'static str),
    /// Gradient, Hessian or parameter shapes are inconsistent.
    InvalidShape(ShapeError),
    /// `max |Aᵀ − A|` exceeds the symmetry tolerance.
    AsymmetricHessian {
        /// Largest absolute difference between `A` and its transpose.
        max_asymmetry: f64,
        /// Tolerance that was exceeded.
        tolerance: f64,
    },
    /// The exact step failed the stationarity check (testing mode only).
    ///
    /// Signals a defect in the dual search or the eigendecomposition rather
    /// than a bad input.
    OptimumNotReached {
        /// `max |c + (L/2)‖x‖x + Ax|` at the returned step.
        residual: f64,
        /// Tolerance that was exceeded.
        tolerance: f64,
    },
}

impl fmt::Display for CubicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubicError::InvalidRegularization { l } => {
                write!(f, "invalid regularization constant: L = {l} (must be > 0)")
            }
            CubicError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            CubicError::InvalidShape(e) => write!(f, "invalid shape: {e}"),
            CubicError::AsymmetricHessian {
                max_asymmetry,
                tolerance,
            } => write!(
                f,
                "Hessian is not symmetric: max |Aᵀ - A| = {max_asymmetry:e} exceeds {tolerance:e}"
            ),
            CubicError::OptimumNotReached {
                residual,
                tolerance,
            } => write!(
                f,
                "obtained step is not optimal: stationarity residual {residual:e} >= {tolerance:e}"
            ),
        }
    }
}

impl std::error::Error for CubicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CubicError::InvalidShape(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ShapeError {}

impl From<ShapeError> for CubicError {
    fn from(e: ShapeError) -> Self {
        CubicError::InvalidShape(e)
    }
}

/// Lossy conversion used when reporting float values in errors.
pub(crate) fn to_f64<F: num_traits::Float>(x: F) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_values() {
        let e = CubicError::InvalidRegularization { l: -1.0 };
        assert!(e.to_string().contains("L = -1"));

        let e: CubicError = ShapeError::DimensionMismatch {
            gradient: 3,
            hessian: 2,
        }
        .into();
        let msg = e.to_string();
        assert!(msg.contains("3 vs 2"), "{msg}");
    }

    #[test]
    fn shape_error_is_the_source() {
        use std::error::Error;

        let e = CubicError::from(ShapeError::GradientNotVector { ndim: 2 });
        assert!(e.source().is_some());
        assert!(CubicError::InvalidConfig("x").source().is_none());
    }
}
