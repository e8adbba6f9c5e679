//! Cubic-regularized Newton steps.
//!
//! One step of the method of Nesterov & Polyak minimizes the local model
//!
//! ```text
//! m(s) = cᵀs + ½ sᵀAs + (L/6)‖s‖³
//! ```
//!
//! where `c` is the gradient, `A` the Hessian and `L` an estimate of the
//! Hessian's Lipschitz constant. Two subproblem solvers are provided:
//!
//! - [`solve_cubic_subproblem`] / [`exact`]: eigendecomposes `A` and reduces
//!   the model to a convex one-dimensional dual search ([`ray_line_search`]).
//! - [`iterative`]: Hessian-free, runs a pluggable [`InnerOptimizer`] on the
//!   model gradient using only Hessian-vector products.
//!
//! [`CubicNewton`] drives both per parameter group and owns the lazy Hessian
//! cache.

pub mod convergence;
pub mod error;
pub mod flatten;
pub mod inner;
pub mod line_search;
pub mod linalg;
pub mod objective;
pub mod optimizer;
pub mod solvers;

#[cfg(feature = "ndarray")]
pub mod ndarray_support;

pub use error::{CubicError, ShapeError};
pub use flatten::{flatten, Layout};
pub use inner::{Adam, GradientDescent, InnerOptimizer, Momentum, Subsolver, SubsolverState};
pub use line_search::{ray_line_search, RaySearchParams};
pub use linalg::{sym_eigen, SymEigen};
pub use objective::Objective;
pub use optimizer::{
    CubicNewton, CubicNewtonConfig, LazyConfig, ParamGroup, SolverKind, StepReport,
};
pub use solvers::exact::{exact, solve_cubic_subproblem, CubicStep, ExactConfig, ExactStep};
pub use solvers::iterative::{iterative, IterativeResult};
