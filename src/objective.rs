/// Differentiation oracle behind a cubic Newton step.
///
/// At the current point `x` the step minimizes the model
/// `cᵀs + ½ sᵀAs + (L/6)‖s‖³` with `c = ∇f(x)` and `A = ∇²f(x)`. The exact
/// solver reads `c` and `A` from [`eval_hessian`](Objective::eval_hessian);
/// the iterative solver never forms `A` and builds the model gradient
/// `c + As + (L/2)‖s‖s` from [`hvp`](Objective::hvp) instead.
///
/// Every returned vector must have length [`dim`](Objective::dim). Inside
/// [`CubicNewton`](crate::CubicNewton) a mismatch is reported as
/// [`ShapeError::OracleOutput`](crate::ShapeError::OracleOutput).
pub trait Objective<F: num_traits::Float> {
    /// Length of the flat parameter vector.
    fn dim(&self) -> usize;

    /// `(f(x), ∇f(x))`.
    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>);

    /// `(f(x), c, A)`: the model's linear and quadratic terms at `x`, with
    /// `A[i][j] = ∂²f/∂xᵢ∂xⱼ` stored row-major.
    ///
    /// Needed by the exact solver only; the default panics.
    fn eval_hessian(&mut self, x: &[F]) -> (F, Vec<F>, Vec<Vec<F>>) {
        let _ = x;
        unimplemented!("objective provides no dense Hessian")
    }

    /// `(c, A·v)`: the gradient at the base point `x`, which is the model's
    /// linear term, followed by the curvature along `v`.
    ///
    /// `x` stays fixed across one inner solve while `v` is the current trial
    /// step. Needed by the iterative solver only; the default panics.
    fn hvp(&mut self, x: &[F], v: &[F]) -> (Vec<F>, Vec<F>) {
        let _ = (x, v);
        unimplemented!("objective provides no Hessian-vector product")
    }
}
