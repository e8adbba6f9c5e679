use num_traits::Float;

use crate::convergence::norm;
use crate::inner::InnerOptimizer;
use crate::objective::Objective;

/// Outcome of [`iterative`].
#[derive(Debug, Clone, PartialEq)]
pub struct IterativeResult<F> {
    /// Whether the relative stopping rule was met.
    pub converged: bool,
    /// The (possibly inexact) step.
    pub step: Vec<F>,
    /// Number of inner iterations performed.
    pub iterations: usize,
}

/// Approximately minimize the cubic model at `x` using Hessian-vector products only.
///
/// Starting from `s = 0`, each iteration evaluates `(∇f(x), H(x)·s)` through
/// `obj.hvp`, forms the model gradient
///
/// ```text
/// g = ∇f(x) + H(x)·s + (L/2)‖s‖·s
/// ```
///
/// and lets `inner` update `s`. The solve stops as soon as
/// `‖g‖ < rel_acc · ‖∇f(x)‖`. After `max_iters` iterations the latest `s` is
/// returned with `converged = false`; running out of iterations is not an
/// error, the caller decides whether the step is good enough.
///
/// `x` is only read. The gradient norm test uses the gradient at the step
/// that was just updated from, so the returned step is one update past it.
/// If `obj.hvp` returns vectors whose length differs from `x.len()` the solve
/// stops there and returns the current step unconverged.
pub fn iterative<F: Float, O: Objective<F>, S: InnerOptimizer<F>>(
    obj: &mut O,
    x: &[F],
    l: F,
    inner: &mut S,
    max_iters: usize,
    rel_acc: F,
) -> IterativeResult<F> {
    let n = x.len();
    let half_l = l / (F::one() + F::one());

    let mut s = vec![F::zero(); n];
    let mut g = vec![F::zero(); n];

    for iter in 0..max_iters {
        let (df, hs) = obj.hvp(x, &s);
        if df.len() != n || hs.len() != n {
            // Malformed oracle output: keep the last well-formed trial step
            return IterativeResult {
                converged: false,
                step: s,
                iterations: iter,
            };
        }

        let scale = half_l * norm(&s);
        // Fresh model gradient; nothing accumulates across iterations
        for (((gi, &dfi), &hsi), &si) in g.iter_mut().zip(&df).zip(&hs).zip(&s) {
            *gi = dfi + hsi + scale * si;
        }

        inner.update(&mut s, &g);

        if norm(&g) < rel_acc * norm(&df) {
            return IterativeResult {
                converged: true,
                step: s,
                iterations: iter + 1,
            };
        }
    }

    IterativeResult {
        converged: false,
        step: s,
        iterations: max_iters,
    }
}
