//! Update rules for the Hessian-free subproblem solver.
//!
//! The iterative solver only needs one capability from its inner optimizer:
//! given the current trial step and the model gradient at that step, move
//! the trial step. [`InnerOptimizer`] is that capability; [`Subsolver`] is
//! the configuration-level selector that builds one of the bundled rules.

use num_traits::Float;

/// A gradient-based update rule driving the trial step of the iterative solver.
pub trait InnerOptimizer<F> {
    /// Update `x` in place given the (pseudo-)gradient `grad` at `x`.
    fn update(&mut self, x: &mut [F], grad: &[F]);
}

/// Plain gradient descent: `x ← x − lr·g`.
#[derive(Debug, Clone)]
pub struct GradientDescent<F> {
    /// Step size.
    pub lr: F,
}

impl<F: Float> GradientDescent<F> {
    /// Gradient descent with step size `lr`.
    pub fn new(lr: F) -> Self {
        GradientDescent { lr }
    }
}

impl<F: Float> InnerOptimizer<F> for GradientDescent<F> {
    fn update(&mut self, x: &mut [F], grad: &[F]) {
        debug_assert_eq!(x.len(), grad.len());
        for (xi, &gi) in x.iter_mut().zip(grad) {
            *xi = *xi - self.lr * gi;
        }
    }
}

/// Heavy-ball momentum: `v ← μ·v + g`, `x ← x − lr·v`.
#[derive(Debug, Clone)]
pub struct Momentum<F> {
    /// Step size.
    pub lr: F,
    /// Momentum coefficient `μ`.
    pub momentum: F,
    velocity: Vec<F>,
}

impl<F: Float> Momentum<F> {
    /// Momentum rule for a `dim`-dimensional trial step.
    pub fn new(dim: usize, lr: F, momentum: F) -> Self {
        Momentum {
            lr,
            momentum,
            velocity: vec![F::zero(); dim],
        }
    }
}

impl<F: Float> InnerOptimizer<F> for Momentum<F> {
    fn update(&mut self, x: &mut [F], grad: &[F]) {
        debug_assert_eq!(x.len(), grad.len());
        if self.velocity.len() != x.len() {
            self.velocity = vec![F::zero(); x.len()];
        }
        for i in 0..x.len() {
            self.velocity[i] = self.momentum * self.velocity[i] + grad[i];
            x[i] = x[i] - self.lr * self.velocity[i];
        }
    }
}

/// Adam with bias-corrected first and second moments.
#[derive(Debug, Clone)]
pub struct Adam<F> {
    /// Step size.
    pub lr: F,
    /// First moment decay.
    pub beta1: F,
    /// Second moment decay.
    pub beta2: F,
    /// Denominator regularizer.
    pub eps: F,
    m: Vec<F>,
    v: Vec<F>,
    t: i32,
}

impl<F: Float> Adam<F> {
    /// Adam rule for a `dim`-dimensional trial step.
    pub fn new(dim: usize, lr: F, beta1: F, beta2: F, eps: F) -> Self {
        Adam {
            lr,
            beta1,
            beta2,
            eps,
            m: vec![F::zero(); dim],
            v: vec![F::zero(); dim],
            t: 0,
        }
    }
}

impl<F: Float> InnerOptimizer<F> for Adam<F> {
    fn update(&mut self, x: &mut [F], grad: &[F]) {
        debug_assert_eq!(x.len(), grad.len());
        if self.m.len() != x.len() {
            self.m = vec![F::zero(); x.len()];
            self.v = vec![F::zero(); x.len()];
            self.t = 0;
        }
        self.t = self.t.saturating_add(1);
        let one = F::one();
        let bias1 = one - self.beta1.powi(self.t);
        let bias2 = one - self.beta2.powi(self.t);

        for i in 0..x.len() {
            let g = grad[i];
            self.m[i] = self.beta1 * self.m[i] + (one - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (one - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            x[i] = x[i] - self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

/// Selector for the inner optimizer of the iterative subproblem solver,
/// together with its arguments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subsolver<F> {
    /// [`GradientDescent`].
    GradientDescent {
        /// Step size.
        lr: F,
    },
    /// [`Momentum`].
    Momentum {
        /// Step size.
        lr: F,
        /// Momentum coefficient.
        momentum: F,
    },
    /// [`Adam`].
    Adam {
        /// Step size.
        lr: F,
        /// First moment decay.
        beta1: F,
        /// Second moment decay.
        beta2: F,
        /// Denominator regularizer.
        eps: F,
    },
}

impl Default for Subsolver<f64> {
    fn default() -> Self {
        Subsolver::GradientDescent { lr: 1e-2 }
    }
}

impl Default for Subsolver<f32> {
    fn default() -> Self {
        Subsolver::GradientDescent { lr: 1e-2 }
    }
}

impl<F: Float> Subsolver<F> {
    /// Build a fresh (zero-state) update rule for a `dim`-dimensional trial step.
    pub fn build(&self, dim: usize) -> SubsolverState<F> {
        match *self {
            Subsolver::GradientDescent { lr } => {
                SubsolverState::GradientDescent(GradientDescent::new(lr))
            }
            Subsolver::Momentum { lr, momentum } => {
                SubsolverState::Momentum(Momentum::new(dim, lr, momentum))
            }
            Subsolver::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => SubsolverState::Adam(Adam::new(dim, lr, beta1, beta2, eps)),
        }
    }

    /// Whether the arguments are usable (finite, non-negative step size and
    /// decay factors in `[0, 1)`).
    pub(crate) fn is_valid(&self) -> bool {
        let unit = |b: F| b >= F::zero() && b < F::one();
        match *self {
            Subsolver::GradientDescent { lr } => lr.is_finite() && lr >= F::zero(),
            Subsolver::Momentum { lr, momentum } => {
                lr.is_finite() && lr >= F::zero() && unit(momentum)
            }
            Subsolver::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => lr.is_finite() && lr >= F::zero() && unit(beta1) && unit(beta2) && eps > F::zero(),
        }
    }
}

/// Stateful rule built by [`Subsolver::build`].
#[derive(Debug, Clone)]
pub enum SubsolverState<F> {
    /// See [`GradientDescent`].
    GradientDescent(GradientDescent<F>),
    /// See [`Momentum`].
    Momentum(Momentum<F>),
    /// See [`Adam`].
    Adam(Adam<F>),
}

impl<F: Float> InnerOptimizer<F> for SubsolverState<F> {
    fn update(&mut self, x: &mut [F], grad: &[F]) {
        match self {
            SubsolverState::GradientDescent(o) => o.update(x, grad),
            SubsolverState::Momentum(o) => o.update(x, grad),
            SubsolverState::Adam(o) => o.update(x, grad),
        }
    }
}
