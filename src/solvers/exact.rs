use num_traits::Float;

use crate::convergence::{dot, max_abs, norm};
use crate::error::{to_f64, CubicError, ShapeError};
use crate::line_search::{ray_line_search, RaySearchParams};
use crate::linalg::{mat_vec, max_asymmetry, sym_eigen};
use crate::objective::Objective;

/// Bracket doublings allowed in the dual search; `2^64` covers any finite `τ*`.
const DUAL_MAX_EXPANSIONS: usize = 64;

/// Newton/bisection iterations polishing the shift; bisection alone halves a
/// double-precision bracket to rounding in well under this.
const SECULAR_MAX_ITERS: usize = 100;

/// Configuration for the exact (eigendecomposition-based) subproblem solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactConfig<F> {
    /// Absolute tolerance of the dual line search (default: 1e-8).
    pub delta: F,
    /// Largest accepted `max |Aᵀ − A|` (default: 0.1).
    pub symmetry_tol: F,
    /// Stationarity residual bound checked in testing mode (default: 0.01).
    pub optimality_tol: F,
    /// Verify stationarity of every returned step (default: false).
    pub testing: bool,
}

impl Default for ExactConfig<f64> {
    fn default() -> Self {
        ExactConfig {
            delta: 1e-8,
            symmetry_tol: 0.1,
            optimality_tol: 0.01,
            testing: false,
        }
    }
}

impl Default for ExactConfig<f32> {
    fn default() -> Self {
        ExactConfig {
            delta: 1e-5,
            symmetry_tol: 0.1,
            optimality_tol: 0.01,
            testing: false,
        }
    }
}

/// Minimizer of the cubic model for a given gradient and Hessian.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicStep<F> {
    /// The step `x*`.
    pub step: Vec<F>,
    /// Optimal dual variable `τ*` (equals `‖x*‖` at the exact optimum).
    pub tau: F,
    /// Eigenvalues of the Hessian, ascending.
    pub eigenvalues: Vec<F>,
}

/// Result of [`exact`]: the step together with the Hessian it was computed from.
#[derive(Debug, Clone)]
pub struct ExactStep<F> {
    /// The step `x*`.
    pub step: Vec<F>,
    /// Optimal dual variable `τ*`.
    pub tau: F,
    /// Hessian used for this step, for reuse by a lazy-Hessian caller.
    pub hessian: Vec<Vec<F>>,
}

/// Exactly minimize `cᵀx + ½ xᵀAx + (L/6)‖x‖³`.
///
/// With `A = U diag(T) Uᵀ` and `ct = Uᵀc`, the minimizer is
/// `x*(τ) = −U (T + (L/2)τ)⁻¹ ct` for the `τ ≥ 0` minimizing the convex dual
///
/// ```text
/// g(τ) = (L/12) τ³ + ½ Σᵢ ctᵢ² / (Tᵢ + (L/2)τ)
/// ```
///
/// on its domain `τ > −2·T_min/L`; outside the domain `g` is treated as `+∞`.
/// The dual is searched with [`ray_line_search`] from the bracket
/// `[left, left + 2]`, `left = max(0, −2·T_min/L)` (i.e. `[0, 2]` for a
/// positive semidefinite Hessian). The search result is then polished on the
/// secular equation `‖x*(τ)‖ = τ`, so the step stays stationary when
/// `T_min + (L/2)τ*` is close to zero.
///
/// If `A` is indefinite and `c` is orthogonal to the bottom eigenspace (the
/// "hard case"), the dual optimum is `τ* = −2·T_min/L` with `‖x*(τ*)‖ < τ*`.
/// The step is then completed along the first eigenvector to length `τ*`,
/// which moves the iterate off a saddle point even for `c = 0`. Components of
/// `ct` below `ε·‖c‖` count as zero here.
///
/// # Errors
///
/// - [`CubicError::InvalidRegularization`] if `l <= 0`.
/// - [`CubicError::InvalidShape`] if `a` is not `n x n` with `n = c.len()`.
/// - [`CubicError::AsymmetricHessian`] if `max |Aᵀ − A| > config.symmetry_tol`.
/// - [`CubicError::OptimumNotReached`] in testing mode, if the stationarity
///   residual `max |c + (L/2)‖x‖x + Ax|` is not below `config.optimality_tol`.
pub fn solve_cubic_subproblem<F: Float>(
    c: &[F],
    a: &[Vec<F>],
    l: F,
    config: &ExactConfig<F>,
) -> Result<CubicStep<F>, CubicError> {
    // Negated form also rejects NaN
    if !(l > F::zero()) {
        return Err(CubicError::InvalidRegularization { l: to_f64(l) });
    }
    validate_hessian(c, a, config.symmetry_tol)?;

    let two = F::one() + F::one();
    let half_l = l / two;
    let l_twelfth = l / (two * two * (two + F::one()));

    let eig = sym_eigen(a);
    let t = &eig.values;
    let mut ct = eig.rotate_in(c);
    // Components at rounding level would put a pole at sigma ~ 0 that the
    // bracketed iteration cannot reach; treat them as exact zeros.
    let bottom_sign = ct.first().map_or(F::one(), |&c0| {
        if c0 > F::zero() {
            F::zero() - F::one()
        } else {
            F::one()
        }
    });
    let negligible = F::epsilon() * norm(&ct);
    for ci in ct.iter_mut() {
        if ci.abs() <= negligible {
            *ci = F::zero();
        }
    }
    let t_min = match eig.min_value() {
        Some(v) => v,
        None => {
            return Ok(CubicStep {
                step: Vec::new(),
                tau: F::zero(),
                eigenvalues: Vec::new(),
            })
        }
    };

    let dual = |tau: F| {
        let mut s = F::zero();
        for (&ti, &ci) in t.iter().zip(&ct) {
            if ci == F::zero() {
                continue;
            }
            let denom = ti + half_l * tau;
            if denom <= F::zero() {
                return F::infinity();
            }
            s = s + ci * ci / denom;
        }
        l_twelfth * tau * tau * tau + s / two
    };

    let left = (F::zero() - t_min / half_l).max(F::zero());
    let params = RaySearchParams {
        delta: config.delta,
        max_expansions: DUAL_MAX_EXPANSIONS,
    };
    let tau_search = ray_line_search(dual, left, left + two, &params);

    // Denominators are d_i + sigma with sigma = T_min + (L/2)·tau, so the
    // bottom eigenvalue contributes an exact zero to d.
    let d: Vec<F> = t.iter().map(|&ti| ti - t_min).collect();
    let shift = secular_shift(&d, &ct, t_min, l, t_min + half_l * tau_search);
    let tau = (shift.sigma - t_min) / half_l;

    // x* = -U (inv(tau) ⊙ ct); zero rotated components contribute nothing
    let mut scaled: Vec<F> = d
        .iter()
        .zip(&ct)
        .map(|(&di, &ci)| {
            if ci == F::zero() {
                F::zero()
            } else {
                F::zero() - ci / (di + shift.sigma)
            }
        })
        .collect();
    if shift.hard_case {
        // c has no component along the bottom eigenvector: move along it
        // until the step reaches length tau
        let gap = tau * tau - dot(&scaled, &scaled);
        scaled[0] = scaled[0] + bottom_sign * gap.max(F::zero()).sqrt();
    }
    let step = eig.rotate_out(&scaled);

    if config.testing {
        let residual = stationarity_residual(c, a, l, &step);
        if !(residual < config.optimality_tol) {
            return Err(CubicError::OptimumNotReached {
                residual: to_f64(residual),
                tolerance: to_f64(config.optimality_tol),
            });
        }
    }

    Ok(CubicStep {
        step,
        tau,
        eigenvalues: eig.values,
    })
}

/// Optimal eigenvalue shift `σ = T_min + (L/2)·τ` of the cubic model.
struct Shift<F> {
    sigma: F,
    /// `σ = 0` with `‖x(σ)‖ < τ`: the step needs a bottom-eigenvector component.
    hard_case: bool,
}

/// Solve the secular equation `‖x(σ)‖ = τ(σ)` on `σ ≥ max(0, T_min)`.
///
/// `d` holds `Tᵢ − T_min` (ascending, `d[0] = 0`). The dual search only
/// resolves `τ` to an absolute tolerance, which is not enough when `σ` sits
/// next to a pole of `x(σ)`; its estimate `guess` seeds a safeguarded Newton
/// iteration on `φ(σ) = 1/‖x(σ)‖ − 1/τ(σ)`, which is increasing in `σ`.
fn secular_shift<F: Float>(d: &[F], ct: &[F], t_min: F, l: F, guess: F) -> Shift<F> {
    let two = F::one() + F::one();
    let floor = t_min.max(F::zero());
    let c_norm = norm(ct);

    if c_norm == F::zero() {
        return Shift {
            sigma: floor,
            hard_case: t_min < F::zero(),
        };
    }

    if t_min < F::zero() {
        // No pole at σ = 0 when every bottom component of ct vanishes; then
        // x(0) may already be shorter than τ(0) and no root exists.
        let pole_at_zero = d
            .iter()
            .zip(ct)
            .any(|(&di, &ci)| ci != F::zero() && di <= F::zero());
        if !pole_at_zero {
            let mut w = F::zero();
            for (&di, &ci) in d.iter().zip(ct) {
                if ci != F::zero() {
                    w = w + (ci / di) * (ci / di);
                }
            }
            if w.sqrt() <= (F::zero() - t_min) * two / l {
                return Shift {
                    sigma: F::zero(),
                    hard_case: true,
                };
            }
        }
    }

    // φ(hi) ≥ 0 since ‖x(σ)‖ ≤ ‖c‖/σ
    let mut lo = floor;
    let mut hi = floor + (l * c_norm / two).sqrt();
    let mut sigma = if guess > lo && guess < hi {
        guess
    } else {
        (lo + hi) / two
    };

    for _ in 0..SECULAR_MAX_ITERS {
        let (phi, dphi) = secular(d, ct, t_min, l, sigma);
        if phi == F::zero() {
            break;
        }
        if phi < F::zero() || phi.is_nan() {
            lo = sigma;
        } else {
            hi = sigma;
        }

        let newton = sigma - phi / dphi;
        let next = if dphi > F::zero() && newton > lo && newton < hi {
            newton
        } else {
            (lo + hi) / two
        };
        let done = (next - sigma).abs() <= F::epsilon() * next.abs();
        sigma = next;
        if done {
            break;
        }
    }

    Shift {
        sigma,
        hard_case: false,
    }
}

/// `φ(σ)` and `φ'(σ)`; `φ = −∞` at or left of a pole and at `τ ≤ 0`.
fn secular<F: Float>(d: &[F], ct: &[F], t_min: F, l: F, sigma: F) -> (F, F) {
    let two = F::one() + F::one();
    let tau = two * (sigma - t_min) / l;
    if tau <= F::zero() {
        return (F::neg_infinity(), F::zero());
    }

    // w = ‖x‖², s3 = Σ ctᵢ² / (dᵢ + σ)³
    let mut w = F::zero();
    let mut s3 = F::zero();
    for (&di, &ci) in d.iter().zip(ct) {
        if ci == F::zero() {
            continue;
        }
        let den = di + sigma;
        if den <= F::zero() {
            return (F::neg_infinity(), F::zero());
        }
        let q = (ci / den) * (ci / den);
        w = w + q;
        s3 = s3 + q / den;
    }

    let nx = w.sqrt();
    let phi = F::one() / nx - F::one() / tau;
    let dphi = s3 / (w * nx) + two / (l * tau * tau);
    (phi, dphi)
}

/// Compute a cubic Newton step at `x` from the objective's gradient and Hessian.
///
/// If `cached_hessian` is given it is used in place of a fresh Hessian and only
/// the gradient is evaluated; otherwise `obj.eval_hessian(x)` supplies both.
/// The Hessian actually used is returned in [`ExactStep::hessian`].
///
/// # Errors
///
/// Same as [`solve_cubic_subproblem`].
pub fn exact<F: Float, O: Objective<F>>(
    obj: &mut O,
    x: &[F],
    l: F,
    cached_hessian: Option<&[Vec<F>]>,
    config: &ExactConfig<F>,
) -> Result<ExactStep<F>, CubicError> {
    let (grad, hessian) = match cached_hessian {
        Some(h) => {
            let (_, grad) = obj.eval_grad(x);
            (grad, h.to_vec())
        }
        None => {
            let (_, grad, hess) = obj.eval_hessian(x);
            (grad, hess)
        }
    };

    let sol = solve_cubic_subproblem(&grad, &hessian, l, config)?;
    Ok(ExactStep {
        step: sol.step,
        tau: sol.tau,
        hessian,
    })
}

/// `max |c + (L/2)‖x‖x + Ax|`, the gradient of the cubic model at `x`.
pub fn stationarity_residual<F: Float>(c: &[F], a: &[Vec<F>], l: F, x: &[F]) -> F {
    let two = F::one() + F::one();
    let scale = l / two * norm(x);
    let ax = mat_vec(a, x);
    let r: Vec<F> = c
        .iter()
        .zip(&ax)
        .zip(x)
        .map(|((&ci, &axi), &xi)| ci + scale * xi + axi)
        .collect();
    max_abs(&r)
}

fn validate_hessian<F: Float>(c: &[F], a: &[Vec<F>], symmetry_tol: F) -> Result<(), CubicError> {
    let n = a.len();
    if c.len() != n {
        return Err(ShapeError::DimensionMismatch {
            gradient: c.len(),
            hessian: n,
        }
        .into());
    }
    if let Some((row, r)) = a.iter().enumerate().find(|(_, r)| r.len() != n) {
        return Err(ShapeError::NonSquareHessian {
            row,
            len: r.len(),
            expected: n,
        }
        .into());
    }

    let asym = max_asymmetry(a);
    if !(asym <= symmetry_tol) {
        return Err(CubicError::AsymmetricHessian {
            max_asymmetry: to_f64(asym),
            tolerance: to_f64(symmetry_tol),
        });
    }
    Ok(())
}
