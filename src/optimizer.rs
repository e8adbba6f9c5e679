use std::fmt;

use log::{debug, warn};
use num_traits::Float;

use crate::convergence::norm;
use crate::error::{to_f64, CubicError, ShapeError};
use crate::flatten::{flatten, Layout};
use crate::inner::Subsolver;
use crate::objective::Objective;
use crate::solvers::exact::{exact, ExactConfig};
use crate::solvers::iterative::iterative;

/// Lazy-Hessian options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LazyConfig {
    /// Recompute the Hessian every `step_per_update` steps under
    /// [`CubicNewton::step_lazy`] (default: 1, i.e. every step).
    pub step_per_update: usize,
}

impl Default for LazyConfig {
    fn default() -> Self {
        LazyConfig { step_per_update: 1 }
    }
}

/// Per-group configuration of the cubic Newton optimizer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicNewtonConfig<F> {
    /// Estimate of the Hessian's Lipschitz constant, must be > 0 (default: 1.0).
    pub l: F,
    /// Inner optimizer for the Hessian-free solver. `None` selects the exact
    /// eigendecomposition solver (default: `None`).
    pub subsolver: Option<Subsolver<F>>,
    /// Inner iteration budget of the Hessian-free solver (default: 100).
    pub max_iters: usize,
    /// Relative stopping tolerance of the Hessian-free solver (default: 0.1).
    pub rel_acc: F,
    /// Lazy-Hessian options.
    pub lazy: LazyConfig,
    /// Log a warning when the inner solve stops short of `rel_acc` (default: true).
    pub verbose: bool,
    /// Exact solver options, including the testing-mode optimality check.
    pub exact: ExactConfig<F>,
}

impl Default for CubicNewtonConfig<f64> {
    fn default() -> Self {
        CubicNewtonConfig {
            l: 1.0,
            subsolver: None,
            max_iters: 100,
            rel_acc: 0.1,
            lazy: LazyConfig::default(),
            verbose: true,
            exact: ExactConfig::default(),
        }
    }
}

impl Default for CubicNewtonConfig<f32> {
    fn default() -> Self {
        CubicNewtonConfig {
            l: 1.0,
            subsolver: None,
            max_iters: 100,
            rel_acc: 0.1,
            lazy: LazyConfig::default(),
            verbose: true,
            exact: ExactConfig::default(),
        }
    }
}

impl<F: Float> CubicNewtonConfig<F> {
    fn validate(&self) -> Result<(), CubicError> {
        if !(self.l > F::zero()) {
            return Err(CubicError::InvalidRegularization { l: to_f64(self.l) });
        }
        if !(self.rel_acc >= F::zero()) {
            return Err(CubicError::InvalidConfig("rel_acc must be non-negative"));
        }
        if self.lazy.step_per_update == 0 {
            return Err(CubicError::InvalidConfig("step_per_update must be at least 1"));
        }
        if !(self.exact.delta > F::zero()) {
            return Err(CubicError::InvalidConfig("line search delta must be positive"));
        }
        if !(self.exact.symmetry_tol >= F::zero()) {
            return Err(CubicError::InvalidConfig(
                "symmetry tolerance must be non-negative",
            ));
        }
        if let Some(sub) = &self.subsolver {
            if !sub.is_valid() {
                return Err(CubicError::InvalidConfig("invalid subsolver arguments"));
            }
        }
        Ok(())
    }
}

/// Which subproblem solver produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Eigendecomposition and dual line search.
    Exact,
    /// Hessian-free inner iterations.
    Iterative,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Exact => write!(f, "exact"),
            SolverKind::Iterative => write!(f, "iterative"),
        }
    }
}

/// Diagnostics of the most recent step of a parameter group.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport<F> {
    /// Solver that produced the step.
    pub solver: SolverKind,
    /// `false` only when the iterative solver ran out of inner iterations.
    pub converged: bool,
    /// Inner iterations used (0 for the exact solver).
    pub inner_iters: usize,
    /// Whether a cached Hessian was reused.
    pub hessian_reused: bool,
    /// Optimal dual variable (exact solver only).
    pub tau: Option<F>,
    /// Euclidean norm of the applied step.
    pub step_norm: F,
}

/// A set of parameters sharing one configuration, with its lazy-Hessian state.
#[derive(Debug, Clone)]
pub struct ParamGroup<F> {
    params: Vec<Vec<F>>,
    layout: Layout,
    config: CubicNewtonConfig<F>,
    cached_hessian: Option<Vec<Vec<F>>>,
    steps: usize,
    last_report: Option<StepReport<F>>,
}

impl<F: Float> ParamGroup<F> {
    /// Create a group, validating its configuration.
    ///
    /// # Errors
    ///
    /// [`CubicError::InvalidRegularization`] if `config.l <= 0`,
    /// [`CubicError::InvalidConfig`] for other invalid settings.
    pub fn new(params: Vec<Vec<F>>, config: CubicNewtonConfig<F>) -> Result<Self, CubicError> {
        config.validate()?;
        let layout = Layout::of(&params);
        Ok(ParamGroup {
            params,
            layout,
            config,
            cached_hessian: None,
            steps: 0,
            last_report: None,
        })
    }

    /// Current parameter tensors.
    pub fn params(&self) -> &[Vec<F>] {
        &self.params
    }

    /// Group configuration.
    pub fn config(&self) -> &CubicNewtonConfig<F> {
        &self.config
    }

    /// Flat dimension of the group.
    pub fn dim(&self) -> usize {
        self.layout.total()
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Last Hessian computed by the exact solver.
    pub fn cached_hessian(&self) -> Option<&[Vec<F>]> {
        self.cached_hessian.as_deref()
    }

    /// Diagnostics of the last step.
    pub fn last_report(&self) -> Option<&StepReport<F>> {
        self.last_report.as_ref()
    }

    /// Whether the lazy policy asks for a fresh Hessian at the next step.
    pub fn hessian_due(&self) -> bool {
        self.cached_hessian.is_none() || self.steps % self.config.lazy.step_per_update == 0
    }
}

/// Cubic-regularized Newton optimizer.
///
/// Each call to [`step`](Self::step) minimizes, for every parameter group in
/// turn, the model `cᵀs + ½ sᵀAs + (L/6)‖s‖³` built from the objective's
/// derivatives at the current parameters and adds the minimizer `s` to them.
///
/// The objective is defined over the concatenation of all groups' flattened
/// parameters, in group order. While a group is stepped the other groups are
/// held at their current values, and only that group's block of the
/// gradient, Hessian and Hessian-vector products is used.
#[derive(Debug, Clone)]
pub struct CubicNewton<F> {
    groups: Vec<ParamGroup<F>>,
}

impl<F: Float> CubicNewton<F> {
    /// Optimizer over a single parameter group.
    ///
    /// # Errors
    ///
    /// See [`ParamGroup::new`].
    pub fn new(params: Vec<Vec<F>>, config: CubicNewtonConfig<F>) -> Result<Self, CubicError> {
        Ok(CubicNewton {
            groups: vec![ParamGroup::new(params, config)?],
        })
    }

    /// Optimizer over already constructed groups.
    pub fn from_groups(groups: Vec<ParamGroup<F>>) -> Self {
        CubicNewton { groups }
    }

    /// Append a parameter group.
    ///
    /// # Errors
    ///
    /// See [`ParamGroup::new`].
    pub fn add_param_group(
        &mut self,
        params: Vec<Vec<F>>,
        config: CubicNewtonConfig<F>,
    ) -> Result<(), CubicError> {
        self.groups.push(ParamGroup::new(params, config)?);
        Ok(())
    }

    /// All parameter groups.
    pub fn groups(&self) -> &[ParamGroup<F>] {
        &self.groups
    }

    /// Parameter tensors of every group, in group order.
    pub fn params(&self) -> Vec<&[Vec<F>]> {
        self.groups.iter().map(ParamGroup::params).collect()
    }

    /// Total flat dimension over all groups.
    pub fn dim(&self) -> usize {
        self.groups.iter().map(ParamGroup::dim).sum()
    }

    /// Concatenation of all groups' flattened parameters.
    pub fn flat_params(&self) -> Vec<F> {
        let mut out = Vec::with_capacity(self.dim());
        for group in &self.groups {
            out.extend(flatten(&group.params));
        }
        out
    }

    /// Take one cubic Newton step for every group.
    ///
    /// With `hess = false` each exact-solver group reuses its cached Hessian
    /// (computing one if nothing is cached yet) and only the gradient is
    /// evaluated. Groups with a subsolver never form the Hessian.
    ///
    /// # Errors
    ///
    /// Structural errors of the exact solver (shape, symmetry, and the
    /// testing-mode optimality check) and [`ShapeError::OracleOutput`] for
    /// derivatives of the wrong length are returned immediately; the failing
    /// group is left unchanged and later groups are not stepped.
    pub fn step<O: Objective<F>>(&mut self, obj: &mut O, hess: bool) -> Result<(), CubicError> {
        for gi in 0..self.groups.len() {
            self.step_group(gi, obj, hess)?;
        }
        Ok(())
    }

    /// Like [`step`](Self::step), but each group decides from its own step
    /// counter whether to refresh the Hessian ([`ParamGroup::hessian_due`]).
    ///
    /// # Errors
    ///
    /// Same as [`step`](Self::step).
    pub fn step_lazy<O: Objective<F>>(&mut self, obj: &mut O) -> Result<(), CubicError> {
        for gi in 0..self.groups.len() {
            let hess = self.groups[gi].hessian_due();
            self.step_group(gi, obj, hess)?;
        }
        Ok(())
    }

    fn step_group<O: Objective<F>>(
        &mut self,
        gi: usize,
        obj: &mut O,
        hess: bool,
    ) -> Result<(), CubicError> {
        let full = self.flat_params();
        let offset: usize = self.groups[..gi].iter().map(ParamGroup::dim).sum();
        let group = &mut self.groups[gi];
        let n = group.dim();
        let x = full[offset..offset + n].to_vec();

        let mut view = GroupObjective {
            inner: obj,
            full,
            offset,
            len: n,
            malformed: None,
        };

        let config = &group.config;
        let (step, mut report) = match &config.subsolver {
            None => {
                let cached = if hess {
                    None
                } else {
                    group.cached_hessian.as_deref()
                };
                if !hess && cached.is_none() {
                    debug!("group {gi}: no cached Hessian to reuse, computing a fresh one");
                }
                let hessian_reused = cached.is_some();

                let res = exact(&mut view, &x, config.l, cached, &config.exact);
                view.verified()?;
                let res = res?;
                group.cached_hessian = Some(res.hessian);

                let report = StepReport {
                    solver: SolverKind::Exact,
                    converged: true,
                    inner_iters: 0,
                    hessian_reused,
                    tau: Some(res.tau),
                    step_norm: F::zero(),
                };
                (res.step, report)
            }
            Some(sub) => {
                let mut inner = sub.build(n);
                let res = iterative(
                    &mut view,
                    &x,
                    config.l,
                    &mut inner,
                    config.max_iters,
                    config.rel_acc,
                );
                view.verified()?;
                if !res.converged && config.verbose {
                    warn!(
                        "group {gi}: subproblem was solved inaccurately \
                         ({} inner iterations, rel_acc = {})",
                        res.iterations,
                        to_f64(config.rel_acc)
                    );
                }

                let report = StepReport {
                    solver: SolverKind::Iterative,
                    converged: res.converged,
                    inner_iters: res.iterations,
                    hessian_reused: false,
                    tau: None,
                    step_norm: F::zero(),
                };
                (res.step, report)
            }
        };

        let updates = group.layout.unflatten(&step)?;
        for (p, u) in group.params.iter_mut().zip(updates) {
            for (pi, ui) in p.iter_mut().zip(u) {
                *pi = *pi + ui;
            }
        }

        report.step_norm = norm(&step);
        debug!(
            "group {gi}: step {} via {} solver, |s| = {:e}, hessian reused: {}",
            group.steps,
            report.solver,
            to_f64(report.step_norm),
            report.hessian_reused
        );
        group.steps += 1;
        group.last_report = Some(report);
        Ok(())
    }
}

/// Restriction of an objective over all groups to one group's block.
struct GroupObjective<'a, F, O> {
    inner: &'a mut O,
    full: Vec<F>,
    offset: usize,
    len: usize,
    /// First oracle output whose length did not match `full`.
    malformed: Option<ShapeError>,
}

impl<F: Float, O: Objective<F>> GroupObjective<'_, F, O> {
    fn load(&mut self, x: &[F]) {
        self.full[self.offset..self.offset + self.len].copy_from_slice(x);
    }

    fn check(&mut self, got: usize) {
        let expected = self.full.len();
        if got != expected && self.malformed.is_none() {
            self.malformed = Some(ShapeError::OracleOutput { expected, got });
        }
    }

    fn verified(&mut self) -> Result<(), ShapeError> {
        match self.malformed.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn block(&self, v: &[F]) -> Vec<F> {
        v.iter().skip(self.offset).take(self.len).copied().collect()
    }
}

impl<F: Float, O: Objective<F>> Objective<F> for GroupObjective<'_, F, O> {
    fn dim(&self) -> usize {
        self.len
    }

    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>) {
        self.load(x);
        let (f, g) = self.inner.eval_grad(&self.full);
        self.check(g.len());
        (f, self.block(&g))
    }

    fn eval_hessian(&mut self, x: &[F]) -> (F, Vec<F>, Vec<Vec<F>>) {
        self.load(x);
        let (f, g, h) = self.inner.eval_hessian(&self.full);
        self.check(g.len());
        self.check(h.len());
        for row in &h {
            self.check(row.len());
        }
        if self.offset == 0 && self.len == self.full.len() {
            return (f, g, h);
        }
        let h_block = h
            .iter()
            .skip(self.offset)
            .take(self.len)
            .map(|row| self.block(row))
            .collect();
        (f, self.block(&g), h_block)
    }

    fn hvp(&mut self, x: &[F], v: &[F]) -> (Vec<F>, Vec<F>) {
        self.load(x);
        let mut dir = vec![F::zero(); self.full.len()];
        dir[self.offset..self.offset + self.len].copy_from_slice(v);
        let (g, hv) = self.inner.hvp(&self.full, &dir);
        self.check(g.len());
        self.check(hv.len());
        (self.block(&g), self.block(&hv))
    }
}
