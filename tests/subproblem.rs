use approx::assert_relative_eq;
use cubic_newton::solvers::exact::stationarity_residual;
use cubic_newton::{
    iterative, ray_line_search, solve_cubic_subproblem, sym_eigen, CubicError, ExactConfig,
    GradientDescent, Objective, RaySearchParams, ShapeError,
};

// ============================================================
// Helpers
// ============================================================

/// Deterministic generator of values in [-1, 1).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

fn random_problem(seed: u64, n: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut rng = Lcg(seed);
    let mut a = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let v = rng.next() * 3.0;
            a[i][j] = v;
            a[j][i] = v;
        }
    }
    let c = (0..n).map(|_| rng.next() * 2.0).collect();
    (c, a)
}

fn testing_config() -> ExactConfig<f64> {
    ExactConfig {
        testing: true,
        ..Default::default()
    }
}

/// f(x) = 0.5 * xᵀ diag(d) x + bᵀx, exposing only gradient and HVP.
struct DiagQuadratic {
    d: Vec<f64>,
    b: Vec<f64>,
}

impl Objective<f64> for DiagQuadratic {
    fn dim(&self) -> usize {
        self.d.len()
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let mut f = 0.0;
        let mut g = vec![0.0; x.len()];
        for i in 0..x.len() {
            f += 0.5 * self.d[i] * x[i] * x[i] + self.b[i] * x[i];
            g[i] = self.d[i] * x[i] + self.b[i];
        }
        (f, g)
    }

    fn hvp(&mut self, x: &[f64], v: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (_, g) = self.eval_grad(x);
        let hv = v.iter().zip(&self.d).map(|(&vi, &di)| vi * di).collect();
        (g, hv)
    }
}

// ============================================================
// Exact solver
// ============================================================

#[test]
fn exact_step_is_stationary_for_random_symmetric_problems() {
    for seed in 1..9u64 {
        for &n in &[1usize, 2, 3, 5, 8] {
            let (c, a) = random_problem(seed * 100 + n as u64, n);
            for &l in &[0.1, 1.0, 10.0] {
                // Testing mode enforces max residual < 0.01
                let sol = solve_cubic_subproblem(&c, &a, l, &testing_config())
                    .unwrap_or_else(|e| panic!("seed {seed}, n {n}, L {l}: {e}"));
                assert!(sol.tau >= 0.0);

                let r = stationarity_residual(&c, &a, l, &sol.step);
                assert!(r < 1e-8, "seed {seed}, n {n}, L {l}: residual {r}");
            }
        }
    }
}

#[test]
fn diagonal_scenario_regression() {
    let c = vec![2.0, 1.0];
    let a = vec![vec![4.0, 0.0], vec![0.0, 1.0]];
    let sol = solve_cubic_subproblem(&c, &a, 1.0, &testing_config()).unwrap();

    // Root of tau = ||x(tau)||, x_i(tau) = -c_i / (A_ii + tau / 2)
    assert_relative_eq!(sol.tau, 0.837_627_069_144_611_3, epsilon = 1e-12);
    assert_relative_eq!(sol.step[0], -0.452_610_182_428_433, epsilon = 1e-12);
    assert_relative_eq!(sol.step[1], -0.704_814_251_931_593_7, epsilon = 1e-12);
    assert!(stationarity_residual(&c, &a, 1.0, &sol.step) < 1e-12);
}

#[test]
fn rotated_hard_case_is_completed() {
    // diag(-1, 1) rotated by 45 degrees, gradient along the +1 eigenvector
    let h = std::f64::consts::FRAC_1_SQRT_2;
    let a = vec![vec![0.0, -1.0], vec![-1.0, 0.0]];
    let c = vec![h, -h];
    let sol = solve_cubic_subproblem(&c, &a, 1.0, &testing_config()).unwrap();

    assert_relative_eq!(sol.tau, 2.0, epsilon = 1e-10);
    assert_relative_eq!(sol.step.iter().map(|v| v * v).sum::<f64>().sqrt(), 2.0, epsilon = 1e-10);
    assert!(stationarity_residual(&c, &a, 1.0, &sol.step) < 1e-10);
}

#[test]
fn near_hard_case_sweep_stays_stationary() {
    let a = vec![vec![-1.0, 0.0], vec![0.0, 1.0]];
    for &l in &[0.5, 1.0, 4.0] {
        for &eps in &[1e-2, 1e-4, 1e-6, 1e-8, 1e-10] {
            let c = vec![eps, 1.0];
            let sol = solve_cubic_subproblem(&c, &a, l, &testing_config()).unwrap();
            let r = stationarity_residual(&c, &a, l, &sol.step);
            assert!(r < 1e-10, "L {l}, eps {eps}: residual {r}");
        }
    }
}

#[test]
fn exact_solver_is_idempotent() {
    let (c, a) = random_problem(42, 4);
    let first = solve_cubic_subproblem(&c, &a, 1.0, &ExactConfig::default()).unwrap();
    let second = solve_cubic_subproblem(&c, &a, 1.0, &ExactConfig::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn larger_l_gives_shorter_step() {
    let (c, a) = random_problem(7, 3);
    let small = solve_cubic_subproblem(&c, &a, 1.0, &ExactConfig::default()).unwrap();
    let large = solve_cubic_subproblem(&c, &a, 100.0, &ExactConfig::default()).unwrap();
    assert!(large.tau < small.tau);
}

#[test]
fn symmetry_within_tolerance_is_accepted() {
    let c = vec![0.1, -0.1];
    let a = vec![vec![2.0, 0.05], vec![0.0, 1.0]];
    assert!(solve_cubic_subproblem(&c, &a, 1.0, &ExactConfig::default()).is_ok());
}

#[test]
fn asymmetric_hessian_is_rejected() {
    let c = vec![0.1, -0.1];
    let a = vec![vec![2.0, 0.3], vec![0.0, 1.0]];
    let err = solve_cubic_subproblem(&c, &a, 1.0, &ExactConfig::default()).unwrap_err();
    match err {
        CubicError::AsymmetricHessian {
            max_asymmetry,
            tolerance,
        } => {
            assert_relative_eq!(max_asymmetry, 0.3);
            assert_relative_eq!(tolerance, 0.1);
        }
        other => panic!("expected AsymmetricHessian, got {other:?}"),
    }
}

#[test]
fn dimension_mismatch_is_rejected() {
    let err = solve_cubic_subproblem(
        &[1.0, 2.0, 3.0],
        &[vec![1.0, 0.0], vec![0.0, 1.0]],
        1.0,
        &ExactConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CubicError::InvalidShape(ShapeError::DimensionMismatch {
            gradient: 3,
            hessian: 2
        })
    );
}

#[test]
fn nan_regularization_is_rejected() {
    let err =
        solve_cubic_subproblem(&[1.0], &[vec![1.0]], f64::NAN, &ExactConfig::default()).unwrap_err();
    assert!(matches!(err, CubicError::InvalidRegularization { .. }));
}

#[test]
fn f32_exact_step() {
    let c = vec![2.0_f32, 1.0];
    let a = vec![vec![4.0_f32, 0.0], vec![0.0, 1.0]];
    let config = ExactConfig::<f32> {
        testing: true,
        ..Default::default()
    };
    let sol = solve_cubic_subproblem(&c, &a, 1.0, &config).unwrap();
    assert!((sol.tau - 0.837_627).abs() < 5e-3);
}

// ============================================================
// Eigendecomposition
// ============================================================

#[test]
fn jacobi_matches_nalgebra_eigenvalues() {
    for seed in 1..6u64 {
        let n = 6;
        let (_, a) = random_problem(seed, n);
        let ours = sym_eigen(&a);

        let flat: Vec<f64> = a.iter().flatten().copied().collect();
        let m = nalgebra::DMatrix::from_row_slice(n, n, &flat);
        let mut theirs: Vec<f64> = m.symmetric_eigen().eigenvalues.iter().copied().collect();
        theirs.sort_by(|x, y| x.partial_cmp(y).unwrap());

        for (o, t) in ours.values.iter().zip(&theirs) {
            assert_relative_eq!(*o, *t, epsilon = 1e-10);
        }
    }
}

// ============================================================
// Ray line search
// ============================================================

#[test]
fn ray_search_beats_dense_grid_on_cubic_dual() {
    // Dual of A = diag(4, 1), c = (2, 1), L = 1
    let g = |tau: f64| tau.powi(3) / 12.0 + 0.5 * (4.0 / (4.0 + tau / 2.0) + 1.0 / (1.0 + tau / 2.0));
    let params = RaySearchParams::default();
    let tau = ray_line_search(g, 0.0, 2.0, &params);
    assert!(tau >= 0.0);

    let g_star = g(tau);
    for k in 0..=10_000 {
        let t = k as f64 * 1e-3;
        assert!(
            g_star <= g(t) + 1e-12,
            "g({}) = {} < g(tau*) = {}",
            t,
            g(t),
            g_star
        );
    }
}

#[test]
fn ray_search_is_deterministic() {
    let g = |t: f64| (t - 5.5).powi(2) + 0.1 * t;
    let params = RaySearchParams::default();
    assert_eq!(
        ray_line_search(g, 0.0, 2.0, &params),
        ray_line_search(g, 0.0, 2.0, &params)
    );
}

// ============================================================
// Iterative solver
// ============================================================

#[test]
fn iterative_succeeds_with_generous_settings() {
    let mut obj = DiagQuadratic {
        d: vec![2.0, 1.5, 1.0],
        b: vec![1.0, -0.5, 0.25],
    };
    let mut gd = GradientDescent::new(0.1);
    let res = iterative(&mut obj, &[0.0, 0.0, 0.0], 1.0, &mut gd, 100, 0.5);
    assert!(res.converged);
    assert!(res.iterations <= 100);
}

#[test]
fn iterative_without_budget_reports_failure() {
    let mut obj = DiagQuadratic {
        d: vec![2.0, 1.5, 1.0],
        b: vec![1.0, -0.5, 0.25],
    };
    let mut gd = GradientDescent::new(0.1);
    let res = iterative(&mut obj, &[0.0, 0.0, 0.0], 1.0, &mut gd, 0, 0.5);
    assert!(!res.converged);
    assert_eq!(res.step, vec![0.0; 3]);
}

#[test]
fn iterative_evaluates_derivatives_at_the_given_point() {
    // Gradient at x = (1, 1) is d + b = (3, 0.5, 1.25); the step must oppose it
    let mut obj = DiagQuadratic {
        d: vec![2.0, 1.5, 1.0],
        b: vec![1.0, -1.0, 0.25],
    };
    let mut gd = GradientDescent::new(0.1);
    let res = iterative(&mut obj, &[1.0, 1.0, 1.0], 1.0, &mut gd, 200, 1e-6);
    assert!(res.converged);
    assert!(res.step.iter().all(|&s| s < 0.0), "step = {:?}", res.step);
}
