use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cubic_newton::{
    iterative, solve_cubic_subproblem, sym_eigen, ExactConfig, GradientDescent, Objective,
};

/// Tridiagonal, indefinite for larger n: diag 2 - 4i/n, off-diagonal 0.5.
fn problem(n: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut a = vec![vec![0.0; n]; n];
    for i in 0..n {
        a[i][i] = 2.0 - 4.0 * i as f64 / n as f64;
        if i + 1 < n {
            a[i][i + 1] = 0.5;
            a[i + 1][i] = 0.5;
        }
    }
    let c = (0..n).map(|i| 1.0 - 0.1 * i as f64).collect();
    (c, a)
}

/// f(x) = 0.5 xᵀAx + cᵀx over the same matrix.
struct Quadratic {
    c: Vec<f64>,
    a: Vec<Vec<f64>>,
}

impl Quadratic {
    fn mul(&self, v: &[f64]) -> Vec<f64> {
        self.a
            .iter()
            .map(|row| row.iter().zip(v).map(|(r, x)| r * x).sum())
            .collect()
    }
}

impl Objective<f64> for Quadratic {
    fn dim(&self) -> usize {
        self.c.len()
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let ax = self.mul(x);
        let g: Vec<f64> = ax.iter().zip(&self.c).map(|(a, c)| a + c).collect();
        let f = x
            .iter()
            .zip(&ax)
            .zip(&self.c)
            .map(|((xi, axi), ci)| 0.5 * xi * axi + ci * xi)
            .sum();
        (f, g)
    }

    fn hvp(&mut self, x: &[f64], v: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (_, g) = self.eval_grad(x);
        (g, self.mul(v))
    }
}

fn bench_eigen(c: &mut Criterion) {
    let mut group = c.benchmark_group("sym_eigen");
    for n in [4, 16, 64] {
        let (_, a) = problem(n);
        group.bench_with_input(BenchmarkId::new("jacobi", n), &a, |b, a| {
            b.iter(|| black_box(sym_eigen(black_box(a))))
        });
    }
    group.finish();
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_subproblem");
    let config = ExactConfig::default();
    for n in [4, 16, 64] {
        let p = problem(n);
        group.bench_with_input(BenchmarkId::new("solve", n), &p, |b, (cv, a)| {
            b.iter(|| black_box(solve_cubic_subproblem(black_box(cv), black_box(a), 1.0, &config)))
        });
    }
    group.finish();
}

fn bench_iterative(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterative_subproblem");
    for n in [4, 16, 64] {
        let (cv, a) = problem(n);
        let mut obj = Quadratic { c: cv, a };
        let x = vec![0.0; n];
        group.bench_with_input(BenchmarkId::new("gradient_descent_100", n), &x, |b, x| {
            b.iter(|| {
                let mut gd = GradientDescent::new(0.05);
                black_box(iterative(&mut obj, black_box(x), 1.0, &mut gd, 100, 1e-3))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_eigen, bench_exact, bench_iterative);
criterion_main!(benches);
