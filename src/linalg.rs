use num_traits::Float;

/// Maximum number of cyclic Jacobi sweeps before giving up on further rotation.
const MAX_SWEEPS: usize = 64;

/// Eigendecomposition of a symmetric matrix, `A = U · diag(values) · Uᵀ`.
#[derive(Debug, Clone)]
pub struct SymEigen<F> {
    /// Eigenvalues in ascending order.
    pub values: Vec<F>,
    /// Orthonormal eigenvectors stored by columns: `vectors[i][k]` is
    /// component `i` of the eigenvector for `values[k]`.
    pub vectors: Vec<Vec<F>>,
}

impl<F: Float> SymEigen<F> {
    /// Smallest eigenvalue (`None` for an empty matrix).
    pub fn min_value(&self) -> Option<F> {
        self.values.first().copied()
    }

    /// Compute `Uᵀ v` (coordinates of `v` in the eigenbasis).
    pub fn rotate_in(&self, v: &[F]) -> Vec<F> {
        mat_t_vec(&self.vectors, v)
    }

    /// Compute `U w` (back from eigenbasis coordinates).
    pub fn rotate_out(&self, w: &[F]) -> Vec<F> {
        mat_vec(&self.vectors, w)
    }
}

/// Eigendecomposition of a symmetric `n x n` matrix by cyclic Jacobi rotations.
///
/// `a` is stored as `a[row][col]`; only its symmetric part `(A + Aᵀ)/2` is
/// decomposed. Eigenvalues are returned in ascending order with the
/// eigenvector columns permuted to match.
// Explicit indexing is clearer for the (p, q) plane rotations
#[allow(clippy::needless_range_loop)]
pub fn sym_eigen<F: Float>(a: &[Vec<F>]) -> SymEigen<F> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let two = F::one() + F::one();
    let mut m = symmetric_part(a);
    let mut v = identity::<F>(n);

    let mut total = F::zero();
    for row in &m {
        for &x in row {
            total = total + x * x;
        }
    }
    let threshold = F::epsilon() * F::epsilon() * total;

    for _ in 0..MAX_SWEEPS {
        let mut off = F::zero();
        for p in 0..n {
            for q in (p + 1)..n {
                off = off + m[p][q] * m[p][q];
            }
        }
        if off <= threshold {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[p][q];
                if apq == F::zero() {
                    continue;
                }

                // Rotation angle zeroing m[p][q]: t = tan(phi) is the smaller
                // root of t^2 + 2*theta*t - 1 = 0.
                let theta = (m[q][q] - m[p][p]) / (two * apq);
                let t = if theta.abs() > F::one() / F::epsilon() {
                    F::one() / (two * theta)
                } else {
                    let sign = if theta < F::zero() {
                        -F::one()
                    } else {
                        F::one()
                    };
                    sign / (theta.abs() + (theta * theta + F::one()).sqrt())
                };
                let c = F::one() / (t * t + F::one()).sqrt();
                let s = t * c;

                // A <- A J (columns p, q)
                for k in 0..n {
                    let mkp = m[k][p];
                    let mkq = m[k][q];
                    m[k][p] = c * mkp - s * mkq;
                    m[k][q] = s * mkp + c * mkq;
                }
                // A <- Jᵀ A (rows p, q)
                for k in 0..n {
                    let mpk = m[p][k];
                    let mqk = m[q][k];
                    m[p][k] = c * mpk - s * mqk;
                    m[q][k] = s * mpk + c * mqk;
                }
                m[p][q] = F::zero();
                m[q][p] = F::zero();

                // V <- V J
                for k in 0..n {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        m[i][i]
            .partial_cmp(&m[j][j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let values = order.iter().map(|&k| m[k][k]).collect();
    let vectors = (0..n)
        .map(|i| order.iter().map(|&k| v[i][k]).collect())
        .collect();

    SymEigen { values, vectors }
}

/// Compute `A x` for `A` stored as `a[row][col]`.
pub fn mat_vec<F: Float>(a: &[Vec<F>], x: &[F]) -> Vec<F> {
    a.iter()
        .map(|row| {
            debug_assert_eq!(row.len(), x.len());
            let mut s = F::zero();
            for (&aij, &xj) in row.iter().zip(x) {
                s = s + aij * xj;
            }
            s
        })
        .collect()
}

/// Compute `Aᵀ x` for `A` stored as `a[row][col]`.
pub fn mat_t_vec<F: Float>(a: &[Vec<F>], x: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), x.len());
    let cols = a.first().map_or(0, Vec::len);
    let mut out = vec![F::zero(); cols];
    for (row, &xi) in a.iter().zip(x) {
        for (o, &aij) in out.iter_mut().zip(row) {
            *o = *o + aij * xi;
        }
    }
    out
}

/// Largest absolute entry of `Aᵀ − A` for a square matrix.
pub fn max_asymmetry<F: Float>(a: &[Vec<F>]) -> F {
    let n = a.len();
    let mut worst = F::zero();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (a[i][j] - a[j][i]).abs();
            if d.is_nan() {
                return d;
            }
            worst = worst.max(d);
        }
    }
    worst
}

fn symmetric_part<F: Float>(a: &[Vec<F>]) -> Vec<Vec<F>> {
    let n = a.len();
    let half = F::one() / (F::one() + F::one());
    (0..n)
        .map(|i| (0..n).map(|j| half * (a[i][j] + a[j][i])).collect())
        .collect()
}

fn identity<F: Float>(n: usize) -> Vec<Vec<F>> {
    let mut id = vec![vec![F::zero(); n]; n];
    for (i, row) in id.iter_mut().enumerate() {
        row[i] = F::one();
    }
    id
}
