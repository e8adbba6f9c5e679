use num_traits::Float;

/// Euclidean length `‖v‖`, as used for the step length `τ = ‖s‖` of the
/// cubic term.
///
/// Entries are scaled by the largest magnitude first, so squaring large
/// steps or gradients in `f32` does not overflow.
pub fn norm<F: Float>(v: &[F]) -> F {
    let scale = max_abs(v);
    if scale == F::zero() || !scale.is_finite() {
        return scale;
    }
    let s = v
        .iter()
        .fold(F::zero(), |acc, &x| acc + (x / scale) * (x / scale));
    scale * s.sqrt()
}

/// `aᵀb` over the common prefix of `a` and `b`.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    a.iter()
        .zip(b)
        .fold(F::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Largest absolute entry of a vector (zero for an empty vector).
///
/// NaN entries propagate so a broken residual is never reported as small.
pub fn max_abs<F: Float>(v: &[F]) -> F {
    let mut m = F::zero();
    for &x in v {
        if x.is_nan() {
            return x;
        }
        m = m.max(x.abs());
    }
    m
}
