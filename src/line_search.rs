use num_traits::Float;

/// Parameters for [`ray_line_search`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaySearchParams<F> {
    /// Absolute tolerance on the final bracket width (default: 1e-8).
    pub delta: F,
    /// Maximum number of bracket doublings along the ray (default: 64).
    pub max_expansions: usize,
}

impl Default for RaySearchParams<f64> {
    fn default() -> Self {
        RaySearchParams {
            delta: 1e-8,
            max_expansions: 64,
        }
    }
}

impl Default for RaySearchParams<f32> {
    fn default() -> Self {
        RaySearchParams {
            delta: 1e-5,
            max_expansions: 64,
        }
    }
}

/// Minimize a convex, unimodal scalar function on the ray `[left, ∞)`.
///
/// Starting from the bracket `[left, middle]`, the right end is pushed out
/// with doubling steps while `g` keeps decreasing, which traps the minimizer
/// in a bracket `[a, b]`. Golden-section search then shrinks the bracket
/// until its width drops below `params.delta` and the midpoint is returned.
///
/// `g` may return `+∞` (e.g. outside the domain of a barrier-type function).
/// If `g` is not unimodal the result is some local minimizer; this is not
/// signalled. The result is never smaller than `left`.
pub fn ray_line_search<F: Float, G: FnMut(F) -> F>(
    mut g: G,
    left: F,
    middle: F,
    params: &RaySearchParams<F>,
) -> F {
    let two = F::one() + F::one();

    let mut a = left;
    let mut m = if middle > left { middle } else { left + F::one() };
    let g_left = g(a);
    let mut g_mid = g(m);

    let b = if g_mid < g_left {
        // Still descending at `m`: expand to the right until g turns up
        let mut width = m - a;
        let mut closed = None;
        for _ in 0..params.max_expansions {
            width = width * two;
            let r = m + width;
            let g_r = g(r);
            if g_r < g_mid {
                a = m;
                m = r;
                g_mid = g_r;
            } else {
                closed = Some(r);
                break;
            }
        }
        match closed {
            Some(r) => r,
            // Never turned up within the expansion budget
            None => return m,
        }
    } else {
        m
    };

    golden_section(&mut g, a, b, params.delta)
}

/// Golden-section search on `[a, b]` for a unimodal `g`; returns the final midpoint.
fn golden_section<F: Float, G: FnMut(F) -> F>(g: &mut G, mut a: F, mut b: F, delta: F) -> F {
    let one = F::one();
    let two = one + one;
    let five = two + two + one;
    // 1/phi = (sqrt(5) - 1) / 2
    let inv_phi = (five.sqrt() - one) / two;

    let mut x1 = b - inv_phi * (b - a);
    let mut x2 = a + inv_phi * (b - a);
    let mut f1 = g(x1);
    let mut f2 = g(x2);

    while b - a > delta.max(F::epsilon() * b.abs()) {
        if f1 < f2 {
            b = x2;
            x2 = x1;
            f2 = f1;
            x1 = b - inv_phi * (b - a);
            f1 = g(x1);
        } else {
            a = x1;
            x1 = x2;
            f1 = f2;
            x2 = a + inv_phi * (b - a);
            f2 = g(x2);
        }
    }

    (a + b) / two
}
