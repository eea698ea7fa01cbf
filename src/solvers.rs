//! Numeric kernels behind the action-angle machinery: Gauss-Legendre
//! quadrature with order escalation, and Brent root bracketing for the
//! orbital turning points.

use std::f64::consts::PI;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning options forwarded to the adaptive quadrature by every
/// action-angle query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuadratureOptions {
    /// Convergence tolerance between two successive quadrature orders.
    pub tol: f64,
    /// Highest Gauss-Legendre order tried before giving up.
    pub max_order: usize,
}

impl Default for QuadratureOptions {
    fn default() -> Self {
        QuadratureOptions {
            tol: 1.49e-8,
            max_order: 50,
        }
    }
}

/// Failure of the adaptive quadrature to reach the requested tolerance
/// within the allowed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureError {
    /// Best estimate at the highest order tried.
    pub estimate: f64,
    /// Difference between the last two orders.
    pub residual: f64,
}

impl fmt::Display for QuadratureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quadrature did not converge (estimate {}, residual {})",
            self.estimate, self.residual
        )
    }
}

impl std::error::Error for QuadratureError {}

/// Legendre polynomial P_n and its derivative at `x`, by the three-term
/// recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    for k in 2..=n {
        let kf = k as f64;
        let p_next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = p_next;
    }
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// Nodes and weights of the n-point Gauss-Legendre rule on [-1, 1].
///
/// Tricomi's estimate seeds a Newton iteration on P_n; only the upper half
/// is solved, the rest follows by symmetry.
pub(crate) fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    debug_assert!(n >= 2);
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n.div_ceil(2) {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..100 {
            let (p, d) = legendre(n, x);
            dp = d;
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

/// ∫_a^b f dx by Gauss-Legendre rules of increasing order, stopping when
/// two consecutive orders agree to `opts.tol`.
///
/// The nodes are strictly interior, so integrands with removable endpoint
/// trouble (like the turning-point substitutions upstream) are evaluated
/// safely.
pub(crate) fn quadrature<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    opts: &QuadratureOptions,
) -> Result<f64, QuadratureError> {
    if a == b {
        return Ok(0.0);
    }
    let mid = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let mut prev = f64::NAN;
    let mut order = 8;
    loop {
        let (xs, ws) = gauss_legendre(order);
        let mut acc = 0.0;
        for (x, w) in xs.iter().zip(&ws) {
            acc += w * f(mid + half * x);
        }
        let val = acc * half;
        let residual = (val - prev).abs();
        if residual <= opts.tol * (1.0 + val.abs()) {
            return Ok(val);
        }
        prev = val;
        order += order / 2;
        if order > opts.max_order.max(8) {
            return Err(QuadratureError {
                estimate: val,
                residual,
            });
        }
    }
}

/// Brent's method on [a, b]; `f(a)` and `f(b)` must bracket a sign change.
///
/// Returns `None` when the interval does not bracket a root. An endpoint
/// that is already an exact root is returned as-is.
pub(crate) fn brent<F: Fn(f64) -> f64>(
    f: F,
    x1: f64,
    x2: f64,
    tol: f64,
    max_iter: usize,
) -> Option<f64> {
    let mut a = x1;
    let mut b = x2;
    let mut fa = f(a);
    let mut fb = f(b);
    if fa == 0.0 {
        return Some(a);
    }
    if fb == 0.0 {
        return Some(b);
    }
    if (fa > 0.0) == (fb > 0.0) {
        return None;
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = b - a;

    for _ in 0..max_iter {
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Some(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, or the secant step when
            // only two points are distinct.
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * xm * s;
                q = 1.0 - s;
            } else {
                let r = fb / fc;
                let t = fa / fc;
                p = s * (2.0 * xm * t * (t - r) - (b - a) * (r - 1.0));
                q = (t - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol1 { d } else { tol1 * xm.signum() };
        fb = f(b);
    }

    Some(b)
}
