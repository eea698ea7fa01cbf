//! Adaptive Dormand-Prince 5(4) integration.
//!
//! An embedded explicit Runge-Kutta pair with proportional step-size
//! control. The orbit integrators drive it segment by segment between the
//! caller's output times, so every output row lands exactly on a requested
//! time with no dense-output interpolation.
//!
//! Reference: Dormand & Prince, "A family of embedded Runge-Kutta
//! formulae", J. Comp. Appl. Math. 6 (1980).

use std::fmt;

/// System of first-order ordinary differential equations dy/dt = f(t, y).
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side at time `t` and state `y` into `dydt`.
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

const STAGES: usize = 7;

const C: [f64; STAGES] = [0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.2, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// Fifth-order solution weights.
const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Difference between the fifth- and fourth-order weights; weighs the
/// stages into the local error estimate.
const E: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Error tolerances for the embedded error estimate.
///
/// A step is accepted when the root-mean-square of the componentwise error
/// divided by `atol + rtol·|y|` is at most one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
}

impl Tolerances {
    /// Tolerances with the given relative and absolute parts.
    pub fn new(rtol: f64, atol: f64) -> Self {
        Tolerances { rtol, atol }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            rtol: 1e-8,
            atol: 1e-12,
        }
    }
}

/// Integration statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Total right-hand-side evaluations.
    pub rhs_evals: u64,
    /// Accepted steps.
    pub accepted_steps: u64,
    /// Rejected steps.
    pub rejected_steps: u64,
}

/// Errors that can occur during integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegrationError {
    /// The controller drove the step size below the representable minimum
    /// without reaching the requested accuracy.
    StepSizeVanished {
        /// Time at which progress stalled.
        t: f64,
    },
    /// The step budget ran out before the end of the interval.
    MaxStepsExceeded {
        /// Time reached when the budget ran out.
        t: f64,
    },
    /// The state stopped being finite.
    NonFiniteState {
        /// Time at which a non-finite component appeared.
        t: f64,
    },
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationError::StepSizeVanished { t } => {
                write!(f, "step size vanished at t = {t}")
            }
            IntegrationError::MaxStepsExceeded { t } => {
                write!(f, "step budget exhausted at t = {t}")
            }
            IntegrationError::NonFiniteState { t } => {
                write!(f, "non-finite state at t = {t}")
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

/// Adaptive Dormand-Prince 5(4) integrator.
///
/// # Type Parameters
/// * `N` - dimension of the state vector
///
/// # Example
/// ```
/// use galactic_sim::{DormandPrince5, OdeSystem, Tolerances};
///
/// struct Decay;
/// impl OdeSystem<1> for Decay {
///     fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
///         dydt[0] = -y[0];
///     }
/// }
///
/// let mut solver = DormandPrince5::new(Tolerances::new(1e-10, 1e-12));
/// let y = solver.integrate(&Decay, 0.0, [1.0], 1.0).unwrap();
/// assert!((y[0] - (-1.0f64).exp()).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct DormandPrince5<const N: usize> {
    tol: Tolerances,
    /// Smallest step magnitude the controller may select.
    pub h_min: f64,
    /// Step budget per call to [`DormandPrince5::integrate`] or per grid
    /// segment of [`DormandPrince5::solve_grid`].
    pub max_steps: u64,
    k: [[f64; N]; STAGES],
    /// Counters accumulated across calls; reset with
    /// [`DormandPrince5::reset_stats`].
    pub stats: Stats,
}

impl<const N: usize> DormandPrince5<N> {
    /// A solver with the given tolerances.
    pub fn new(tol: Tolerances) -> Self {
        DormandPrince5 {
            tol,
            h_min: 1e-14,
            max_steps: 1_000_000,
            k: [[0.0; N]; STAGES],
            stats: Stats::default(),
        }
    }

    /// Reset the statistics counters.
    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    /// Integrate from `t0` to `tf` and return the final state.
    pub fn integrate<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: [f64; N],
        tf: f64,
    ) -> Result<[f64; N], IntegrationError> {
        let h0 = ((tf - t0).abs() * 1e-3).max(self.h_min);
        self.advance(sys, t0, y0, tf, h0).map(|(y, _)| y)
    }

    /// Integrate over a monotonic time grid, returning one state per grid
    /// time. The first row is `y0` at `times[0]`; every later row is the
    /// state exactly at its grid time, with the step size carried from
    /// segment to segment.
    pub fn solve_grid<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        y0: [f64; N],
        times: &[f64],
    ) -> Result<Vec<[f64; N]>, IntegrationError> {
        let mut out = Vec::with_capacity(times.len());
        out.push(y0);
        if times.len() < 2 {
            return Ok(out);
        }
        let span = (times[times.len() - 1] - times[0]).abs();
        let mut h = (span * 1e-3).max(self.h_min);
        let mut y = y0;
        for w in times.windows(2) {
            let (y_next, h_next) = self.advance(sys, w[0], y, w[1], h)?;
            y = y_next;
            h = h_next.abs().max(self.h_min);
            out.push(y);
        }
        Ok(out)
    }

    /// March from `t0` to exactly `tf`; returns the final state and a
    /// suggested step size for a continuation.
    fn advance<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: [f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<([f64; N], f64), IntegrationError> {
        if t0 == tf {
            return Ok((y0, h0));
        }
        let dir = (tf - t0).signum();
        let mut t = t0;
        let mut y = y0;
        let mut h = h0.abs().max(self.h_min) * dir;
        let mut steps = 0u64;

        loop {
            let mut clamped = false;
            if (t + h - tf) * dir > 0.0 {
                h = tf - t;
                clamped = true;
            }

            let (y_new, err) = self.step(sys, t, &y, h);
            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err <= 1.0 {
                t = if clamped { tf } else { t + h };
                y = y_new;
                self.stats.accepted_steps += 1;
                if y.iter().any(|v| !v.is_finite()) {
                    return Err(IntegrationError::NonFiniteState { t });
                }
                if (tf - t) * dir <= 0.0 {
                    return Ok((y, h * factor));
                }
            } else {
                self.stats.rejected_steps += 1;
            }

            h *= factor;
            if h.abs() < self.h_min {
                return Err(IntegrationError::StepSizeVanished { t });
            }
            steps += 1;
            if steps > self.max_steps {
                return Err(IntegrationError::MaxStepsExceeded { t });
            }
        }
    }

    /// One trial step: the fifth-order solution plus the scaled RMS error
    /// estimate from the embedded fourth-order weights.
    fn step<S: OdeSystem<N>>(&mut self, sys: &S, t: f64, y: &[f64; N], h: f64) -> ([f64; N], f64) {
        let mut y_stage = [0.0; N];

        sys.rhs(t, y, &mut self.k[0]);
        for i in 1..STAGES {
            for (n, slot) in y_stage.iter_mut().enumerate() {
                let mut acc = 0.0;
                for j in 0..i {
                    acc += A[i][j] * self.k[j][n];
                }
                *slot = y[n] + h * acc;
            }
            sys.rhs(t + C[i] * h, &y_stage, &mut self.k[i]);
        }
        self.stats.rhs_evals += STAGES as u64;

        let mut y_new = [0.0; N];
        for (n, slot) in y_new.iter_mut().enumerate() {
            let mut acc = 0.0;
            for i in 0..STAGES {
                acc += B[i] * self.k[i][n];
            }
            *slot = y[n] + h * acc;
        }

        let mut err_sq = 0.0;
        for n in 0..N {
            let mut e = 0.0;
            for i in 0..STAGES {
                e += E[i] * self.k[i][n];
            }
            e *= h;
            let scale = self.tol.atol + self.tol.rtol * y[n].abs().max(y_new[n].abs());
            err_sq += (e / scale) * (e / scale);
        }

        (y_new, (err_sq / N as f64).sqrt())
    }
}
