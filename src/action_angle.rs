//! Closed-form action-angle variables for integrable disk potentials.
//!
//! Potentials whose rotation curve is a pure power of radius (including the
//! flat curve as the zero-power case) admit exact action-angle solutions
//! built from one-dimensional quadratures between the orbital turning
//! points. The solvers here are constructed from a phase-space point
//! (R, vR, vT) alone, in the galactic-dynamics normalization v_c(1) = 1,
//! and never look at a trajectory.
//!
//! [`ActionAngle::for_potential`] picks the solver from the potential's
//! [`ActionAngleFamily`] tag: the flat family maps to [`ActionAngleFlat`],
//! the power-law family to [`ActionAnglePower`] with shape parameter
//! β = 0.5 − α/4 (or to the flat solver when α is exactly 2), and anything
//! untagged is refused.

use std::f64::consts::PI;
use std::fmt;

use crate::potential::{ActionAngleFamily, PlanarPotential};
use crate::solvers::{brent, quadrature, QuadratureError, QuadratureOptions};

/// Innermost radius probed when hunting the pericenter of a plunging,
/// zero-angular-momentum orbit.
const R_FLOOR: f64 = 1e-10;
/// Outermost radius probed before declaring the orbit unbound.
const R_CEILING: f64 = 1e10;
/// Relative peri-to-apo spread below which the orbit is treated as
/// circular and the epicyclic closed forms apply.
const CIRCULAR_EPS: f64 = 1e-8;

/// Errors from action-angle resolution and evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionAngleError {
    /// The potential reports no closed-form family.
    UnsupportedPotential,
    /// No apocenter exists: the orbit escapes the potential.
    UnboundOrbit,
    /// A quadrature failed to reach its tolerance.
    Quadrature(QuadratureError),
}

impl fmt::Display for ActionAngleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionAngleError::UnsupportedPotential => {
                write!(f, "no closed-form action-angle solution for this potential")
            }
            ActionAngleError::UnboundOrbit => {
                write!(f, "the orbit is not radially bound in this potential")
            }
            ActionAngleError::Quadrature(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ActionAngleError {}

impl From<QuadratureError> for ActionAngleError {
    fn from(e: QuadratureError) -> Self {
        ActionAngleError::Quadrature(e)
    }
}

/// A resolved action-angle solver for one phase-space point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionAngle {
    /// Flat-rotation-curve solver.
    Flat(ActionAngleFlat),
    /// Power-law rotation-curve solver.
    Power(ActionAnglePower),
}

impl ActionAngle {
    /// Select the solver matching the potential's family tag, built at the
    /// phase-space point (`r`, `vr`, `vt`).
    ///
    /// A power-law tag with α exactly 2 resolves to the flat solver, since
    /// the two families coincide there. Untagged potentials fail with
    /// [`ActionAngleError::UnsupportedPotential`].
    pub fn for_potential(
        pot: &dyn PlanarPotential,
        r: f64,
        vr: f64,
        vt: f64,
    ) -> Result<Self, ActionAngleError> {
        match pot.action_angle_family() {
            Some(ActionAngleFamily::FlatRotationCurve) => {
                Ok(ActionAngle::Flat(ActionAngleFlat::new(r, vr, vt)))
            }
            Some(ActionAngleFamily::PowerLaw { alpha }) => {
                if alpha == 2.0 {
                    Ok(ActionAngle::Flat(ActionAngleFlat::new(r, vr, vt)))
                } else {
                    Ok(ActionAngle::Power(ActionAnglePower::new(
                        r,
                        vr,
                        vt,
                        0.5 - alpha / 4.0,
                    )))
                }
            }
            None => Err(ActionAngleError::UnsupportedPotential),
        }
    }

    fn engine(&self) -> &AxiEngine {
        match self {
            ActionAngle::Flat(s) => &s.engine,
            ActionAngle::Power(s) => &s.engine,
        }
    }

    /// The radial action J_R.
    pub fn radial_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().radial_action(opts)
    }

    /// The azimuthal action J_φ (the angular momentum).
    pub fn azimuthal_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().azimuthal_action(opts)
    }

    /// The radial angle w_R.
    pub fn radial_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().radial_angle(opts)
    }

    /// The azimuthal angle conjugate to J_φ.
    pub fn azimuthal_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().azimuthal_angle(opts)
    }

    /// The radial period T_R.
    pub fn radial_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().radial_period(opts)
    }

    /// The azimuthal period T_φ.
    pub fn azimuthal_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().azimuthal_period(opts)
    }

    /// T_R/T_φ · π, the azimuth swept during half a radial oscillation.
    pub fn period_ratio(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine().period_ratio(opts)
    }
}

/// Exact action-angle solver for the flat rotation curve v_c(r) = 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionAngleFlat {
    engine: AxiEngine,
}

impl ActionAngleFlat {
    /// A solver at the phase-space point (`r`, `vr`, `vt`).
    pub fn new(r: f64, vr: f64, vt: f64) -> Self {
        ActionAngleFlat {
            engine: AxiEngine {
                r,
                vr,
                vt,
                beta: 0.0,
            },
        }
    }

    /// The radial action J_R.
    pub fn radial_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_action(opts)
    }

    /// The azimuthal action J_φ (the angular momentum).
    pub fn azimuthal_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_action(opts)
    }

    /// The radial angle w_R.
    pub fn radial_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_angle(opts)
    }

    /// The azimuthal angle conjugate to J_φ.
    pub fn azimuthal_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_angle(opts)
    }

    /// The radial period T_R.
    pub fn radial_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_period(opts)
    }

    /// The azimuthal period T_φ.
    pub fn azimuthal_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_period(opts)
    }

    /// T_R/T_φ · π.
    pub fn period_ratio(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.period_ratio(opts)
    }
}

/// Exact action-angle solver for a power-law rotation curve
/// v_c(r) = r^β.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionAnglePower {
    engine: AxiEngine,
}

impl ActionAnglePower {
    /// A solver at the phase-space point (`r`, `vr`, `vt`) with
    /// rotation-curve exponent `beta`.
    pub fn new(r: f64, vr: f64, vt: f64, beta: f64) -> Self {
        ActionAnglePower {
            engine: AxiEngine { r, vr, vt, beta },
        }
    }

    /// The rotation-curve exponent β.
    pub fn beta(&self) -> f64 {
        self.engine.beta
    }

    /// The radial action J_R.
    pub fn radial_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_action(opts)
    }

    /// The azimuthal action J_φ (the angular momentum).
    pub fn azimuthal_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_action(opts)
    }

    /// The radial angle w_R.
    pub fn radial_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_angle(opts)
    }

    /// The azimuthal angle conjugate to J_φ.
    pub fn azimuthal_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_angle(opts)
    }

    /// The radial period T_R.
    pub fn radial_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.radial_period(opts)
    }

    /// The azimuthal period T_φ.
    pub fn azimuthal_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.azimuthal_period(opts)
    }

    /// T_R/T_φ · π.
    pub fn period_ratio(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.engine.period_ratio(opts)
    }
}

/// The shared axisymmetric engine: a rotation curve v_c(r) = r^β, a
/// phase-space point, and the turning-point quadratures over the effective
/// potential.
///
/// All radial integrals use the substitution r(θ) = m − d·cos θ with
/// m = (r_apo + r_peri)/2 and d = (r_apo − r_peri)/2, which turns the
/// square-root turning-point singularities into smooth integrands.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxiEngine {
    r: f64,
    vr: f64,
    vt: f64,
    beta: f64,
}

impl AxiEngine {
    /// Φ(r) of the normalized rotation curve: ln r for β = 0, else
    /// r^(2β)/(2β).
    fn potential(&self, r: f64) -> f64 {
        if self.beta == 0.0 {
            r.ln()
        } else {
            let two_beta = 2.0 * self.beta;
            r.powf(two_beta) / two_beta
        }
    }

    fn energy(&self) -> f64 {
        self.potential(self.r) + 0.5 * (self.vr * self.vr + self.vt * self.vt)
    }

    fn lz(&self) -> f64 {
        self.r * self.vt
    }

    /// The squared radial velocity 2(E − Φ(r)) − L²/r² at radius `r`;
    /// non-negative exactly between the turning points.
    fn vr_squared(&self, r: f64) -> f64 {
        let lz_over_r = self.lz() / r;
        2.0 * (self.energy() - self.potential(r)) - lz_over_r * lz_over_r
    }

    /// Epicyclic frequency at the orbit's radius, for the circular branch.
    fn kappa(&self) -> f64 {
        (2.0 + 2.0 * self.beta).sqrt() * self.r.powf(self.beta - 1.0)
    }

    /// Pericenter and apocenter radii, bracketed outward from the current
    /// radius and polished with Brent's method.
    fn turning_points(&self) -> Result<(f64, f64), ActionAngleError> {
        let f = |r: f64| self.vr_squared(r);

        // Pericenter: walk inward until vr² goes negative, then bracket.
        let mut outer = self.r;
        let mut inner = self.r * 0.8;
        let rp = loop {
            if inner < R_FLOOR {
                break R_FLOOR;
            }
            if f(inner) < 0.0 {
                // brent cannot fail here: the bracket was just verified.
                break brent(f, inner, outer, 1e-14, 100).unwrap_or(outer);
            }
            outer = inner;
            inner *= 0.8;
        };

        // Apocenter: walk outward the same way.
        let mut inner = self.r;
        let mut upper = self.r * 1.25;
        let ra = loop {
            if upper > R_CEILING {
                return Err(ActionAngleError::UnboundOrbit);
            }
            if f(upper) < 0.0 {
                break brent(f, inner, upper, 1e-14, 100).unwrap_or(inner);
            }
            inner = upper;
            upper *= 1.25;
        };

        Ok((rp, ra))
    }

    fn is_circular(rp: f64, ra: f64) -> bool {
        ra - rp <= CIRCULAR_EPS * (ra + rp)
    }

    fn radial_action(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        let (rp, ra) = self.turning_points()?;
        if Self::is_circular(rp, ra) {
            return Ok(0.0);
        }
        let (m, d) = (0.5 * (ra + rp), 0.5 * (ra - rp));
        let integrand = |theta: f64| {
            let r = m - d * theta.cos();
            self.vr_squared(r).max(0.0).sqrt() * d * theta.sin()
        };
        Ok(quadrature(integrand, 0.0, PI, opts)? / PI)
    }

    fn azimuthal_action(&self, _opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        Ok(self.lz())
    }

    fn radial_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        let (rp, ra) = self.turning_points()?;
        if Self::is_circular(rp, ra) {
            return Ok(2.0 * PI / self.kappa());
        }
        let (m, d) = (0.5 * (ra + rp), 0.5 * (ra - rp));
        let integrand = |theta: f64| {
            let r = m - d * theta.cos();
            d * theta.sin() / self.vr_squared(r).max(VR_SQ_FLOOR).sqrt()
        };
        Ok(2.0 * quadrature(integrand, 0.0, PI, opts)?)
    }

    /// The azimuth swept during half a radial oscillation,
    /// I = ∫ (L/r²)·dr/v_r from pericenter to apocenter. This is both the
    /// T_R/T_φ·π ratio quantity and the bridge to the azimuthal period.
    fn angle_ratio(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        let (rp, ra) = self.turning_points()?;
        if Self::is_circular(rp, ra) {
            return Ok(PI * (self.vt / self.r) / self.kappa());
        }
        let lz = self.lz();
        let (m, d) = (0.5 * (ra + rp), 0.5 * (ra - rp));
        let integrand = |theta: f64| {
            let r = m - d * theta.cos();
            (lz / (r * r)) * d * theta.sin() / self.vr_squared(r).max(VR_SQ_FLOOR).sqrt()
        };
        Ok(quadrature(integrand, 0.0, PI, opts)?)
    }

    fn azimuthal_period(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        Ok(PI * self.radial_period(opts)? / self.angle_ratio(opts)?)
    }

    fn period_ratio(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        self.angle_ratio(opts)
    }

    fn radial_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        let (rp, ra) = self.turning_points()?;
        if Self::is_circular(rp, ra) {
            return Ok(0.0);
        }
        let tr = self.radial_period(opts)?;
        let (m, d) = (0.5 * (ra + rp), 0.5 * (ra - rp));
        let theta_here = ((m - self.r) / d).clamp(-1.0, 1.0).acos();
        let integrand = |theta: f64| {
            let r = m - d * theta.cos();
            d * theta.sin() / self.vr_squared(r).max(VR_SQ_FLOOR).sqrt()
        };
        let from_peri = quadrature(integrand, 0.0, theta_here, opts)?;
        let wr = 2.0 * PI * from_peri / tr;
        Ok(if self.vr >= 0.0 { wr } else { 2.0 * PI - wr })
    }

    fn azimuthal_angle(&self, opts: &QuadratureOptions) -> Result<f64, ActionAngleError> {
        // Mean azimuth advance at the current radial phase.
        Ok(self.radial_angle(opts)? * self.angle_ratio(opts)? / PI)
    }
}

/// Guard against rounding pushing vr² fractionally negative right at a
/// turning point; well below anything a quadrature node can see.
const VR_SQ_FLOOR: f64 = 1e-300;
