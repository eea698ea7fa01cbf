//! Equations of motion for the two planar reductions.
//!
//! Both systems integrate reduced variables rather than the physical phase
//! space. The radial-only system drops the azimuth entirely and freezes the
//! angular momentum at its initial value; the full planar system substitutes
//! the angular velocity ω = vT/R for the tangential velocity, which removes
//! the coordinate singularity from the azimuthal equation. The physical
//! tangential velocity is reconstructed after the solve.

use crate::ode::{DormandPrince5, IntegrationError, OdeSystem, Tolerances};
use crate::potential::PlanarPotential;

/// Relative error tolerance of every orbit integration.
const ORBIT_RTOL: f64 = 1e-8;
const ORBIT_ATOL: f64 = 1e-12;

/// Radial-only motion in an axisymmetric potential: state (R, vR).
///
/// The squared angular momentum is computed once from the initial condition
/// and frozen; it is never re-derived from the integrated state.
pub(crate) struct RadialMotion<'a> {
    pub(crate) pot: &'a dyn PlanarPotential,
    pub(crate) lz_squared: f64,
}

impl OdeSystem<2> for RadialMotion<'_> {
    fn rhs(&self, t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
        let r = y[0];
        dydt[0] = y[1];
        dydt[1] = self.lz_squared / (r * r * r) + self.pot.radial_force(r, 0.0, t);
    }
}

/// Full planar motion: state (R, vR, φ, ω) with ω = vT/R.
///
/// Here the squared angular momentum is recomputed from the current state at
/// every evaluation: the potential may depend on φ, in which case L is not
/// conserved.
pub(crate) struct PlanarMotion<'a> {
    pub(crate) pot: &'a dyn PlanarPotential,
}

impl OdeSystem<4> for PlanarMotion<'_> {
    fn rhs(&self, t: f64, y: &[f64; 4], dydt: &mut [f64; 4]) {
        let (r, vr, phi, omega) = (y[0], y[1], y[2], y[3]);
        let lz = r * r * omega;
        dydt[0] = vr;
        dydt[1] = lz * lz / (r * r * r) + self.pot.radial_force(r, phi, t);
        dydt[2] = omega;
        dydt[3] = (self.pot.azimuthal_force(r, phi, t) - 2.0 * r * vr * omega) / (r * r);
    }
}

/// Integrate (R, vR, vT) over `times`, reconstructing vT = L/R from the
/// frozen angular momentum.
pub(crate) fn integrate_radial(
    init: [f64; 3],
    pot: &dyn PlanarPotential,
    times: &[f64],
) -> Result<Vec<[f64; 3]>, IntegrationError> {
    let lz = init[0] * init[2];
    let sys = RadialMotion {
        pot,
        lz_squared: lz * lz,
    };
    let mut solver = DormandPrince5::new(Tolerances::new(ORBIT_RTOL, ORBIT_ATOL));
    let reduced = solver.solve_grid(&sys, [init[0], init[1]], times)?;
    Ok(reduced.iter().map(|y| [y[0], y[1], lz / y[0]]).collect())
}

/// Integrate (R, vR, vT, φ) over `times`, converting vT to ω = vT/R on the
/// way in and back to vT = R·ω on the way out.
pub(crate) fn integrate_planar(
    init: [f64; 4],
    pot: &dyn PlanarPotential,
    times: &[f64],
) -> Result<Vec<[f64; 4]>, IntegrationError> {
    let omega = init[2] / init[0];
    let sys = PlanarMotion { pot };
    let mut solver = DormandPrince5::new(Tolerances::new(ORBIT_RTOL, ORBIT_ATOL));
    let reduced = solver.solve_grid(&sys, [init[0], init[1], init[3], omega], times)?;
    Ok(reduced
        .iter()
        .map(|y| [y[0], y[1], y[0] * y[3], y[2]])
        .collect())
}
