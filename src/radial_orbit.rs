//! Planar orbits without azimuth.

use crate::eom;
use crate::potential::{IntoPotentialRef, PotentialRef};
use crate::{
    validate_time_grid, ActionAngleCache, DiskOrbit, IntegratedState, OrbitError, PhaseSpaceError,
    Trajectory,
};

/// A planar orbit that does not track azimuth: phase space (R, vR, vT).
///
/// The angular momentum L = R·vT is computed once from the initial
/// condition and treated as exactly conserved, reducing the motion to the
/// two degrees of freedom (R, vR). That makes this variant the right choice
/// for axisymmetric potentials when the azimuth is of no interest — and the
/// wrong one otherwise: azimuth-derived queries ([`DiskOrbit::azimuth`],
/// [`DiskOrbit::rectangular`]) fail with [`OrbitError::NoAzimuth`].
///
/// # Example
/// ```
/// use galactic_sim::{DiskOrbit, LogarithmicHaloPotential, RadialOrbit};
///
/// let mut orbit = RadialOrbit::new(1.0, 0.1, 1.1);
/// let times: Vec<f64> = (0..=100).map(|i| i as f64 * 0.1).collect();
/// orbit.integrate(&times, LogarithmicHaloPotential::flat(1.0)).unwrap();
///
/// // The frozen angular momentum survives in every reconstructed row.
/// for i in 0..orbit.trajectory().unwrap().len() {
///     let row = orbit.trajectory().unwrap().row(i);
///     assert!((row[0] * row[2] - 1.1).abs() < 1e-12);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RadialOrbit {
    vxvv: [f64; 3],
    state: Option<IntegratedState>,
    action_angle: ActionAngleCache,
}

impl RadialOrbit {
    /// A radial-only orbit at (R, vR, vT), defined at t = 0.
    ///
    /// `vr` is the outward radial velocity and `vt` the tangential
    /// velocity. `r` must be positive for the dynamics to make sense; this
    /// is not enforced here.
    pub fn new(r: f64, vr: f64, vt: f64) -> Self {
        RadialOrbit {
            vxvv: [r, vr, vt],
            state: None,
            action_angle: ActionAngleCache::default(),
        }
    }

    /// Build the orbit from a raw 3-component phase-space slice
    /// [R, vR, vT].
    pub fn from_phase_space(vxvv: &[f64]) -> Result<Self, PhaseSpaceError> {
        match vxvv {
            [r, vr, vt] => Ok(RadialOrbit::new(*r, *vr, *vt)),
            _ => Err(PhaseSpaceError::WrongComponentCount {
                expected: 3,
                got: vxvv.len(),
            }),
        }
    }

    /// Integrate the orbit over `times` in `pot`.
    ///
    /// The time grid must be non-empty, start at exactly 0 (where the
    /// initial condition is defined), and be strictly monotonic. On success
    /// the trajectory and the resolved potential are stored on the orbit
    /// and any memoized action-angle solver is dropped; on failure the
    /// orbit's previous state is left untouched.
    pub fn integrate(
        &mut self,
        times: &[f64],
        pot: impl IntoPotentialRef,
    ) -> Result<(), OrbitError> {
        validate_time_grid(times)?;
        let pot = pot.into_potential_ref();
        let rows = eom::integrate_radial(self.vxvv, pot.as_ref(), times)?;
        self.state = Some(IntegratedState::new(
            Trajectory::from_rows(times.to_vec(), rows),
            pot,
        ));
        self.action_angle.clear();
        Ok(())
    }
}

impl Default for RadialOrbit {
    /// The circular orbit at R = 1 with unit tangential velocity.
    fn default() -> Self {
        RadialOrbit::new(1.0, 0.0, 1.0)
    }
}

impl DiskOrbit for RadialOrbit {
    fn phase_space(&self) -> &[f64] {
        &self.vxvv
    }

    fn integrated(&self) -> Option<&IntegratedState> {
        self.state.as_ref()
    }

    fn action_angle_cache(&self) -> &ActionAngleCache {
        &self.action_angle
    }

    fn energy(&self, pot: Option<&PotentialRef>) -> Result<f64, OrbitError> {
        let pot = pot
            .or_else(|| self.last_potential())
            .ok_or(OrbitError::MissingPotential)?;
        let [r, vr, vt] = self.vxvv;
        Ok(pot.value(r, 0.0, 0.0) + vr * vr / 2.0 + vt * vt / 2.0)
    }

    fn energies(&self, pot: Option<&PotentialRef>) -> Result<Vec<f64>, OrbitError> {
        let state = self.integrated().ok_or(OrbitError::NotIntegrated)?;
        let pot = pot.unwrap_or_else(|| state.potential());
        let trajectory = state.trajectory();
        Ok((0..trajectory.len())
            .map(|i| {
                let row = trajectory.row(i);
                pot.value(row[0], 0.0, 0.0) + row[1] * row[1] / 2.0 + row[2] * row[2] / 2.0
            })
            .collect())
    }

    fn azimuth(&self) -> Result<f64, OrbitError> {
        Err(OrbitError::NoAzimuth)
    }
}
