//! Full planar orbits with azimuth.

use glam::DVec2;

use crate::eom;
use crate::potential::{IntoPotentialRef, PotentialRef};
use crate::{
    validate_time_grid, ActionAngleCache, DiskOrbit, IntegratedState, OrbitError, PhaseSpaceError,
    RectangularState, Trajectory,
};

/// A full planar orbit: phase space (R, vR, vT, φ).
///
/// Internally the integrator substitutes the angular velocity ω = vT/R for
/// the tangential velocity and re-derives the angular momentum from the
/// current state at every step, so potentials with azimuthal structure are
/// handled correctly. The stored trajectory is converted back to
/// (R, vR, vT, φ).
///
/// # Example
/// ```
/// use std::f64::consts::PI;
///
/// use galactic_sim::{DiskOrbit, LogarithmicHaloPotential, PlanarOrbit};
///
/// let mut orbit = PlanarOrbit::new(1.0, 0.0, 1.0, 0.0);
/// orbit
///     .integrate(&[0.0, PI], LogarithmicHaloPotential::flat(1.0))
///     .unwrap();
///
/// // Half an orbit at unit angular velocity.
/// let end = orbit.trajectory().unwrap().row(1).to_vec();
/// assert!((end[0] - 1.0).abs() < 1e-6);
/// assert!((end[3] - PI).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarOrbit {
    vxvv: [f64; 4],
    state: Option<IntegratedState>,
    action_angle: ActionAngleCache,
}

impl PlanarOrbit {
    /// A full planar orbit at (R, vR, vT, φ), defined at t = 0.
    ///
    /// `vr` is the outward radial velocity, `vt` the tangential velocity,
    /// and `phi` the azimuth in radians. `r` must be positive for the
    /// dynamics to make sense; this is not enforced here.
    pub fn new(r: f64, vr: f64, vt: f64, phi: f64) -> Self {
        PlanarOrbit {
            vxvv: [r, vr, vt, phi],
            state: None,
            action_angle: ActionAngleCache::default(),
        }
    }

    /// Build the orbit from a raw 4-component phase-space slice
    /// [R, vR, vT, φ].
    ///
    /// A 3-component slice is rejected with
    /// [`PhaseSpaceError::MissingAzimuth`]: it is indistinguishable from a
    /// radial-only initial condition, and the caller almost certainly wants
    /// [`crate::RadialOrbit`] instead.
    pub fn from_phase_space(vxvv: &[f64]) -> Result<Self, PhaseSpaceError> {
        match vxvv {
            [r, vr, vt, phi] => Ok(PlanarOrbit::new(*r, *vr, *vt, *phi)),
            [_, _, _] => Err(PhaseSpaceError::MissingAzimuth),
            _ => Err(PhaseSpaceError::WrongComponentCount {
                expected: 4,
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
        let rows = eom::integrate_planar(self.vxvv, pot.as_ref(), times)?;
        self.state = Some(IntegratedState::new(
            Trajectory::from_rows(times.to_vec(), rows),
            pot,
        ));
        self.action_angle.clear();
        Ok(())
    }
}

impl Default for PlanarOrbit {
    /// The circular orbit at R = 1 with unit tangential velocity, starting
    /// at φ = 0.
    fn default() -> Self {
        PlanarOrbit::new(1.0, 0.0, 1.0, 0.0)
    }
}

impl DiskOrbit for PlanarOrbit {
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
        let [r, vr, vt, phi] = self.vxvv;
        Ok(pot.value(r, phi, 0.0) + vr * vr / 2.0 + vt * vt / 2.0)
    }

    fn energies(&self, pot: Option<&PotentialRef>) -> Result<Vec<f64>, OrbitError> {
        let state = self.integrated().ok_or(OrbitError::NotIntegrated)?;
        let pot = pot.unwrap_or_else(|| state.potential());
        let trajectory = state.trajectory();
        Ok((0..trajectory.len())
            .map(|i| {
                let row = trajectory.row(i);
                pot.value(row[0], row[3], 0.0) + row[1] * row[1] / 2.0 + row[2] * row[2] / 2.0
            })
            .collect())
    }

    fn azimuth(&self) -> Result<f64, OrbitError> {
        Ok(self.vxvv[3])
    }

    fn rectangular(&self) -> Result<Vec<RectangularState>, OrbitError> {
        let trajectory = self.trajectory()?;
        Ok((0..trajectory.len())
            .map(|i| {
                let row = trajectory.row(i);
                let (r, vr, vt, phi) = (row[0], row[1], row[2], row[3]);
                let (sin_phi, cos_phi) = phi.sin_cos();
                RectangularState {
                    position: DVec2::new(r * cos_phi, r * sin_phi),
                    velocity: DVec2::new(
                        vr * cos_phi - vt * sin_phi,
                        vr * sin_phi + vt * cos_phi,
                    ),
                }
            })
            .collect())
    }
}
