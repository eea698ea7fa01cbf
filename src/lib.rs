//! # Planar Galactic Orbit Integration
//! This library crate integrates the orbit of a test particle moving in the
//! plane of a galactic disk, and derives the quantities that characterize the
//! resulting orbit: energy, eccentricity, apocenter and pericenter,
//! action-angle variables, and orbital periods.
//!
//! Unlike a Keplerian two-body setup, a galactic potential generally admits
//! no closed-form trajectory, so orbits here are obtained by numerically
//! integrating the equations of motion with an adaptive embedded Runge-Kutta
//! scheme at a relative tolerance of 1e-8. Action-angle variables *are*
//! available in closed form for a small set of integrable potential families
//! (flat and power-law rotation curves), and those are computed by
//! tolerance-controlled quadrature from the initial condition rather than
//! from the trajectory.
//!
//! ## Getting started
//! This crate provides two orbit structs:
//! - [`RadialOrbit`]: an orbit described by (R, vR, vT) that does not track
//!   azimuth. The angular momentum L = R·vT is frozen at its initial value
//!   and the motion reduces to two degrees of freedom. Use this for
//!   axisymmetric potentials when the azimuth is of no interest.
//! - [`PlanarOrbit`]: a full planar orbit described by (R, vR, vT, φ). The
//!   angular momentum is re-derived from the state at every step, so
//!   potentials with azimuthal structure are handled correctly.
//!
//! Both implement the [`DiskOrbit`] trait, which carries the shared
//! derived-quantity surface. Potentials implement [`PlanarPotential`] (or
//! [`AxisymPotential`] plus the [`PlanarFromAxisym`] adapter); the crate
//! ships [`LogarithmicHaloPotential`] and [`PowerLawPotential`].
//!
//! ## Example
//!
//! ```rust
//! use std::f64::consts::PI;
//!
//! use galactic_sim::{DiskOrbit, LogarithmicHaloPotential, PlanarOrbit};
//!
//! // A circular orbit at R = 1 in a flat rotation curve with v_c = 1.
//! let mut orbit = PlanarOrbit::new(1.0, 0.0, 1.0, 0.0);
//! let times: Vec<f64> = (0..=64).map(|i| i as f64 * (PI / 64.0)).collect();
//! orbit.integrate(&times, LogarithmicHaloPotential::flat(1.0)).unwrap();
//!
//! assert!(orbit.eccentricity().unwrap() < 1e-6);
//! ```

#![warn(missing_docs)]

mod action_angle;
mod eom;
mod ode;
mod planar_orbit;
mod potential;
mod radial_orbit;
mod solvers;

use std::cell::{OnceCell, RefCell};
use std::fmt;

pub use action_angle::{ActionAngle, ActionAngleError, ActionAngleFlat, ActionAnglePower};
use glam::DVec2;
pub use ode::{DormandPrince5, IntegrationError, OdeSystem, Stats, Tolerances};
pub use planar_orbit::PlanarOrbit;
pub use potential::{
    ActionAngleFamily, AxisymPotential, CompositePotential, IntoPotentialRef,
    LogarithmicHaloPotential, PlanarFromAxisym, PlanarPotential, PotentialRef, PowerLawPotential,
};
pub use radial_orbit::RadialOrbit;
pub use solvers::{QuadratureError, QuadratureOptions};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phase-space samples produced by one `integrate` call.
///
/// A row-major table with one row per output time and one column per
/// phase-space component, in the same order as the orbit's initial
/// condition: (R, vR, vT) for [`RadialOrbit`], (R, vR, vT, φ) for
/// [`PlanarOrbit`]. The table is produced once per integration and read-only
/// afterwards; a fresh `integrate` call replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    dim: usize,
    times: Vec<f64>,
    data: Vec<f64>,
}

impl Trajectory {
    pub(crate) fn from_rows<const N: usize>(times: Vec<f64>, rows: Vec<[f64; N]>) -> Self {
        debug_assert_eq!(times.len(), rows.len());
        let mut data = Vec::with_capacity(rows.len() * N);
        for row in &rows {
            data.extend_from_slice(row);
        }
        Trajectory {
            dim: N,
            times,
            data,
        }
    }

    /// The number of sampled rows; equals the length of the time grid.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the trajectory holds no rows.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The number of phase-space components per row (3 or 4).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The output times the rows were sampled at.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The phase-space components of row `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterator over one phase-space component across all rows.
    ///
    /// Column 0 is the radius, column 1 the radial velocity, column 2 the
    /// tangential velocity, and column 3 (full planar orbits only) the
    /// azimuth.
    ///
    /// # Panics
    /// Panics if `c` is not a valid column for this trajectory.
    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(c < self.dim, "column {c} out of range for dim {}", self.dim);
        self.data.iter().skip(c).step_by(self.dim).copied()
    }
}

/// The product of a successful `integrate` call: the trajectory plus the
/// resolved potential it was computed in.
///
/// The potential is kept so that later derived-quantity queries can omit an
/// explicit potential argument. The squared-radius column used by
/// [`DiskOrbit::eccentricity`] and friends is memoized here on first access.
#[derive(Clone)]
pub struct IntegratedState {
    trajectory: Trajectory,
    potential: PotentialRef,
    rs: OnceCell<Vec<f64>>,
}

impl IntegratedState {
    pub(crate) fn new(trajectory: Trajectory, potential: PotentialRef) -> Self {
        IntegratedState {
            trajectory,
            potential,
            rs: OnceCell::new(),
        }
    }

    /// The integrated trajectory.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// The potential the trajectory was integrated in.
    pub fn potential(&self) -> &PotentialRef {
        &self.potential
    }

    /// The squared radius R² at every row, memoized on first access.
    pub fn radius_squared(&self) -> &[f64] {
        self.rs
            .get_or_init(|| self.trajectory.column(0).map(|r| r * r).collect())
    }
}

impl fmt::Debug for IntegratedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegratedState")
            .field("trajectory", &self.trajectory)
            .finish_non_exhaustive()
    }
}

impl PartialEq for IntegratedState {
    fn eq(&self, other: &Self) -> bool {
        self.trajectory == other.trajectory
            && std::sync::Arc::ptr_eq(&self.potential, &other.potential)
            && self.rs == other.rs
    }
}

/// Per-orbit memo for the resolved action-angle solver.
///
/// The solver is built from the orbit's initial condition and the potential
/// family the first time an action, angle, or period is requested, and
/// reused for every later request. Re-integration clears the memo; if the
/// potential changes without re-integration, clearing it is the caller's
/// responsibility ([`ActionAngleCache::clear`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionAngleCache {
    slot: RefCell<Option<ActionAngle>>,
}

impl ActionAngleCache {
    /// Drop the memoized solver so the next query re-resolves it.
    pub fn clear(&self) {
        *self.slot.borrow_mut() = None;
    }

    pub(crate) fn resolve_with(
        &self,
        init: &[f64],
        pot: Option<&PotentialRef>,
        stored: Option<&PotentialRef>,
    ) -> Result<ActionAngle, OrbitError> {
        if let Some(solver) = *self.slot.borrow() {
            return Ok(solver);
        }
        let pot = pot.or(stored).ok_or(OrbitError::MissingPotential)?;
        let solver = ActionAngle::for_potential(pot.as_ref(), init[0], init[1], init[2])?;
        *self.slot.borrow_mut() = Some(solver);
        Ok(solver)
    }
}

/// A rectangular (x, y) snapshot of one trajectory row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RectangularState {
    /// Position in the disk plane.
    pub position: DVec2,
    /// Velocity in the disk plane.
    pub velocity: DVec2,
}

/// Errors from orbit integration and derived-quantity queries.
///
/// None of these are retried anywhere in the crate: every failure is
/// immediate and terminal for the call that raised it, and leaves the
/// orbit's prior state untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum OrbitError {
    /// A derived quantity needs a trajectory; call `integrate` first.
    NotIntegrated,
    /// No potential is stored on the orbit and none was supplied; integrate
    /// the orbit or pass a potential explicitly.
    MissingPotential,
    /// The orbit does not track azimuth, so azimuth-derived quantities and
    /// rectangular coordinates are unavailable.
    NoAzimuth,
    /// Orbits confined to the disk plane have no vertical extent.
    NoVerticalMotion,
    /// The output time grid is empty.
    EmptyTimeGrid,
    /// The output time grid must start at t = 0, where the initial
    /// condition is defined.
    TimeGridMissingZero,
    /// The output time grid must be strictly monotonic.
    NonMonotonicTimeGrid,
    /// The potential admits no closed-form action-angle solution.
    UnsupportedPotential,
    /// The orbit is not radially bound in the potential, so no apocenter
    /// exists for the action integrals.
    UnboundOrbit,
    /// The action-angle quadrature failed to reach its tolerance.
    Quadrature(QuadratureError),
    /// The ODE solve failed.
    Integration(IntegrationError),
}

impl fmt::Display for OrbitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitError::NotIntegrated => write!(f, "integrate the orbit first"),
            OrbitError::MissingPotential => {
                write!(f, "integrate the orbit first or specify a potential")
            }
            OrbitError::NoAzimuth => write!(f, "this orbit does not track azimuth"),
            OrbitError::NoVerticalMotion => {
                write!(f, "an orbit in the disk plane has no vertical extent")
            }
            OrbitError::EmptyTimeGrid => write!(f, "the output time grid is empty"),
            OrbitError::TimeGridMissingZero => {
                write!(f, "the output time grid must start at t = 0")
            }
            OrbitError::NonMonotonicTimeGrid => {
                write!(f, "the output time grid must be strictly monotonic")
            }
            OrbitError::UnsupportedPotential => {
                write!(f, "no closed-form action-angle solution for this potential")
            }
            OrbitError::UnboundOrbit => {
                write!(f, "the orbit is not radially bound in this potential")
            }
            OrbitError::Quadrature(e) => write!(f, "action-angle quadrature failed: {e}"),
            OrbitError::Integration(e) => write!(f, "orbit integration failed: {e}"),
        }
    }
}

impl std::error::Error for OrbitError {}

impl From<ActionAngleError> for OrbitError {
    fn from(e: ActionAngleError) -> Self {
        match e {
            ActionAngleError::UnsupportedPotential => OrbitError::UnsupportedPotential,
            ActionAngleError::UnboundOrbit => OrbitError::UnboundOrbit,
            ActionAngleError::Quadrature(q) => OrbitError::Quadrature(q),
        }
    }
}

impl From<IntegrationError> for OrbitError {
    fn from(e: IntegrationError) -> Self {
        OrbitError::Integration(e)
    }
}

/// Errors from constructing an orbit out of a raw phase-space slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSpaceError {
    /// Only R, vR, and vT were provided, but not φ; a 3-component phase
    /// space describes a [`RadialOrbit`].
    MissingAzimuth,
    /// The slice held the wrong number of phase-space components.
    WrongComponentCount {
        /// Components the orbit variant requires.
        expected: usize,
        /// Components the slice actually held.
        got: usize,
    },
}

impl fmt::Display for PhaseSpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseSpaceError::MissingAzimuth => write!(
                f,
                "only R, vR, and vT were provided, but not phi; you probably want RadialOrbit"
            ),
            PhaseSpaceError::WrongComponentCount { expected, got } => {
                write!(f, "expected {expected} phase-space components, got {got}")
            }
        }
    }
}

impl std::error::Error for PhaseSpaceError {}

pub(crate) fn validate_time_grid(times: &[f64]) -> Result<(), OrbitError> {
    let first = *times.first().ok_or(OrbitError::EmptyTimeGrid)?;
    if first != 0.0 {
        return Err(OrbitError::TimeGridMissingZero);
    }
    if times.len() > 1 {
        let forward = times[1] > times[0];
        for w in times.windows(2) {
            if w[1] == w[0] || (w[1] > w[0]) != forward {
                return Err(OrbitError::NonMonotonicTimeGrid);
            }
        }
    }
    Ok(())
}

/// A trait that defines the shared surface of a disk-plane orbit.
///
/// This trait is implemented by both [`RadialOrbit`] and [`PlanarOrbit`].
/// The derived quantities split into two groups with different data
/// requirements:
///
/// - `eccentricity`, `apocenter`, `pericenter`, and `energies` read the
///   integrated trajectory and fail with [`OrbitError::NotIntegrated`]
///   before `integrate` has run.
/// - The action, angle, and period queries read only the *initial
///   condition* plus a potential: the one stored by the last `integrate`
///   call, or one passed explicitly (which also works before any
///   integration).
pub trait DiskOrbit {
    /// The phase-space components of the initial condition, in the order
    /// (R, vR, vT) or (R, vR, vT, φ).
    fn phase_space(&self) -> &[f64];

    /// The integrated state, if `integrate` has completed successfully.
    fn integrated(&self) -> Option<&IntegratedState>;

    /// The per-orbit action-angle solver memo.
    fn action_angle_cache(&self) -> &ActionAngleCache;

    /// Total mechanical energy Φ + vR²/2 + vT²/2 evaluated at the *initial*
    /// condition.
    ///
    /// This is a conserved-quantity check on the initial condition, not a
    /// per-timestep sampling; see [`DiskOrbit::energies`] for the energy at
    /// every trajectory row. With `pot = None` the potential of the last
    /// `integrate` call is used.
    fn energy(&self, pot: Option<&PotentialRef>) -> Result<f64, OrbitError>;

    /// Total mechanical energy at every trajectory row.
    ///
    /// With `pot = None` the potential of the last `integrate` call is
    /// used.
    fn energies(&self, pot: Option<&PotentialRef>) -> Result<Vec<f64>, OrbitError>;

    /// The azimuth component stored in the initial condition.
    ///
    /// Fails with [`OrbitError::NoAzimuth`] on orbits that do not track
    /// azimuth. Note this reads the phase-space point directly; it is not
    /// derived from an action-angle solver.
    fn azimuth(&self) -> Result<f64, OrbitError>;

    /// The trajectory rows converted to rectangular (x, y) coordinates.
    ///
    /// Fails with [`OrbitError::NoAzimuth`] on orbits that do not track
    /// azimuth, since the in-plane orientation is then unknown.
    fn rectangular(&self) -> Result<Vec<RectangularState>, OrbitError> {
        Err(OrbitError::NoAzimuth)
    }

    /// The integrated trajectory.
    fn trajectory(&self) -> Result<&Trajectory, OrbitError> {
        self.integrated()
            .map(IntegratedState::trajectory)
            .ok_or(OrbitError::NotIntegrated)
    }

    /// The potential of the last `integrate` call, if any.
    fn last_potential(&self) -> Option<&PotentialRef> {
        self.integrated().map(IntegratedState::potential)
    }

    /// Orbital eccentricity (Rmax² − Rmin²)/(Rmax² + Rmin²) over the full
    /// trajectory.
    ///
    /// Both extrema are of the *squared* radius, consistent with
    /// [`DiskOrbit::apocenter`] and [`DiskOrbit::pericenter`].
    fn eccentricity(&self) -> Result<f64, OrbitError> {
        let rs = self
            .integrated()
            .ok_or(OrbitError::NotIntegrated)?
            .radius_squared();
        let (min, max) = min_max(rs);
        Ok((max - min) / (max + min))
    }

    /// The maximum of the squared radius R² over the trajectory.
    ///
    /// Note the value is the *squared* apocenter radius, matching how
    /// [`DiskOrbit::eccentricity`] consumes it; take the square root for
    /// the radius itself.
    fn apocenter(&self) -> Result<f64, OrbitError> {
        let rs = self
            .integrated()
            .ok_or(OrbitError::NotIntegrated)?
            .radius_squared();
        Ok(min_max(rs).1)
    }

    /// The minimum of the squared radius R² over the trajectory.
    ///
    /// Note the value is the *squared* pericenter radius, matching how
    /// [`DiskOrbit::eccentricity`] consumes it; take the square root for
    /// the radius itself.
    fn pericenter(&self) -> Result<f64, OrbitError> {
        let rs = self
            .integrated()
            .ok_or(OrbitError::NotIntegrated)?
            .radius_squared();
        Ok(min_max(rs).0)
    }

    /// The maximum height above the disk plane.
    ///
    /// Always fails with [`OrbitError::NoVerticalMotion`]: the vertical
    /// axis does not exist for orbits confined to the plane.
    fn max_height(&self) -> Result<f64, OrbitError> {
        Err(OrbitError::NoVerticalMotion)
    }

    /// Resolve (and memoize) the closed-form action-angle solver for this
    /// orbit's initial condition.
    ///
    /// With `pot = None` the potential of the last `integrate` call is
    /// used; passing a potential explicitly works before any integration.
    fn resolve_action_angle(&self, pot: Option<&PotentialRef>) -> Result<ActionAngle, OrbitError> {
        self.action_angle_cache()
            .resolve_with(self.phase_space(), pot, self.last_potential())
    }

    /// The radial action J_R.
    fn radial_action(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.radial_action(opts)?)
    }

    /// The azimuthal action J_φ (the angular momentum).
    fn azimuthal_action(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.azimuthal_action(opts)?)
    }

    /// The radial angle w_R of the initial condition.
    fn radial_angle(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.radial_angle(opts)?)
    }

    /// The azimuthal angle conjugate to J_φ at the initial condition.
    fn azimuthal_angle(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.azimuthal_angle(opts)?)
    }

    /// The radial period T_R.
    fn radial_period(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.radial_period(opts)?)
    }

    /// The azimuthal period T_φ.
    fn azimuthal_period(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.azimuthal_period(opts)?)
    }

    /// The ratio quantity T_R/T_φ · π, the azimuth swept during half a
    /// radial oscillation.
    fn period_ratio(
        &self,
        pot: Option<&PotentialRef>,
        opts: &QuadratureOptions,
    ) -> Result<f64, OrbitError> {
        Ok(self.resolve_action_angle(pot)?.period_ratio(opts)?)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests;
