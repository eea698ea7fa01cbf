//! Gravitational potentials restricted to the disk plane.
//!
//! The orbit integrators consume potentials through the [`PlanarPotential`]
//! trait: a radial force, an azimuthal force, and a scalar potential value,
//! each as a function of position and time. Axisymmetric potentials can be
//! written against the smaller [`AxisymPotential`] trait and adapted with
//! [`PlanarFromAxisym`]; ordered collections of potentials are summed by
//! [`CompositePotential`].
//!
//! Instead of inspecting concrete types, the action-angle machinery asks a
//! potential for its [`ActionAngleFamily`] tag, so user-defined potentials
//! can opt into the closed-form solvers by reporting a family.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Potential families with closed-form action-angle solutions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActionAngleFamily {
    /// A flat rotation curve, i.e. the logarithmic potential family.
    FlatRotationCurve,
    /// A power-law density family with exponent `alpha`; the rotation curve
    /// goes as v_c ∝ r^(0.5 − α/4). At α = 2 this coincides with the flat
    /// rotation curve.
    PowerLaw {
        /// The density power-law exponent.
        alpha: f64,
    },
}

/// A potential evaluable anywhere in the disk plane.
///
/// Force and value evaluation must be free of side effects: potentials are
/// shared read-only between orbits, possibly across threads.
pub trait PlanarPotential: Send + Sync {
    /// The radial force F_R = −∂Φ/∂R at radius `r`, azimuth `phi`, time `t`.
    fn radial_force(&self, r: f64, phi: f64, t: f64) -> f64;

    /// The azimuthal force F_φ = −(1/R)·∂Φ/∂φ at (`r`, `phi`, `t`).
    fn azimuthal_force(&self, r: f64, phi: f64, t: f64) -> f64;

    /// The potential value Φ at (`r`, `phi`, `t`).
    fn value(&self, r: f64, phi: f64, t: f64) -> f64;

    /// The closed-form action-angle family this potential belongs to, if
    /// any. Defaults to none, which makes action-angle queries fail with an
    /// unsupported-potential error.
    fn action_angle_family(&self) -> Option<ActionAngleFamily> {
        None
    }
}

/// An axisymmetric potential: no azimuth dependence.
///
/// Adapt to the planar interface with [`PlanarFromAxisym`].
pub trait AxisymPotential: Send + Sync {
    /// The radial force F_R = −dΦ/dR at radius `r` and time `t`.
    fn radial_force(&self, r: f64, t: f64) -> f64;

    /// The potential value Φ at (`r`, `t`).
    fn value(&self, r: f64, t: f64) -> f64;

    /// The closed-form action-angle family this potential belongs to, if
    /// any.
    fn action_angle_family(&self) -> Option<ActionAngleFamily> {
        None
    }
}

/// A shared handle to a planar potential.
///
/// Orbits keep the potential of their last integration behind one of these
/// so that later derived-quantity queries can omit the potential argument.
pub type PotentialRef = Arc<dyn PlanarPotential>;

/// Adapter exposing an [`AxisymPotential`] on the planar interface.
///
/// The azimuthal force is identically zero and the family tag of the inner
/// potential is forwarded, so an axisymmetric potential loses nothing by
/// being wrapped.
#[derive(Debug, Clone, Copy)]
pub struct PlanarFromAxisym<P> {
    inner: P,
}

impl<P: AxisymPotential> PlanarFromAxisym<P> {
    /// Wrap an axisymmetric potential for use in the plane.
    pub fn new(inner: P) -> Self {
        PlanarFromAxisym { inner }
    }

    /// The wrapped axisymmetric potential.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: AxisymPotential> PlanarPotential for PlanarFromAxisym<P> {
    fn radial_force(&self, r: f64, _phi: f64, t: f64) -> f64 {
        self.inner.radial_force(r, t)
    }

    fn azimuthal_force(&self, _r: f64, _phi: f64, _t: f64) -> f64 {
        0.0
    }

    fn value(&self, r: f64, _phi: f64, t: f64) -> f64 {
        self.inner.value(r, t)
    }

    fn action_angle_family(&self) -> Option<ActionAngleFamily> {
        self.inner.action_angle_family()
    }
}

/// An ordered collection of potentials summed at evaluation time.
///
/// Composites never report an action-angle family: even when every member
/// is integrable on its own, their sum generally is not.
#[derive(Clone)]
pub struct CompositePotential {
    components: Vec<PotentialRef>,
}

impl CompositePotential {
    /// Sum the given potentials.
    pub fn new(components: Vec<PotentialRef>) -> Self {
        CompositePotential { components }
    }

    /// The summed member potentials, in order.
    pub fn components(&self) -> &[PotentialRef] {
        &self.components
    }
}

impl fmt::Debug for CompositePotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositePotential")
            .field("components", &self.components.len())
            .finish()
    }
}

impl PlanarPotential for CompositePotential {
    fn radial_force(&self, r: f64, phi: f64, t: f64) -> f64 {
        self.components
            .iter()
            .map(|p| p.radial_force(r, phi, t))
            .sum()
    }

    fn azimuthal_force(&self, r: f64, phi: f64, t: f64) -> f64 {
        self.components
            .iter()
            .map(|p| p.azimuthal_force(r, phi, t))
            .sum()
    }

    fn value(&self, r: f64, phi: f64, t: f64) -> f64 {
        self.components.iter().map(|p| p.value(r, phi, t)).sum()
    }
}

/// Conversion into a shared planar potential handle.
///
/// Implemented for any planar potential by value, for an existing
/// [`PotentialRef`], and for an ordered `Vec` of handles (which becomes a
/// [`CompositePotential`]), so `integrate` accepts all three shapes
/// directly.
pub trait IntoPotentialRef {
    /// Convert `self` into a shared planar potential handle.
    fn into_potential_ref(self) -> PotentialRef;
}

impl IntoPotentialRef for PotentialRef {
    fn into_potential_ref(self) -> PotentialRef {
        self
    }
}

impl IntoPotentialRef for &PotentialRef {
    fn into_potential_ref(self) -> PotentialRef {
        Arc::clone(self)
    }
}

impl<P: PlanarPotential + 'static> IntoPotentialRef for P {
    fn into_potential_ref(self) -> PotentialRef {
        Arc::new(self)
    }
}

impl IntoPotentialRef for Vec<PotentialRef> {
    fn into_potential_ref(self) -> PotentialRef {
        Arc::new(CompositePotential::new(self))
    }
}

/// The logarithmic halo potential Φ(R) = (amp/2)·ln(R² + core²).
///
/// With `core = 0` the rotation curve is exactly flat with circular
/// velocity √amp at every radius; a nonzero `core` softens the center. The
/// family tag is [`ActionAngleFamily::FlatRotationCurve`] either way.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogarithmicHaloPotential {
    /// Amplitude; equals the squared circular velocity far outside the
    /// core.
    pub amp: f64,
    /// Core radius softening the potential near the center.
    pub core: f64,
}

impl LogarithmicHaloPotential {
    /// A logarithmic halo with the given amplitude and core radius.
    pub fn new(amp: f64, core: f64) -> Self {
        LogarithmicHaloPotential { amp, core }
    }

    /// A coreless halo with an exactly flat rotation curve at
    /// `circular_velocity`.
    pub fn flat(circular_velocity: f64) -> Self {
        LogarithmicHaloPotential {
            amp: circular_velocity * circular_velocity,
            core: 0.0,
        }
    }
}

impl PlanarPotential for LogarithmicHaloPotential {
    fn radial_force(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        -self.amp * r / (r * r + self.core * self.core)
    }

    fn azimuthal_force(&self, _r: f64, _phi: f64, _t: f64) -> f64 {
        0.0
    }

    fn value(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        0.5 * self.amp * (r * r + self.core * self.core).ln()
    }

    fn action_angle_family(&self) -> Option<ActionAngleFamily> {
        Some(ActionAngleFamily::FlatRotationCurve)
    }
}

/// A power-law potential with rotation curve v_c(r) = √amp · r^β, where
/// β = 0.5 − α/4 and α is the density power-law exponent.
///
/// Φ(r) = amp·r^(2β)/(2β) for α ≠ 2, and amp·ln r at α = 2, where the
/// family degenerates to the flat rotation curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerLawPotential {
    /// Amplitude; equals the squared circular velocity at r = 1.
    pub amp: f64,
    /// The density power-law exponent.
    pub alpha: f64,
}

impl PowerLawPotential {
    /// A power-law potential with the given amplitude and density exponent.
    pub fn new(amp: f64, alpha: f64) -> Self {
        PowerLawPotential { amp, alpha }
    }

    /// The rotation-curve exponent β = 0.5 − α/4.
    pub fn beta(&self) -> f64 {
        0.5 - self.alpha / 4.0
    }
}

impl PlanarPotential for PowerLawPotential {
    fn radial_force(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        // dΦ/dr = amp·r^(2β−1) for every α, including the α = 2 limit.
        -self.amp * r.powf(2.0 * self.beta() - 1.0)
    }

    fn azimuthal_force(&self, _r: f64, _phi: f64, _t: f64) -> f64 {
        0.0
    }

    fn value(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        if self.alpha == 2.0 {
            self.amp * r.ln()
        } else {
            let two_beta = 2.0 * self.beta();
            self.amp * r.powf(two_beta) / two_beta
        }
    }

    fn action_angle_family(&self) -> Option<ActionAngleFamily> {
        Some(ActionAngleFamily::PowerLaw { alpha: self.alpha })
    }
}
