#![cfg(test)]

use std::f64::consts::PI;

use rand::Rng;

use crate::{
    AxisymPotential, DiskOrbit, IntoPotentialRef, LogarithmicHaloPotential, OrbitError,
    PhaseSpaceError, PlanarFromAxisym, PlanarOrbit, PlanarPotential, PotentialRef,
    PowerLawPotential, QuadratureOptions, RadialOrbit,
};


use assertions::*;

/// A point-mass potential with no action-angle family tag.
struct PointMassPotential {
    amp: f64,
}

impl PlanarPotential for PointMassPotential {
    fn radial_force(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        -self.amp / (r * r)
    }
    fn azimuthal_force(&self, _r: f64, _phi: f64, _t: f64) -> f64 {
        0.0
    }
    fn value(&self, r: f64, _phi: f64, _t: f64) -> f64 {
        -self.amp / r
    }
}

fn time_grid(end: f64, steps: usize) -> Vec<f64> {
    (0..=steps).map(|i| i as f64 * end / steps as f64).collect()
}

fn opts() -> QuadratureOptions {
    QuadratureOptions::default()
}

#[test]
fn radial_orbit_conserves_angular_momentum() {
    let mut rng = rand::rng();
    for _ in 0..20 {
        let r = rng.random_range(0.5..2.0);
        let vr = rng.random_range(-0.3..0.3);
        let vt = rng.random_range(0.6..1.4);
        let lz = r * vt;

        let mut orbit = RadialOrbit::new(r, vr, vt);
        orbit
            .integrate(&time_grid(10.0, 100), LogarithmicHaloPotential::flat(1.0))
            .unwrap();

        let trajectory = orbit.trajectory().unwrap();
        for i in 0..trajectory.len() {
            let row = trajectory.row(i);
            assert_close(
                row[0] * row[2],
                lz,
                1e-12,
                &format!("L at row {i} for R={r}, vR={vr}, vT={vt}"),
            );
        }
    }
}

#[test]
fn planar_orbit_conserves_angular_momentum_numerically() {
    // Unlike the radial variant, the full planar system re-derives L from
    // the state, so conservation holds only to solver tolerance.
    let mut orbit = PlanarOrbit::new(1.2, 0.25, 0.9, 0.5);
    orbit
        .integrate(&time_grid(10.0, 100), LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    let lz = 1.2 * 0.9;
    let trajectory = orbit.trajectory().unwrap();
    for i in 0..trajectory.len() {
        let row = trajectory.row(i);
        assert_almost_eq(row[0] * row[2], lz, &format!("L at row {i}"));
    }
}

#[test]
fn circular_orbit_has_zero_eccentricity() {
    let mut orbit = RadialOrbit::new(1.0, 0.0, 1.0);
    orbit
        .integrate(&time_grid(20.0, 200), LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    assert!(orbit.eccentricity().unwrap() < 1e-8);
    // Apocenter and pericenter are returned as squared radii.
    assert_almost_eq(orbit.apocenter().unwrap(), 1.0, "squared apocenter");
    assert_almost_eq(orbit.pericenter().unwrap(), 1.0, "squared pericenter");
}

#[test]
fn eccentric_orbit_extrema_bracket_the_start() {
    let mut orbit = RadialOrbit::new(1.0, 0.3, 0.9);
    orbit
        .integrate(&time_grid(30.0, 400), LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    let e = orbit.eccentricity().unwrap();
    assert!(e > 0.05 && e < 1.0, "eccentricity {e}");
    assert!(orbit.pericenter().unwrap() < 1.0);
    assert!(orbit.apocenter().unwrap() > 1.0);
    let (rap2, rperi2) = (orbit.apocenter().unwrap(), orbit.pericenter().unwrap());
    assert_almost_eq(
        e,
        (rap2 - rperi2) / (rap2 + rperi2),
        "eccentricity from squared extrema",
    );
}

#[test]
fn energy_defaults_to_last_used_potential() {
    let pot = LogarithmicHaloPotential::flat(1.0).into_potential_ref();
    let mut orbit = PlanarOrbit::new(1.0, 0.2, 1.1, 0.0);
    orbit.integrate(&time_grid(5.0, 50), &pot).unwrap();

    assert_eq!(orbit.energy(None), orbit.energy(Some(&pot)));
}

#[test]
fn energy_is_evaluated_at_the_initial_condition() {
    let pot = LogarithmicHaloPotential::flat(1.0).into_potential_ref();
    let mut orbit = RadialOrbit::new(1.0, 0.3, 0.9);
    orbit.integrate(&time_grid(5.0, 50), &pot).unwrap();

    let expected = pot.value(1.0, 0.0, 0.0) + 0.3 * 0.3 / 2.0 + 0.9 * 0.9 / 2.0;
    assert_eq!(orbit.energy(None).unwrap(), expected);
}

#[test]
fn energy_series_is_conserved_along_the_orbit() {
    let mut orbit = PlanarOrbit::new(1.0, 0.3, 0.9, 0.0);
    orbit
        .integrate(&time_grid(20.0, 200), LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    let energies = orbit.energies(None).unwrap();
    assert_eq!(energies.len(), 201);
    let e0 = energies[0];
    for (i, e) in energies.iter().enumerate() {
        assert_close(*e, e0, 1e-5, &format!("energy at row {i}"));
    }
}

#[test]
fn derived_quantities_fail_before_integration() {
    let radial = RadialOrbit::new(1.0, 0.1, 1.0);
    assert_eq!(radial.eccentricity(), Err(OrbitError::NotIntegrated));
    assert_eq!(radial.apocenter(), Err(OrbitError::NotIntegrated));
    assert_eq!(radial.pericenter(), Err(OrbitError::NotIntegrated));
    assert_eq!(radial.energies(None), Err(OrbitError::NotIntegrated));
    assert_eq!(radial.energy(None), Err(OrbitError::MissingPotential));
    assert_eq!(
        radial.radial_action(None, &opts()),
        Err(OrbitError::MissingPotential)
    );

    let planar = PlanarOrbit::new(1.0, 0.1, 1.0, 0.0);
    assert_eq!(planar.eccentricity(), Err(OrbitError::NotIntegrated));
    assert_eq!(planar.energy(None), Err(OrbitError::MissingPotential));
    assert!(planar.trajectory().is_err());
}

#[test]
fn action_queries_with_an_explicit_potential_work_before_integration() {
    let pot = LogarithmicHaloPotential::flat(1.0).into_potential_ref();
    let orbit = RadialOrbit::new(1.0, 0.0, 1.0);
    let tr = orbit.radial_period(Some(&pot), &opts()).unwrap();
    assert_almost_eq(tr, PI * 2.0f64.sqrt(), "circular radial period");
    assert_eq!(orbit.azimuthal_action(None, &opts()), Ok(1.0));
}

#[test]
fn planar_orbit_rejects_a_three_component_phase_space() {
    assert_eq!(
        PlanarOrbit::from_phase_space(&[1.0, 0.0, 1.0]),
        Err(PhaseSpaceError::MissingAzimuth)
    );
    assert_eq!(
        PlanarOrbit::from_phase_space(&[1.0, 0.0]),
        Err(PhaseSpaceError::WrongComponentCount {
            expected: 4,
            got: 2
        })
    );
    assert!(PlanarOrbit::from_phase_space(&[1.0, 0.0, 1.0, 0.5]).is_ok());

    assert_eq!(
        RadialOrbit::from_phase_space(&[1.0, 0.0, 1.0, 0.5]),
        Err(PhaseSpaceError::WrongComponentCount {
            expected: 3,
            got: 4
        })
    );
    assert!(RadialOrbit::from_phase_space(&[1.0, 0.0, 1.0]).is_ok());
}

#[test]
fn time_grid_is_validated() {
    let pot = LogarithmicHaloPotential::flat(1.0);
    let mut orbit = RadialOrbit::new(1.0, 0.0, 1.0);

    assert_eq!(orbit.integrate(&[], pot), Err(OrbitError::EmptyTimeGrid));
    assert_eq!(
        orbit.integrate(&[1.0, 2.0], pot),
        Err(OrbitError::TimeGridMissingZero)
    );
    assert_eq!(
        orbit.integrate(&[0.0, 2.0, 1.0], pot),
        Err(OrbitError::NonMonotonicTimeGrid)
    );
    assert_eq!(
        orbit.integrate(&[0.0, 1.0, 1.0], pot),
        Err(OrbitError::NonMonotonicTimeGrid)
    );
    // A failed call leaves the orbit untouched.
    assert_eq!(orbit.eccentricity(), Err(OrbitError::NotIntegrated));

    // Backward grids are fine as long as they are monotonic.
    assert!(orbit.integrate(&[0.0, -0.5, -1.0], pot).is_ok());
}

#[test]
fn actions_in_an_untagged_potential_are_unsupported() {
    let mut orbit = RadialOrbit::new(1.0, 0.0, 1.0);
    orbit
        .integrate(&time_grid(5.0, 50), PointMassPotential { amp: 1.0 })
        .unwrap();

    assert_eq!(
        orbit.radial_action(None, &opts()),
        Err(OrbitError::UnsupportedPotential)
    );
    assert_eq!(
        orbit.azimuthal_period(None, &opts()),
        Err(OrbitError::UnsupportedPotential)
    );
}

#[test]
fn tangential_velocity_reconstruction_matches_euler() {
    // March the physical planar equations with a crude explicit Euler
    // scheme over a short span and compare against the adaptive
    // integration with its vT = R·ω reconstruction.
    let pot = LogarithmicHaloPotential::flat(1.0);
    let (mut r, mut vr, mut vt, mut phi) = (1.1, 0.2, 0.9, 0.3);
    let dt = 1e-6;
    let steps = 20_000;
    for _ in 0..steps {
        let fr = pot.radial_force(r, phi, 0.0);
        let (dr, dvr, dvt, dphi) = (
            vr,
            vt * vt / r + fr,
            -vr * vt / r,
            vt / r,
        );
        r += dt * dr;
        vr += dt * dvr;
        vt += dt * dvt;
        phi += dt * dphi;
    }

    let mut orbit = PlanarOrbit::new(1.1, 0.2, 0.9, 0.3);
    orbit
        .integrate(&[0.0, dt * steps as f64], pot)
        .unwrap();
    let end = orbit.trajectory().unwrap().row(1).to_vec();

    assert_almost_eq(end[0], r, "R after a short span");
    assert_almost_eq(end[1], vr, "vR after a short span");
    assert_almost_eq(end[2], vt, "vT after a short span");
    assert_almost_eq(end[3], phi, "phi after a short span");
}

#[test]
fn half_orbit_in_a_flat_rotation_curve() {
    let mut orbit = PlanarOrbit::new(1.0, 0.0, 1.0, 0.0);
    orbit
        .integrate(&[0.0, PI], LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    let trajectory = orbit.trajectory().unwrap();
    assert_eq!(trajectory.len(), 2);
    assert_eq!(trajectory.dim(), 4);
    let end = trajectory.row(1).to_vec();
    assert_almost_eq(end[0], 1.0, "R after half an orbit");
    assert_almost_eq(end[3], PI, "phi after half an orbit");
    assert!(orbit.eccentricity().unwrap() < 1e-8);
}

#[test]
fn composite_potentials_integrate_but_refuse_actions() {
    let halves = vec![
        LogarithmicHaloPotential::new(0.5, 0.0).into_potential_ref(),
        LogarithmicHaloPotential::new(0.5, 0.0).into_potential_ref(),
    ];
    let mut orbit = PlanarOrbit::new(1.0, 0.0, 1.0, 0.0);
    orbit.integrate(&[0.0, PI], halves).unwrap();

    // The two half-amplitude halos sum to a unit flat curve.
    let end = orbit.trajectory().unwrap().row(1).to_vec();
    assert_almost_eq(end[0], 1.0, "R in the summed potential");
    assert_almost_eq(end[3], PI, "phi in the summed potential");

    assert_eq!(
        orbit.radial_action(None, &opts()),
        Err(OrbitError::UnsupportedPotential)
    );
}

#[test]
fn vertical_queries_fail_on_both_variants() {
    let mut radial = RadialOrbit::new(1.0, 0.0, 1.0);
    let mut planar = PlanarOrbit::new(1.0, 0.0, 1.0, 0.0);
    assert_eq!(radial.max_height(), Err(OrbitError::NoVerticalMotion));
    assert_eq!(planar.max_height(), Err(OrbitError::NoVerticalMotion));

    let pot = LogarithmicHaloPotential::flat(1.0);
    radial.integrate(&[0.0, 1.0], pot).unwrap();
    planar.integrate(&[0.0, 1.0], pot).unwrap();
    assert_eq!(radial.max_height(), Err(OrbitError::NoVerticalMotion));
    assert_eq!(planar.max_height(), Err(OrbitError::NoVerticalMotion));
}

#[test]
fn azimuth_is_per_variant() {
    let radial = RadialOrbit::new(1.0, 0.0, 1.0);
    assert_eq!(radial.azimuth(), Err(OrbitError::NoAzimuth));
    assert_eq!(radial.rectangular(), Err(OrbitError::NoAzimuth));

    // The full variant reports the stored azimuth of the phase-space
    // point, untouched by integration.
    let mut planar = PlanarOrbit::new(1.0, 0.0, 1.0, 0.75);
    assert_eq!(planar.azimuth(), Ok(0.75));
    planar
        .integrate(&[0.0, 1.0], LogarithmicHaloPotential::flat(1.0))
        .unwrap();
    assert_eq!(planar.azimuth(), Ok(0.75));
}

#[test]
fn rectangular_conversion_of_the_full_variant() {
    let mut orbit = PlanarOrbit::new(2.0, 0.2, 1.0, PI / 4.0);
    orbit
        .integrate(&[0.0, 0.5], LogarithmicHaloPotential::flat(1.0))
        .unwrap();

    let rect = orbit.rectangular().unwrap();
    assert_eq!(rect.len(), 2);
    let inv_sqrt2 = 1.0 / 2.0f64.sqrt();
    assert_almost_eq(rect[0].position.x, 2.0 * inv_sqrt2, "x at t = 0");
    assert_almost_eq(rect[0].position.y, 2.0 * inv_sqrt2, "y at t = 0");
    assert_almost_eq(
        rect[0].velocity.x,
        (0.2 - 1.0) * inv_sqrt2,
        "vx at t = 0",
    );
    assert_almost_eq(
        rect[0].velocity.y,
        (0.2 + 1.0) * inv_sqrt2,
        "vy at t = 0",
    );
}

#[test]
fn solver_period_closes_the_integrated_orbit() {
    // The radial period from the closed-form solver must bring the
    // integrated radius and radial velocity back to their initial values.
    let pot = LogarithmicHaloPotential::flat(1.0).into_potential_ref();
    let mut orbit = RadialOrbit::new(1.0, 0.3, 0.9);
    orbit.integrate(&time_grid(1.0, 10), &pot).unwrap();

    let tr = orbit.radial_period(None, &opts()).unwrap();
    let mut closed = RadialOrbit::new(1.0, 0.3, 0.9);
    closed.integrate(&time_grid(tr, 64), &pot).unwrap();
    let trajectory = closed.trajectory().unwrap();
    let last = trajectory.row(trajectory.len() - 1).to_vec();
    assert_close(last[0], 1.0, 1e-5, "R after one radial period");
    assert_close(last[1], 0.3, 1e-5, "vR after one radial period");
}

#[test]
fn action_angle_memo_persists_until_reintegration() {
    let flat = LogarithmicHaloPotential::flat(1.0).into_potential_ref();
    let power = PowerLawPotential::new(1.0, 1.0).into_potential_ref();

    let mut orbit = RadialOrbit::new(1.0, 0.0, 1.0);
    orbit.integrate(&time_grid(5.0, 50), &flat).unwrap();

    let flat_tr = orbit.radial_period(None, &opts()).unwrap();
    // The memoized solver wins even over an explicit potential argument.
    assert_eq!(
        orbit.radial_period(Some(&power), &opts()).unwrap(),
        flat_tr
    );
    // Clearing the memo lets the explicit potential take effect.
    orbit.action_angle_cache().clear();
    let power_tr = orbit.radial_period(Some(&power), &opts()).unwrap();
    assert_close(
        power_tr,
        2.0 * PI / 2.5f64.sqrt(),
        1e-8,
        "circular period for beta = 0.25",
    );

    // Re-integration also drops the memo.
    orbit.integrate(&time_grid(5.0, 50), &power).unwrap();
    assert_close(
        orbit.radial_period(None, &opts()).unwrap(),
        power_tr,
        1e-12,
        "period after re-integration",
    );
}

#[test]
fn power_law_at_alpha_two_dispatches_to_the_flat_solver() {
    let degenerate = PowerLawPotential::new(1.0, 2.0).into_potential_ref();
    let flat = LogarithmicHaloPotential::flat(1.0).into_potential_ref();

    let orbit = RadialOrbit::new(1.0, 0.2, 1.0);
    let other = RadialOrbit::new(1.0, 0.2, 1.0);
    let a = orbit.radial_period(Some(&degenerate), &opts()).unwrap();
    let b = other.radial_period(Some(&flat), &opts()).unwrap();
    assert_close(a, b, 1e-12, "degenerate power law vs flat curve");
}

#[test]
fn axisymmetric_adapter_supports_the_full_pipeline() {
    struct FlatHalo;
    impl AxisymPotential for FlatHalo {
        fn radial_force(&self, r: f64, _t: f64) -> f64 {
            -1.0 / r
        }
        fn value(&self, r: f64, _t: f64) -> f64 {
            r.ln()
        }
        fn action_angle_family(&self) -> Option<crate::ActionAngleFamily> {
            Some(crate::ActionAngleFamily::FlatRotationCurve)
        }
    }

    let mut orbit = RadialOrbit::new(1.0, 0.0, 1.0);
    orbit
        .integrate(&time_grid(5.0, 50), PlanarFromAxisym::new(FlatHalo))
        .unwrap();

    assert!(orbit.eccentricity().unwrap() < 1e-8);
    assert_almost_eq(
        orbit.radial_period(None, &opts()).unwrap(),
        PI * 2.0f64.sqrt(),
        "adapter-backed circular period",
    );
}

#[test]
fn trajectory_shape_matches_the_grid() {
    let times = time_grid(3.0, 17);
    let mut radial = RadialOrbit::new(1.0, 0.1, 1.0);
    radial
        .integrate(&times, LogarithmicHaloPotential::flat(1.0))
        .unwrap();
    let trajectory = radial.trajectory().unwrap();
    assert_eq!(trajectory.len(), times.len());
    assert_eq!(trajectory.dim(), 3);
    assert_eq!(trajectory.times(), times.as_slice());

    let mut planar = PlanarOrbit::new(1.0, 0.1, 1.0, 0.0);
    planar
        .integrate(&times, LogarithmicHaloPotential::flat(1.0))
        .unwrap();
    assert_eq!(planar.trajectory().unwrap().dim(), 4);
}

#[test]
fn radial_and_planar_radii_agree_in_axisymmetric_potentials() {
    // With azimuth integrated out or kept, the radial motion must be the
    // same in an axisymmetric potential.
    let times = time_grid(15.0, 150);
    let pot: PotentialRef = LogarithmicHaloPotential::flat(1.0).into_potential_ref();

    let mut radial = RadialOrbit::new(1.0, 0.3, 0.9);
    radial.integrate(&times, &pot).unwrap();
    let mut planar = PlanarOrbit::new(1.0, 0.3, 0.9, 0.0);
    planar.integrate(&times, &pot).unwrap();

    let radial_r = radial.trajectory().unwrap();
    let planar_r = planar.trajectory().unwrap();
    for i in 0..times.len() {
        assert_close(
            radial_r.row(i)[0],
            planar_r.row(i)[0],
            1e-5,
            &format!("R at row {i}"),
        );
    }
    assert_close(
        radial.eccentricity().unwrap(),
        planar.eccentricity().unwrap(),
        1e-5,
        "eccentricities of the two reductions",
    );
}
