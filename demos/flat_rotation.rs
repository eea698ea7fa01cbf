use std::f64::consts::PI;

use galactic_sim::{DiskOrbit, LogarithmicHaloPotential, PlanarOrbit, QuadratureOptions};

const OUTPUT_STEPS: usize = 32;

fn main() {
    // An eccentric orbit in a flat rotation curve with v_c = 1.
    let mut orbit = PlanarOrbit::new(1.0, 0.3, 0.9, 0.0);
    let times: Vec<f64> = (0..=OUTPUT_STEPS)
        .map(|i| i as f64 * (4.0 * PI / OUTPUT_STEPS as f64))
        .collect();

    orbit
        .integrate(&times, LogarithmicHaloPotential::flat(1.0))
        .expect("orbit integration failed");

    println!("      t          R         vR         vT        phi");
    let trajectory = orbit.trajectory().unwrap();
    for (i, t) in trajectory.times().iter().enumerate() {
        let row = trajectory.row(i);
        println!(
            "{t:9.4}  {:9.6}  {:9.6}  {:9.6}  {:9.6}",
            row[0], row[1], row[2], row[3]
        );
    }

    let opts = QuadratureOptions::default();
    println!();
    println!("energy            = {:.10}", orbit.energy(None).unwrap());
    println!("eccentricity      = {:.10}", orbit.eccentricity().unwrap());
    println!(
        "apocenter (R^2)   = {:.10}",
        orbit.apocenter().unwrap()
    );
    println!(
        "pericenter (R^2)  = {:.10}",
        orbit.pericenter().unwrap()
    );
    println!(
        "radial action     = {:.10}",
        orbit.radial_action(None, &opts).unwrap()
    );
    println!(
        "azimuthal action  = {:.10}",
        orbit.azimuthal_action(None, &opts).unwrap()
    );
    println!(
        "radial period     = {:.10}",
        orbit.radial_period(None, &opts).unwrap()
    );
    println!(
        "azimuthal period  = {:.10}",
        orbit.azimuthal_period(None, &opts).unwrap()
    );
    println!(
        "period ratio      = {:.10}",
        orbit.period_ratio(None, &opts).unwrap()
    );
}
