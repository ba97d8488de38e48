//! End-to-end checks for the ground state pipeline.

use spinchain_dmrg::{
    dmrg, heisenberg, product_state, spin_half_chain, sz_profile, total_sz, DmrgOptions,
    SweepSchedule,
};

/// Open-chain Heisenberg ground energy for N = 10 (exact diagonalization).
const E0_N10: f64 = -4.2580352072;

#[test]
fn ground_energy_ten_sites() {
    let sites = spin_half_chain(10).unwrap();
    let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
    let initial = product_state(&sites, 5).unwrap();
    let schedule = SweepSchedule::uniform(10, 64, 1e-12);
    let opts = DmrgOptions::default().with_energy_tol(1e-12);

    let result = dmrg(&mpo, &initial, &schedule, &opts).unwrap();
    assert!(
        (result.energy - E0_N10).abs() < 1e-5,
        "energy {} vs reference {}",
        result.energy,
        E0_N10
    );
    assert!((result.state.norm() - 1.0).abs() < 1e-8);
}

#[test]
fn ground_state_stays_at_half_filling() {
    let sites = spin_half_chain(10).unwrap();
    let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
    let initial = product_state(&sites, 5).unwrap();
    let schedule = SweepSchedule::uniform(8, 32, 1e-10);

    let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
    let total = total_sz(&result.state).unwrap();
    assert!(total.abs() < 1e-6, "total Sz drifted to {total}");

    let profile = sz_profile(&result.state).unwrap();
    assert_eq!(profile.len(), 10);
    // Open boundaries leave the profile symmetric about the middle.
    for i in 0..5 {
        assert!((profile[i] - profile[9 - i]).abs() < 1e-5);
    }
}

#[test]
fn sweeps_preserve_the_initial_sector() {
    let sites = spin_half_chain(6).unwrap();
    let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
    // Start away from half filling; the sweeps must stay there.
    let initial = product_state(&sites, 2).unwrap();
    let schedule = SweepSchedule::uniform(5, 16, 1e-12);

    let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
    let total = total_sz(&result.state).unwrap();
    assert!((total + 1.0).abs() < 1e-8, "total Sz = {total}");
}

#[test]
fn deterministic_without_randomness() {
    let sites = spin_half_chain(8).unwrap();
    let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
    let initial = product_state(&sites, 4).unwrap();
    let schedule = SweepSchedule::ramp(6, 4, 32, 1e-11);

    let a = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
    let b = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
    assert!((a.energy - b.energy).abs() < 1e-13);
    assert_eq!(a.sweep_energies.len(), b.sweep_energies.len());
}

#[test]
fn ramp_schedule_reaches_the_same_energy() {
    let sites = spin_half_chain(8).unwrap();
    let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
    let initial = product_state(&sites, 4).unwrap();

    let uniform = dmrg(
        &mpo,
        &initial,
        &SweepSchedule::uniform(8, 32, 1e-12),
        &DmrgOptions::default(),
    )
    .unwrap();
    let ramp = dmrg(
        &mpo,
        &initial,
        &SweepSchedule::ramp(8, 4, 32, 1e-12),
        &DmrgOptions::default(),
    )
    .unwrap();
    assert!((uniform.energy - ramp.energy).abs() < 1e-7);
}
