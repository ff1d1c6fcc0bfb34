use crate::{epoch, init_logger};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rstest::*;
use twin::dynamics::HabitatDynamics;
use twin::habitat::{
    Boundary, ControlInput, Disturbance, HabitatParameter, HabitatParams, HabitatState,
};
use twin::propagators::{step, Propagator, SaturationConfig, SaturationMonitor};
use twin::time::{Epoch, TimeUnits};

#[rstest]
fn adversarial_commands_keep_soc_and_health_bounded(epoch: Epoch) {
    init_logger();
    let mut rng = Pcg64Mcg::seed_from_u64(0xdead_beef);
    let params = HabitatParams::default();
    let mut state = HabitatState::nominal(epoch);

    for k in 0..500 {
        let control = ControlInput::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        );
        // Alternate between a blinding sun and a cold eclipse.
        let disturbance = if (k / 25) % 2 == 0 {
            Disturbance::new(5_000.0, 6.0, 350.0)
        } else {
            Disturbance::new(0.0, 6.0, 120.0)
        };
        state = step(&state, &control, &disturbance, 1.seconds(), &params).unwrap();
        assert!((0.0..=1.0).contains(&state.soc), "SOC = {} at step {k}", state.soc);
        assert!(
            (0.0..=1.0).contains(&state.battery_health),
            "health = {} at step {k}",
            state.battery_health
        );
        assert!(state.core_temp_k > 0.0 && state.radiator_temp_k > 0.0);
        assert!(state.o2_mass_kg >= 0.0 && state.co2_mass_kg >= 0.0);
    }
}

#[rstest]
fn persistent_saturation_is_reported(epoch: Epoch) {
    init_logger();
    let prop = Propagator::rk4(HabitatDynamics::default());
    let mut monitor = SaturationMonitor::new(SaturationConfig::default());
    let mut state = HabitatState::nominal(epoch).with_value(HabitatParameter::StateOfCharge, 1.0);
    // Plenty of sunlight and no consumer: the battery is always pushed above full charge.
    let control = ControlInput::safe_mode();
    let disturbance = Disturbance::new(1_000.0, 0.0, 250.0);

    let mut first_report = None;
    for k in 1..=60 {
        let (next, saturation) = prop.step(&state, &control, &disturbance, 1.seconds()).unwrap();
        assert_eq!(
            saturation.get(HabitatParameter::StateOfCharge),
            Some(Boundary::Upper)
        );
        assert_eq!(next.soc, 1.0);
        let violations = monitor.observe(next.epoch, &saturation);
        if first_report.is_none() && !violations.is_empty() {
            first_report = Some((k, violations[0]));
        }
        state = next;
    }

    let (k, violation) = first_report.expect("no violation reported");
    assert_eq!(k, 50);
    assert_eq!(violation.param, HabitatParameter::StateOfCharge);
    assert_eq!(violation.boundary, Boundary::Upper);
    assert_eq!(violation.consecutive_steps, 50);
    assert_eq!(monitor.consecutive(HabitatParameter::StateOfCharge), 60);

    // Dropping below full charge resets the count.
    let eclipse = Disturbance::new(0.0, 4.0, 250.0);
    let (next, saturation) = prop.step(&state, &control, &eclipse, 1.seconds()).unwrap();
    assert!(next.soc < 1.0);
    assert!(monitor.observe(next.epoch, &saturation).is_empty());
    assert_eq!(monitor.consecutive(HabitatParameter::StateOfCharge), 0);
}
