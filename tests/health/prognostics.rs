use crate::{epoch, init_logger};
use rstest::*;
use twin::dynamics::HabitatDynamics;
use twin::habitat::{ControlInput, Disturbance, HabitatParams, HabitatState};
use twin::health::{estimate_rul, HealthHistory, RulConfig, RulEstimator};
use twin::propagators::Propagator;
use twin::time::{Duration, Epoch, TimeUnits};

/// Samples skipped before checking the RUL, while the trend settles.
const SETTLE: usize = 5;

/// Accelerated aging during an eclipse: the battery drains and the depth of discharge keeps growing.
fn eclipse_discharge(epoch: Epoch, steps: usize) -> Vec<HabitatState> {
    let params = HabitatParams::default().with_degradation_scale(100.0);
    let prop = Propagator::rk4(HabitatDynamics::new(params));
    let eclipse = Disturbance::new(0.0, 4.0, 250.0);
    prop.for_steps(
        &HabitatState::nominal(epoch),
        &ControlInput::safe_mode(),
        &eclipse,
        1.seconds(),
        steps,
    )
    .unwrap()
}

#[rstest]
fn rul_shrinks_as_the_battery_ages(epoch: Epoch) {
    init_logger();
    let states = eclipse_discharge(epoch, 300);
    assert!(states.last().unwrap().battery_health < 1.0);

    let mut estimator = RulEstimator::new(RulConfig::default());
    let mut previous: Option<Duration> = None;
    for (k, state) in states.iter().enumerate() {
        let rul = estimator.ingest(state.epoch, state.battery_health).unwrap();
        if k < SETTLE {
            continue;
        }
        let rul = rul.expect("no RUL despite a decreasing health");
        assert!(rul > Duration::ZERO && rul < Duration::MAX);
        if let Some(previous) = previous {
            assert!(rul <= previous, "RUL grew from {previous} to {rul} at #{k}");
        }
        previous = Some(rul);
    }

    // The history based estimate agrees with the online one.
    let mut history = HealthHistory::new();
    for state in &states {
        history.push(state.epoch, state.battery_health).unwrap();
    }
    assert_eq!(
        estimate_rul(&history, RulConfig::default().failure_threshold),
        previous
    );
}

#[rstest]
fn rul_of_a_linear_decay_matches_the_slope(epoch: Epoch) {
    init_logger();
    let mut history = HealthHistory::new();
    for k in 0..200 {
        history
            .push(epoch + (k as f64).seconds(), 1.0 - 1e-4 * k as f64)
            .unwrap();
    }
    // Health is 0.9801 at the last sample, i.e. 2301 s away from 0.75.
    let rul = estimate_rul(&history, 0.75).unwrap();
    assert!((rul.to_seconds() - 2301.0).abs() < 1.0, "RUL = {rul}");
}

#[rstest]
#[case::flat(0.0)]
#[case::recovering(1e-4)]
fn no_rul_without_degradation(epoch: Epoch, #[case] slope: f64) {
    let mut history = HealthHistory::new();
    for k in 0..50 {
        history
            .push(epoch + (k as f64).seconds(), 0.9 + slope * k as f64)
            .unwrap();
    }
    assert_eq!(estimate_rul(&history, 0.75), None);
}

#[rstest]
fn failed_battery_has_no_life_left(epoch: Epoch) {
    let mut estimator = RulEstimator::new(RulConfig::default());
    let mut rul = None;
    for k in 0..20 {
        rul = estimator
            .ingest(epoch + (k as f64).seconds(), 0.74 - 1e-3 * k as f64)
            .unwrap();
    }
    assert_eq!(rul, Some(Duration::ZERO));
}
