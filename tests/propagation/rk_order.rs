use crate::{epoch, init_logger};
use approx::assert_relative_eq;
use rstest::*;
use twin::dynamics::{Dynamics, DynamicsError, HabitatDynamics};
use twin::habitat::{
    ControlInput, Disturbance, HabitatParams, HabitatState, StateVector, STATE_DIM,
};
use twin::propagators::{step, InputHold, Propagator, RK2Fixed, RK4Fixed};
use twin::time::{Duration, Epoch, TimeUnits, Unit};

/// dx/dt = -x / (i + 1) on every component, whose solution is x0 exp(-t / (i + 1)).
#[derive(Clone)]
struct Relaxation;

impl Dynamics for Relaxation {
    fn eom(
        &self,
        _delta_t: f64,
        state_vec: &StateVector,
        _control: &ControlInput,
        _disturbance: &Disturbance,
    ) -> Result<StateVector, DynamicsError> {
        let mut d_x = StateVector::zeros();
        for i in 0..STATE_DIM {
            d_x[i] = -state_vec[i] / (i as f64 + 1.0);
        }
        Ok(d_x)
    }
}

fn final_error(prop: &Propagator<Relaxation>, start: Epoch, dt: Duration, span: Duration) -> f64 {
    let x0 = StateVector::from([1.0; STATE_DIM]);
    let initial = HabitatState::from_vector(start, &x0);
    let steps = (span.to_seconds() / dt.to_seconds()).round() as usize;
    let states = prop
        .for_steps(
            &initial,
            &ControlInput::default(),
            &Disturbance::new(0.0, 0.0, 250.0),
            dt,
            steps,
        )
        .unwrap();
    let last = states.last().unwrap();
    let elapsed_s = (last.epoch - start).to_seconds();
    assert_relative_eq!(elapsed_s, span.to_seconds(), epsilon = 1e-9);
    let exact = StateVector::from_fn(|i, _| (-elapsed_s / (i as f64 + 1.0)).exp());
    (last.to_vector() - exact).amax()
}

#[rstest]
fn rk4_is_fourth_order(epoch: Epoch) {
    init_logger();
    let prop = Propagator::new::<RK4Fixed>(Relaxation, InputHold::ZeroOrderHold);
    let span = 4 * Unit::Second;
    let coarse = final_error(&prop, epoch, 200.milliseconds(), span);
    let fine = final_error(&prop, epoch, 100.milliseconds(), span);
    let ratio = coarse / fine;
    println!("RK4 error {coarse:e} -> {fine:e} (ratio {ratio:.2})");
    assert!(ratio > 14.0 && ratio < 18.0, "ratio = {ratio}");
}

#[rstest]
fn rk2_is_second_order(epoch: Epoch) {
    init_logger();
    let prop = Propagator::new::<RK2Fixed>(Relaxation, InputHold::ZeroOrderHold);
    let span = 4 * Unit::Second;
    let coarse = final_error(&prop, epoch, 200.milliseconds(), span);
    let fine = final_error(&prop, epoch, 100.milliseconds(), span);
    let ratio = coarse / fine;
    assert!(ratio > 3.5 && ratio < 4.5, "ratio = {ratio}");
}

#[rstest]
fn habitat_step_matches_the_propagator(epoch: Epoch) {
    init_logger();
    let params = HabitatParams::default();
    let state = HabitatState::nominal(epoch);
    let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    let disturbance = Disturbance::new(80.0, 4.0, 250.0);

    let prop = Propagator::rk4(HabitatDynamics::new(params));
    let mut expected = state;
    let mut actual = state;
    for _ in 0..60 {
        expected = prop
            .step(&expected, &control, &disturbance, 1.seconds())
            .unwrap()
            .0;
        actual = step(&actual, &control, &disturbance, 1.seconds(), &params).unwrap();
    }
    assert_eq!(actual, expected);
    assert_eq!(actual.epoch, epoch + 1.minutes());
    // Health never increases.
    assert!(actual.battery_health <= 1.0);
    assert!(actual.battery_health > 0.99);
}
