use crate::{epoch, init_logger, Scenario};
use rstest::*;
use twin::dynamics::HabitatDynamics;
use twin::habitat::{ControlInput, Disturbance, HabitatParameter, HabitatState};
use twin::health::{HealthHistory, RulEstimator};
use twin::mpc::*;
use twin::od::prelude::*;
use twin::propagators::Propagator;

fn decide(soc: f64, sunlight_w: f64, start: Epoch) -> ControlDecision {
    let prop = Propagator::rk4(HabitatDynamics::default());
    let disturbance = Disturbance::new(sunlight_w, 4.0, 250.0);
    let model = PredictionModel::new(&prop, &disturbance, 1.seconds());
    let estimate = KfEstimate::with_default_prior(
        HabitatState::nominal(start).with_value(HabitatParameter::StateOfCharge, soc),
    );
    MpcConfig::default().select(&estimate, &model).unwrap()
}

#[rstest]
fn identical_inputs_yield_identical_decisions(epoch: Epoch) {
    init_logger();
    let first = decide(0.8, 160.0, epoch);
    for _ in 0..5 {
        assert_eq!(decide(0.8, 160.0, epoch), first);
    }
    assert!(first.feasible);
    // Below the target, nothing is worth curtailing or switching on for ten seconds.
    assert_eq!(first.control, ControlInput::safe_mode());
}

#[rstest]
fn solar_is_curtailed_above_the_target(epoch: Epoch) {
    init_logger();
    let decision = decide(0.95, 160.0, epoch);
    assert!(decision.feasible);
    assert!(decision.control.solar_utilization < 1.0);
    assert_eq!(decision.control.pump_speed, 0.0);
}

#[rstest]
fn depleted_battery_falls_back_to_safe_mode(epoch: Epoch) {
    init_logger();
    let decision = decide(0.2, 0.0, epoch);
    assert!(!decision.feasible);
    assert_eq!(decision.control, ControlInput::safe_mode());
    assert_eq!(
        decision.fallback,
        Some(FallbackReason::NoFeasibleCandidate { evaluated: 135 })
    );
}

#[rstest]
fn invalid_configuration_is_rejected(epoch: Epoch) {
    let prop = Propagator::rk4(HabitatDynamics::default());
    let disturbance = Disturbance::new(80.0, 4.0, 250.0);
    let model = PredictionModel::new(&prop, &disturbance, 1.seconds());
    let estimate = KfEstimate::with_default_prior(HabitatState::nominal(epoch));
    let config = MpcConfig::builder().resolution([5, 0, 3, 3]).build();
    assert_eq!(
        config.select(&estimate, &model),
        Err(MpcError::EmptyAxis { axis: 1 })
    );
}

/// Estimation, fault detection, control and prognostics in one loop.
#[rstest]
fn closed_loop_runs_without_fallback() {
    init_logger();
    let mut scenario = Scenario::nominal(11);
    let config = MpcConfig::builder().resolution([3, 2, 2, 2]).horizon(5).build();
    let grid = config.grid().unwrap();
    let prop = scenario.sim.prop.clone();
    let mut detector = FaultDetector::new(FaultDetectorConfig::default(), 7).unwrap();
    let mut history = HealthHistory::new();
    let mut rul = RulEstimator::new(Default::default());

    let mut control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    for _ in 0..60 {
        let outcome = scenario.cycle(&control);
        let status = detector.observe(outcome.residual().unwrap().nis_sample());
        assert!(!status.flagged);
        history.push_estimate(&scenario.estimate).unwrap();
        rul.ingest(scenario.estimate.epoch(), scenario.estimate.state.battery_health)
            .unwrap();

        let model = PredictionModel::new(&prop, &scenario.profile, scenario.dt);
        let decision = select_control(
            &scenario.estimate,
            &grid,
            config.horizon,
            &config.weights,
            &config.constraints,
            &model,
        );
        assert!(decision.feasible, "{decision}");
        control = decision.control;
    }
    assert_eq!(history.len(), 60);
    let truth = scenario.sim.state;
    assert!(scenario.estimate.within_sigmas(&truth, 5.0));
}
