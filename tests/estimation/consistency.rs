use crate::{init_logger, Scenario};
use rstest::*;
use twin::habitat::{ControlInput, HabitatParameter};
use twin::od::prelude::*;
use twin::utils::{asymmetry, is_psd};

/// Number of cycles ignored at the start of each run, while the prior is being forgotten.
const WARM_UP: usize = 10;

#[rstest]
fn covariance_stays_symmetric_and_psd() {
    init_logger();
    let mut scenario = Scenario::nominal(42);
    let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    for k in 0..150 {
        let predicted = scenario
            .ekf
            .predict(&scenario.estimate, &control, &scenario.profile, scenario.dt)
            .unwrap();
        assert!(is_psd(&predicted.covar, 1e-9), "prediction #{k} not PSD");
        assert!(asymmetry(&predicted.covar) < 1e-12);

        scenario.sim.advance(&control, &scenario.profile, scenario.dt).unwrap();
        let outcome = scenario.ekf.update(&predicted, &scenario.sim.measure()).unwrap();
        assert!(!outcome.is_degraded());
        let estimate = outcome.estimate();
        assert!(is_psd(&estimate.covar, 1e-9), "update #{k} not PSD");
        assert!(asymmetry(&estimate.covar) < 1e-12);
        assert!(estimate.state.soc >= 0.0 && estimate.state.soc <= 1.0);
        scenario.estimate = *estimate;
    }
    // Every measured channel is tighter than its sensor.
    for channel in &scenario.ekf.model.channels {
        assert!(scenario.estimate.sigma_for(channel.param) < channel.sigma);
    }
}

#[rstest]
fn average_nis_matches_the_measurement_dimension() {
    init_logger();
    let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    let mut stats = RunStatistics::new(MeasurementModel::default().dim());
    for seed in 0..10 {
        let mut scenario = Scenario::nominal(seed);
        for k in 0..100 {
            let outcome = scenario.cycle(&control);
            if k >= WARM_UP {
                stats.record_nis(&outcome.residual().unwrap().nis_sample());
                stats.record_estimate(&scenario.sim.state, &scenario.estimate);
            }
        }
    }
    println!("{stats}");
    let average = stats.average_nis().unwrap();
    assert!((6.0..=8.0).contains(&average), "average NIS = {average}");
    assert!(stats.is_consistent().unwrap());
    let threshold = FaultThreshold::default().value(7).unwrap();
    assert!(stats.percent_above(threshold).unwrap() < 5.0);
    assert!(stats.soc_rmse().unwrap() < 0.01);
    assert!(stats.health_rmse().unwrap() < 0.01);
}

#[rstest]
fn out_of_range_measurements_are_skipped() {
    init_logger();
    let mut scenario = Scenario::nominal(5);
    let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    for _ in 0..20 {
        scenario.cycle(&control);
    }
    scenario.sim.advance(&control, &scenario.profile, scenario.dt).unwrap();
    let mut msr = scenario.sim.measure();
    // A stuck sensor reporting a negative pressure.
    msr.values[5] = -1.0;
    let predicted = scenario
        .ekf
        .predict(&scenario.estimate, &control, &scenario.profile, scenario.dt)
        .unwrap();
    let err = scenario.ekf.update(&predicted, &msr).unwrap_err();
    assert!(matches!(
        err,
        ODError::MeasurementRange {
            param: HabitatParameter::CabinPressure,
            ..
        }
    ));
    // The caller keeps the prediction and carries on with the next sample.
    scenario.estimate = predicted;
    let outcome = scenario.cycle(&control);
    assert!(!outcome.is_degraded());
    assert!(outcome.residual().unwrap().nis < 100.0);
}
