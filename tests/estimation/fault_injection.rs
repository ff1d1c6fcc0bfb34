use crate::{init_logger, Scenario};
use rstest::*;
use twin::habitat::{ControlInput, HabitatParameter, HabitatParams};
use twin::od::prelude::*;

const FAULT_STEP: usize = 100;
const STEPS: usize = 160;
/// Maximum number of cycles between the injection and the flag
const DETECTION_BUDGET: usize = 10;

/// Runs a nominal scenario where the internal resistance of the truth is multiplied by 200 at `FAULT_STEP`.
fn run_with_resistance_fault(seed: u128) -> (Vec<FaultStatus>, Vec<NisSample>) {
    let mut scenario = Scenario::nominal(seed);
    let mut detector =
        FaultDetector::new(FaultDetectorConfig::default(), scenario.ekf.model.dim()).unwrap();
    let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
    let nominal = HabitatParams::default();

    let mut statuses = Vec::with_capacity(STEPS);
    let mut history = Vec::with_capacity(STEPS);
    for k in 0..STEPS {
        if k == FAULT_STEP {
            scenario
                .sim
                .inject(nominal.with_internal_resistance(200.0 * nominal.internal_resistance_ohm));
        }
        let outcome = scenario.cycle(&control);
        let sample = outcome.residual().unwrap().nis_sample();
        history.push(sample);
        statuses.push(detector.observe(sample));
    }
    (statuses, history)
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
fn resistance_fault_is_flagged_and_latched(#[case] seed: u128) {
    init_logger();
    let (statuses, history) = run_with_resistance_fault(seed);

    assert!(
        statuses[..FAULT_STEP].iter().all(|s| !s.flagged),
        "false alarm before the injection"
    );

    let first = statuses
        .iter()
        .position(|s| s.flagged)
        .expect("fault never flagged");
    assert!(first >= FAULT_STEP);
    assert!(
        first < FAULT_STEP + DETECTION_BUDGET,
        "flagged {} cycles after the injection",
        first - FAULT_STEP
    );
    assert!(statuses[first..].iter().all(|s| s.flagged), "flag not latched");

    let status = statuses[STEPS - 1];
    assert_eq!(status.trigger_index, Some(first));
    assert_eq!(status.trigger_epoch, Some(history[first].epoch));
    // Only the bus voltage depends on the internal resistance.
    assert_eq!(status.worst_channel, Some(HabitatParameter::BusVoltage));

    // Replaying the history with the pure detector flags the same sample.
    let threshold = FaultThreshold::default().value(7).unwrap();
    let replayed = detect_fault(&history, threshold, 3);
    assert!(replayed.flagged);
    assert_eq!(replayed.trigger_index, Some(first));
}
