/*
    Habitat Twin, closed-loop estimation and control for habitat power, thermal and life support
    Copyright (C) 2024-onwards The Habitat Twin developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::measurement::{Measurement, MeasurementModel};
use super::noise::{ProcessNoise, Stochastics, WhiteNoise};
use crate::dynamics::{Dynamics, HabitatDynamics};
use crate::habitat::{
    ControlInput, DisturbanceProfile, HabitatParameter, HabitatParams, HabitatState, Saturation,
};
use crate::linalg::DVector;
use crate::propagators::{PropagationError, Propagator};
use crate::time::Duration;
use rand_pcg::Pcg64Mcg;

/// Simulates the true habitat and its sensors.
///
/// The truth is propagated with the same propagator as the filter, then perturbed by the process noise
/// and saturated. Measurements add white noise of each channel's sigma. Every random draw comes from a
/// single seeded generator, so two simulators built with the same seed produce the same run.
#[derive(Clone, Debug)]
pub struct TruthSimulator<D: Dynamics> {
    pub prop: Propagator<D>,
    pub process_noise: ProcessNoise,
    pub model: MeasurementModel,
    /// The current true state
    pub state: HabitatState,
    /// Random number generator used for this run, ensures repeatability
    rng: Pcg64Mcg,
}

impl TruthSimulator<HabitatDynamics> {
    /// Builds a simulator of the habitat with the default RK4 propagator.
    pub fn from_params(
        params: HabitatParams,
        process_noise: ProcessNoise,
        model: MeasurementModel,
        initial: HabitatState,
        seed: u128,
    ) -> Self {
        Self::new(
            Propagator::rk4(HabitatDynamics::new(params)),
            process_noise,
            model,
            initial,
            seed,
        )
    }

    /// Replaces the physical parameters of the truth, e.g. to inject a fault, without touching the random sequence.
    pub fn inject(&mut self, params: HabitatParams) {
        info!(
            "truth parameters changed at {}: R_int = {} Ω",
            self.state.epoch, params.internal_resistance_ohm
        );
        self.prop.dynamics.params = params;
    }
}

impl<D: Dynamics> TruthSimulator<D> {
    pub fn new(
        prop: Propagator<D>,
        process_noise: ProcessNoise,
        model: MeasurementModel,
        initial: HabitatState,
        seed: u128,
    ) -> Self {
        Self {
            prop,
            process_noise,
            model,
            state: initial,
            rng: Pcg64Mcg::new(seed),
        }
    }

    /// Propagates the truth by `dt` and returns the new true state with what got saturated.
    ///
    /// A parameter is reported as saturated if either the step itself or the process noise drove it
    /// out of bounds. The noise never raises the battery health above its noise-free value.
    pub fn advance<P: DisturbanceProfile>(
        &mut self,
        control: &ControlInput,
        profile: &P,
        dt: Duration,
    ) -> Result<(HabitatState, Saturation), PropagationError> {
        let (next, step_saturation) = self.prop.step(&self.state, control, profile, dt)?;
        let mut noisy =
            next.to_vector() + self.process_noise.sample(next.epoch, dt, &mut self.rng);
        let health = HabitatParameter::BatteryHealth.index();
        noisy[health] = noisy[health].min(next.battery_health);

        let (perturbed, mut saturation) = self.prop.dynamics.finally(noisy);
        saturation.merge(&step_saturation);
        self.state = HabitatState::from_vector(next.epoch, &perturbed);
        Ok((self.state, saturation))
    }

    /// Draws a noisy measurement of the current true state.
    pub fn measure(&mut self) -> Measurement {
        let epoch = self.state.epoch;
        let truth = self.model.observe(&self.state.to_vector());
        let noise = DVector::from_iterator(
            self.model.dim(),
            self.model
                .channels
                .iter()
                .map(|c| WhiteNoise::constant_white_noise(c.sigma).sample(epoch, &mut self.rng))
                .collect::<Vec<f64>>(),
        );
        Measurement {
            epoch,
            values: truth + noise,
        }
    }
}

#[cfg(test)]
mod ut_simulator {
    use super::*;
    use crate::habitat::{Boundary, Disturbance, OrbitalDisturbance};
    use crate::propagators::{SaturationConfig, SaturationMonitor};
    use crate::time::{Epoch, TimeUnits};

    fn simulator(seed: u128) -> TruthSimulator<HabitatDynamics> {
        TruthSimulator::from_params(
            HabitatParams::default(),
            ProcessNoise::default(),
            MeasurementModel::default(),
            HabitatState::nominal(Epoch::from_gregorian_tai_at_midnight(2024, 1, 1)),
            seed,
        )
    }

    #[test]
    fn same_seed_same_run() {
        let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
        let disturbance = Disturbance::new(80.0, 4.0, 250.0);
        let mut first = simulator(7);
        let mut second = simulator(7);
        let mut third = simulator(8);
        for _ in 0..10 {
            let a = first.advance(&control, &disturbance, 1.seconds()).unwrap().0;
            let b = second.advance(&control, &disturbance, 1.seconds()).unwrap().0;
            let c = third.advance(&control, &disturbance, 1.seconds()).unwrap().0;
            assert_eq!(a, b);
            assert_ne!(a, c);
            assert_eq!(first.measure(), second.measure());
        }
        assert_eq!(first.state.epoch, second.state.epoch);
    }

    #[test]
    fn truth_stays_within_bounds() {
        let mut sim = simulator(1);
        // Full charge and health: the noise would push both above one without saturation.
        sim.state = sim
            .state
            .with_value(HabitatParameter::StateOfCharge, 1.0)
            .with_value(HabitatParameter::BatteryHealth, 1.0);
        let control = ControlInput::new(0.0, 0.0, 0.0, 0.0);
        let disturbance = Disturbance::new(200.0, 0.0, 250.0);
        for _ in 0..50 {
            let (state, _) = sim.advance(&control, &disturbance, 1.seconds()).unwrap();
            assert!(state.soc <= 1.0 && state.soc >= 0.0);
            assert!(state.battery_health <= 1.0);
        }
    }

    #[test]
    fn truth_health_never_recovers() {
        let mut sim = simulator(7);
        let orbit = OrbitalDisturbance::builder().start(sim.state.epoch).build();
        let control = ControlInput::new(0.5, 0.5, 0.5, 0.5);
        let mut health = sim.state.battery_health;
        for _ in 0..200 {
            let (state, _) = sim.advance(&control, &orbit, 1.seconds()).unwrap();
            assert!(state.battery_health <= health);
            health = state.battery_health;
        }
    }

    #[test]
    fn full_battery_in_strong_sun_violates_its_bound() {
        let mut sim = simulator(5);
        sim.state = sim.state.with_value(HabitatParameter::StateOfCharge, 1.0);
        let sun = Disturbance::new(1000.0, 4.0, 250.0);
        let mut monitor = SaturationMonitor::new(SaturationConfig::default());
        let mut violations = Vec::new();
        for _ in 0..200 {
            let (state, saturation) = sim
                .advance(&ControlInput::safe_mode(), &sun, 1.seconds())
                .unwrap();
            // Clamped by the step, even when the noise then pulls it just below the bound.
            assert_eq!(
                saturation.get(HabitatParameter::StateOfCharge),
                Some(Boundary::Upper)
            );
            violations.extend(monitor.observe(state.epoch, &saturation));
        }
        assert_eq!(monitor.consecutive(HabitatParameter::StateOfCharge), 200);
        let soc = violations
            .iter()
            .filter(|v| v.param == HabitatParameter::StateOfCharge)
            .collect::<Vec<_>>();
        assert_eq!(soc.len(), 151);
        assert_eq!(soc[0].consecutive_steps, 50);
        assert_eq!(soc[0].boundary, Boundary::Upper);
    }

    #[test]
    fn injection_changes_the_truth_only() {
        let mut sim = simulator(3);
        let params = HabitatParams::default().with_internal_resistance(10.0);
        sim.inject(params);
        assert_eq!(sim.prop.dynamics.params.internal_resistance_ohm, 10.0);
        let msr = sim.measure();
        assert_eq!(msr.values.len(), 7);
        assert_eq!(msr.epoch, sim.state.epoch);
    }
}
