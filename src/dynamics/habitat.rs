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

use super::degradation::health_rate;
use super::life_support::LifeSupportRates;
use super::power::PowerBalance;
use super::thermal::ThermalBalance;
use super::{Dynamics, DynamicsError, NonFiniteDerivativeSnafu};
use crate::habitat::{
    ControlInput, Disturbance, HabitatParameter, HabitatParams, Saturation, StateVector,
};
use snafu::ensure;
use std::fmt;

/// The coupled power, thermal, life support and degradation dynamics of the habitat.
///
/// The bus voltage is modeled as a first order relaxation toward the battery terminal voltage,
/// hence it carries no independent dynamics beyond its coupling to the state of charge and the load.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HabitatDynamics {
    pub params: HabitatParams,
}

impl HabitatDynamics {
    pub fn new(params: HabitatParams) -> Self {
        Self { params }
    }
}

impl fmt::Display for HabitatDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "habitat dynamics (capacity {} J, R_int {} Ohm)",
            self.params.battery_capacity_j, self.params.internal_resistance_ohm
        )
    }
}

impl Dynamics for HabitatDynamics {
    fn eom(
        &self,
        _delta_t: f64,
        state_vec: &StateVector,
        control: &ControlInput,
        disturbance: &Disturbance,
    ) -> Result<StateVector, DynamicsError> {
        let power = PowerBalance::compute(state_vec, control, disturbance, &self.params);
        let thermal =
            ThermalBalance::compute(state_vec, control, disturbance, &self.params, power.load_w);
        let eclss = LifeSupportRates::compute(state_vec, control, disturbance, &self.params);
        let health = health_rate(state_vec, power.soc_rate, &self.params);

        let d_x = StateVector::from([
            power.soc_rate,
            power.bus_voltage_rate,
            thermal.core_temp_rate,
            thermal.radiator_temp_rate,
            eclss.o2_rate_kg_s,
            eclss.co2_rate_kg_s,
            eclss.cabin_pressure_rate,
            health,
        ]);

        for param in enum_iterator::all::<HabitatParameter>() {
            let value = d_x[param.index()];
            ensure!(value.is_finite(), NonFiniteDerivativeSnafu { param, value });
        }

        Ok(d_x)
    }

    fn finally(&self, next_state: StateVector) -> (StateVector, Saturation) {
        self.params.bounds.saturate(next_state)
    }
}

#[cfg(test)]
mod ut_habitat_dynamics {
    use super::*;
    use crate::habitat::HabitatState;
    use crate::time::Epoch;

    #[test]
    fn nominal_derivative_is_finite_and_health_non_increasing() {
        let dynamics = HabitatDynamics::default();
        let state = HabitatState::nominal(Epoch::from_gregorian_tai_at_midnight(2024, 1, 1));
        for sunlight_w in [0.0, 80.0, 160.0] {
            let dist = Disturbance::new(sunlight_w, 4.0, 250.0);
            let d_x = dynamics
                .eom(0.0, &state.to_vector(), &ControlInput::new(0.5, 0.5, 0.5, 0.5), &dist)
                .unwrap();
            assert!(d_x.iter().all(|v| v.is_finite()));
            assert!(d_x[HabitatParameter::BatteryHealth.index()] <= 0.0);
        }
    }

    #[test]
    fn non_finite_derivatives_are_reported() {
        let dynamics = HabitatDynamics::default();
        let mut state = StateVector::zeros();
        state[7] = 1.0;
        state[2] = f64::NAN;
        let err = dynamics
            .eom(
                0.0,
                &state,
                &ControlInput::safe_mode(),
                &Disturbance::new(0.0, 0.0, 250.0),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DynamicsError::NonFiniteDerivative {
                param: HabitatParameter::CoreTemperature,
                ..
            }
        ));
    }
}
