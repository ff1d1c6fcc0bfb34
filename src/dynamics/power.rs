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

use crate::habitat::{ControlInput, Disturbance, HabitatParams, StateVector};

/// The electrical power balance of the bus at one instant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PowerBalance {
    pub solar_w: f64,
    pub load_w: f64,
    /// Current drawn from the battery, positive when discharging
    pub battery_current_a: f64,
    pub open_circuit_voltage_v: f64,
    pub soc_rate: f64,
    pub bus_voltage_rate: f64,
}

impl PowerBalance {
    pub fn compute(
        state: &StateVector,
        control: &ControlInput,
        disturbance: &Disturbance,
        params: &HabitatParams,
    ) -> Self {
        let soc = state[0];
        let bus_voltage_v = state[1];
        let health = state[7];

        let solar_w = disturbance.sunlight_w * control.solar_utilization;
        let load_w = electrical_load_w(control, disturbance, params);

        // Effective capacity fades with health.
        let capacity_j = params.battery_capacity_j * health.max(params.health_capacity_floor);
        let net_w = solar_w - load_w;
        let soc_rate = if net_w >= 0.0 {
            params.charge_efficiency * net_w / capacity_j
        } else {
            net_w / (params.discharge_efficiency * capacity_j)
        };

        let open_circuit_voltage_v =
            params.empty_voltage_v + (params.full_voltage_v - params.empty_voltage_v) * soc;
        let resistance_ohm = params.internal_resistance_ohm * (2.0 - health.clamp(0.0, 1.0));
        let battery_current_a = (load_w - solar_w) / open_circuit_voltage_v;
        let terminal_voltage_v = open_circuit_voltage_v - resistance_ohm * battery_current_a;
        let bus_voltage_rate = (terminal_voltage_v - bus_voltage_v) / params.bus_time_constant_s;

        Self {
            solar_w,
            load_w,
            battery_current_a,
            open_circuit_voltage_v,
            soc_rate,
            bus_voltage_rate,
        }
    }
}

/// Total electrical load of the habitat, which is also the heat dissipated in the core.
pub fn electrical_load_w(
    control: &ControlInput,
    disturbance: &Disturbance,
    params: &HabitatParams,
) -> f64 {
    params.base_load_w
        + params.crew_load_w * disturbance.crew_metabolic_load
        + params.pump_power_w * control.pump_speed
        + params.o2_generator_power_w * control.o2_generation
        + params.scrubber_power_w * control.co2_scrubbing
}
