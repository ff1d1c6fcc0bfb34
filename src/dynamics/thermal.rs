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

/// Stefan-Boltzmann constant, in W/(m^2 K^4)
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Heat flows between the core, the coolant loop and deep space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThermalBalance {
    /// Heat carried from the core to the radiator, in W
    pub loop_w: f64,
    /// Heat radiated to the environment, in W
    pub radiated_w: f64,
    pub core_temp_rate: f64,
    pub radiator_temp_rate: f64,
}

impl ThermalBalance {
    /// `dissipated_w` is the electrical load, all of which ends up as heat in the core.
    pub fn compute(
        state: &StateVector,
        control: &ControlInput,
        disturbance: &Disturbance,
        params: &HabitatParams,
        dissipated_w: f64,
    ) -> Self {
        let core_temp_k = state[2];
        let radiator_temp_k = state[3];

        let conductance_w_k =
            params.passive_conductance_w_k + params.loop_conductance_w_k * control.pump_speed;
        let loop_w = conductance_w_k * (core_temp_k - radiator_temp_k);
        let radiated_w = STEFAN_BOLTZMANN
            * params.radiator_emissivity
            * params.radiator_area_m2
            * (radiator_temp_k.powi(4) - disturbance.external_temp_k.powi(4));

        Self {
            loop_w,
            radiated_w,
            core_temp_rate: (dissipated_w - loop_w) / params.core_heat_capacity_j_k,
            radiator_temp_rate: (loop_w - radiated_w) / params.radiator_heat_capacity_j_k,
        }
    }
}
