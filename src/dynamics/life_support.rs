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

/// Universal gas constant, in J/(mol K)
pub const GAS_CONSTANT: f64 = 8.314_462_618;
/// Molar mass of O2, in kg/mol
pub const O2_MOLAR_MASS: f64 = 0.032;
/// Molar mass of CO2, in kg/mol
pub const CO2_MOLAR_MASS: f64 = 0.044;

/// Mass flows of the simplified ECLSS and the resulting cabin pressure rate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LifeSupportRates {
    pub o2_rate_kg_s: f64,
    pub co2_rate_kg_s: f64,
    pub cabin_pressure_rate: f64,
}

impl LifeSupportRates {
    pub fn compute(
        state: &StateVector,
        control: &ControlInput,
        disturbance: &Disturbance,
        params: &HabitatParams,
    ) -> Self {
        let o2_mass_kg = state[4].max(0.0);
        let co2_mass_kg = state[5].max(0.0);
        let knee = params.life_support_knee_kg;

        // Consumption and scrubbing fade out as the respective gas runs out, so neither mass is driven negative.
        let consumed = params.o2_consumption_kg_s
            * disturbance.crew_metabolic_load
            * (o2_mass_kg / (o2_mass_kg + knee));
        let scrubbed =
            control.co2_scrubbing * params.co2_scrubbing_max_kg_s * (co2_mass_kg / (co2_mass_kg + knee));

        let o2_rate_kg_s = control.o2_generation * params.o2_generation_max_kg_s - consumed;
        let co2_rate_kg_s = params.co2_generation_kg_s * disturbance.crew_metabolic_load - scrubbed;

        // Ideal gas at constant cabin volume and temperature
        let cabin_pressure_rate = GAS_CONSTANT * params.cabin_temp_k / params.cabin_volume_m3
            * (o2_rate_kg_s / O2_MOLAR_MASS + co2_rate_kg_s / CO2_MOLAR_MASS);

        Self {
            o2_rate_kg_s,
            co2_rate_kg_s,
            cabin_pressure_rate,
        }
    }
}
