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

use super::{HabitatError, InvalidPhysicalParameterSnafu, StateBounds};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use typed_builder::TypedBuilder;

/// The immutable physical constants of the habitat.
///
/// This record is passed explicitly to the dynamics and never mutated: fault injection builds a
/// new record, e.g. with [`HabitatParams::with_internal_resistance`].
///
/// # Usage
/// `HabitatParams::builder().battery_capacity_j(80_000.0).build()` overrides the capacity and
/// keeps every other default.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct HabitatParams {
    /// Usable energy of a healthy battery, in J
    #[builder(default = 50_000.0)]
    pub battery_capacity_j: f64,
    #[builder(default = 0.95)]
    pub charge_efficiency: f64,
    #[builder(default = 0.90)]
    pub discharge_efficiency: f64,
    /// The effective capacity never drops below this fraction of the nominal capacity
    #[builder(default = 0.05)]
    pub health_capacity_floor: f64,
    /// Avionics and housekeeping load, in W
    #[builder(default = 20.0)]
    pub base_load_w: f64,
    /// Electrical load per crew-equivalent of metabolic load, in W
    #[builder(default = 2.0)]
    pub crew_load_w: f64,
    #[builder(default = 15.0)]
    pub pump_power_w: f64,
    #[builder(default = 25.0)]
    pub o2_generator_power_w: f64,
    #[builder(default = 15.0)]
    pub scrubber_power_w: f64,
    /// Open circuit voltage at zero state of charge
    #[builder(default = 100.0)]
    pub empty_voltage_v: f64,
    /// Open circuit voltage at full state of charge
    #[builder(default = 126.0)]
    pub full_voltage_v: f64,
    /// Internal resistance of a healthy battery, doubled at zero health
    #[builder(default = 0.05)]
    pub internal_resistance_ohm: f64,
    #[builder(default = 2.0)]
    pub bus_time_constant_s: f64,
    #[builder(default = 5_000.0)]
    pub core_heat_capacity_j_k: f64,
    #[builder(default = 2_000.0)]
    pub radiator_heat_capacity_j_k: f64,
    /// Conductance of the coolant loop at full pump speed, in W/K
    #[builder(default = 20.0)]
    pub loop_conductance_w_k: f64,
    /// Conductance between core and radiator with the pump off, in W/K
    #[builder(default = 1.0)]
    pub passive_conductance_w_k: f64,
    #[builder(default = 0.85)]
    pub radiator_emissivity: f64,
    #[builder(default = 2.0)]
    pub radiator_area_m2: f64,
    #[builder(default = 5e-5)]
    pub o2_generation_max_kg_s: f64,
    /// Oxygen consumed per crew-equivalent, in kg/s
    #[builder(default = 1e-5)]
    pub o2_consumption_kg_s: f64,
    /// Carbon dioxide produced per crew-equivalent, in kg/s
    #[builder(default = 1.2e-5)]
    pub co2_generation_kg_s: f64,
    #[builder(default = 6e-5)]
    pub co2_scrubbing_max_kg_s: f64,
    /// Half saturation mass of the consumption and scrubbing rates, in kg
    #[builder(default = 0.05)]
    pub life_support_knee_kg: f64,
    #[builder(default = 100.0)]
    pub cabin_volume_m3: f64,
    #[builder(default = 295.0)]
    pub cabin_temp_k: f64,
    /// Health loss per second per unit of depth of discharge
    #[builder(default = 2e-6)]
    pub dod_degradation: f64,
    /// Health loss per unit of state of charge change
    #[builder(default = 1e-3)]
    pub rate_degradation: f64,
    #[builder(default)]
    pub bounds: StateBounds,
}

impl Default for HabitatParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HabitatParams {
    /// Returns a copy of these parameters with a different internal resistance, e.g. to inject a fault.
    pub fn with_internal_resistance(&self, internal_resistance_ohm: f64) -> Self {
        Self {
            internal_resistance_ohm,
            ..*self
        }
    }

    /// Returns a copy of these parameters where both degradation constants are scaled by `factor`.
    pub fn with_degradation_scale(&self, factor: f64) -> Self {
        Self {
            dod_degradation: self.dod_degradation * factor,
            rate_degradation: self.rate_degradation * factor,
            ..*self
        }
    }

    /// Checks that the parameters lie within the domain where the dynamics are well defined.
    pub fn validate(&self) -> Result<(), HabitatError> {
        let strictly_positive = [
            ("battery_capacity_j", self.battery_capacity_j),
            ("health_capacity_floor", self.health_capacity_floor),
            ("empty_voltage_v", self.empty_voltage_v),
            ("bus_time_constant_s", self.bus_time_constant_s),
            ("core_heat_capacity_j_k", self.core_heat_capacity_j_k),
            ("radiator_heat_capacity_j_k", self.radiator_heat_capacity_j_k),
            ("life_support_knee_kg", self.life_support_knee_kg),
            ("cabin_volume_m3", self.cabin_volume_m3),
            ("cabin_temp_k", self.cabin_temp_k),
            ("temperature_floor_k", self.bounds.temperature_floor_k),
        ];
        for (name, value) in strictly_positive {
            ensure!(
                value.is_finite() && value > 0.0,
                InvalidPhysicalParameterSnafu {
                    name,
                    value,
                    reason: "must be strictly positive"
                }
            );
        }

        let non_negative = [
            ("base_load_w", self.base_load_w),
            ("crew_load_w", self.crew_load_w),
            ("pump_power_w", self.pump_power_w),
            ("o2_generator_power_w", self.o2_generator_power_w),
            ("scrubber_power_w", self.scrubber_power_w),
            ("internal_resistance_ohm", self.internal_resistance_ohm),
            ("loop_conductance_w_k", self.loop_conductance_w_k),
            ("passive_conductance_w_k", self.passive_conductance_w_k),
            ("radiator_area_m2", self.radiator_area_m2),
            ("o2_generation_max_kg_s", self.o2_generation_max_kg_s),
            ("o2_consumption_kg_s", self.o2_consumption_kg_s),
            ("co2_generation_kg_s", self.co2_generation_kg_s),
            ("co2_scrubbing_max_kg_s", self.co2_scrubbing_max_kg_s),
            ("dod_degradation", self.dod_degradation),
            ("rate_degradation", self.rate_degradation),
        ];
        for (name, value) in non_negative {
            ensure!(
                value.is_finite() && value >= 0.0,
                InvalidPhysicalParameterSnafu {
                    name,
                    value,
                    reason: "must be non negative"
                }
            );
        }

        for (name, value) in [
            ("charge_efficiency", self.charge_efficiency),
            ("discharge_efficiency", self.discharge_efficiency),
            ("radiator_emissivity", self.radiator_emissivity),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                InvalidPhysicalParameterSnafu {
                    name,
                    value,
                    reason: "must be in (0, 1]"
                }
            );
        }

        ensure!(
            self.full_voltage_v > self.empty_voltage_v,
            InvalidPhysicalParameterSnafu {
                name: "full_voltage_v",
                value: self.full_voltage_v,
                reason: "must be greater than the empty voltage"
            }
        );

        Ok(())
    }
}
