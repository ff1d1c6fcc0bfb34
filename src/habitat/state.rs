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

use super::{
    HabitatError, HabitatParameter, InvalidDimensionSnafu, NonFiniteValueSnafu, StateVector,
    STATE_DIM,
};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// The full habitat state at a given epoch.
///
/// Values are stored with named fields. Use [`HabitatState::to_vector`] and
/// [`HabitatState::from_vector`] to switch to the positional representation used by the
/// propagators and the filter, whose ordering is defined by [`HabitatParameter::index`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HabitatState {
    pub epoch: Epoch,
    /// Battery state of charge, in [0, 1]
    pub soc: f64,
    pub bus_voltage_v: f64,
    pub core_temp_k: f64,
    pub radiator_temp_k: f64,
    pub o2_mass_kg: f64,
    pub co2_mass_kg: f64,
    pub cabin_pressure_pa: f64,
    /// Battery health index, in [0, 1]
    pub battery_health: f64,
}

impl HabitatState {
    /// The nominal initial condition of a fresh habitat.
    pub fn nominal(epoch: Epoch) -> Self {
        Self {
            epoch,
            soc: 0.8,
            bus_voltage_v: 120.0,
            core_temp_k: 295.0,
            radiator_temp_k: 280.0,
            o2_mass_kg: 100.0,
            co2_mass_kg: 5.0,
            cabin_pressure_pa: 101_325.0,
            battery_health: 1.0,
        }
    }

    pub fn from_vector(epoch: Epoch, vector: &StateVector) -> Self {
        Self {
            epoch,
            soc: vector[0],
            bus_voltage_v: vector[1],
            core_temp_k: vector[2],
            radiator_temp_k: vector[3],
            o2_mass_kg: vector[4],
            co2_mass_kg: vector[5],
            cabin_pressure_pa: vector[6],
            battery_health: vector[7],
        }
    }

    /// Builds a state from a raw slice, checking its dimension and that all values are finite.
    pub fn try_from_slice(epoch: Epoch, values: &[f64]) -> Result<Self, HabitatError> {
        ensure!(
            values.len() == STATE_DIM,
            InvalidDimensionSnafu {
                expected: STATE_DIM,
                got: values.len()
            }
        );
        let vector = StateVector::from_column_slice(values);
        for param in enum_iterator::all::<HabitatParameter>() {
            let value = vector[param.index()];
            ensure!(value.is_finite(), NonFiniteValueSnafu { param, value });
        }
        Ok(Self::from_vector(epoch, &vector))
    }

    pub fn to_vector(&self) -> StateVector {
        StateVector::from([
            self.soc,
            self.bus_voltage_v,
            self.core_temp_k,
            self.radiator_temp_k,
            self.o2_mass_kg,
            self.co2_mass_kg,
            self.cabin_pressure_pa,
            self.battery_health,
        ])
    }

    pub fn value(&self, param: HabitatParameter) -> f64 {
        self.to_vector()[param.index()]
    }

    /// Returns a copy of this state with the provided parameter set to `value`.
    pub fn with_value(&self, param: HabitatParameter, value: f64) -> Self {
        let mut vector = self.to_vector();
        vector[param.index()] = value;
        Self::from_vector(self.epoch, &vector)
    }
}

impl fmt::Display for HabitatState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] SOC = {:.4}\tV_bus = {:.3} V\tT_core = {:.3} K\tT_rad = {:.3} K\tO2 = {:.4} kg\tCO2 = {:.4} kg\tP = {:.2} Pa\tH = {:.6}",
            self.epoch,
            self.soc,
            self.bus_voltage_v,
            self.core_temp_k,
            self.radiator_temp_k,
            self.o2_mass_kg,
            self.co2_mass_kg,
            self.cabin_pressure_pa,
            self.battery_health
        )
    }
}

/// Which side of its physical range a parameter was clamped to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    Lower,
    Upper,
}

/// Records which parameters were clamped by the latest saturation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Saturation {
    clamped: [Option<Boundary>; STATE_DIM],
}

impl Saturation {
    pub fn is_empty(&self) -> bool {
        self.clamped.iter().all(Option::is_none)
    }

    pub fn get(&self, param: HabitatParameter) -> Option<Boundary> {
        self.clamped[param.index()]
    }

    /// Iterates over the clamped parameters.
    pub fn iter(&self) -> impl Iterator<Item = (HabitatParameter, Boundary)> + '_ {
        enum_iterator::all::<HabitatParameter>()
            .filter_map(|param| self.clamped[param.index()].map(|side| (param, side)))
    }

    pub(crate) fn mark(&mut self, param: HabitatParameter, side: Boundary) {
        self.clamped[param.index()] = Some(side);
    }

    /// Marks every parameter clamped in `other` which is not already clamped here.
    pub fn merge(&mut self, other: &Saturation) {
        for (mine, theirs) in self.clamped.iter_mut().zip(other.clamped) {
            *mine = mine.or(theirs);
        }
    }
}

/// Physical bounds of the habitat state, enforced by saturation after every integration step.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateBounds {
    pub soc_min: f64,
    pub soc_max: f64,
    pub health_min: f64,
    pub health_max: f64,
    /// Temperatures must remain strictly positive, they are floored at this value.
    pub temperature_floor_k: f64,
}

impl Default for StateBounds {
    fn default() -> Self {
        Self {
            soc_min: 0.0,
            soc_max: 1.0,
            health_min: 0.0,
            health_max: 1.0,
            temperature_floor_k: 1.0,
        }
    }
}

impl StateBounds {
    pub fn lower(&self, param: HabitatParameter) -> f64 {
        match param {
            HabitatParameter::StateOfCharge => self.soc_min,
            HabitatParameter::BatteryHealth => self.health_min,
            HabitatParameter::CoreTemperature | HabitatParameter::RadiatorTemperature => {
                self.temperature_floor_k
            }
            _ => 0.0,
        }
    }

    pub fn upper(&self, param: HabitatParameter) -> f64 {
        match param {
            HabitatParameter::StateOfCharge => self.soc_max,
            HabitatParameter::BatteryHealth => self.health_max,
            _ => f64::INFINITY,
        }
    }

    /// Clamps every component of the vector into its physical range.
    pub fn saturate(&self, mut vector: StateVector) -> (StateVector, Saturation) {
        let mut saturation = Saturation::default();
        for param in enum_iterator::all::<HabitatParameter>() {
            let idx = param.index();
            if vector[idx] < self.lower(param) {
                vector[idx] = self.lower(param);
                saturation.mark(param, Boundary::Lower);
            } else if vector[idx] > self.upper(param) {
                vector[idx] = self.upper(param);
                saturation.mark(param, Boundary::Upper);
            }
        }
        (vector, saturation)
    }

    pub fn contains(&self, vector: &StateVector) -> bool {
        enum_iterator::all::<HabitatParameter>().all(|param| {
            let value = vector[param.index()];
            value >= self.lower(param) && value <= self.upper(param)
        })
    }
}
