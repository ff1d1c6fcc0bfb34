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

use super::{InvalidMpcConfigSnafu, MpcError};
use crate::habitat::{ControlInput, HabitatState};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// Weights and set points of the controller cost.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct ControlWeights {
    /// Weight of the mean squared deviation of the state of charge from its target
    #[builder(default = 10.0)]
    pub soc: f64,
    /// Weight of the mean battery health degradation rate, in 1/s
    #[builder(default = 1e4)]
    pub health: f64,
    #[builder(default = 0.1)]
    pub effort: f64,
    /// Weight of the mean squared O2 deficit and CO2 excess, in kg²
    #[builder(default = 1.0)]
    pub life_support: f64,
    #[builder(default = 0.9)]
    pub soc_target: f64,
    #[builder(default = 100.0)]
    pub o2_target_kg: f64,
    #[builder(default = 5.0)]
    pub co2_max_kg: f64,
}

impl Default for ControlWeights {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ControlWeights {
    pub fn validate(&self) -> Result<(), MpcError> {
        for (name, value) in [
            ("soc weight", self.soc),
            ("health weight", self.health),
            ("effort weight", self.effort),
            ("life support weight", self.life_support),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                InvalidMpcConfigSnafu { name, value }
            );
        }
        for (name, value) in [
            ("soc target", self.soc_target),
            ("O2 target", self.o2_target_kg),
            ("CO2 max", self.co2_max_kg),
        ] {
            ensure!(value.is_finite(), InvalidMpcConfigSnafu { name, value });
        }
        Ok(())
    }
}

/// Hard constraints every state of the horizon must satisfy.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct ControlConstraints {
    #[builder(default = 0.3)]
    pub soc_min: f64,
    #[builder(default = 1.0)]
    pub soc_max: f64,
    #[builder(default = 0.75)]
    pub health_min: f64,
}

impl Default for ControlConstraints {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ControlConstraints {
    pub fn validate(&self) -> Result<(), MpcError> {
        ensure!(
            self.soc_min.is_finite() && self.soc_min <= self.soc_max,
            InvalidMpcConfigSnafu {
                name: "soc min",
                value: self.soc_min
            }
        );
        ensure!(
            self.soc_max.is_finite(),
            InvalidMpcConfigSnafu {
                name: "soc max",
                value: self.soc_max
            }
        );
        ensure!(
            self.health_min.is_finite(),
            InvalidMpcConfigSnafu {
                name: "health min",
                value: self.health_min
            }
        );
        Ok(())
    }

    pub fn is_satisfied(&self, state: &HabitatState) -> bool {
        state.soc >= self.soc_min && state.soc <= self.soc_max && state.battery_health >= self.health_min
    }
}

/// The unweighted terms of the cost of one candidate over the horizon.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HorizonCost {
    /// Mean of (SOC_k - SOC*)²
    pub soc: f64,
    /// Mean of (H_k - H_{k+1}) / dt, positive when the battery degrades
    pub health: f64,
    /// Effort of the candidate command
    pub effort: f64,
    /// Mean of (O2* - O2_k)₊² + (CO2_k - CO2_max)₊²
    pub life_support: f64,
}

impl HorizonCost {
    /// Evaluates the cost terms of a simulated horizon, where `trajectory` excludes the initial state.
    pub fn evaluate(
        initial: &HabitatState,
        trajectory: &[HabitatState],
        control: &ControlInput,
        step_s: f64,
        weights: &ControlWeights,
    ) -> Self {
        let count = trajectory.len().max(1) as f64;
        let mut cost = Self {
            effort: control.effort(),
            ..Default::default()
        };
        let mut prev_health = initial.battery_health;
        for state in trajectory {
            cost.soc += (state.soc - weights.soc_target).powi(2);
            cost.health += (prev_health - state.battery_health) / step_s;
            cost.life_support += (weights.o2_target_kg - state.o2_mass_kg).max(0.0).powi(2)
                + (state.co2_mass_kg - weights.co2_max_kg).max(0.0).powi(2);
            prev_health = state.battery_health;
        }
        cost.soc /= count;
        cost.health /= count;
        cost.life_support /= count;
        cost
    }

    pub fn total(&self, weights: &ControlWeights) -> f64 {
        weights.soc * self.soc
            + weights.health * self.health
            + weights.effort * self.effort
            + weights.life_support * self.life_support
    }
}

impl fmt::Display for HorizonCost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "soc {:.3e}, health {:.3e}, effort {:.3}, life support {:.3e}",
            self.soc, self.health, self.effort, self.life_support
        )
    }
}
