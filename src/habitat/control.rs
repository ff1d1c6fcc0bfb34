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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Number of control channels.
pub const CONTROL_DIM: usize = 4;

/// Actuator commands, each normalized to [0, 1] of the actuator's physical range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Fraction of the available sunlight fed to the bus (1.0 means no curtailment)
    pub solar_utilization: f64,
    pub pump_speed: f64,
    pub o2_generation: f64,
    pub co2_scrubbing: f64,
}

impl ControlInput {
    pub fn new(
        solar_utilization: f64,
        pump_speed: f64,
        o2_generation: f64,
        co2_scrubbing: f64,
    ) -> Self {
        Self {
            solar_utilization,
            pump_speed,
            o2_generation,
            co2_scrubbing,
        }
    }

    /// The minimum load command: all solar power is used and every consumer is switched off.
    pub fn safe_mode() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn from_array(values: [f64; CONTROL_DIM]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(&self) -> [f64; CONTROL_DIM] {
        [
            self.solar_utilization,
            self.pump_speed,
            self.o2_generation,
            self.co2_scrubbing,
        ]
    }

    /// Clamps every command into [0, 1]. Non finite commands are replaced by the safe mode value of that channel.
    pub fn clamped(&self) -> Self {
        let safe = Self::safe_mode().to_array();
        let mut values = self.to_array();
        for (value, fallback) in values.iter_mut().zip(safe) {
            *value = if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            };
        }
        Self::from_array(values)
    }

    pub fn is_within_range(&self) -> bool {
        self.to_array()
            .iter()
            .all(|value| (0.0..=1.0).contains(value))
    }

    /// Quadratic actuation effort: solar curtailment plus the use of each consumer.
    pub fn effort(&self) -> f64 {
        (1.0 - self.solar_utilization).powi(2)
            + self.pump_speed.powi(2)
            + self.o2_generation.powi(2)
            + self.co2_scrubbing.powi(2)
    }
}

impl fmt::Display for ControlInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "solar {:.3}, pump {:.3}, O2 gen {:.3}, CO2 scrub {:.3}",
            self.solar_utilization, self.pump_speed, self.o2_generation, self.co2_scrubbing
        )
    }
}
