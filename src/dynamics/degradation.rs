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

use crate::habitat::{HabitatParams, StateVector};

/// Rate of change of the battery health index.
///
/// The health loss is driven by the depth of discharge and by the magnitude of the state of charge rate.
/// The returned rate is never positive, and exactly zero once the battery has failed (health at or below zero).
pub fn health_rate(state: &StateVector, soc_rate: f64, params: &HabitatParams) -> f64 {
    let health = state[7];
    if health <= 0.0 {
        return 0.0;
    }
    let depth_of_discharge = 1.0 - state[0].clamp(0.0, 1.0);
    -(params.dod_degradation * depth_of_discharge + params.rate_degradation * soc_rate.abs())
}
