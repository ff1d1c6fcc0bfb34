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

use super::{EmptyAxisSnafu, InvalidLevelSnafu, MpcError};
use crate::habitat::{ControlInput, CONTROL_DIM};
use crate::utils::linspace;
use snafu::ensure;
use std::fmt;

/// The discrete set of candidate commands searched by the controller.
///
/// Each axis holds its levels sorted and without duplicates. Candidates are enumerated in
/// lexicographic order: solar utilization varies slowest and CO2 scrubbing fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlGrid {
    levels: [Vec<f64>; CONTROL_DIM],
}

impl ControlGrid {
    /// Builds a grid of evenly spaced levels over [0, 1] on each axis.
    ///
    /// An axis with a single level is pinned at its safe mode value.
    pub fn from_resolution(resolution: [usize; CONTROL_DIM]) -> Result<Self, MpcError> {
        let safe = ControlInput::safe_mode().to_array();
        let mut levels: [Vec<f64>; CONTROL_DIM] = Default::default();
        for (axis, num) in resolution.iter().enumerate() {
            ensure!(*num > 0, EmptyAxisSnafu { axis });
            levels[axis] = if *num == 1 {
                vec![safe[axis]]
            } else {
                linspace(0.0, 1.0, *num)
            };
        }
        Self::from_levels(levels)
    }

    /// Builds a grid from explicit levels, which are sorted and deduplicated.
    pub fn from_levels(mut levels: [Vec<f64>; CONTROL_DIM]) -> Result<Self, MpcError> {
        for (axis, axis_levels) in levels.iter_mut().enumerate() {
            ensure!(!axis_levels.is_empty(), EmptyAxisSnafu { axis });
            for value in axis_levels.iter() {
                ensure!(
                    value.is_finite() && (0.0..=1.0).contains(value),
                    InvalidLevelSnafu {
                        axis,
                        value: *value
                    }
                );
            }
            axis_levels.sort_by(f64::total_cmp);
            axis_levels.dedup();
        }
        Ok(Self { levels })
    }

    pub fn levels(&self, axis: usize) -> &[f64] {
        &self.levels[axis]
    }

    /// Number of candidates in this grid.
    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every candidate command, in grid order.
    pub fn candidates(&self) -> impl Iterator<Item = ControlInput> + '_ {
        (0..self.len()).map(move |mut flat| {
            let mut values = [0.0; CONTROL_DIM];
            for axis in (0..CONTROL_DIM).rev() {
                let count = self.levels[axis].len();
                values[axis] = self.levels[axis][flat % count];
                flat /= count;
            }
            ControlInput::from_array(values)
        })
    }
}

impl fmt::Display for ControlGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sizes = self
            .levels
            .iter()
            .map(|l| l.len().to_string())
            .collect::<Vec<String>>();
        write!(f, "{} candidates ({})", self.len(), sizes.join(" x "))
    }
}
