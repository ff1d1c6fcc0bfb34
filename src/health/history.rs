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

use super::{HealthError, InvalidHealthSnafu, NonIncreasingEpochSnafu};
use crate::od::estimate::KfEstimate;
use crate::time::Epoch;
use snafu::ensure;

/// Append only history of the estimated battery health, with strictly increasing epochs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HealthHistory {
    samples: Vec<(Epoch, f64)>,
}

impl HealthHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from samples, which must be in strictly increasing epochs.
    pub fn from_samples(samples: &[(Epoch, f64)]) -> Result<Self, HealthError> {
        let mut history = Self::new();
        for (epoch, health) in samples {
            history.push(*epoch, *health)?;
        }
        Ok(history)
    }

    pub fn push(&mut self, epoch: Epoch, health: f64) -> Result<(), HealthError> {
        ensure!(health.is_finite(), InvalidHealthSnafu { value: health });
        if let Some((previous, _)) = self.samples.last() {
            ensure!(
                epoch > *previous,
                NonIncreasingEpochSnafu {
                    previous: *previous,
                    got: epoch
                }
            );
        }
        self.samples.push((epoch, health));
        Ok(())
    }

    /// Records the battery health of a filter estimate.
    pub fn push_estimate(&mut self, estimate: &KfEstimate) -> Result<(), HealthError> {
        self.push(estimate.epoch(), estimate.state.battery_health)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<(Epoch, f64)> {
        self.samples.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Epoch, f64)> {
        self.samples.iter()
    }
}
