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

use crate::habitat::{Boundary, HabitatParameter, Saturation, STATE_DIM};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use typed_builder::TypedBuilder;

/// Configures when a persistent saturation is reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct SaturationConfig {
    /// Number of consecutive clamped steps after which a parameter is reported
    #[builder(default = 50)]
    pub persistence: usize,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A parameter has been held at one of its bounds for too many consecutive steps.
///
/// Saturation itself is normal sanitization. This warning means the model, the commands, or the
/// configuration keep pushing the state out of its physical domain.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConstraintViolation {
    pub param: HabitatParameter,
    pub boundary: Boundary,
    pub consecutive_steps: usize,
    pub epoch: Epoch,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} held at its {:?} bound for {} consecutive steps as of {}",
            self.param, self.boundary, self.consecutive_steps, self.epoch
        )
    }
}

/// Counts the consecutive saturations of each parameter.
#[derive(Clone, Debug, Default)]
pub struct SaturationMonitor {
    pub config: SaturationConfig,
    counts: [usize; STATE_DIM],
    sides: [Option<Boundary>; STATE_DIM],
}

impl SaturationMonitor {
    pub fn new(config: SaturationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Records the saturation of the latest step and returns the parameters which have now been clamped for too long.
    ///
    /// The count of a parameter resets as soon as it leaves its bound or switches to the other bound.
    pub fn observe(&mut self, epoch: Epoch, saturation: &Saturation) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();
        for param in enum_iterator::all::<HabitatParameter>() {
            let idx = param.index();
            match saturation.get(param) {
                Some(side) if self.sides[idx] == Some(side) => self.counts[idx] += 1,
                Some(side) => {
                    self.sides[idx] = Some(side);
                    self.counts[idx] = 1;
                }
                None => {
                    self.sides[idx] = None;
                    self.counts[idx] = 0;
                }
            }

            if let Some(boundary) = self.sides[idx] {
                if self.counts[idx] >= self.config.persistence.max(1) {
                    let violation = ConstraintViolation {
                        param,
                        boundary,
                        consecutive_steps: self.counts[idx],
                        epoch,
                    };
                    warn!("{violation}");
                    violations.push(violation);
                }
            }
        }
        violations
    }

    /// Number of consecutive steps the parameter has been clamped for.
    pub fn consecutive(&self, param: HabitatParameter) -> usize {
        self.counts[param.index()]
    }

    pub fn reset(&mut self) {
        self.counts = [0; STATE_DIM];
        self.sides = [None; STATE_DIM];
    }
}
