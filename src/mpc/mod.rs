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

use crate::dynamics::Dynamics;
use crate::habitat::{DisturbanceProfile, CONTROL_DIM};
use crate::od::estimate::KfEstimate;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use typed_builder::TypedBuilder;

mod grid;
pub use grid::ControlGrid;

mod objective;
pub use objective::{ControlConstraints, ControlWeights, HorizonCost};

mod selector;
pub use selector::{select_control, ControlDecision, FallbackReason, PredictionModel};

/// Configuration of the grid-search model predictive controller.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct MpcConfig {
    /// Number of levels of solar utilization, pump speed, O2 generation and CO2 scrubbing
    #[builder(default = [5, 3, 3, 3])]
    pub resolution: [usize; CONTROL_DIM],
    /// Number of steps simulated for each candidate
    #[builder(default = 10)]
    pub horizon: usize,
    #[builder(default)]
    pub weights: ControlWeights,
    #[builder(default)]
    pub constraints: ControlConstraints,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MpcConfig {
    pub fn validate(&self) -> Result<(), MpcError> {
        ensure!(
            self.horizon > 0,
            InvalidMpcConfigSnafu {
                name: "horizon",
                value: 0.0
            }
        );
        self.weights.validate()?;
        self.constraints.validate()?;
        ControlGrid::from_resolution(self.resolution).map(|_| ())
    }

    /// Builds the grid of this configuration.
    pub fn grid(&self) -> Result<ControlGrid, MpcError> {
        ControlGrid::from_resolution(self.resolution)
    }

    /// Validates this configuration and selects the control from the provided estimate.
    pub fn select<D: Dynamics, P: DisturbanceProfile>(
        &self,
        estimate: &KfEstimate,
        model: &PredictionModel<'_, D, P>,
    ) -> Result<ControlDecision, MpcError> {
        self.validate()?;
        Ok(select_control(
            estimate,
            &self.grid()?,
            self.horizon,
            &self.weights,
            &self.constraints,
            model,
        ))
    }
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MpcError {
    #[snafu(display("control axis #{axis} has no level"))]
    EmptyAxis { axis: usize },
    #[snafu(display("control level {value} of axis #{axis} is outside [0, 1]"))]
    InvalidLevel { axis: usize, value: f64 },
    #[snafu(display("invalid controller configuration: {name} = {value}"))]
    InvalidMpcConfig { name: &'static str, value: f64 },
}
