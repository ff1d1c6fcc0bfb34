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
    DimensionMismatchSnafu, DuplicateChannelSnafu, EmptyMeasurementModelSnafu, InvalidNoiseSnafu,
    MeasurementRangeSnafu, ODError,
};
use crate::habitat::{HabitatParameter, HabitatState, StateVector, STATE_DIM};
use crate::linalg::{DMatrix, DVector};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// A sensor reading one parameter of the habitat state directly.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementChannel {
    pub param: HabitatParameter,
    /// One sigma of the white measurement noise, in the unit of the parameter
    pub sigma: f64,
    /// Readings below this value are rejected
    pub min: f64,
    /// Readings above this value are rejected
    pub max: f64,
}

impl MeasurementChannel {
    /// Builds a channel with the default plausibility range of the parameter.
    pub fn new(param: HabitatParameter, sigma: f64) -> Self {
        let (min, max) = match param {
            HabitatParameter::StateOfCharge | HabitatParameter::BatteryHealth => (-0.1, 1.1),
            HabitatParameter::BusVoltage => (0.0, 1_000.0),
            HabitatParameter::CoreTemperature | HabitatParameter::RadiatorTemperature => {
                (0.0, 1_000.0)
            }
            HabitatParameter::OxygenMass | HabitatParameter::CarbonDioxideMass => (-1.0, 10_000.0),
            HabitatParameter::CabinPressure => (0.0, 1e6),
        };
        Self {
            param,
            sigma,
            min,
            max,
        }
    }

    pub fn with_range(self, min: f64, max: f64) -> Self {
        Self { min, max, ..self }
    }
}

/// The measurement model `z = h(x) + v` where `h` selects a subset of the state and `v ~ N(0, R)` with diagonal `R`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementModel {
    pub channels: Vec<MeasurementChannel>,
}

impl Default for MeasurementModel {
    /// Every parameter but the radiator temperature is measured.
    fn default() -> Self {
        Self {
            channels: vec![
                MeasurementChannel::new(HabitatParameter::StateOfCharge, 0.01),
                MeasurementChannel::new(HabitatParameter::BusVoltage, 0.05),
                MeasurementChannel::new(HabitatParameter::CoreTemperature, 0.1),
                MeasurementChannel::new(HabitatParameter::OxygenMass, 0.01),
                MeasurementChannel::new(HabitatParameter::CarbonDioxideMass, 0.005),
                MeasurementChannel::new(HabitatParameter::CabinPressure, 1.0),
                MeasurementChannel::new(HabitatParameter::BatteryHealth, 0.001),
            ],
        }
    }
}

impl MeasurementModel {
    /// Builds a validated measurement model.
    pub fn new(channels: Vec<MeasurementChannel>) -> Result<Self, ODError> {
        let model = Self { channels };
        model.validate()?;
        Ok(model)
    }

    /// Checks that there is at least one channel, that no parameter is measured twice and that every noise is strictly positive.
    pub fn validate(&self) -> Result<(), ODError> {
        ensure!(!self.channels.is_empty(), EmptyMeasurementModelSnafu);
        for (i, channel) in self.channels.iter().enumerate() {
            ensure!(
                channel.sigma.is_finite() && channel.sigma > 0.0,
                InvalidNoiseSnafu {
                    kind: "measurement",
                    param: channel.param,
                    value: channel.sigma
                }
            );
            ensure!(
                !self.channels[..i].iter().any(|c| c.param == channel.param),
                DuplicateChannelSnafu {
                    param: channel.param
                }
            );
        }
        Ok(())
    }

    /// Number of measured parameters, i.e. the degrees of freedom of the NIS.
    pub fn dim(&self) -> usize {
        self.channels.len()
    }

    pub fn params(&self) -> Vec<HabitatParameter> {
        self.channels.iter().map(|c| c.param).collect()
    }

    /// The expected measurement `h(x)`.
    pub fn observe(&self, state_vec: &StateVector) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            self.channels.iter().map(|c| state_vec[c.param.index()]),
        )
    }

    /// The measurement sensitivity matrix `H = ∂h/∂x`.
    pub fn sensitivity(&self) -> DMatrix<f64> {
        let mut h_tilde = DMatrix::zeros(self.dim(), STATE_DIM);
        for (row, channel) in self.channels.iter().enumerate() {
            h_tilde[(row, channel.param.index())] = 1.0;
        }
        h_tilde
    }

    /// The measurement noise covariance `R`.
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_iterator(
            self.dim(),
            self.channels.iter().map(|c| c.sigma.powi(2)),
        ))
    }

    /// Rejects measurements of the wrong dimension or with a value which is not finite or out of the channel range.
    pub fn validate_measurement(&self, msr: &Measurement) -> Result<(), ODError> {
        ensure!(
            msr.values.len() == self.dim(),
            DimensionMismatchSnafu {
                expected: self.dim(),
                got: msr.values.len()
            }
        );
        for (channel, value) in self.channels.iter().zip(msr.values.iter()) {
            ensure!(
                value.is_finite() && *value >= channel.min && *value <= channel.max,
                MeasurementRangeSnafu {
                    param: channel.param,
                    value: *value,
                    min: channel.min,
                    max: channel.max
                }
            );
        }
        Ok(())
    }

    /// A noise free measurement of the provided state.
    pub fn measure(&self, state: &HabitatState) -> Measurement {
        Measurement {
            epoch: state.epoch,
            values: self.observe(&state.to_vector()),
        }
    }
}

/// One synchronous reading of every channel of a measurement model.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub epoch: Epoch,
    /// The values, in the order of the channels of the model
    pub values: DVector<f64>,
}

impl Measurement {
    pub fn new(epoch: Epoch, values: Vec<f64>) -> Self {
        Self {
            epoch,
            values: DVector::from_vec(values),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "measurement @ {}: {}", self.epoch, self.values.transpose())
    }
}
