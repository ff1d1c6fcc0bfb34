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

use crate::habitat::HabitatParameter;
use crate::propagators::PropagationError;
use crate::time::{Duration, Epoch};
use snafu::prelude::Snafu;

/// Provides Estimate handling functionalities.
pub mod estimate;

/// Provides the measurement model and the measurements themselves.
pub mod measurement;

/// Finite difference linearization of the transition.
pub mod jacobian;

/// The extended Kalman filter.
pub mod filter;
pub use filter::Ekf;

/// Prefit and postfit residuals, and the NIS samples derived from them.
pub mod residual;

/// NIS based fault detection.
pub mod fault;

/// Provides noise modeling
pub mod noise;

/// Provides the seeded truth and measurement simulator.
pub mod simulator;

/// Consistency and accuracy statistics of a filter run.
pub mod stats;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::estimate::*;
    pub use super::fault::*;
    pub use super::filter::*;
    pub use super::measurement::*;
    pub use super::noise::{ProcessNoise, Stochastics, WhiteNoise};
    pub use super::residual::*;
    pub use super::simulator::*;
    pub use super::stats::*;
    pub use super::*;

    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ODError {
    #[snafu(display("during an estimation, encountered {source}"))]
    ODPropError { source: PropagationError },
    #[snafu(display("invalid step size: {step}"))]
    StepSizeError { step: Duration },
    #[snafu(display("expected {expected} measured values, got {got}"))]
    DimensionMismatch { expected: usize, got: usize },
    #[snafu(display("measurement of {param} = {value} outside of [{min}, {max}]"))]
    MeasurementRange {
        param: HabitatParameter,
        value: f64,
        min: f64,
        max: f64,
    },
    #[snafu(display("measurement model has no channel"))]
    EmptyMeasurementModel,
    #[snafu(display("{param} is measured by more than one channel"))]
    DuplicateChannel { param: HabitatParameter },
    #[snafu(display("invalid {kind} noise for {param}: {value}"))]
    InvalidNoise {
        kind: &'static str,
        param: HabitatParameter,
        value: f64,
    },
    #[snafu(display("estimate is at {estimate} but measurement is at {measurement}"))]
    EpochMismatch { estimate: Epoch, measurement: Epoch },
    #[snafu(display("invalid filter configuration: {name} = {value}"))]
    InvalidFilterConfig { name: &'static str, value: f64 },
    #[snafu(display("invalid fault threshold: {reason}"))]
    InvalidThreshold { reason: String },
    #[snafu(display("not enough samples to {action}"))]
    ODNoResiduals { action: &'static str },
}
