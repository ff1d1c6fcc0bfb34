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
use snafu::prelude::*;
use std::fmt;

// Re-Export
mod propagator;
pub use propagator::*;
mod rk_methods;
pub use rk_methods::*;
mod saturation;
pub use saturation::*;

use crate::dynamics::{DynamicsError, HabitatDynamics};
use crate::habitat::{ControlInput, Disturbance, HabitatParameter, HabitatParams, HabitatState};
use crate::time::Duration;

/// Defines which disturbance value is used at each stage of an integration step.
///
/// The control input is always held constant over the whole step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputHold {
    /// The disturbance sampled at the start of the step is used for every stage.
    #[default]
    ZeroOrderHold,
    /// The disturbance profile is evaluated at each stage time `t + c_i dt`.
    Sampled,
}

impl fmt::Display for InputHold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ZeroOrderHold => write!(f, "zero-order hold"),
            Self::Sampled => write!(f, "sampled at stage times"),
        }
    }
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("encountered a dynamics error {source}"))]
    Dynamics { source: DynamicsError },
    /// The integration diverged: the step size must be reduced or the run aborted.
    #[snafu(display(
        "numerical instability: {param} = {value} after a {step_s} s step, reduce the step size"
    ))]
    NumericalInstability {
        param: HabitatParameter,
        value: f64,
        step_s: f64,
    },
    #[snafu(display("step size must be strictly positive, got {step}"))]
    InvalidStep { step: Duration },
    #[snafu(display("disturbance outside of the model domain: {disturbance}"))]
    InvalidDisturbance { disturbance: Disturbance },
}

/// Advances the habitat state by one RK4 step of `dt` under a zero-order hold of the control and the disturbance.
///
/// The returned state is saturated to the physical bounds of `params`.
pub fn step(
    state: &HabitatState,
    control: &ControlInput,
    disturbance: &Disturbance,
    dt: Duration,
    params: &HabitatParams,
) -> Result<HabitatState, PropagationError> {
    let (next_state, _) =
        Propagator::rk4(HabitatDynamics::new(*params)).step(state, control, disturbance, dt)?;
    Ok(next_state)
}
