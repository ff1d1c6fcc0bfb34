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

use crate::habitat::{ControlInput, Disturbance, HabitatParameter, Saturation, StateVector};
use snafu::Snafu;

/// Battery charge, discharge and bus voltage.
pub mod power;

/// Core and radiator heat balance.
pub mod thermal;

/// Oxygen, carbon dioxide and cabin pressure.
pub mod life_support;

/// Battery health degradation.
pub mod degradation;

/// The coupled habitat model, combining all of the above.
pub mod habitat;
pub use self::habitat::HabitatDynamics;

/// A trait for models with equations of motion that can be integrated.
///
/// Implementations must be pure: the derivative only depends on the provided arguments.
pub trait Dynamics: Clone {
    /// Defines the equations of motion.
    ///
    /// - `delta_t`: Time in seconds past the start of the integration step.
    /// - `state_vec`: The state vector, which changes at each integration stage.
    /// - `control`: The actuator commands, held constant over the whole step.
    /// - `disturbance`: The disturbance for this stage, as selected by the input hold policy.
    fn eom(
        &self,
        delta_t: f64,
        state_vec: &StateVector,
        control: &ControlInput,
        disturbance: &Disturbance,
    ) -> Result<StateVector, DynamicsError>;

    /// Performs final changes after each successful integration step, e.g. saturation to the physical bounds.
    ///
    /// Returns the sanitized state and which parameters were clamped.
    fn finally(&self, next_state: StateVector) -> (StateVector, Saturation) {
        (next_state, Saturation::default())
    }
}

/// Dynamical model errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// The equations of motion returned NaN or an infinite value.
    #[snafu(display("derivative of {param} is not finite ({value})"))]
    NonFiniteDerivative { param: HabitatParameter, value: f64 },
}
