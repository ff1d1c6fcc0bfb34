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
use crate::habitat::{ControlInput, DisturbanceProfile, StateMatrix, StateVector, STATE_DIM};
use crate::propagators::{PropagationError, Propagator};
use crate::time::Epoch;

/// Relative perturbation used by default for the finite differences.
pub const DEFAULT_RELATIVE_STEP: f64 = 1e-6;

/// Computes the Jacobian of the one step transition `x_{k+1} = φ(x_k)` by central finite differences.
///
/// The transition is not saturated, so the linearization remains valid at the physical bounds.
/// Column `j` is perturbed by `relative_step * max(|x_j|, 1)`.
pub fn transition_jacobian<D: Dynamics, P: DisturbanceProfile>(
    prop: &Propagator<D>,
    state_vec: &StateVector,
    control: &ControlInput,
    profile: &P,
    epoch: Epoch,
    step_s: f64,
    relative_step: f64,
) -> Result<StateMatrix, PropagationError> {
    let mut stm = StateMatrix::zeros();
    for j in 0..STATE_DIM {
        let h = relative_step * state_vec[j].abs().max(1.0);

        let mut plus = *state_vec;
        plus[j] += h;
        let mut minus = *state_vec;
        minus[j] -= h;

        let phi_plus = prop.derive(&plus, control, profile, epoch, step_s)?;
        let phi_minus = prop.derive(&minus, control, profile, epoch, step_s)?;

        stm.set_column(j, &((phi_plus - phi_minus) / (2.0 * h)));
    }
    Ok(stm)
}
