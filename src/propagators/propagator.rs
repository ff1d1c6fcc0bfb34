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

use super::rk_methods::{RK, RK4Fixed};
use super::{
    DynamicsSnafu, InputHold, InvalidDisturbanceSnafu, InvalidStepSnafu,
    NumericalInstabilitySnafu, PropagationError,
};
use crate::dynamics::Dynamics;
use crate::habitat::{
    ControlInput, Disturbance, DisturbanceProfile, HabitatParameter, HabitatState, Saturation,
    StateVector,
};
use crate::time::{Duration, Epoch, Unit};
use snafu::prelude::*;
use std::fmt;

/// A Propagator advances the habitat state with a fixed step explicit Runge Kutta.
///
/// It stores the dynamics, the input hold policy and the Butcher coefficients of the chosen method,
/// so a single propagator can be reused for the truth, the filter and the controller.
#[derive(Clone, Debug)]
pub struct Propagator<D: Dynamics> {
    pub dynamics: D,
    pub hold: InputHold,
    pub(crate) order: u8,
    pub(crate) stages: usize,
    pub(crate) a_coeffs: &'static [f64],
    pub(crate) b_coeffs: &'static [f64],
}

impl<D: Dynamics> Propagator<D> {
    /// Each propagator must be initialized with `new` which stores the dynamics and the coefficients of the RK method.
    pub fn new<T: RK>(dynamics: D, hold: InputHold) -> Self {
        Self {
            dynamics,
            hold,
            order: T::ORDER,
            stages: T::STAGES,
            a_coeffs: T::A_COEFFS,
            b_coeffs: T::B_COEFFS,
        }
    }

    /// Classical RK4 with a zero-order hold of the inputs.
    pub fn rk4(dynamics: D) -> Self {
        Self::new::<RK4Fixed>(dynamics, InputHold::ZeroOrderHold)
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    /// Computes the state after one step of `step_s` seconds, without saturating it.
    ///
    /// This is the raw transition map, which the filter linearizes.
    pub fn derive<P: DisturbanceProfile>(
        &self,
        state_vec: &StateVector,
        control: &ControlInput,
        profile: &P,
        epoch: Epoch,
        step_s: f64,
    ) -> Result<StateVector, PropagationError> {
        let start_disturbance = profile.at(epoch);
        ensure!(
            start_disturbance.is_valid(),
            InvalidDisturbanceSnafu {
                disturbance: start_disturbance
            }
        );

        let mut k: Vec<StateVector> = Vec::with_capacity(self.stages);
        k.push(
            self.dynamics
                .eom(0.0, state_vec, control, &start_disturbance)
                .context(DynamicsSnafu)?,
        );

        let mut a_idx: usize = 0;
        for i in 0..(self.stages - 1) {
            // c_i = \sum_{j=1}^{i-1} a_ij
            let mut ci: f64 = 0.0;
            // w_i = a_{i1} k_1 + ... + a_{i,i-1} k_{i-1}
            let mut wi = StateVector::zeros();
            for kj in &k[0..i + 1] {
                let a_ij = self.a_coeffs[a_idx];
                ci += a_ij;
                wi += a_ij * kj;
                a_idx += 1;
            }

            let disturbance = match self.hold {
                InputHold::ZeroOrderHold => start_disturbance,
                InputHold::Sampled => self.sample(profile, epoch, ci * step_s)?,
            };

            let ki = self
                .dynamics
                .eom(
                    ci * step_s,
                    &(state_vec + step_s * wi),
                    control,
                    &disturbance,
                )
                .context(DynamicsSnafu)?;
            k.push(ki);
        }

        let mut next_state = *state_vec;
        for (b_i, ki) in self.b_coeffs.iter().zip(&k) {
            next_state += step_s * *b_i * ki;
        }

        Ok(next_state)
    }

    /// Advances the state by `dt`, then saturates it to its physical bounds.
    ///
    /// Commands are clamped into their range before integration. Returns the new state and which parameters were clamped.
    pub fn step<P: DisturbanceProfile>(
        &self,
        state: &HabitatState,
        control: &ControlInput,
        profile: &P,
        dt: Duration,
    ) -> Result<(HabitatState, Saturation), PropagationError> {
        ensure!(dt > Duration::ZERO, InvalidStepSnafu { step: dt });
        let step_s = dt.to_seconds();

        let state_vec = state.to_vector();
        ensure_finite(&state_vec, step_s)?;

        let next_state =
            self.derive(&state_vec, &control.clamped(), profile, state.epoch, step_s)?;
        ensure_finite(&next_state, step_s)?;

        let (next_state, saturation) = self.dynamics.finally(next_state);
        if !saturation.is_empty() {
            for (param, side) in saturation.iter() {
                trace!("{} saturated at {side:?} bound at {}", param, state.epoch + dt);
            }
        }

        Ok((
            HabitatState::from_vector(state.epoch + dt, &next_state),
            saturation,
        ))
    }

    /// Propagates for `steps` steps of `dt` with a constant control, returning every intermediate state (excluding the initial one).
    pub fn for_steps<P: DisturbanceProfile>(
        &self,
        state: &HabitatState,
        control: &ControlInput,
        profile: &P,
        dt: Duration,
        steps: usize,
    ) -> Result<Vec<HabitatState>, PropagationError> {
        let mut states = Vec::with_capacity(steps);
        let mut current = *state;
        for _ in 0..steps {
            let (next, _) = self.step(&current, control, profile, dt)?;
            states.push(next);
            current = next;
        }
        Ok(states)
    }

    fn sample<P: DisturbanceProfile>(
        &self,
        profile: &P,
        epoch: Epoch,
        offset_s: f64,
    ) -> Result<Disturbance, PropagationError> {
        let disturbance = profile.at(epoch + offset_s * Unit::Second);
        ensure!(
            disturbance.is_valid(),
            InvalidDisturbanceSnafu { disturbance }
        );
        Ok(disturbance)
    }
}

impl<D: Dynamics + fmt::Display> fmt::Display for Propagator<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RK{} ({} stages, {}) of {}",
            self.order, self.stages, self.hold, self.dynamics
        )
    }
}

fn ensure_finite(state_vec: &StateVector, step_s: f64) -> Result<(), PropagationError> {
    for param in enum_iterator::all::<HabitatParameter>() {
        let value = state_vec[param.index()];
        ensure!(
            value.is_finite(),
            NumericalInstabilitySnafu {
                param,
                value,
                step_s
            }
        );
    }
    Ok(())
}
