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

use crate::habitat::{HabitatParameter, HabitatState, StateMatrix, StateVector, STATE_DIM};
use crate::time::Epoch;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use std::fmt;

/// Diagonal of the default prior covariance of the habitat state.
pub const DEFAULT_PRIOR_DIAG: [f64; STATE_DIM] = [1e-4, 1.0, 1.0, 1.0, 1e-2, 1e-2, 100.0, 1e-4];

/// Kalman filter Estimate of the full habitat state, battery health included.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KfEstimate {
    /// The estimated state
    pub state: HabitatState,
    /// The Covariance of this estimate
    pub covar: StateMatrix,
    /// The predicted covariance of this estimate
    pub covar_bar: StateMatrix,
    /// Whether or not this is a predicted estimate from a time update, or an estimate from a measurement
    pub predicted: bool,
    /// The linearized one step transition used to compute this Estimate
    pub stm: StateMatrix,
}

impl KfEstimate {
    /// Initializes a new filter estimate from the state and the full covariance
    pub fn from_covar(state: HabitatState, covar: StateMatrix) -> Self {
        Self {
            state,
            covar,
            covar_bar: covar,
            predicted: true,
            stm: StateMatrix::identity(),
        }
    }

    /// Initializes a new filter estimate from the state and the diagonal of the covariance
    pub fn from_diag(state: HabitatState, diag: StateVector) -> Self {
        Self::from_covar(state, StateMatrix::from_diagonal(&diag))
    }

    /// Initializes a new filter estimate with the default prior covariance.
    pub fn with_default_prior(state: HabitatState) -> Self {
        Self::from_diag(state, StateVector::from(DEFAULT_PRIOR_DIAG))
    }

    /// Generates an estimate whose state is dispersed from the truth using the provided covariance diagonal.
    ///
    /// The dispersed state is not saturated: the caller decides whether it needs to be sanitized.
    pub fn disperse_from_diag(truth: HabitatState, diag: StateVector, seed: u128) -> Self {
        let mut rng = Pcg64Mcg::new(seed);
        let mut vector = truth.to_vector();
        for (value, variance) in vector.iter_mut().zip(diag.iter()) {
            if let Ok(normal) = Normal::new(0.0, variance.max(0.0).sqrt()) {
                *value += normal.sample(&mut rng);
            }
        }
        Self::from_diag(HabitatState::from_vector(truth.epoch, &vector), diag)
    }

    pub fn epoch(&self) -> Epoch {
        self.state.epoch
    }

    pub fn state_vector(&self) -> StateVector {
        self.state.to_vector()
    }

    /// One sigma uncertainty of the provided parameter
    pub fn sigma_for(&self, param: HabitatParameter) -> f64 {
        let idx = param.index();
        self.covar[(idx, idx)].max(0.0).sqrt()
    }

    /// Returns whether the truth lies within `n_sigmas` of this estimate on every parameter.
    pub fn within_sigmas(&self, truth: &HabitatState, n_sigmas: f64) -> bool {
        let error = truth.to_vector() - self.state_vector();
        enum_iterator::all::<HabitatParameter>()
            .all(|param| error[param.index()].abs() <= n_sigmas * self.sigma_for(param))
    }
}

impl fmt::Display for KfEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = if self.predicted {
            "Prediction"
        } else {
            "Estimate"
        };
        let fmt_sigmas = enum_iterator::all::<HabitatParameter>()
            .map(|param| format!("{param}: {:e}", self.sigma_for(param)))
            .collect::<Vec<String>>();
        write!(
            f,
            "=== {} @ {} ===\nstate {}\nsigmas [{}]\n",
            word,
            self.epoch(),
            self.state,
            fmt_sigmas.join(", ")
        )
    }
}

impl fmt::LowerExp for KfEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "=== PREDICTED: {} ===\nState {:e} Covariance {:e}\n=====================",
            self.predicted,
            self.state_vector(),
            self.covar
        )
    }
}
