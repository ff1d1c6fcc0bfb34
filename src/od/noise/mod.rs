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

use super::{InvalidNoiseSnafu, ODError};
use crate::habitat::{HabitatParameter, StateMatrix, StateVector, STATE_DIM};
use crate::time::{Duration, Epoch};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

pub mod white;

pub use white::WhiteNoise;

/// Trait for any kind of stochastic modeling, used to corrupt the truth and the synthetic measurements.
pub trait Stochastics {
    /// Return the variance of this stochastic noise model at a given time.
    fn covariance(&self, epoch: Epoch) -> f64;

    /// Returns a new sample of these stochastics
    fn sample<R: Rng>(&mut self, epoch: Epoch, rng: &mut R) -> f64;
}

/// Diagonal process noise of the habitat state, expressed as a variance growth per second.
///
/// The filter adds `Q = diag(rate) * dt` at each prediction, and the simulator draws the truth
/// process noise from the same `Q`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessNoise {
    pub variance_rate: [f64; STATE_DIM],
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            variance_rate: [1e-8, 1e-4, 1e-4, 1e-4, 1e-10, 1e-10, 1e-4, 1e-10],
        }
    }
}

impl ProcessNoise {
    pub fn zero() -> Self {
        Self {
            variance_rate: [0.0; STATE_DIM],
        }
    }

    /// Returns a copy of this process noise with every variance scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut variance_rate = self.variance_rate;
        variance_rate.iter_mut().for_each(|q| *q *= factor);
        Self { variance_rate }
    }

    /// The discrete process noise covariance over `dt`.
    pub fn covariance(&self, dt: Duration) -> StateMatrix {
        let dt_s = dt.to_seconds();
        StateMatrix::from_diagonal(&StateVector::from(self.variance_rate.map(|q| q * dt_s)))
    }

    pub fn validate(&self) -> Result<(), ODError> {
        for param in enum_iterator::all::<HabitatParameter>() {
            let value = self.variance_rate[param.index()];
            ensure!(
                value.is_finite() && value >= 0.0,
                InvalidNoiseSnafu {
                    kind: "process",
                    param,
                    value
                }
            );
        }
        Ok(())
    }

    /// Draws one sample of the process noise accumulated over `dt`.
    pub fn sample<R: Rng>(&self, epoch: Epoch, dt: Duration, rng: &mut R) -> StateVector {
        let dt_s = dt.to_seconds();
        let mut noise = StateVector::zeros();
        for (value, rate) in noise.iter_mut().zip(self.variance_rate) {
            let mut wn = WhiteNoise::constant_white_noise((rate * dt_s).max(0.0).sqrt());
            *value = wn.sample(epoch, rng);
        }
        noise
    }
}

#[cfg(test)]
mod ut_process_noise {
    use super::*;
    use crate::time::TimeUnits;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn covariance_scales_with_step() {
        let q = ProcessNoise::default();
        assert!(q.validate().is_ok());
        let q_1s = q.covariance(1.seconds());
        let q_2s = q.covariance(2.seconds());
        assert_eq!(q_1s[(6, 6)], 1e-4);
        assert_eq!(q_2s[(6, 6)], 2e-4);
        assert_eq!(q_1s[(0, 1)], 0.0);

        let mut bad = q;
        bad.variance_rate[3] = -1.0;
        assert!(matches!(
            bad.validate(),
            Err(ODError::InvalidNoise {
                param: HabitatParameter::RadiatorTemperature,
                ..
            })
        ));
    }

    #[test]
    fn zero_noise_samples_zero() {
        let epoch = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1);
        let mut rng = Pcg64Mcg::new(0);
        let sample = ProcessNoise::zero().sample(epoch, 1.seconds(), &mut rng);
        assert_eq!(sample, StateVector::zeros());
        let sample = ProcessNoise::default().sample(epoch, 1.seconds(), &mut rng);
        assert!(sample[6] != 0.0);
    }
}
