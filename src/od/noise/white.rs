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

use hifitime::Epoch;
use rand::Rng;
use rand_distr::StandardNormal;
use serde_derive::{Deserialize, Serialize};

use super::Stochastics;

/// White noise is an uncorrelated random variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WhiteNoise {
    /// Mean value of this white noise
    pub mean: f64,
    /// Noise as a one-sigma of the Normal distribution.
    pub sigma: f64,
}

impl WhiteNoise {
    /// Initializes a zero mean white noise whose level is fixed regardless of the sampling time.
    pub fn constant_white_noise(sigma: f64) -> Self {
        Self {
            sigma,
            ..Default::default()
        }
    }
}

impl Stochastics for WhiteNoise {
    fn covariance(&self, _epoch: Epoch) -> f64 {
        self.sigma.powi(2)
    }

    fn sample<R: Rng>(&mut self, _epoch: Epoch, rng: &mut R) -> f64 {
        let unit: f64 = rng.sample(StandardNormal);
        self.mean + self.sigma * unit
    }
}

#[cfg(test)]
mod ut_wn {
    use super::{Stochastics, WhiteNoise};
    use hifitime::Epoch;
    use rand_pcg::Pcg64Mcg;
    use statrs::statistics::Statistics;

    #[test]
    fn samples_follow_the_sigma() {
        let epoch = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1);
        let mut rng = Pcg64Mcg::new(1000);
        let mut wn = WhiteNoise::constant_white_noise(0.1);
        assert!((wn.covariance(epoch) - 0.01).abs() < 1e-15);

        let samples = (0..5_000)
            .map(|_| wn.sample(epoch, &mut rng))
            .collect::<Vec<f64>>();
        assert!(samples.iter().mean().abs() < 5e-3);
        assert!((samples.iter().std_dev() - 0.1).abs() < 5e-3);
        // Nothing beyond five sigmas in a few thousand draws.
        assert!(samples.iter().all(|x| x.abs() < 0.5));

        let mut biased = WhiteNoise { mean: 2.0, sigma: 0.0 };
        assert_eq!(biased.sample(epoch, &mut rng), 2.0);
    }
}
