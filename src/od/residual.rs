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
use crate::linalg::DVector;
use crate::time::Epoch;
use std::fmt;

/// Stores the result of a `measurement_update`.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    /// Date time of this Residual
    pub epoch: Epoch,
    /// The prefit residual, or innovation, in the units of each channel
    pub prefit: DVector<f64>,
    /// The postfit residual in the units of each channel
    pub postfit: DVector<f64>,
    /// The normalized innovation squared, computed as `y' * S^-1 * y` where `y` is the prefit residual
    /// and `S = H*P*H' + R` is the innovation covariance.
    /// Under nominal operation, it follows a Chi Square distribution with as many degrees of freedom as channels.
    pub nis: f64,
    /// Diagonal of the innovation covariance `S`
    pub innovation_variance: DVector<f64>,
    /// Measured parameters, in the order of the residual vectors
    pub channels: Vec<HabitatParameter>,
    /// The real observation.
    pub real_obs: DVector<f64>,
    /// The computed observation as expected from the prediction of the filter.
    pub computed_obs: DVector<f64>,
}

impl Residual {
    /// Degrees of freedom of the NIS of this residual.
    pub fn dof(&self) -> usize {
        self.channels.len()
    }

    /// Returns the prefit for this parameter, if measured
    pub fn prefit(&self, param: HabitatParameter) -> Option<f64> {
        self.position(param).map(|idx| self.prefit[idx])
    }

    /// Returns the postfit for this parameter, if measured
    pub fn postfit(&self, param: HabitatParameter) -> Option<f64> {
        self.position(param).map(|idx| self.postfit[idx])
    }

    /// Each prefit divided by the square root of its innovation variance.
    pub fn standardized(&self) -> DVector<f64> {
        self.prefit
            .zip_map(&self.innovation_variance, |y, s| y / s.sqrt())
    }

    /// The channel with the largest absolute standardized residual, and that standardized residual.
    pub fn worst_channel(&self) -> Option<(HabitatParameter, f64)> {
        self.standardized()
            .iter()
            .zip(&self.channels)
            .fold(None, |worst: Option<(HabitatParameter, f64)>, (z, param)| {
                match worst {
                    Some((_, max)) if max.abs() >= z.abs() => worst,
                    _ => Some((*param, *z)),
                }
            })
    }

    /// The NIS sample of this residual, as consumed by the fault detector.
    pub fn nis_sample(&self) -> NisSample {
        NisSample {
            epoch: self.epoch,
            nis: self.nis,
            dof: self.dof(),
            worst_channel: self.worst_channel().map(|(param, _)| param),
        }
    }

    fn position(&self, param: HabitatParameter) -> Option<usize> {
        self.channels.iter().position(|p| *p == param)
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Residual at {}: NIS = {:.3} ({} dof)\nPrefit {} Postfit {}",
            self.epoch,
            self.nis,
            self.dof(),
            self.prefit.transpose(),
            self.postfit.transpose()
        )
    }
}

impl fmt::LowerExp for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Prefit {:e} Postfit {:e}", &self.prefit, &self.postfit)
    }
}

/// One NIS value of the filter, with what is needed to diagnose a fault.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NisSample {
    pub epoch: Epoch,
    pub nis: f64,
    /// Degrees of freedom, i.e. the number of measured channels
    pub dof: usize,
    /// The channel with the largest absolute standardized residual
    pub worst_channel: Option<HabitatParameter>,
}

#[cfg(test)]
mod ut_residual {
    use super::*;

    #[test]
    fn worst_channel_uses_standardized_residuals() {
        let residual = Residual {
            epoch: Epoch::from_gregorian_tai_at_midnight(2024, 1, 1),
            // Pressure has the largest raw residual but the voltage is further out in sigmas.
            prefit: DVector::from_vec(vec![0.01, -0.5, 3.0]),
            postfit: DVector::zeros(3),
            nis: 0.0,
            innovation_variance: DVector::from_vec(vec![1e-4, 2.5e-3, 1.0]),
            channels: vec![
                HabitatParameter::StateOfCharge,
                HabitatParameter::BusVoltage,
                HabitatParameter::CabinPressure,
            ],
            real_obs: DVector::zeros(3),
            computed_obs: DVector::zeros(3),
        };
        let (param, z) = residual.worst_channel().unwrap();
        assert_eq!(param, HabitatParameter::BusVoltage);
        assert!((z + 10.0).abs() < 1e-9);
        assert_eq!(residual.prefit(HabitatParameter::CabinPressure), Some(3.0));
        assert_eq!(residual.prefit(HabitatParameter::OxygenMass), None);
        assert_eq!(
            residual.nis_sample().worst_channel,
            Some(HabitatParameter::BusVoltage)
        );
        assert_eq!(residual.nis_sample().dof, 3);
    }
}
