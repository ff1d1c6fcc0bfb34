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

use super::estimate::KfEstimate;
use super::residual::NisSample;
use super::{InvalidThresholdSnafu, ODError, ODNoResidualsSnafu};
use crate::habitat::HabitatState;
use snafu::ensure;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::statistics::Statistics;
use std::fmt;

/// Accumulates the accuracy and consistency metrics of a filter run against the truth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStatistics {
    /// Number of measured channels, i.e. the expected mean of the NIS
    pub dof: usize,
    soc_errors: Vec<f64>,
    health_errors: Vec<f64>,
    nis: Vec<f64>,
}

impl RunStatistics {
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            ..Default::default()
        }
    }

    /// Records the estimation error of the state of charge and of the battery health.
    pub fn record_estimate(&mut self, truth: &HabitatState, estimate: &KfEstimate) {
        self.soc_errors.push(estimate.state.soc - truth.soc);
        self.health_errors
            .push(estimate.state.battery_health - truth.battery_health);
    }

    pub fn record_nis(&mut self, sample: &NisSample) {
        self.nis.push(sample.nis);
    }

    /// Number of NIS samples recorded
    pub fn len(&self) -> usize {
        self.nis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nis.is_empty() && self.soc_errors.is_empty()
    }

    /// Root mean square of the state of charge error
    pub fn soc_rmse(&self) -> Result<f64, ODError> {
        rms(&self.soc_errors, "compute the SOC RMSE")
    }

    /// Root mean square of the battery health error
    pub fn health_rmse(&self) -> Result<f64, ODError> {
        rms(&self.health_errors, "compute the health RMSE")
    }

    pub fn average_nis(&self) -> Result<f64, ODError> {
        ensure!(
            !self.nis.is_empty(),
            ODNoResidualsSnafu {
                action: "compute the average NIS"
            }
        );
        Ok(self.nis.iter().mean())
    }

    /// Percentage, between 0 and 100, of the NIS samples strictly above the threshold.
    pub fn percent_above(&self, threshold: f64) -> Result<f64, ODError> {
        ensure!(
            !self.nis.is_empty(),
            ODNoResidualsSnafu {
                action: "count the NIS exceedances"
            }
        );
        let count = self.nis.iter().filter(|nis| **nis > threshold).count();
        Ok(100.0 * count as f64 / self.nis.len() as f64)
    }

    /// Average NIS minus its ideal value, the degrees of freedom.
    pub fn nis_deviation(&self) -> Result<f64, ODError> {
        Ok(self.average_nis()? - self.dof as f64)
    }

    /// Whether the average NIS is within one of the degrees of freedom.
    pub fn is_consistent(&self) -> Result<bool, ODError> {
        Ok(self.nis_deviation()?.abs() < 1.0)
    }

    /// Two sided acceptance region of the average NIS at the provided confidence.
    ///
    /// The sum of N independent NIS samples follows a Chi Square distribution with N times the degrees of freedom.
    pub fn average_nis_bounds(&self, confidence: f64) -> Result<(f64, f64), ODError> {
        ensure!(
            confidence > 0.0 && confidence < 1.0,
            InvalidThresholdSnafu {
                reason: format!("confidence must be in (0, 1), got {confidence}")
            }
        );
        ensure!(
            !self.nis.is_empty() && self.dof > 0,
            ODNoResidualsSnafu {
                action: "compute the NIS bounds"
            }
        );
        let n = self.nis.len() as f64;
        let chi2 = ChiSquared::new(n * self.dof as f64).map_err(|e| ODError::InvalidThreshold {
            reason: e.to_string(),
        })?;
        let tail = (1.0 - confidence) / 2.0;
        Ok((chi2.inverse_cdf(tail) / n, chi2.inverse_cdf(1.0 - tail) / n))
    }
}

fn rms(errors: &[f64], action: &'static str) -> Result<f64, ODError> {
    ensure!(!errors.is_empty(), ODNoResidualsSnafu { action });
    Ok((errors.iter().map(|e| e.powi(2)).sum::<f64>() / errors.len() as f64).sqrt())
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.soc_rmse(), self.health_rmse(), self.average_nis()) {
            (Ok(soc), Ok(health), Ok(nis)) => write!(
                f,
                "SOC RMSE {:.3e}, health RMSE {:.3e}, average NIS {:.3} over {} samples ({} dof)",
                soc,
                health,
                nis,
                self.len(),
                self.dof
            ),
            _ => write!(f, "empty run"),
        }
    }
}
