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

use super::{
    HealthError, HealthHistory, InvalidHealthSnafu, InvalidRulConfigSnafu, NonIncreasingEpochSnafu,
};
use crate::time::{Duration, Epoch, TimeUnits};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use typed_builder::TypedBuilder;

/// Configuration of the remaining useful life estimator.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct RulConfig {
    /// Smoothing factor of the health level
    #[builder(default = 0.2)]
    pub alpha: f64,
    /// Smoothing factor of the health trend
    #[builder(default = 0.05)]
    pub beta: f64,
    /// Health at which the battery is considered failed
    #[builder(default = 0.75)]
    pub failure_threshold: f64,
}

impl Default for RulConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RulConfig {
    pub fn validate(&self) -> Result<(), HealthError> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            ensure!(
                value > 0.0 && value <= 1.0,
                InvalidRulConfigSnafu { name, value }
            );
        }
        ensure!(
            self.failure_threshold.is_finite(),
            InvalidRulConfigSnafu {
                name: "failure threshold",
                value: self.failure_threshold
            }
        );
        Ok(())
    }
}

/// Estimates the remaining useful life of the battery from its health with Holt's double exponential smoothing.
///
/// The trend is initialized from the first two samples and is expressed per second, so that samples
/// need not be evenly spaced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RulEstimator {
    pub config: RulConfig,
    level: f64,
    /// Trend of the health, per second
    trend: Option<f64>,
    last_epoch: Option<Epoch>,
}

impl RulEstimator {
    pub fn new(config: RulConfig) -> Self {
        Self {
            config,
            level: f64::NAN,
            trend: None,
            last_epoch: None,
        }
    }

    /// The smoothed health, if any sample was ingested.
    pub fn level(&self) -> Option<f64> {
        self.last_epoch.map(|_| self.level)
    }

    /// The smoothed health trend per second, once two samples were ingested.
    pub fn trend(&self) -> Option<f64> {
        self.trend
    }

    /// Ingests a new health sample and returns the updated remaining useful life.
    pub fn ingest(&mut self, epoch: Epoch, health: f64) -> Result<Option<Duration>, HealthError> {
        ensure!(health.is_finite(), InvalidHealthSnafu { value: health });
        match self.last_epoch {
            None => {
                self.level = health;
            }
            Some(previous) => {
                ensure!(
                    epoch > previous,
                    NonIncreasingEpochSnafu {
                        previous,
                        got: epoch
                    }
                );
                let dt_s = (epoch - previous).to_seconds();
                self.trend = Some(match self.trend {
                    None => {
                        let trend = (health - self.level) / dt_s;
                        self.level = health;
                        trend
                    }
                    Some(trend) => {
                        let predicted = self.level + trend * dt_s;
                        let level =
                            self.config.alpha * health + (1.0 - self.config.alpha) * predicted;
                        let trend = self.config.beta * (level - self.level) / dt_s
                            + (1.0 - self.config.beta) * trend;
                        self.level = level;
                        trend
                    }
                });
            }
        }
        self.last_epoch = Some(epoch);
        Ok(self.rul())
    }

    /// Time until the smoothed health reaches the failure threshold, if the health is decreasing.
    pub fn rul(&self) -> Option<Duration> {
        let trend = self.trend?;
        if trend >= 0.0 {
            None
        } else if self.level <= self.config.failure_threshold {
            Some(Duration::ZERO)
        } else {
            let rul_s = (self.level - self.config.failure_threshold) / -trend;
            if rul_s >= Duration::MAX.to_seconds() {
                Some(Duration::MAX)
            } else {
                Some(rul_s.seconds())
            }
        }
    }
}

/// Remaining useful life of the battery at the end of the history, or None if fewer than two samples or no degradation.
pub fn estimate_rul(history: &HealthHistory, failure_threshold: f64) -> Option<Duration> {
    let mut estimator = RulEstimator::new(
        RulConfig::builder()
            .failure_threshold(failure_threshold)
            .build(),
    );
    // The history guarantees increasing epochs and finite values.
    history
        .iter()
        .filter_map(|(epoch, health)| estimator.ingest(*epoch, *health).ok())
        .last()
        .flatten()
}
