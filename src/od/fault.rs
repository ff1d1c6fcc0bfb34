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

use super::residual::NisSample;
use super::{InvalidThresholdSnafu, ODError};
use crate::habitat::HabitatParameter;
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::VecDeque;
use std::fmt;
use typed_builder::TypedBuilder;

/// The NIS threshold above which a sample counts toward a fault.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FaultThreshold {
    /// Quantile of the Chi Square distribution with as many degrees of freedom as measured channels, e.g. 0.99
    Confidence(f64),
    /// A fixed NIS value
    Fixed(f64),
}

impl Default for FaultThreshold {
    fn default() -> Self {
        Self::Confidence(0.99)
    }
}

impl FaultThreshold {
    /// The NIS value of this threshold for the provided degrees of freedom.
    pub fn value(&self, dof: usize) -> Result<f64, ODError> {
        match *self {
            Self::Confidence(confidence) => {
                ensure!(
                    confidence > 0.0 && confidence < 1.0,
                    InvalidThresholdSnafu {
                        reason: format!("confidence must be in (0, 1), got {confidence}")
                    }
                );
                let chi2 = ChiSquared::new(dof as f64).map_err(|e| ODError::InvalidThreshold {
                    reason: format!("no Chi Square distribution with {dof} dof: {e}"),
                })?;
                Ok(chi2.inverse_cdf(confidence))
            }
            Self::Fixed(value) => {
                ensure!(
                    value.is_finite() && value > 0.0,
                    InvalidThresholdSnafu {
                        reason: format!("fixed threshold must be strictly positive, got {value}")
                    }
                );
                Ok(value)
            }
        }
    }
}

/// Configuration of the NIS fault detector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct FaultDetectorConfig {
    #[builder(default)]
    pub threshold: FaultThreshold,
    /// Number of consecutive samples above the threshold needed to raise the flag
    #[builder(default = 3)]
    pub debounce: usize,
    /// Number of consecutive samples at or below the threshold needed to clear a raised flag
    #[builder(default = 5)]
    pub clear_after: usize,
    /// Number of samples kept in the sliding window
    #[builder(default = 50)]
    pub window: usize,
}

impl Default for FaultDetectorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Output of the fault detector.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FaultStatus {
    pub flagged: bool,
    /// Index, in the sequence of processed samples, of the sample which raised the flag
    pub trigger_index: Option<usize>,
    pub trigger_epoch: Option<Epoch>,
    /// Channel with the largest standardized residual at the triggering sample
    pub worst_channel: Option<HabitatParameter>,
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.flagged, self.trigger_epoch) {
            (true, Some(epoch)) => write!(
                f,
                "FAULT since {} (sample #{}), worst channel: {}",
                epoch,
                self.trigger_index.unwrap_or_default(),
                self.worst_channel
                    .map_or_else(|| "unknown".to_string(), |p| p.to_string())
            ),
            _ => write!(f, "nominal"),
        }
    }
}

/// Monitors the NIS of the filter over a sliding window and flags persistent inconsistencies.
///
/// The flag is raised after `debounce` consecutive samples above the threshold, and latched until
/// `clear_after` consecutive samples are back at or below it.
#[derive(Clone, Debug)]
pub struct FaultDetector {
    pub config: FaultDetectorConfig,
    threshold: f64,
    history: VecDeque<NisSample>,
    processed: usize,
    above: usize,
    below: usize,
    status: FaultStatus,
}

impl FaultDetector {
    /// Builds a detector for a measurement model with `dof` channels.
    pub fn new(config: FaultDetectorConfig, dof: usize) -> Result<Self, ODError> {
        let threshold = config.threshold.value(dof)?;
        Ok(Self::with_threshold(config, threshold))
    }

    fn with_threshold(config: FaultDetectorConfig, threshold: f64) -> Self {
        Self {
            config,
            threshold,
            history: VecDeque::with_capacity(config.window.max(1)),
            processed: 0,
            above: 0,
            below: 0,
            status: FaultStatus::default(),
        }
    }

    /// The NIS threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn status(&self) -> FaultStatus {
        self.status
    }

    /// The samples of the sliding window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &NisSample> {
        self.history.iter()
    }

    /// Mean NIS over the sliding window, if any sample was processed.
    pub fn window_mean(&self) -> Option<f64> {
        if self.history.is_empty() {
            None
        } else {
            Some(self.history.iter().map(|s| s.nis).sum::<f64>() / self.history.len() as f64)
        }
    }

    /// Processes a new NIS sample and returns the updated status.
    pub fn observe(&mut self, sample: NisSample) -> FaultStatus {
        if self.history.len() == self.config.window.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(sample);
        let index = self.processed;
        self.processed += 1;

        if sample.nis > self.threshold {
            self.above += 1;
            self.below = 0;
        } else {
            self.below += 1;
            self.above = 0;
        }

        if !self.status.flagged && self.above >= self.config.debounce.max(1) {
            self.status = FaultStatus {
                flagged: true,
                trigger_index: Some(index),
                trigger_epoch: Some(sample.epoch),
                worst_channel: sample.worst_channel,
            };
            warn!(
                "NIS above {:.3} for {} consecutive samples: {}",
                self.threshold, self.above, self.status
            );
        } else if self.status.flagged && self.below >= self.config.clear_after.max(1) {
            info!(
                "fault cleared at {} after {} consistent samples",
                sample.epoch, self.below
            );
            self.status = FaultStatus::default();
        }

        self.status
    }
}

/// Replays a NIS history and returns the resulting fault status.
///
/// The flag is raised after `debounce` consecutive samples above `threshold`, and cleared after as many consecutive samples at or below it.
pub fn detect_fault(history: &[NisSample], threshold: f64, debounce: usize) -> FaultStatus {
    let config = FaultDetectorConfig::builder()
        .threshold(FaultThreshold::Fixed(threshold))
        .debounce(debounce)
        .clear_after(debounce)
        .window(history.len())
        .build();
    let mut detector = FaultDetector::with_threshold(config, threshold);
    history
        .iter()
        .fold(FaultStatus::default(), |_, sample| detector.observe(*sample))
}
