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

use super::{duration_from_str, duration_to_str, ConfigError, ConfigRepr};
use crate::dynamics::HabitatDynamics;
use crate::habitat::{HabitatParams, HabitatState, StateVector, STATE_DIM};
use crate::health::{RulConfig, RulEstimator};
use crate::mpc::MpcConfig;
use crate::od::estimate::{KfEstimate, DEFAULT_PRIOR_DIAG};
use crate::od::fault::{FaultDetector, FaultDetectorConfig};
use crate::od::filter::{Ekf, EkfConfig};
use crate::od::measurement::MeasurementModel;
use crate::propagators::{InputHold, Propagator, RK4Fixed, SaturationConfig, SaturationMonitor};
use crate::time::{Duration, Unit};
use serde_derive::{Deserialize, Serialize};
use std::fmt::Display;
use typed_builder::TypedBuilder;

/// Every setting of the twin in one record.
///
/// Missing YAML keys take their default value, so a configuration file only lists what it overrides:
/// ```yaml
/// step: 2 s
/// hold: Sampled
/// params:
///   internal_resistance_ohm: 0.08
/// mpc:
///   horizon: 20
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct TwinConfig {
    /// Control and estimation period
    #[serde(
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    #[builder(default = Unit::Second * 1)]
    pub step: Duration,
    /// How the control and the disturbance are held during one step
    #[builder(default)]
    pub hold: InputHold,
    #[builder(default)]
    pub params: HabitatParams,
    /// Diagonal of the initial covariance of the filter
    #[builder(default = DEFAULT_PRIOR_DIAG)]
    pub prior_diag: [f64; STATE_DIM],
    #[builder(default)]
    pub measurement: MeasurementModel,
    #[builder(default)]
    pub ekf: EkfConfig,
    #[builder(default)]
    pub fault: FaultDetectorConfig,
    #[builder(default)]
    pub mpc: MpcConfig,
    #[builder(default)]
    pub rul: RulConfig,
    #[builder(default)]
    pub saturation: SaturationConfig,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for TwinConfig {}

fn invalid<E: Display>(section: &'static str, e: E) -> ConfigError {
    ConfigError::InvalidConfig(format!("{section}: {e}"))
}

impl TwinConfig {
    /// Checks every section of this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step <= Duration::ZERO {
            return Err(ConfigError::InvalidConfig(format!(
                "step must be strictly positive, got {}",
                self.step
            )));
        }
        if let Some(variance) = self
            .prior_diag
            .iter()
            .find(|v| !v.is_finite() || **v < 0.0)
        {
            return Err(ConfigError::InvalidConfig(format!(
                "prior variances must be non negative, got {variance}"
            )));
        }
        self.params.validate().map_err(|e| invalid("params", e))?;
        self.measurement.validate().map_err(|e| invalid("measurement", e))?;
        self.ekf.validate().map_err(|e| invalid("ekf", e))?;
        self.mpc.validate().map_err(|e| invalid("mpc", e))?;
        self.rul.validate().map_err(|e| invalid("rul", e))?;
        self.fault
            .threshold
            .value(self.measurement.dim())
            .map_err(|e| invalid("fault", e))?;
        Ok(())
    }

    /// The propagator of the habitat, used by the truth and the controller.
    pub fn propagator(&self) -> Propagator<HabitatDynamics> {
        Propagator::new::<RK4Fixed>(HabitatDynamics::new(self.params), self.hold)
    }

    pub fn ekf(&self) -> Result<Ekf<HabitatDynamics>, ConfigError> {
        Ekf::from_params(self.params, self.hold, self.measurement.clone(), self.ekf)
            .map_err(|e| invalid("ekf", e))
    }

    pub fn fault_detector(&self) -> Result<FaultDetector, ConfigError> {
        FaultDetector::new(self.fault, self.measurement.dim()).map_err(|e| invalid("fault", e))
    }

    pub fn rul_estimator(&self) -> RulEstimator {
        RulEstimator::new(self.rul)
    }

    pub fn saturation_monitor(&self) -> SaturationMonitor {
        SaturationMonitor::new(self.saturation)
    }

    /// The initial estimate centered on the provided state with the configured prior covariance.
    pub fn prior(&self, state: HabitatState) -> KfEstimate {
        KfEstimate::from_diag(state, StateVector::from(self.prior_diag))
    }
}

#[cfg(test)]
mod ut_config {
    use super::*;
    use crate::od::fault::FaultThreshold;
    use crate::time::TimeUnits;

    #[test]
    fn defaults_are_valid() {
        let cfg = TwinConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.step, 1.seconds());
        assert_eq!(cfg.hold, InputHold::ZeroOrderHold);
        assert_eq!(cfg.mpc.horizon, 10);
        assert_eq!(cfg.fault.threshold, FaultThreshold::Confidence(0.99));
        assert!((cfg.fault_detector().unwrap().threshold() - 18.475).abs() < 1e-3);
        assert!(cfg.ekf().is_ok());
    }

    #[test]
    fn partial_yaml_overrides_defaults() {
        let cfg = TwinConfig::loads(
            r#"
step: 2 s
hold: Sampled
params:
  internal_resistance_ohm: 0.08
mpc:
  resolution: [3, 2, 2, 2]
  horizon: 20
fault:
  debounce: 4
rul:
  failure_threshold: 0.8
"#,
        )
        .unwrap();
        assert_eq!(cfg.step, 2.seconds());
        assert_eq!(cfg.hold, InputHold::Sampled);
        assert_eq!(cfg.params.internal_resistance_ohm, 0.08);
        assert_eq!(
            cfg.params.battery_capacity_j,
            HabitatParams::default().battery_capacity_j
        );
        assert_eq!(cfg.mpc.resolution, [3, 2, 2, 2]);
        assert_eq!(cfg.mpc.horizon, 20);
        assert_eq!(cfg.fault.debounce, 4);
        assert_eq!(cfg.fault.clear_after, 5);
        assert_eq!(cfg.rul.failure_threshold, 0.8);
        assert_eq!(cfg.measurement, MeasurementModel::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let cfg = TwinConfig::builder()
            .step(5.seconds())
            .params(HabitatParams::default().with_internal_resistance(0.2))
            .build();
        let path = std::env::temp_dir().join(format!("habitat_twin_{}.yaml", std::process::id()));
        std::fs::write(&path, cfg.dumps().unwrap()).unwrap();
        let loaded = TwinConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), cfg);

        assert!(matches!(
            TwinConfig::load(&path),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn invalid_sections_are_reported() {
        let mut cfg = TwinConfig::default();
        cfg.mpc.horizon = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidConfig(msg)) if msg.starts_with("mpc")
        ));

        let mut cfg = TwinConfig::default();
        cfg.measurement.channels.clear();
        assert!(cfg.validate().is_err());

        let cfg = TwinConfig::builder().step(Duration::ZERO).build();
        assert!(cfg.validate().is_err());

        assert!(TwinConfig::loads("step: [1, 2]").is_err());
    }
}
