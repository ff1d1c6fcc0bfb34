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
use super::jacobian::{transition_jacobian, DEFAULT_RELATIVE_STEP};
use super::measurement::{Measurement, MeasurementModel};
use super::noise::ProcessNoise;
use super::residual::Residual;
use super::{EpochMismatchSnafu, InvalidFilterConfigSnafu, ODError, ODPropSnafu, StepSizeSnafu};
use crate::dynamics::{Dynamics, HabitatDynamics};
use crate::habitat::{ControlInput, DisturbanceProfile, HabitatParams, HabitatState, StateMatrix};
use crate::linalg::DMatrix;
use crate::propagators::{InputHold, Propagator, RK4Fixed};
use crate::time::Duration;
use crate::utils::{condition_number, symmetrize};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;
use typed_builder::TypedBuilder;

/// How the covariance is updated after a measurement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceUpdate {
    /// P = (I - K H) P'
    #[default]
    Standard,
    /// P = (I - K H) P' (I - K H)' + K R K', which preserves positive definiteness with a suboptimal gain
    Joseph,
}

/// Configuration of the extended Kalman filter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct EkfConfig {
    #[builder(default)]
    pub process_noise: ProcessNoise,
    /// Updates are skipped when the condition number of the innovation covariance exceeds this value
    #[builder(default = 1e12)]
    pub max_condition: f64,
    #[builder(default)]
    pub covariance_update: CovarianceUpdate,
    /// Relative perturbation of the finite difference Jacobian
    #[builder(default = DEFAULT_RELATIVE_STEP)]
    pub jacobian_relative_step: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EkfConfig {
    pub fn validate(&self) -> Result<(), ODError> {
        self.process_noise.validate()?;
        ensure!(
            self.max_condition > 1.0,
            InvalidFilterConfigSnafu {
                name: "max_condition",
                value: self.max_condition
            }
        );
        ensure!(
            self.jacobian_relative_step.is_finite() && self.jacobian_relative_step > 0.0,
            InvalidFilterConfigSnafu {
                name: "jacobian_relative_step",
                value: self.jacobian_relative_step
            }
        );
        Ok(())
    }
}

/// Why a measurement update was skipped.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DegradedReason {
    /// The Cholesky factorization of the innovation covariance failed.
    SingularInnovation,
    /// The innovation covariance is too ill-conditioned to be inverted reliably.
    IllConditioned { condition: f64 },
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SingularInnovation => write!(f, "innovation covariance is singular"),
            Self::IllConditioned { condition } => {
                write!(f, "innovation covariance is ill-conditioned ({condition:.3e})")
            }
        }
    }
}

/// The result of a measurement update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
    /// The measurement was processed.
    Accepted {
        estimate: KfEstimate,
        residual: Residual,
    },
    /// The update was skipped and the estimate is the prediction.
    Degraded {
        estimate: KfEstimate,
        reason: DegradedReason,
    },
}

impl UpdateOutcome {
    /// The estimate to carry on with, whether or not the update succeeded.
    pub fn estimate(&self) -> &KfEstimate {
        match self {
            Self::Accepted { estimate, .. } | Self::Degraded { estimate, .. } => estimate,
        }
    }

    pub fn residual(&self) -> Option<&Residual> {
        match self {
            Self::Accepted { residual, .. } => Some(residual),
            Self::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Extended Kalman filter over the full habitat state, jointly estimating the battery health.
///
/// The filter holds no estimate: every call takes the previous estimate and returns a new one.
#[derive(Clone, Debug)]
pub struct Ekf<D: Dynamics> {
    pub prop: Propagator<D>,
    pub model: MeasurementModel,
    pub config: EkfConfig,
}

impl Ekf<HabitatDynamics> {
    /// An RK4 filter of the habitat with the provided parameters.
    pub fn from_params(
        params: HabitatParams,
        hold: InputHold,
        model: MeasurementModel,
        config: EkfConfig,
    ) -> Result<Self, ODError> {
        Self::new(
            Propagator::new::<RK4Fixed>(HabitatDynamics::new(params), hold),
            model,
            config,
        )
    }
}

impl<D: Dynamics> Ekf<D> {
    pub fn new(
        prop: Propagator<D>,
        model: MeasurementModel,
        config: EkfConfig,
    ) -> Result<Self, ODError> {
        model.validate()?;
        config.validate()?;
        Ok(Self {
            prop,
            model,
            config,
        })
    }

    /// Time update: propagates the estimate by `dt` and its covariance with `P' = F P F' + Q`.
    pub fn predict<P: DisturbanceProfile>(
        &self,
        estimate: &KfEstimate,
        control: &ControlInput,
        profile: &P,
        dt: Duration,
    ) -> Result<KfEstimate, ODError> {
        ensure!(dt > Duration::ZERO, StepSizeSnafu { step: dt });
        let control = control.clamped();

        let (state, _) = self
            .prop
            .step(&estimate.state, &control, profile, dt)
            .context(ODPropSnafu)?;

        let stm = transition_jacobian(
            &self.prop,
            &estimate.state_vector(),
            &control,
            profile,
            estimate.epoch(),
            dt.to_seconds(),
            self.config.jacobian_relative_step,
        )
        .context(ODPropSnafu)?;

        let covar_bar = symmetrize(
            &(stm * estimate.covar * stm.transpose() + self.config.process_noise.covariance(dt)),
        );

        Ok(KfEstimate {
            state,
            covar: covar_bar,
            covar_bar,
            predicted: true,
            stm,
        })
    }

    /// Measurement update of a predicted estimate.
    ///
    /// Invalid measurements are rejected with an error and must be skipped by the caller.
    /// If the innovation covariance cannot be inverted reliably, the prediction is returned as a
    /// [`UpdateOutcome::Degraded`] outcome.
    pub fn update(
        &self,
        estimate: &KfEstimate,
        msr: &Measurement,
    ) -> Result<UpdateOutcome, ODError> {
        self.model.validate_measurement(msr)?;
        ensure!(
            msr.epoch == estimate.epoch(),
            EpochMismatchSnafu {
                estimate: estimate.epoch(),
                measurement: msr.epoch
            }
        );

        let h_tilde = self.model.sensitivity();
        let h_tilde_t = h_tilde.transpose();
        let r_k = self.model.noise_covariance();
        let covar_bar = DMatrix::from_column_slice(
            estimate.covar.nrows(),
            estimate.covar.ncols(),
            estimate.covar.as_slice(),
        );

        let state_vec = estimate.state_vector();
        let computed_obs = self.model.observe(&state_vec);
        // Innovation, usually marked as y_i
        let prefit = &msr.values - &computed_obs;

        let innovation_covar = &h_tilde * &covar_bar * &h_tilde_t + &r_k;
        let innovation_covar = (&innovation_covar + innovation_covar.transpose()) * 0.5;

        let condition = condition_number(&innovation_covar);
        if !(condition <= self.config.max_condition) {
            return Ok(self.degraded(
                estimate,
                if condition.is_finite() {
                    DegradedReason::IllConditioned { condition }
                } else {
                    DegradedReason::SingularInnovation
                },
            ));
        }

        let s_inv = match innovation_covar.clone().cholesky() {
            Some(chol) => chol.inverse(),
            None => return Ok(self.degraded(estimate, DegradedReason::SingularInnovation)),
        };

        let nis = prefit.dot(&(&s_inv * &prefit));

        let gain = &covar_bar * &h_tilde_t * &s_inv;
        let state_hat = &gain * &prefit;

        let i_kh = DMatrix::<f64>::identity(state_vec.len(), state_vec.len()) - &gain * &h_tilde;
        let covar = match self.config.covariance_update {
            CovarianceUpdate::Standard => &i_kh * &covar_bar,
            CovarianceUpdate::Joseph => {
                &i_kh * &covar_bar * i_kh.transpose() + &gain * &r_k * gain.transpose()
            }
        };
        let covar = symmetrize(&StateMatrix::from_column_slice(covar.as_slice()));

        let mut updated = state_vec;
        for (value, delta) in updated.iter_mut().zip(state_hat.iter()) {
            *value += delta;
        }
        let (updated, saturation) = self.prop.dynamics.finally(updated);
        if !saturation.is_empty() {
            debug!("measurement update saturated at {}", estimate.epoch());
        }

        let postfit = &msr.values - self.model.observe(&updated);

        let residual = Residual {
            epoch: estimate.epoch(),
            prefit,
            postfit,
            nis,
            innovation_variance: innovation_covar.diagonal(),
            channels: self.model.params(),
            real_obs: msr.values.clone(),
            computed_obs,
        };

        trace!("{residual}");

        Ok(UpdateOutcome::Accepted {
            estimate: KfEstimate {
                state: HabitatState::from_vector(estimate.epoch(), &updated),
                covar,
                covar_bar: estimate.covar_bar,
                predicted: false,
                stm: estimate.stm,
            },
            residual,
        })
    }

    fn degraded(&self, estimate: &KfEstimate, reason: DegradedReason) -> UpdateOutcome {
        warn!(
            "degraded update at {}: {reason}, keeping the prediction",
            estimate.epoch()
        );
        UpdateOutcome::Degraded {
            estimate: *estimate,
            reason,
        }
    }
}

#[cfg(test)]
mod ut_ekf {
    use super::*;
    use crate::habitat::{Disturbance, HabitatParameter};
    use crate::od::measurement::MeasurementChannel;
    use crate::time::{Epoch, TimeUnits};
    use crate::utils::is_psd;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_tai_at_midnight(2024, 1, 1)
    }

    fn ekf() -> Ekf<HabitatDynamics> {
        Ekf::from_params(
            HabitatParams::default(),
            InputHold::ZeroOrderHold,
            MeasurementModel::default(),
            EkfConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn predict_grows_and_update_shrinks_uncertainty() {
        let ekf = ekf();
        let truth = HabitatState::nominal(epoch());
        let estimate = KfEstimate::with_default_prior(truth);
        let ctrl = ControlInput::new(0.5, 0.5, 0.5, 0.5);
        let dist = Disturbance::new(80.0, 4.0, 250.0);

        let predicted = ekf.predict(&estimate, &ctrl, &dist, 1.seconds()).unwrap();
        assert!(predicted.predicted);
        assert_eq!(predicted.epoch(), epoch() + 1.seconds());
        assert!(is_psd(&predicted.covar, 1e-9));
        assert!(predicted.covar[(7, 7)] > estimate.covar[(7, 7)]);

        let msr = ekf.model.measure(&predicted.state);
        let outcome = ekf.update(&predicted, &msr).unwrap();
        let updated = outcome.estimate();
        assert!(!updated.predicted);
        assert!(is_psd(&updated.covar, 1e-9));
        for param in ekf.model.params() {
            assert!(updated.sigma_for(param) < predicted.sigma_for(param));
        }
        // A perfect measurement of the prediction has no innovation.
        let residual = outcome.residual().unwrap();
        assert!(residual.nis.abs() < 1e-12);
        assert_eq!(residual.dof(), 7);
    }

    #[test]
    fn joseph_and_standard_updates_agree_with_the_optimal_gain() {
        let truth = HabitatState::nominal(epoch());
        let estimate = KfEstimate::with_default_prior(truth);
        let mut msr = MeasurementModel::default().measure(&truth);
        msr.values[1] += 0.1;

        let standard = ekf().update(&estimate, &msr).unwrap();
        let joseph = Ekf::from_params(
            HabitatParams::default(),
            InputHold::ZeroOrderHold,
            MeasurementModel::default(),
            EkfConfig::builder()
                .covariance_update(CovarianceUpdate::Joseph)
                .build(),
        )
        .unwrap()
        .update(&estimate, &msr)
        .unwrap();

        let delta = standard.estimate().covar - joseph.estimate().covar;
        assert!(delta.amax() < 1e-9);
        assert!(standard.estimate().state.bus_voltage_v > truth.bus_voltage_v);
    }

    #[test]
    fn ill_conditioned_innovation_degrades_the_update() {
        // A near perfect sensor on a perfectly known parameter next to a noisy pressure sensor.
        let model = MeasurementModel::new(vec![
            MeasurementChannel::new(HabitatParameter::CoreTemperature, 1e-9),
            MeasurementChannel::new(HabitatParameter::CabinPressure, 1.0),
        ])
        .unwrap();
        let ekf = Ekf::from_params(
            HabitatParams::default(),
            InputHold::ZeroOrderHold,
            model,
            EkfConfig::default(),
        )
        .unwrap();

        let mut covar = StateMatrix::identity() * 100.0;
        covar[(2, 2)] = 0.0;
        let estimate = KfEstimate::from_covar(HabitatState::nominal(epoch()), covar);
        let msr = ekf.model.measure(&estimate.state);

        let outcome = ekf.update(&estimate, &msr).unwrap();
        assert!(outcome.is_degraded());
        assert!(matches!(
            outcome,
            UpdateOutcome::Degraded {
                reason: DegradedReason::IllConditioned { .. },
                ..
            }
        ));
        assert_eq!(outcome.estimate(), &estimate);
        assert!(outcome.residual().is_none());
    }

    #[test]
    fn invalid_measurements_are_rejected() {
        let ekf = ekf();
        let estimate = KfEstimate::with_default_prior(HabitatState::nominal(epoch()));
        let mut msr = ekf.model.measure(&estimate.state);
        msr.values[0] = f64::INFINITY;
        assert!(matches!(
            ekf.update(&estimate, &msr),
            Err(ODError::MeasurementRange {
                param: HabitatParameter::StateOfCharge,
                ..
            })
        ));

        let mut late = ekf.model.measure(&estimate.state);
        late.epoch = epoch() + 1.seconds();
        assert!(matches!(
            ekf.update(&estimate, &late),
            Err(ODError::EpochMismatch { .. })
        ));
    }
}
