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

use crate::time::{Duration, Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use typed_builder::TypedBuilder;

/// Exogenous inputs to the habitat. These are never estimated.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disturbance {
    /// Sunlight power available to the arrays, in W
    pub sunlight_w: f64,
    /// Crew metabolic load, in crew-equivalents
    pub crew_metabolic_load: f64,
    pub external_temp_k: f64,
}

impl Disturbance {
    pub fn new(sunlight_w: f64, crew_metabolic_load: f64, external_temp_k: f64) -> Self {
        Self {
            sunlight_w,
            crew_metabolic_load,
            external_temp_k,
        }
    }

    /// Returns true if this disturbance lies within the domain of the dynamics.
    pub fn is_valid(&self) -> bool {
        self.sunlight_w.is_finite()
            && self.sunlight_w >= 0.0
            && self.crew_metabolic_load.is_finite()
            && self.crew_metabolic_load >= 0.0
            && self.external_temp_k.is_finite()
            && self.external_temp_k > 0.0
    }
}

impl fmt::Display for Disturbance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "sunlight {:.2} W, crew load {:.2}, T_ext {:.2} K",
            self.sunlight_w, self.crew_metabolic_load, self.external_temp_k
        )
    }
}

/// Anything which can provide the disturbance at a given epoch.
///
/// The propagators only sample a profile at the stage times allowed by their
/// [`InputHold`](crate::propagators::InputHold) policy.
pub trait DisturbanceProfile {
    fn at(&self, epoch: Epoch) -> Disturbance;
}

/// A constant disturbance is its own profile.
impl DisturbanceProfile for Disturbance {
    fn at(&self, _epoch: Epoch) -> Disturbance {
        *self
    }
}

/// Periodic orbital sunlight with constant crew load and external temperature.
///
/// The sunlight follows `max(0, mean + amplitude * sin(2π (t - start) / period))`.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder)]
#[builder(doc)]
pub struct OrbitalDisturbance {
    pub start: Epoch,
    #[builder(default = 80.0)]
    pub mean_sunlight_w: f64,
    #[builder(default = 80.0)]
    pub sunlight_amplitude_w: f64,
    #[builder(default_code = "180.0 * Unit::Second")]
    pub period: Duration,
    #[builder(default = 4.0)]
    pub crew_metabolic_load: f64,
    #[builder(default = 250.0)]
    pub external_temp_k: f64,
}

impl OrbitalDisturbance {
    pub fn sunlight_w(&self, epoch: Epoch) -> f64 {
        let elapsed_s = (epoch - self.start).to_seconds();
        let phase = TAU * elapsed_s / self.period.to_seconds();
        (self.mean_sunlight_w + self.sunlight_amplitude_w * phase.sin()).max(0.0)
    }
}

impl DisturbanceProfile for OrbitalDisturbance {
    fn at(&self, epoch: Epoch) -> Disturbance {
        Disturbance {
            sunlight_w: self.sunlight_w(epoch),
            crew_metabolic_load: self.crew_metabolic_load,
            external_temp_k: self.external_temp_k,
        }
    }
}

#[cfg(test)]
mod ut_disturbance {
    use super::*;
    use crate::time::TimeUnits;
    use approx::assert_abs_diff_eq;

    #[test]
    fn orbital_sunlight_is_periodic_and_non_negative() {
        let start = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1);
        let orbit = OrbitalDisturbance::builder()
            .start(start)
            .sunlight_amplitude_w(120.0)
            .build();

        assert_abs_diff_eq!(orbit.sunlight_w(start), 80.0, epsilon = 1e-9);
        assert_abs_diff_eq!(orbit.sunlight_w(start + 45.seconds()), 200.0, epsilon = 1e-9);
        // The amplitude exceeds the mean so the eclipse is clipped to zero.
        assert_eq!(orbit.sunlight_w(start + 135.seconds()), 0.0);
        assert_abs_diff_eq!(
            orbit.sunlight_w(start + 10.seconds()),
            orbit.sunlight_w(start + 190.seconds()),
            epsilon = 1e-9
        );

        let dist = orbit.at(start);
        assert!(dist.is_valid());
        assert_eq!(dist.crew_metabolic_load, 4.0);
        assert!(!Disturbance::new(-1.0, 1.0, 250.0).is_valid());
        assert!(!Disturbance::new(1.0, 1.0, 0.0).is_valid());
    }
}
