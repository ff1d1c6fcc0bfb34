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

use crate::time::Epoch;
use snafu::prelude::*;

mod history;
pub use history::HealthHistory;

mod rul;
pub use rul::{estimate_rul, RulConfig, RulEstimator};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HealthError {
    #[snafu(display("health sample at {got} is not after the previous one at {previous}"))]
    NonIncreasingEpoch { previous: Epoch, got: Epoch },
    #[snafu(display("battery health must be finite, got {value}"))]
    InvalidHealth { value: f64 },
    #[snafu(display("invalid RUL configuration: {name} = {value}"))]
    InvalidRulConfig { name: &'static str, value: f64 },
}
