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

use crate::linalg::{SMatrix, SVector};
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;

mod control;
pub use control::*;
mod disturbance;
pub use disturbance::*;
mod params;
pub use params::*;
mod state;
pub use state::*;

/// Dimension of the habitat state vector.
pub const STATE_DIM: usize = 8;

/// The habitat state as a column vector, ordered as per [`HabitatParameter::index`].
pub type StateVector = SVector<f64, STATE_DIM>;

/// A square matrix over the habitat state, e.g. a covariance or a state transition matrix.
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;

/// Each quantity of the habitat state, in the order in which it is stored in a [`StateVector`].
///
/// | index | parameter | unit |
/// |---|---|---|
/// | 0 | state of charge | - |
/// | 1 | bus voltage | V |
/// | 2 | core temperature | K |
/// | 3 | radiator temperature | K |
/// | 4 | oxygen mass | kg |
/// | 5 | carbon dioxide mass | kg |
/// | 6 | cabin pressure | Pa |
/// | 7 | battery health | - |
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
pub enum HabitatParameter {
    StateOfCharge,
    BusVoltage,
    CoreTemperature,
    RadiatorTemperature,
    OxygenMass,
    CarbonDioxideMass,
    CabinPressure,
    BatteryHealth,
}

impl HabitatParameter {
    /// Position of this parameter in the state vector.
    pub const fn index(self) -> usize {
        match self {
            Self::StateOfCharge => 0,
            Self::BusVoltage => 1,
            Self::CoreTemperature => 2,
            Self::RadiatorTemperature => 3,
            Self::OxygenMass => 4,
            Self::CarbonDioxideMass => 5,
            Self::CabinPressure => 6,
            Self::BatteryHealth => 7,
        }
    }

    /// Returns the parameter stored at the provided index of the state vector, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        enum_iterator::all::<Self>().find(|param| param.index() == index)
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::StateOfCharge | Self::BatteryHealth => "",
            Self::BusVoltage => "V",
            Self::CoreTemperature | Self::RadiatorTemperature => "K",
            Self::OxygenMass | Self::CarbonDioxideMass => "kg",
            Self::CabinPressure => "Pa",
        }
    }
}

impl fmt::Display for HabitatParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::StateOfCharge => "SOC",
            Self::BusVoltage => "V_bus",
            Self::CoreTemperature => "T_core",
            Self::RadiatorTemperature => "T_radiator",
            Self::OxygenMass => "O2_mass",
            Self::CarbonDioxideMass => "CO2_mass",
            Self::CabinPressure => "P_cabin",
            Self::BatteryHealth => "H_battery",
        };
        write!(f, "{name}")
    }
}

/// Errors raised when building habitat data from raw values.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HabitatError {
    #[snafu(display("expected {expected} values but got {got}"))]
    InvalidDimension { expected: usize, got: usize },
    #[snafu(display("{param} is not finite ({value})"))]
    NonFiniteValue { param: HabitatParameter, value: f64 },
    #[snafu(display("invalid parameter {name} = {value}: {reason}"))]
    InvalidPhysicalParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}
