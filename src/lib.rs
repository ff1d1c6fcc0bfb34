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

/*! # habitat-twin

A closed-loop digital twin of a habitat's coupled electrical, thermal and life-support systems.

The crate provides the nonlinear dynamics of an 8 dimensional state, a fixed step Runge Kutta
propagator, a joint state and battery health Extended Kalman Filter, an NIS based fault detector,
a grid-search model predictive controller and a remaining useful life estimator.

Every operation is a pure, synchronous transformation of values: the caller owns the time loop.
*/

/// The habitat state, control inputs, disturbances and physical parameters.
pub mod habitat;

/// Provides the equations of motion of the habitat, split per subsystem.
pub mod dynamics;

/// Provides the fixed step Runge Kutta propagators and the saturation monitor.
pub mod propagators;

/// All of the estimation tools: Kalman filter, measurement model, fault detection and run statistics.
pub mod od;

/// Grid-search model predictive control.
pub mod mpc;

/// Battery health history and remaining useful life.
pub mod health;

/// Configuration loading.
pub mod io;

/// Utility functions shared by different modules.
pub mod utils;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::habitat::{ControlInput, Disturbance, HabitatParameter, HabitatParams, HabitatState};
