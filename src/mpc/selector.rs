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

use super::{ControlConstraints, ControlGrid, ControlWeights, HorizonCost};
use crate::dynamics::Dynamics;
use crate::habitat::{ControlInput, DisturbanceProfile, HabitatState};
use crate::od::estimate::KfEstimate;
use crate::propagators::Propagator;
use crate::time::Duration;
use std::fmt;

/// Relative tolerance under which two costs are considered equal.
const COST_TIE_TOLERANCE: f64 = 1e-12;

/// What the controller simulates: the propagator, the expected disturbances and the control period.
#[derive(Clone, Debug)]
pub struct PredictionModel<'a, D: Dynamics, P: DisturbanceProfile> {
    pub prop: &'a Propagator<D>,
    pub profile: &'a P,
    pub dt: Duration,
}

impl<'a, D: Dynamics, P: DisturbanceProfile> PredictionModel<'a, D, P> {
    pub fn new(prop: &'a Propagator<D>, profile: &'a P, dt: Duration) -> Self {
        Self { prop, profile, dt }
    }

    /// Simulates `horizon` steps with a constant command, returning None if a step fails or a constraint is violated.
    fn simulate(
        &self,
        initial: &HabitatState,
        control: &ControlInput,
        horizon: usize,
        constraints: &ControlConstraints,
    ) -> Option<Vec<HabitatState>> {
        let mut trajectory = Vec::with_capacity(horizon);
        let mut state = *initial;
        for _ in 0..horizon {
            state = match self.prop.step(&state, control, self.profile, self.dt) {
                Ok((next, _)) => next,
                Err(e) => {
                    debug!("candidate {control} dropped: {e}");
                    return None;
                }
            };
            if !constraints.is_satisfied(&state) {
                return None;
            }
            trajectory.push(state);
        }
        Some(trajectory)
    }
}

/// Why the controller fell back to the safe mode command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// Every candidate violated a constraint or failed to propagate
    NoFeasibleCandidate { evaluated: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoFeasibleCandidate { evaluated } => {
                write!(f, "none of the {evaluated} candidates is feasible")
            }
        }
    }
}

/// Output of the controller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlDecision {
    pub control: ControlInput,
    pub feasible: bool,
    /// Cost of the selected candidate, infinite on fallback
    pub cost: f64,
    pub fallback: Option<FallbackReason>,
}

impl fmt::Display for ControlDecision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.fallback {
            Some(reason) => write!(f, "safe mode ({reason}): {}", self.control),
            None => write!(f, "{} (cost {:.6e})", self.control, self.cost),
        }
    }
}

/// Selects the command of the grid which minimizes the cost over the horizon, starting from the estimated state.
///
/// Candidates are evaluated in grid order. Costs within a relative 1e-12 of each other are tied, and ties go
/// to the lowest effort, then to the first candidate in grid order. When no candidate is feasible, the safe
/// mode command is returned with the reason. A horizon of zero is simulated as a single step.
pub fn select_control<D: Dynamics, P: DisturbanceProfile>(
    estimate: &KfEstimate,
    grid: &ControlGrid,
    horizon: usize,
    weights: &ControlWeights,
    constraints: &ControlConstraints,
    model: &PredictionModel<'_, D, P>,
) -> ControlDecision {
    let horizon = horizon.max(1);
    let step_s = model.dt.to_seconds();
    let initial = estimate.state;

    let mut best: Option<(ControlInput, f64, f64)> = None;
    let mut evaluated = 0;
    for candidate in grid.candidates() {
        evaluated += 1;
        let Some(trajectory) = model.simulate(&initial, &candidate, horizon, constraints) else {
            continue;
        };
        let terms = HorizonCost::evaluate(&initial, &trajectory, &candidate, step_s, weights);
        let cost = terms.total(weights);
        if !cost.is_finite() {
            continue;
        }
        let effort = terms.effort;
        best = match best {
            None => Some((candidate, cost, effort)),
            Some((_, best_cost, best_effort)) => {
                let tolerance = COST_TIE_TOLERANCE * best_cost.abs().max(1.0);
                if cost < best_cost - tolerance
                    || ((cost - best_cost).abs() <= tolerance && effort < best_effort)
                {
                    Some((candidate, cost, effort))
                } else {
                    best
                }
            }
        };
    }

    match best {
        Some((control, cost, _)) => {
            trace!("selected {control} with cost {cost:.6e} among {evaluated} candidates");
            ControlDecision {
                control,
                feasible: true,
                cost,
                fallback: None,
            }
        }
        None => {
            let reason = FallbackReason::NoFeasibleCandidate { evaluated };
            warn!("controller falling back to safe mode at {}: {reason}", initial.epoch);
            ControlDecision {
                control: ControlInput::safe_mode(),
                feasible: false,
                cost: f64::INFINITY,
                fallback: Some(reason),
            }
        }
    }
}
