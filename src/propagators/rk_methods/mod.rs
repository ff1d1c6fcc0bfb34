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

/// The `RK` trait defines a fixed step explicit Runge Kutta integrator.
#[allow(clippy::upper_case_acronyms)]
pub trait RK
where
    Self: Sized,
{
    /// Returns the order of this integrator (as u8 because there probably isn't an order greater than 255).
    const ORDER: u8;

    /// Returns the stages of this integrator (as usize because it's used as indexing)
    const STAGES: usize;

    /// Returns a pointer to a list of f64 corresponding to the A coefficients of the Butcher table for that RK.
    /// The coefficients are stored row by row, below the diagonal, so `A_COEFFS.len()` must be
    /// `STAGES * (STAGES - 1) / 2`.
    /// *Warning:* this RK trait supposes that the implementation is consistent, i.e. c_i = \sum_j a_{ij}.
    const A_COEFFS: &'static [f64];
    /// Returns a pointer to a list of f64 corresponding to the b_i coefficients of the
    /// Butcher table for that RK. `B_COEFFS.len()` must be `STAGES`.
    const B_COEFFS: &'static [f64];
}

/// `RK4Fixed` is the classical fixed step fourth order Runge Kutta, with a local truncation error in O(dt^5).
pub struct RK4Fixed {}

impl RK for RK4Fixed {
    const ORDER: u8 = 4;
    const STAGES: usize = 4;
    const A_COEFFS: &'static [f64] = &[0.5, 0.0, 0.5, 0.0, 0.0, 1.0];
    const B_COEFFS: &'static [f64] = &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0];
}

/// `RK2Fixed` is the explicit midpoint method.
pub struct RK2Fixed {}

impl RK for RK2Fixed {
    const ORDER: u8 = 2;
    const STAGES: usize = 2;
    const A_COEFFS: &'static [f64] = &[0.5];
    const B_COEFFS: &'static [f64] = &[0.0, 1.0];
}

#[cfg(test)]
mod ut_butcher {
    use super::*;

    fn check_table<M: RK>() {
        assert_eq!(M::A_COEFFS.len(), M::STAGES * (M::STAGES - 1) / 2);
        assert_eq!(M::B_COEFFS.len(), M::STAGES);
        let b_sum: f64 = M::B_COEFFS.iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-15);
    }

    #[test]
    fn tables_are_consistent() {
        check_table::<RK4Fixed>();
        check_table::<RK2Fixed>();
    }
}
