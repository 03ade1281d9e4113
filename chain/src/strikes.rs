//! ATM and strike-grid arithmetic.

/// Round `spot` to the nearest multiple of `step`, half-up.
///
/// `step <= 0` is a programmer error, not a runtime condition; the valid
/// steps are fixed per underlying and validated at startup.
pub fn atm_strike(spot: f64, step: f64) -> f64 {
    debug_assert!(step > 0.0, "strike step must be positive");

    (spot / step).round() * step
}

/// The `2 * half_width + 1` strikes centered on `atm`, spaced by `step`,
/// ascending.
pub fn strike_grid(atm: f64, step: f64, half_width: i32) -> Vec<f64> {
    debug_assert!(step > 0.0, "strike step must be positive");
    debug_assert!(half_width >= 0, "half width must be non-negative");

    (-half_width..=half_width)
        .map(|i| atm + f64::from(i) * step)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atm_is_a_multiple_of_step_and_close_to_spot() {
        for &(spot, step) in &[(25012.35, 50.0), (56891.0, 100.0), (25.0, 50.0), (24987.5, 25.0)] {
            let atm = atm_strike(spot, step);
            assert_eq!(atm % step, 0.0, "atm {atm} not aligned to step {step}");
            assert!((atm - spot).abs() <= step / 2.0 + 1e-9);
        }
    }

    #[test]
    fn atm_rounds_half_up() {
        assert_eq!(atm_strike(25025.0, 50.0), 25050.0);
        assert_eq!(atm_strike(25024.99, 50.0), 25000.0);
        assert_eq!(atm_strike(56950.0, 100.0), 57000.0);
    }

    #[test]
    fn grid_is_symmetric_ascending_and_evenly_spaced() {
        let grid = strike_grid(25000.0, 50.0, 15);

        assert_eq!(grid.len(), 31);
        assert_eq!(grid[0], 25000.0 - 15.0 * 50.0);
        assert_eq!(grid[15], 25000.0);
        assert_eq!(grid[30], 25000.0 + 15.0 * 50.0);

        for pair in grid.windows(2) {
            assert_eq!(pair[1] - pair[0], 50.0);
        }
    }

    #[test]
    fn zero_half_width_is_just_atm() {
        assert_eq!(strike_grid(25000.0, 50.0, 0), vec![25000.0]);
    }
}
