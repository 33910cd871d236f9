//! Outcome sources: turn a stake into a signed settlement amount.

use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::ledger::{BALANCE_SCALE, LedgerError, LedgerResult, validate_amount};

/// Produces the signed outcome of a wager
///
/// Implementations must return a value in `[-stake, 2 * stake)` with at most
/// `BALANCE_SCALE` fractional digits; the resolver rejects anything else.
pub trait OutcomeSource: Send + Sync {
    fn draw(&self, stake: Decimal) -> LedgerResult<Decimal>;
}

/// Uniform draw over `[-stake, 2 * stake)` in steps of one hundredth
pub struct UniformOutcome {
    rng: Mutex<StdRng>,
}

impl UniformOutcome {
    /// Seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence, for reproducible runs
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeSource for UniformOutcome {
    fn draw(&self, stake: Decimal) -> LedgerResult<Decimal> {
        // A panic while holding the lock cannot leave the RNG half-updated
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        draw_outcome(&mut *rng, stake)
    }
}

/// Always returns the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub Decimal);

impl OutcomeSource for FixedOutcome {
    fn draw(&self, _stake: Decimal) -> LedgerResult<Decimal> {
        Ok(self.0)
    }
}

/// Draw a uniformly distributed outcome in `[-stake, 2 * stake)`.
///
/// The draw is taken over integer hundredths so every result is exact at the
/// balance scale: one third of the range loses, two thirds win.
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Stake not positive or too precise
pub fn draw_outcome<R: Rng + ?Sized>(rng: &mut R, stake: Decimal) -> LedgerResult<Decimal> {
    validate_amount(stake)?;
    let units = stake
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or(LedgerError::InvalidAmount(stake))?;
    let upper = units
        .checked_mul(2)
        .ok_or(LedgerError::InvalidAmount(stake))?;

    Ok(Decimal::new(rng.random_range(-units..upper), BALANCE_SCALE))
}

/// Check that an outcome lies in `[-stake, 2 * stake)` at the balance scale
///
/// # Errors
///
/// * `LedgerError::OutcomeOutOfRange` - Outcome outside the range or too precise
pub fn check_outcome(stake: Decimal, outcome: Decimal) -> LedgerResult<()> {
    let in_range = outcome >= -stake
        && stake
            .checked_mul(Decimal::TWO)
            .is_some_and(|upper| outcome < upper);
    if !in_range || outcome.normalize().scale() > BALANCE_SCALE {
        return Err(LedgerError::OutcomeOutOfRange { stake, outcome });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_draws_repeat() {
        let a = UniformOutcome::from_seed(7);
        let b = UniformOutcome::from_seed(7);
        let stake = Decimal::new(6000, 2);
        for _ in 0..32 {
            assert_eq!(a.draw(stake).unwrap(), b.draw(stake).unwrap());
        }
    }

    #[test]
    fn test_draws_cover_both_sides() {
        let source = UniformOutcome::from_seed(42);
        let stake = Decimal::new(100, 0);
        let draws: Vec<Decimal> = (0..600).map(|_| source.draw(stake).unwrap()).collect();

        assert!(draws.iter().all(|d| check_outcome(stake, *d).is_ok()));
        let losses = draws.iter().filter(|d| d.is_sign_negative()).count();
        // Expected about 200 of 600
        assert!((100..300).contains(&losses), "losses = {losses}");
    }

    #[test]
    fn test_smallest_stake() {
        let mut rng = StdRng::seed_from_u64(1);
        let stake = Decimal::new(1, 2);
        for _ in 0..50 {
            let drawn = draw_outcome(&mut rng, stake).unwrap();
            assert!([Decimal::new(-1, 2), Decimal::ZERO, Decimal::new(1, 2)].contains(&drawn));
        }
    }

    #[test]
    fn test_draw_rejects_bad_stake() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            draw_outcome(&mut rng, Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            draw_outcome(&mut rng, Decimal::new(-100, 2)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_check_outcome_bounds() {
        let stake = Decimal::new(6000, 2);
        assert!(check_outcome(stake, -stake).is_ok());
        assert!(check_outcome(stake, Decimal::new(11999, 2)).is_ok());
        assert!(check_outcome(stake, Decimal::new(12000, 2)).is_err());
        assert!(check_outcome(stake, Decimal::new(-6001, 2)).is_err());
        assert!(check_outcome(stake, Decimal::new(1, 3)).is_err());
    }
}
