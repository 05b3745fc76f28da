//! Shared increment/decrement primitive
//!
//! Domain accounts and vendor payables both keep a running decimal balance
//! that moves by signed deltas tagged with the reference that caused them.
//! They share this one implementation so overflow handling and tracing stay
//! identical.

use rust_decimal::Decimal;
use tracing::trace;

use core_kernel::checked_sum;

use crate::error::LedgerError;

/// Result of applying a delta to a balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceMovement {
    pub before: Decimal,
    pub delta: Decimal,
    pub after: Decimal,
}

/// A running balance that moves only by signed deltas
pub(crate) trait BalanceCell {
    fn balance_slot(&mut self) -> &mut Decimal;

    /// Called after every successful movement
    fn touch(&mut self) {}

    /// Identifies the holder in trace output
    fn owner(&self) -> String;

    fn apply(&mut self, delta: Decimal, reference: &str) -> Result<BalanceMovement, LedgerError> {
        let owner = self.owner();
        let slot = self.balance_slot();
        let before = *slot;
        let after = checked_sum(before, delta)
            .map_err(|_| LedgerError::Overflow(format!("balance of {}", owner)))?;
        *slot = after;
        self.touch();
        trace!(owner = %owner, reference, %before, %delta, %after, "balance moved");
        Ok(BalanceMovement { before, delta, after })
    }

    fn increment(&mut self, amount: Decimal, reference: &str) -> Result<BalanceMovement, LedgerError> {
        self.apply(amount, reference)
    }

    fn decrement(&mut self, amount: Decimal, reference: &str) -> Result<BalanceMovement, LedgerError> {
        self.apply(-amount, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Cell(Decimal);

    impl BalanceCell for Cell {
        fn balance_slot(&mut self) -> &mut Decimal {
            &mut self.0
        }

        fn owner(&self) -> String {
            "cell".to_string()
        }
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut cell = Cell(dec!(10));
        let up = cell.increment(dec!(5), "a").unwrap();
        assert_eq!((up.before, up.after), (dec!(10), dec!(15)));
        let down = cell.decrement(dec!(20), "b").unwrap();
        assert_eq!(down.delta, dec!(-20));
        assert_eq!(cell.0, dec!(-5));
    }

    #[test]
    fn test_overflow_leaves_balance_untouched() {
        let mut cell = Cell(Decimal::MAX);
        assert!(matches!(cell.increment(dec!(1), "c"), Err(LedgerError::Overflow(_))));
        assert_eq!(cell.0, Decimal::MAX);
    }
}
