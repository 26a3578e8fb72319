use std::sync::atomic::{AtomicU64, Ordering};

/// Every n-th write is a credit; the rest are debits.
pub const CREDIT_EVERY: u64 = 4;

/// Deterministic credit/debit schedule shared by all writer tasks.
///
/// Each write claims the next ordinal (1-based) from a shared atomic counter.
/// Ordinals divisible by [`CREDIT_EVERY`] are credits of `credit_amount`, all
/// others are debits of `debit_amount`.
#[derive(Debug)]
pub struct Cadence {
    issued: AtomicU64,
    credit_amount: i64,
    debit_amount: i64,
}

impl Cadence {
    /// Both amounts are magnitudes; the debit is applied negated. `i64::MIN`
    /// saturates to `i64::MAX`.
    pub fn new(credit_amount: i64, debit_amount: i64) -> Self {
        Self {
            issued: AtomicU64::new(0),
            credit_amount: credit_amount.saturating_abs(),
            debit_amount: debit_amount.saturating_abs(),
        }
    }

    /// Claims the next ordinal and returns its delta.
    pub fn next_delta(&self) -> i64 {
        let ordinal = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        self.delta_for(ordinal)
    }

    pub fn delta_for(&self, ordinal: u64) -> i64 {
        if ordinal % CREDIT_EVERY == 0 {
            self.credit_amount
        } else {
            -self.debit_amount
        }
    }

    /// Number of ordinals claimed so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}
