//! Fixed-point money in integer minor units
//!
//! All amounts in the system are carried as integer minor units (cents for
//! EUR/USD). Floating point never appears in any balance computation; the
//! only place decimals exist is the display formatting.
//!
//! The two allocation helpers implement the largest-remainder rule used by
//! every split strategy: floor division plus one extra minor unit to the
//! first `remainder` shares, lowest index first. This is what guarantees
//! `sum(shares) == total` exactly and `max - min <= 1`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// An amount in minor units (e.g. cents)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from minor units
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Raw minor units
    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Money) -> Money {
        Money(self.0.max(other.0))
    }

    /// Multiply by an item quantity
    pub fn times(self, quantity: i32) -> Money {
        Money(self.0 * quantity as i64)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Divide `total` into `n` shares that sum exactly to `total`.
///
/// Each share is `floor(total / n)`; the remainder is handed out one minor
/// unit at a time starting from share 0 (deterministic tie-break: lowest
/// index first). Shares differ by at most one minor unit.
///
/// Negative totals allocate symmetrically (the first shares carry the extra
/// negative unit), which keeps discount components exact under the same
/// rule.
pub fn allocate_evenly(total: Money, n: usize) -> Vec<Money> {
    assert!(n > 0, "cannot allocate across zero shares");
    let n_i64 = n as i64;
    let base = total.0.div_euclid(n_i64);
    let remainder = total.0.rem_euclid(n_i64);
    (0..n_i64)
        .map(|i| {
            if i < remainder {
                Money(base + 1)
            } else {
                Money(base)
            }
        })
        .collect()
}

/// Floor-proportional share of `component`: `component * part / whole`.
///
/// Used by the custom-amount strategy to carve tax/tip in the ratio of the
/// carved amount to the outstanding balance. The flooring means the parent
/// always retains the rounding residue, so no minor unit is ever created.
pub fn allocate_proportional(component: Money, part: Money, whole: Money) -> Money {
    if whole.0 == 0 {
        return Money::ZERO;
    }
    let scaled = component.0 as i128 * part.0 as i128;
    Money(scaled.div_euclid(whole.0 as i128) as i64)
}
