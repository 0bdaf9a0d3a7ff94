use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Currency amount in integer cents. Serialized as a bare integer so
/// amounts survive canonical-JSON handling, which forbids floats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Line total for `quantity` units at this unit price, rounded half-up
    /// at the cent.
    pub fn times_quantity(self, quantity: f64) -> Money {
        Money(round_half_up(self.0 as f64 * quantity))
    }

    /// Amount scaled by `rate` (e.g. a tax rate), rounded half-up at the
    /// cent.
    pub fn apply_rate(self, rate: f64) -> Money {
        Money(round_half_up(self.0 as f64 * rate))
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Half-up rounding at the cent: 274.9725 cents -> 275 cents.
fn round_half_up(cents: f64) -> i64 {
    if cents < 0.0 {
        -(((-cents) + 0.5).floor() as i64)
    } else {
        (cents + 0.5).floor() as i64
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    /// `$1,234.56`, negatives as `-$1,234.56`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let dollars = abs / 100;
        let cents = abs % 100;
        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, grouped, cents)
    }
}

impl Money {
    /// Plain decimal form without currency sign, for CSV cells: `1234.56`.
    pub fn to_decimal_string(self) -> String {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times_quantity_rounds_half_up() {
        // 2.5 x $99.99 = $249.975 -> $249.98
        assert_eq!(Money::from_cents(9999).times_quantity(2.5).cents(), 24998);
        assert_eq!(Money::from_cents(10000).times_quantity(2.0).cents(), 20000);
    }

    #[test]
    fn test_apply_rate_half_up_at_cent() {
        // $33.33 * 0.0825 = $2.749725 -> $2.75
        assert_eq!(Money::from_cents(3333).apply_rate(0.0825).cents(), 275);
        assert_eq!(Money::from_cents(10000).apply_rate(0.0825).cents(), 825);
        // exact half rounds up
        assert_eq!(Money::from_cents(2).apply_rate(0.25).cents(), 1);
    }

    #[test]
    fn test_display_grouping() {
        assert_eq!(Money::from_cents(123_456).to_string(), "$1,234.56");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(100_000_000).to_string(), "$1,000,000.00");
        assert_eq!(Money::from_cents(-4250).to_string(), "-$42.50");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_cents(123_456).to_decimal_string(), "1234.56");
        assert_eq!(Money::from_cents(-5).to_decimal_string(), "-0.05");
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
    }
}
