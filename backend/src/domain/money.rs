//! Monetary amounts in integer minor units.
//!
//! Amounts never touch floating point. Rates are expressed in basis points
//! (1/100 of a percent) and applied with 128-bit intermediates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_SCALE: u32 = 10_000;

/// Errors produced by monetary arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Currency code is not three ASCII uppercase letters.
    #[error("currency must be a three-letter ISO 4217 code, got {0:?}")]
    InvalidCurrency(String),
    /// Operands carry different currencies.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Left-hand currency.
        left: CurrencyCode,
        /// Right-hand currency.
        right: CurrencyCode,
    },
    /// A negative amount was supplied where only non-negative is allowed.
    #[error("amount must not be negative")]
    Negative,
    /// Arithmetic exceeded the representable range.
    #[error("amount overflowed")]
    Overflow,
}

/// ISO 4217 currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [a, b, c] if [a, b, c].iter().all(|byte| byte.is_ascii_uppercase()) => {
                Ok(Self([*a, *b, *c]))
            }
            _ => Err(MoneyError::InvalidCurrency(s.to_owned())),
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An amount of a single currency in minor units (cents, pence, ...).
///
/// # Examples
/// ```
/// use storefront::domain::Money;
///
/// let price = Money::parse(1999, "EUR").expect("valid");
/// let total = price.times(3).expect("no overflow");
/// assert_eq!(total.amount_minor(), 5997);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    amount_minor: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Build an amount.
    pub const fn new(amount_minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Parse the currency and build an amount.
    pub fn parse(amount_minor: i64, currency: &str) -> Result<Self, MoneyError> {
        Ok(Self::new(amount_minor, currency.parse()?))
    }

    /// Zero in the given currency.
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Build an amount, rejecting negatives.
    pub fn non_negative(amount_minor: i64, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount_minor < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self::new(amount_minor, currency))
    }

    /// Amount in minor units.
    pub const fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Currency of the amount.
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Whether the amount is strictly positive.
    pub const fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    fn same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }

    /// Checked addition.
    pub fn plus(&self, other: &Self) -> Result<Self, MoneyError> {
        self.same_currency(other)?;
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction.
    pub fn minus(&self, other: &Self) -> Result<Self, MoneyError> {
        self.same_currency(other)?;
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Checked multiplication by a quantity.
    pub fn times(&self, quantity: u32) -> Result<Self, MoneyError> {
        self.amount_minor
            .checked_mul(i64::from(quantity))
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Apply a basis-point rate, rounding half away from zero.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::Money;
    ///
    /// let amount = Money::parse(1_005, "USD").expect("valid");
    /// // 15% of 10.05 = 1.5075, rounded to 1.51
    /// assert_eq!(amount.basis_points(1_500).expect("fits").amount_minor(), 151);
    /// ```
    pub fn basis_points(&self, bps: u32) -> Result<Self, MoneyError> {
        let scaled = i128::from(self.amount_minor)
            .checked_mul(i128::from(bps))
            .ok_or(MoneyError::Overflow)?;
        let rounded = div_round_half_up(scaled, i128::from(BASIS_POINTS_SCALE))
            .ok_or(MoneyError::Overflow)?;
        i64::try_from(rounded)
            .map(|amount| Self::new(amount, self.currency))
            .map_err(|_| MoneyError::Overflow)
    }

    /// The smaller of two amounts of the same currency.
    pub fn min(&self, other: &Self) -> Result<Self, MoneyError> {
        self.same_currency(other)?;
        Ok(if self.amount_minor <= other.amount_minor {
            *self
        } else {
            *other
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor, self.currency)
    }
}

/// Integer division rounding half away from zero. `None` on a zero divisor.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> Option<i128> {
    if denominator == 0 {
        return None;
    }
    let quotient = numerator.checked_div(denominator)?;
    let remainder = numerator.checked_rem(denominator)?;
    let twice = remainder.checked_abs()?.checked_mul(2)?;
    if twice >= denominator.checked_abs()? {
        let step = if (numerator < 0) == (denominator < 0) {
            1
        } else {
            -1
        };
        quotient.checked_add(step)
    } else {
        Some(quotient)
    }
}
