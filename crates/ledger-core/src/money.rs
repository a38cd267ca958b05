//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  ERP terminals speak decimal strings: "1,200.00/Pcs", "-300.00"         │
//! │  Parsing them into f64 and multiplying by 0.8 gives 959.9999999...     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    "1,200.00" → 120000                                                  │
//! │    120000 × 8000 bps → 96000 → "960.00"                                 │
//! │                                                                         │
//! │  Decimal text only exists at the protocol edge.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ledger_core::money::Money;
//!
//! let rate = Money::from_cents(10000);          // 100.00
//! let amount = rate.multiply_quantity(3);       // 300.00
//! assert_eq!(amount.to_string(), "300.00");
//!
//! let parsed = Money::parse_decimal("1200.5").unwrap();
//! assert_eq!(parsed.cents(), 120050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (paise, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: sales amounts go out negative by ERP convention
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serializes as the raw integer** so REST payloads never carry floats
///
/// ## Where Money Flows
/// ```text
/// ProductPrice ──► OrderLine.rate (snapshot) ──► OrderLine.amount
///                                                     │
///                                                     ▼
///                                   <AMOUNT>-300.00</AMOUNT> in the voucher
///
/// <OPENINGRATE>1,200.00/Pcs</OPENINGRATE> ──► StockItem.price ──► tier prices
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a plain decimal string such as `"1200"`, `"1200.5"` or
    /// `"-300.00"`.
    ///
    /// Digits beyond the second decimal place are rounded half away from
    /// zero. Thousands separators and unit suffixes are NOT accepted here;
    /// strip them first (see [`crate::codec`]).
    ///
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("300.00"), Some(Money::from_cents(30000)));
    /// assert_eq!(Money::parse_decimal("0.125"), Some(Money::from_cents(13)));
    /// assert_eq!(Money::parse_decimal("12a"), None);
    /// assert_eq!(Money::parse_decimal(""), None);
    /// ```
    pub fn parse_decimal(input: &str) -> Option<Money> {
        let s = input.trim();
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let major: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut digits = frac.chars().map(|c| c as i64 - '0' as i64);
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().map(|d| d >= 5).unwrap_or(false);

        let mut cents = major.checked_mul(100)? + tenths * 10 + hundredths;
        if round_up {
            cents += 1;
        }

        Some(Money(if negative { -cents } else { cents }))
    }

    /// Converts a float to the nearest minor unit. Only used at the protocol
    /// edge where the ERP terminal hands us a computed quotient.
    pub fn from_f64_rounded(value: f64) -> Option<Money> {
        if !value.is_finite() {
            return None;
        }
        Some(Money((value * 100.0).round() as i64))
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Minor unit portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax on this amount.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, the `+5000` rounds
    /// half up.
    ///
    /// ```rust
    /// use ledger_core::money::Money;
    /// use ledger_core::types::TaxRate;
    ///
    /// let amount = Money::from_cents(30000);        // 300.00
    /// let tax = amount.calculate_tax(TaxRate::from_bps(1800)); // 18%
    /// assert_eq!(tax.cents(), 5400);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies by a line quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Scales by a basis-point factor (10000 = ×1.0), rounding half up.
    ///
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// let base = Money::from_cents(120000);
    /// assert_eq!(base.scale_bps(8000).cents(), 96000);   // ×0.8
    /// assert_eq!(base.scale_bps(12000).cents(), 144000); // ×1.2
    /// ```
    pub fn scale_bps(&self, factor_bps: u32) -> Money {
        let scaled = (self.0 as i128 * factor_bps as i128 + 5000) / 10000;
        Money::from_cents(scaled as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal with two places, the form ERP envelopes expect.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
