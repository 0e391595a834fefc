//! Fixed-point decimal arithmetic.
//!
//! Prices, returns and spread estimates are stored as [`Decimal`]: a signed
//! value with seven fractional digits held in a scaled `i64`. Addition,
//! subtraction, multiplication and division are exact on that grid
//! (intermediates widen to `i128`, renormalisation uses banker's rounding);
//! comparisons and hashing are plain integer operations. Transcendentals
//! (`ln`, `exp`, `sqrt`, `powi`) route through `f64` and round back
//! half-even — a 53-bit mantissa covers the seven-digit grid for the price
//! magnitudes this crate handles.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every [`Decimal`].
pub const SCALE: u32 = 7;

/// `10^SCALE`, the raw units per whole unit.
const FACTOR: i64 = 10_000_000;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal {
    raw: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid decimal literal '{0}'")]
pub struct ParseDecimalError(String);

impl Decimal {
    pub const ZERO: Decimal = Decimal { raw: 0 };
    pub const ONE: Decimal = Decimal { raw: FACTOR };
    pub const TWO: Decimal = Decimal { raw: 2 * FACTOR };
    pub const ONE_HUNDRED: Decimal = Decimal { raw: 100 * FACTOR };

    /// Builds a value directly from raw scaled units (`raw / 10^7`).
    pub const fn from_raw(raw: i64) -> Self {
        Decimal { raw }
    }

    pub const fn raw(self) -> i64 {
        self.raw
    }

    pub const fn from_int(value: i64) -> Self {
        Decimal { raw: value * FACTOR }
    }

    /// Nearest grid point to an `f64`, ties to even.
    pub fn from_f64(value: f64) -> Self {
        let scaled = value * FACTOR as f64;
        // f64 round-half-even: `round_ties_even` is stable since 1.77.
        Decimal {
            raw: scaled.round_ties_even() as i64,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.raw as f64 / FACTOR as f64
    }

    pub const fn is_zero(self) -> bool {
        self.raw == 0
    }

    pub const fn abs(self) -> Self {
        Decimal { raw: self.raw.abs() }
    }

    pub fn floor(self) -> Self {
        Decimal {
            raw: self.raw.div_euclid(FACTOR) * FACTOR,
        }
    }

    pub fn ceil(self) -> Self {
        let q = self.raw.div_euclid(FACTOR);
        let r = self.raw.rem_euclid(FACTOR);
        Decimal {
            raw: (q + i64::from(r != 0)) * FACTOR,
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn ln(self) -> Self {
        Decimal::from_f64(self.to_f64().ln())
    }

    pub fn exp(self) -> Self {
        Decimal::from_f64(self.to_f64().exp())
    }

    pub fn sqrt(self) -> Self {
        Decimal::from_f64(self.to_f64().sqrt())
    }

    pub fn powi(self, exponent: i32) -> Self {
        Decimal::from_f64(self.to_f64().powi(exponent))
    }

    pub fn pow(self, exponent: Decimal) -> Self {
        Decimal::from_f64(self.to_f64().powf(exponent.to_f64()))
    }
}

/// Divides with banker's rounding (round half to even), the renormalisation
/// rule for `×` and `÷` so long accumulation chains carry no drift bias.
fn div_round_half_even(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    let twice = remainder * 2;
    if twice > denominator || (twice == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

impl Add for Decimal {
    type Output = Decimal;
    fn add(self, rhs: Decimal) -> Decimal {
        Decimal {
            raw: self.raw + rhs.raw,
        }
    }
}

impl Sub for Decimal {
    type Output = Decimal;
    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal {
            raw: self.raw - rhs.raw,
        }
    }
}

impl Mul for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: Decimal) -> Decimal {
        let wide = i128::from(self.raw) * i128::from(rhs.raw);
        Decimal {
            raw: div_round_half_even(wide, i128::from(FACTOR)) as i64,
        }
    }
}

impl Div for Decimal {
    type Output = Decimal;
    fn div(self, rhs: Decimal) -> Decimal {
        assert!(rhs.raw != 0, "division by zero Decimal");
        let wide = i128::from(self.raw) * i128::from(FACTOR);
        let raw = if rhs.raw > 0 {
            div_round_half_even(wide, i128::from(rhs.raw))
        } else {
            -div_round_half_even(-wide, i128::from(-rhs.raw))
        };
        Decimal { raw: raw as i64 }
    }
}

impl Neg for Decimal {
    type Output = Decimal;
    fn neg(self) -> Decimal {
        Decimal { raw: -self.raw }
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.raw += rhs.raw;
    }
}

impl SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.raw -= rhs.raw;
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::ZERO, Add::add)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if body.is_empty() {
            return Err(err());
        }

        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| err())?
        };

        // Pad or round the fraction onto the 7-digit grid; excess digits
        // round half-even.
        let mut frac: i64 = 0;
        let mut digits = 0u32;
        for c in frac_part.chars().take(SCALE as usize) {
            frac = frac * 10 + i64::from(c as u8 - b'0');
            digits += 1;
        }
        frac *= 10_i64.pow(SCALE - digits);
        if frac_part.len() > SCALE as usize {
            let rest = &frac_part[SCALE as usize..];
            let next = rest.as_bytes()[0] - b'0';
            let tail_nonzero = rest.as_bytes()[1..].iter().any(|&b| b != b'0');
            if next > 5 || (next == 5 && (tail_nonzero || frac % 2 == 1)) {
                frac += 1;
            }
        }

        let raw = whole
            .checked_mul(FACTOR)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(err)?;
        Ok(Decimal {
            raw: if negative { -raw } else { raw },
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.raw < 0 { "-" } else { "" };
        let abs = self.raw.unsigned_abs();
        let whole = abs / FACTOR as u64;
        let mut frac = abs % FACTOR as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let mut width = SCALE as usize;
        while frac % 10 == 0 {
            frac /= 10;
            width -= 1;
        }
        write!(f, "{sign}{whole}.{frac:0width$}")
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
