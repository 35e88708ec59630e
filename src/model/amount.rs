//! Amount type for handling monetary values that are always stored as absolute values.
//!
//! Direction (money in or money out) is carried by `TransactionType`, never by sign, so the
//! `Amount` type drops the sign of whatever it is given. When written to a `String` it always has
//! exactly two decimal places, which is what makes fingerprints of independently parsed sources
//! agree with each other.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The number of decimal places used when an amount is written to a `String`.
const SCALE: u32 = 2;

/// Represents a non-negative monetary amount.
///
/// # Examples
///
/// The sign is dropped:
/// ```
/// # use firefly_importer::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-45.5").unwrap();
/// assert_eq!(amount.to_string(), "45.50");
/// ```
///
/// A dollar sign and thousands separators are tolerated:
/// ```
/// # use firefly_importer::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,500").unwrap();
/// let b = Amount::from_str("1500.00").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value, never negative.
    value: Decimal,
}

impl Amount {
    /// Creates a new Amount from the absolute value of `value`.
    pub fn new(value: Decimal) -> Self {
        Self { value: value.abs() }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// The value rounded half away from zero and rescaled to exactly two decimal places.
    fn rounded(&self) -> Decimal {
        let mut rounded = self
            .value
            .round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(SCALE);
        rounded
    }

    /// Like `new`, but refuses values too large to be written with two decimal places.
    fn checked(value: Decimal) -> Result<Self, AmountError> {
        let amount = Amount::new(value);
        if amount.rounded().scale() != SCALE {
            return Err(AmountError(format!(
                "amount {value} is too large to have {SCALE} decimal places"
            )));
        }
        Ok(amount)
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(String::from("empty amount")));
        }

        // Remove dollar sign if present: "-$50.00", "$50.00"
        let without_dollar = match trimmed.strip_prefix('-') {
            Some(after_minus) => match after_minus.strip_prefix('$') {
                Some(after_dollar) => format!("-{after_dollar}"),
                None => trimmed.to_string(),
            },
            None => trimmed.strip_prefix('$').unwrap_or(trimmed).to_string(),
        };

        // Remove commas (thousand separators)
        let without_commas = without_dollar.replace(',', "");

        let value = Decimal::from_str(&without_commas)
            .or_else(|_| Decimal::from_scientific(&without_commas))
            .map_err(|e| AmountError(e.to_string()))?;
        Amount::checked(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.rounded(), f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Accepts either a JSON number or a numeric string. The extraction service replies with numbers,
/// the ledger replies with strings.
struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("amount must be finite, got {v}")));
        }
        // The shortest round-trip representation of the float, e.g. 4.5 -> "4.5", which avoids
        // binary representation noise like 4.5000000000000001.
        Amount::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
