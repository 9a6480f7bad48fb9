//! Stock quantity type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input is below zero.
    #[error("quantity cannot be negative")]
    Negative,
    /// The input does not fit the storage column.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Maximum allowed value.
        max: i32,
    },
    /// The input text is not an integer.
    #[error("quantity must be a whole number")]
    NotANumber,
}

/// A non-negative count of units in a batch.
///
/// ## Constraints
///
/// - Range: `0..=i32::MAX` (the `INTEGER` column backing it)
/// - Text input is trimmed and must be a plain integer (`"12"`, not `"12.0"`)
///
/// ## Examples
///
/// ```
/// use lotkeeper_core::Quantity;
///
/// assert_eq!(Quantity::parse("15").map(Quantity::get), Ok(15));
/// assert!(Quantity::new(-1).is_err());
/// assert!(Quantity::parse("ten").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Validate an integer quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is negative or larger than `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 0 {
            return Err(QuantityError::Negative);
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge { max: i32::MAX })
    }

    /// Parse a quantity from text, as submitted by form-style clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not an integer or is out of range.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber)?;
        Self::new(value)
    }

    /// Returns the number of units.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}
