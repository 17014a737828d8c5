use serde::{Deserialize, Serialize};
use serde_json::Number as JsonNumber;

use crate::CanonicalizeError;

/// A finite IEEE-754 double, the only numeric representation in a [`Value`](crate::Value).
#[derive(Clone, Copy, Debug, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Number(f64);

impl Number {
    /// Creates a new [`Number`] after validating finiteness.
    ///
    /// ```
    /// # use treesync_core::Number;
    /// let num = Number::new(42.0)?;
    /// assert_eq!(num.get(), 42.0);
    /// assert!(Number::new(f64::NAN).is_err());
    /// # Ok::<(), treesync_core::CanonicalizeError>(())
    /// ```
    pub fn new(value: f64) -> Result<Self, CanonicalizeError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(CanonicalizeError::NotFinite { value })
        }
    }

    /// Returns the raw floating-point value.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Converts the number into a `serde_json::Number`, preferring an integer
    /// representation when the value is integral.
    pub fn to_json_number(self) -> JsonNumber {
        if self.0.fract() == 0.0 && !(self.0 == 0.0 && self.0.is_sign_negative()) {
            if (i64::MIN as f64) <= self.0 && self.0 <= (i64::MAX as f64) {
                return JsonNumber::from(self.0 as i64);
            }
            if self.0 >= 0.0 && self.0 <= (u64::MAX as f64) {
                return JsonNumber::from(self.0 as u64);
            }
        }
        // Finite by construction, so `from_f64` only fails on NaN/inf.
        JsonNumber::from_f64(self.0).unwrap_or_else(|| JsonNumber::from(0))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}
