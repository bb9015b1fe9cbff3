//! Exchange rate types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency code.
    pub from_currency: String,
    /// Target currency code.
    pub to_currency: String,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
}

impl ExchangeRate {
    /// Creates a new exchange rate, normalizing codes to upper case.
    #[must_use]
    pub fn new(from_currency: &str, to_currency: &str, rate: Decimal) -> Self {
        Self {
            from_currency: from_currency.trim().to_uppercase(),
            to_currency: to_currency.trim().to_uppercase(),
            rate,
        }
    }

    /// Returns the inverse rate, or `None` for a zero rate.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if self.rate.is_zero() {
            return None;
        }
        Some(Self {
            from_currency: self.to_currency.clone(),
            to_currency: self.from_currency.clone(),
            rate: Decimal::ONE / self.rate,
        })
    }

    /// Returns true if this rate converts `from` into `to`.
    #[must_use]
    pub fn converts(&self, from: &str, to: &str) -> bool {
        self.from_currency.eq_ignore_ascii_case(from) && self.to_currency.eq_ignore_ascii_case(to)
    }
}
