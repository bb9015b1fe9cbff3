//! Currency conversion seam.
//!
//! Rounding strategy:
//! - Converted amounts are rounded to 2 decimal places
//! - Use banker's rounding (round half to even)
//! - Both the claimed and the converted amount are stored on the expense

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::currency::exchange::ExchangeRate;

/// Decimal places kept for money amounts.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Errors a converter may report. None of them escape the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// No rate is known for the pair.
    #[error("No exchange rate for {from}/{to}")]
    RateUnavailable {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// The converted amount does not fit a decimal.
    #[error("Converting {from} to {to} overflowed")]
    Overflow {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// The converter's backing service failed.
    #[error("Exchange rate lookup failed: {0}")]
    Lookup(String),
}

/// Converts an amount between two currencies.
pub trait CurrencyConverter {
    /// Converts `amount` from `from` into `to`.
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, ConversionError>;
}

impl<F> CurrencyConverter for F
where
    F: Fn(Decimal, &str, &str) -> Result<Decimal, ConversionError>,
{
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, ConversionError> {
        self(amount, from, to)
    }
}

/// Result of resolving an amount in the company currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedAmount {
    /// The amount to store as `amount_in_company_currency`.
    pub amount: Decimal,
    /// True when conversion failed and the claimed amount was used as-is.
    pub degraded: bool,
}

/// Rounds a money amount using banker's rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Resolves `amount` in the company currency.
///
/// Same-currency claims never touch the converter. A failed conversion
/// degrades to the claimed amount and sets `degraded` so callers can log it.
pub fn resolve_company_amount<C>(
    converter: &C,
    amount: Decimal,
    from: &str,
    to: &str,
) -> ConvertedAmount
where
    C: CurrencyConverter + ?Sized,
{
    if from.trim().eq_ignore_ascii_case(to.trim()) {
        return ConvertedAmount {
            amount,
            degraded: false,
        };
    }

    match converter.convert(amount, from, to) {
        Ok(converted) => ConvertedAmount {
            amount: converted,
            degraded: false,
        },
        Err(_) => ConvertedAmount {
            amount,
            degraded: true,
        },
    }
}

/// Converter backed by a fixed table of rates.
///
/// Falls back to the inverse of the opposite pair when the direct pair is
/// missing.
#[derive(Debug, Clone, Default)]
pub struct RateTableConverter {
    rates: Vec<ExchangeRate>,
}

impl RateTableConverter {
    /// Creates a converter from a list of rates.
    #[must_use]
    pub fn new(rates: Vec<ExchangeRate>) -> Self {
        Self { rates }
    }

    /// Returns the number of configured rates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Returns true if no rates are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    fn rate_for(&self, from: &str, to: &str) -> Option<Decimal> {
        if let Some(direct) = self.rates.iter().find(|r| r.converts(from, to)) {
            return Some(direct.rate);
        }
        self.rates
            .iter()
            .find(|r| r.converts(to, from))
            .and_then(ExchangeRate::inverse)
            .map(|r| r.rate)
    }
}

impl CurrencyConverter for RateTableConverter {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, ConversionError> {
        let rate = self
            .rate_for(from, to)
            .ok_or_else(|| ConversionError::RateUnavailable {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
            })?;
        let converted = amount
            .checked_mul(rate)
            .ok_or_else(|| ConversionError::Overflow {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
            })?;
        Ok(round_money(converted))
    }
}
