//! Conversion of claimed amounts into the organization's currency.
//!
//! Exchange-rate retrieval lives outside the engine. The engine only sees a
//! [`CurrencyConverter`] and never fails because of it: when conversion is
//! impossible the claimed amount is used unchanged.

pub mod conversion;
pub mod exchange;

#[cfg(test)]
mod props;

pub use conversion::{
    ConversionError, ConvertedAmount, CurrencyConverter, RateTableConverter, resolve_company_amount,
    round_money,
};
pub use exchange::ExchangeRate;
