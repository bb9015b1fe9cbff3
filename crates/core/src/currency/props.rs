//! Property-based tests for currency resolution.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::conversion::{
    ConversionError, RateTableConverter, resolve_company_amount, round_money,
};
use super::exchange::ExchangeRate;

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A failing converter always yields the claimed amount.
    #[test]
    fn prop_failure_degrades_to_claimed_amount(amount in positive_amount()) {
        let failing = |_: Decimal, _: &str, _: &str| -> Result<Decimal, ConversionError> {
            Err(ConversionError::Lookup("down".into()))
        };
        let resolved = resolve_company_amount(&failing, amount, "USD", "EUR");
        prop_assert_eq!(resolved.amount, amount);
        prop_assert!(resolved.degraded);
    }

    /// Table conversion is rounded to cents.
    #[test]
    fn prop_table_conversion_rounded_to_cents(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let converter = RateTableConverter::new(vec![ExchangeRate::new("USD", "EUR", rate)]);
        let resolved = resolve_company_amount(&converter, amount, "USD", "EUR");
        prop_assert!(!resolved.degraded);
        prop_assert_eq!(resolved.amount, round_money(resolved.amount));
        prop_assert_eq!(resolved.amount, round_money(amount * rate));
    }
}
