//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// BigCommerce reports cart and order amounts in the channel's transactional
/// currency; amounts are kept as decimals to avoid float drift when summing
/// line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

/// Error parsing a [`CurrencyCode`] from its ISO string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyCodeError(String);

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(CurrencyCodeError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn test_price_equality() {
        let a = Price::new(Decimal::from_f64(49.50).unwrap(), CurrencyCode::USD);
        let b = Price::new(Decimal::new(4950, 2), CurrencyCode::USD);
        assert_eq!(a, b);
    }

    #[test]
    fn test_currency_default() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::USD);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("EUR".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }
}
