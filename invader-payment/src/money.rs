//! Money and currency types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency codes (ISO 4217). Both acquirers settle in reais only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    BRL,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BRL => "BRL",
        }
    }

    pub fn decimals(&self) -> u32 {
        2
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Money amount with currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest currency unit (centavos)
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Amount in centavos
    pub fn brl(centavos: i64) -> Self {
        Self::new(centavos, Currency::BRL)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.decimals())
    }

    /// Decimal string with the currency's precision, as acquirer APIs
    /// expect it (`"10.50"`)
    pub fn to_amount_string(&self) -> String {
        self.to_decimal().to_string()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_amount_string(), self.currency)
    }
}
