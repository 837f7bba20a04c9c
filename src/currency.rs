//! Currency codes and currency pairs

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD, // US Dollar
    EUR, // Euro
    MAD, // Moroccan Dirham
    GBP, // British Pound
    CHF, // Swiss Franc
    JPY, // Japanese Yen
    CNY, // Chinese Yuan
}

impl Currency {
    /// Get currency code as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::MAD => "MAD",
            Currency::GBP => "GBP",
            Currency::CHF => "CHF",
            Currency::JPY => "JPY",
            Currency::CNY => "CNY",
        }
    }
}

impl FromStr for Currency {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "MAD" => Ok(Currency::MAD),
            "GBP" => Ok(Currency::GBP),
            "CHF" => Ok(Currency::CHF),
            "JPY" => Ok(Currency::JPY),
            "CNY" => Ok(Currency::CNY),
            _ => Err(DashboardError::ConfigError(format!(
                "Unknown currency: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currency pair quoted as `base/quote`, e.g. USD/MAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Parse from "USD/MAD" or "USDMAD"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (base, quote) = match s.split_once('/') {
            Some((b, q)) => (b, q),
            None if s.len() == 6 && s.is_ascii() => (&s[0..3], &s[3..6]),
            None => {
                return Err(DashboardError::ConfigError(format!(
                    "Invalid currency pair format: {}",
                    s
                )))
            }
        };
        Ok(Self::new(base.parse()?, quote.parse()?))
    }

    /// File-name friendly form, e.g. `USD_MAD`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = DashboardError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
