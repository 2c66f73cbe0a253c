use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ticker::Ticker;

/// Default unit for Indian mutual fund NAVs.
pub const INR: &str = "INR";

/// A single priced observation for a ticker on a date.
///
/// A given (ticker, date) maps to exactly one point once cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePoint {
    pub ticker: Ticker,

    /// Trading day of the observation
    pub date: NaiveDate,

    /// Closing price / NAV
    pub price: Decimal,

    /// Currency or unit of `price`
    pub currency: String,
}

impl QuotePoint {
    pub fn new(ticker: Ticker, date: NaiveDate, price: Decimal, currency: impl Into<String>) -> Self {
        Self {
            ticker,
            date,
            price,
            currency: currency.into(),
        }
    }
}
