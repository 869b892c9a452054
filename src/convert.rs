// 3.0 convert.rs: currency conversion. a rate table keyed off one base
// currency (USD); every conversion pivots through the base and re-quantizes
// to cents. pure computation; fetching rates is behind the RateSource trait.

use crate::error::LedgerError;
use crate::types::{Amount, Currency, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    base: Currency,
    // units of the keyed currency per one unit of base
    rates: HashMap<Currency, Decimal>,
    pub fetched_at: Timestamp,
}

impl RateTable {
    pub fn new(base: Currency, fetched_at: Timestamp) -> Self {
        let mut rates = HashMap::new();
        rates.insert(base.clone(), Decimal::ONE);
        Self {
            base,
            rates,
            fetched_at,
        }
    }

    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.insert(currency, rate);
        self
    }

    /// Non-positive rates are ignored; the base rate is pinned at 1.
    pub fn insert(&mut self, currency: Currency, rate: Decimal) {
        if currency == self.base || rate <= Decimal::ZERO {
            return;
        }
        self.rates.insert(currency, rate);
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn rate(&self, currency: &Currency) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    pub fn is_stale(&self, now: Timestamp, max_age_secs: i64) -> bool {
        self.fetched_at.elapsed_secs(&now) >= max_age_secs
    }

    /// Identity when from == to. Pivots through the base otherwise.
    pub fn convert(
        &self,
        amount: Amount,
        from: &Currency,
        to: &Currency,
    ) -> Result<Amount, LedgerError> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self
            .rate(from)
            .ok_or_else(|| LedgerError::validation(format!("no exchange rate for {from}")))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| LedgerError::validation(format!("no exchange rate for {to}")))?;

        let in_base = amount.value() / from_rate;
        let converted = in_base * to_rate;
        Amount::new(converted)
            .ok_or_else(|| LedgerError::validation("conversion produced a negative amount"))
    }

    /// Replaces all non-base rates with a freshly fetched set.
    pub fn replace(&mut self, rates: HashMap<Currency, Decimal>, fetched_at: Timestamp) {
        self.rates.clear();
        self.rates.insert(self.base.clone(), Decimal::ONE);
        for (currency, rate) in rates {
            self.insert(currency, rate);
        }
        self.fetched_at = fetched_at;
    }
}

// Rate providers implement this. The engine refreshes on an interval and
// never blocks a ledger mutation on a fetch.
pub trait RateSource {
    fn fetch(&self, base: &Currency) -> Result<HashMap<Currency, Decimal>, LedgerError>;
}

// Fixed in-memory source for tests and the simulator.
#[derive(Debug, Clone, Default)]
pub struct FixedRateSource {
    rates: HashMap<Currency, Decimal>,
}

impl FixedRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }
}

impl RateSource for FixedRateSource {
    fn fetch(&self, _base: &Currency) -> Result<HashMap<Currency, Decimal>, LedgerError> {
        Ok(self.rates.clone())
    }
}
