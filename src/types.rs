// 1.0: all the primitives live here. nothing in the engine works without these types.
// ids, monetary amounts, currencies, account numbers, emails, timestamps.
// each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepositId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JournalId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.1: monetary amount in a fiat currency. non-negative, quantized to 2 decimal
// places. balances, deposits, transfer amounts all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub const SCALE: u32 = 2;

    /// Returns None for negative values. Quantizes to 2 decimal places.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value < Decimal::ZERO {
            None
        } else {
            Some(Self(value.round_dp(Self::SCALE)))
        }
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Amount) -> Self {
        Self(self.0 + other.0)
    }

    /// None when the subtraction would go negative. The overdraft guard.
    #[must_use]
    pub fn checked_sub(&self, other: Amount) -> Option<Self> {
        if other.0 > self.0 {
            None
        } else {
            Some(Self(self.0 - other.0))
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, a| acc.add(a))
    }
}

// 1.2: currency code. upper-cased, 3-5 ascii letters ("USD", "EUR", "BRL").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    #[must_use]
    pub fn new(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() < 3 || code.len() > 5 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: asset symbol held in a portfolio ("BTC", "ETH", "AAPL").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    #[must_use]
    pub fn new(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() || symbol.len() > 12 {
            None
        } else {
            Some(Self(symbol))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: account number. all digits, fixed length (10 in the default config).
// assigned once, globally unique, used as a transfer receiver identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    #[must_use]
    pub fn parse(digits: &str) -> Option<Self> {
        if digits.len() >= 8 && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.5: case-normalized email address. uniqueness key for users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (local, domain) = normalized.split_once('@')?;
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return None;
        }
        if normalized.contains(char::is_whitespace) || domain.contains('@') {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.6: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_unix_secs(&self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn add_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    pub fn elapsed_secs(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0).div_euclid(1000)
    }

    pub fn elapsed_hours(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0).div_euclid(3_600_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_rejects_negative() {
        assert!(Amount::new(dec!(-0.01)).is_none());
        assert!(Amount::new(dec!(0)).is_some());
    }

    #[test]
    fn amount_quantizes_to_cents() {
        let a = Amount::new(dec!(10.005)).unwrap();
        assert_eq!(a.value(), dec!(10.00)); // banker's rounding
        let b = Amount::new(dec!(10.019)).unwrap();
        assert_eq!(b.value(), dec!(10.02));
    }

    #[test]
    fn amount_checked_sub_guards_overdraft() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(75)).unwrap();
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a).unwrap().value(), dec!(25));
    }

    #[test]
    fn currency_normalizes() {
        assert_eq!(Currency::new(" usd ").unwrap().code(), "USD");
        assert!(Currency::new("US").is_none());
        assert!(Currency::new("U2D").is_none());
    }

    #[test]
    fn email_normalizes_and_validates() {
        let e = Email::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(e.as_str(), "alice@example.com");
        assert!(Email::parse("not-an-email").is_none());
        assert!(Email::parse("a@b").is_none());
        assert!(Email::parse("@example.com").is_none());
    }

    #[test]
    fn account_number_shape() {
        assert!(AccountNumber::parse("1234567890").is_some());
        assert!(AccountNumber::parse("1234567").is_none()); // too short
        assert!(AccountNumber::parse("12345678ab").is_none());
    }

    #[test]
    fn timestamp_elapsed() {
        let t0 = Timestamp::from_millis(0);
        let t1 = t0.add_millis(25 * 3_600_000);
        assert_eq!(t0.elapsed_hours(&t1), 25);
        assert_eq!(t0.elapsed_secs(&t1), 25 * 3600);
    }
}
