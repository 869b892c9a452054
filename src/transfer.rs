// 12.0 transfer.rs: P2P transfer records and receiver resolution. a receiver
// is named either by email or by account number; the digits-only heuristic
// decides which. the executed transfer is a flat record; the paired journal
// entries are the source of truth for balances.

use crate::error::LedgerError;
use crate::types::{AccountNumber, Amount, Currency, Email, Timestamp, TransferId, UserId};
use serde::{Deserialize, Serialize};

/// How the sender named the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverRef {
    Email(Email),
    AccountNumber(AccountNumber),
}

impl ReceiverRef {
    // 12.1: 8+ digits means account number; anything else must parse as an
    // email. matches how the lookup treats free-form receiver input.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.len() >= 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let number = AccountNumber::parse(trimmed)
                .ok_or_else(|| LedgerError::validation("malformed account number"))?;
            return Ok(ReceiverRef::AccountNumber(number));
        }
        let email = Email::parse(trimmed)
            .ok_or_else(|| LedgerError::validation("receiver must be an email or account number"))?;
        Ok(ReceiverRef::Email(email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub sender: UserId,
    pub receiver: UserId,
    /// What left the sender, in the sender's currency.
    pub amount_sent: Amount,
    pub sender_currency: Currency,
    /// What arrived, in the receiver's currency.
    pub amount_received: Amount,
    pub receiver_currency: Currency,
    pub note: Option<String>,
    pub executed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_resolve_to_account_number() {
        match ReceiverRef::parse(" 1234567890 ").unwrap() {
            ReceiverRef::AccountNumber(n) => assert_eq!(n.as_str(), "1234567890"),
            other => panic!("expected account number, got {other:?}"),
        }
    }

    #[test]
    fn short_digit_strings_are_not_account_numbers() {
        // 7 digits: neither a valid account number nor an email
        assert!(ReceiverRef::parse("1234567").is_err());
    }

    #[test]
    fn emails_resolve_to_email() {
        match ReceiverRef::parse("Bob@Example.com").unwrap() {
            ReceiverRef::Email(e) => assert_eq!(e.as_str(), "bob@example.com"),
            other => panic!("expected email, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ReceiverRef::parse("").is_err());
        assert!(ReceiverRef::parse("not an email").is_err());
        assert!(ReceiverRef::parse("12345abc").is_err());
    }
}
