// 4.0 idgen.rs: identifier generation. raw generators only; uniqueness of
// account numbers is enforced by the store's reservation index with a bounded
// retry budget (see store.rs).

use crate::types::{AccountNumber, DepositId, Timestamp, TransferId};
use rand::Rng;

/// Random digit string of the configured length (10 by default).
pub fn account_number(len: usize) -> AccountNumber {
    let mut rng = rand::thread_rng();
    let digits: String = (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
    // len is validated by config; 8+ digits always parses
    AccountNumber::parse(&digits).expect("generated digits form an account number")
}

/// Transaction reference: TRF + millis + 6 random upper alphanumerics.
pub fn transaction_reference(now: Timestamp) -> TransferId {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    TransferId(format!("TRF{}{}", now.as_millis(), suffix))
}

pub fn deposit_id() -> DepositId {
    DepositId(uuid::Uuid::new_v4().to_string())
}

/// Six-digit one-time code for email 2FA. Leading zeros allowed.
pub fn email_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}
