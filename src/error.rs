// 2.0: the error taxonomy. every ledger-mutating operation returns
// Result<_, LedgerError>; business failures are values, never panics.
// credential failures collapse into InvalidCredential so a caller cannot
// probe which factor of a multi-factor check missed.

use crate::types::{Amount, AssetSymbol, DepositId, TransferId, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("authentication required")]
    Unauthorized,

    #[error("operation requires an elevated role")]
    Forbidden,

    #[error("user {0:?} not found")]
    UserNotFound(UserId),

    #[error("deposit {0:?} not found")]
    DepositNotFound(DepositId),

    #[error("transfer {0:?} not found")]
    TransferNotFound(TransferId),

    #[error("no KYC submission on file")]
    KycNotFound,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("{action} is not allowed from state {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    #[error("asset {0} still has a non-zero position")]
    AssetInUse(AssetSymbol),

    #[error("could not allocate a unique identifier")]
    DuplicateIdentifier,

    #[error("receiver not found")]
    ReceiverNotFound,

    #[error("receiver account is not fully set up")]
    ReceiverNotProvisioned,

    #[error("balance must be zero and holdings empty before deletion")]
    BalanceNotEmpty,

    #[error("validation failed: {0}")]
    Validation(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }
}
