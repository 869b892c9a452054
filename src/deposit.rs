// 10.0 deposit.rs: the deposit state machine. a deposit is a request to add
// funds; it only touches the balance when it reaches Completed. state
// transitions are validated here, crediting and journaling happen in the
// engine so the two always move together.

use crate::error::LedgerError;
use crate::types::{Amount, Currency, DepositId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl DepositStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::Completed
                | DepositStatus::Failed
                | DepositStatus::Cancelled
                | DepositStatus::Expired
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "PENDING",
            DepositStatus::Processing => "PROCESSING",
            DepositStatus::Completed => "COMPLETED",
            DepositStatus::Failed => "FAILED",
            DepositStatus::Cancelled => "CANCELLED",
            DepositStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositMethod {
    Crypto,
    BankTransfer,
    Card,
    AdminManual,
}

/// Identifiers handed back by an external payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReference {
    pub external_id: String,
    pub pay_address: Option<String>,
    pub pay_amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub user_id: UserId,
    pub amount: Amount,
    pub currency: Currency,
    pub method: DepositMethod,
    pub status: DepositStatus,
    pub provider: Option<ProviderReference>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Deposit {
    pub fn new(
        id: DepositId,
        user_id: UserId,
        amount: Amount,
        currency: Currency,
        method: DepositMethod,
        now: Timestamp,
    ) -> Result<Self, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("deposit amount must be positive"));
        }
        Ok(Self {
            id,
            user_id,
            amount,
            currency,
            method,
            status: DepositStatus::Pending,
            provider: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition(&mut self, to: DepositStatus, action: &'static str, now: Timestamp) {
        debug_assert!(!self.status.is_terminal(), "{action} from terminal state");
        let _ = action;
        self.status = to;
        self.updated_at = now;
    }

    // 10.1: attaching a provider reference moves Pending into Processing.
    // a second attach with the same external id is a no-op; a different id
    // is rejected.
    pub fn attach_provider(
        &mut self,
        provider: ProviderReference,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        match (&self.status, &self.provider) {
            (_, Some(existing)) if existing.external_id == provider.external_id => Ok(()),
            (_, Some(_)) => Err(LedgerError::validation(
                "deposit already bound to a different provider reference",
            )),
            (DepositStatus::Pending, None) => {
                self.provider = Some(provider);
                self.transition(DepositStatus::Processing, "attach provider", now);
                Ok(())
            }
            _ => Err(LedgerError::InvalidTransition {
                from: self.status.name(),
                action: "attach provider",
            }),
        }
    }

    /// Confirmation is idempotent: confirming a Completed deposit reports
    /// that nothing changed so the caller does not credit twice.
    pub fn confirm(&mut self, now: Timestamp) -> Result<bool, LedgerError> {
        match self.status {
            DepositStatus::Completed => Ok(false),
            DepositStatus::Pending | DepositStatus::Processing => {
                self.transition(DepositStatus::Completed, "confirm", now);
                Ok(true)
            }
            _ => Err(LedgerError::InvalidTransition {
                from: self.status.name(),
                action: "confirm",
            }),
        }
    }

    /// Only the owner may cancel, and only while still Pending.
    pub fn cancel(&mut self, by: UserId, now: Timestamp) -> Result<(), LedgerError> {
        if by != self.user_id {
            return Err(LedgerError::Forbidden);
        }
        if self.status != DepositStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                from: self.status.name(),
                action: "cancel",
            });
        }
        self.transition(DepositStatus::Cancelled, "cancel", now);
        Ok(())
    }

    pub fn fail(&mut self, now: Timestamp) -> Result<(), LedgerError> {
        match self.status {
            DepositStatus::Pending | DepositStatus::Processing => {
                self.transition(DepositStatus::Failed, "fail", now);
                Ok(())
            }
            _ => Err(LedgerError::InvalidTransition {
                from: self.status.name(),
                action: "fail",
            }),
        }
    }

    /// Whether the expiry sweep should move this deposit to Expired. Only
    /// Pending deposits age out; a Processing deposit has a provider payment
    /// behind it and stays confirmable however late the webhook arrives.
    pub fn is_expired(&self, now: Timestamp, expiry_hours: i64) -> bool {
        self.status == DepositStatus::Pending
            && self.created_at.elapsed_hours(&now) >= expiry_hours
    }

    pub(crate) fn expire(&mut self, now: Timestamp) {
        self.transition(DepositStatus::Expired, "expire", now);
    }
}
