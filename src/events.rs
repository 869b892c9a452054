// 13.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists
// all event types. the collector keeps a bounded buffer so a long-running
// engine cannot grow without limit.

use crate::deposit::DepositMethod;
use crate::kyc::KycStatus;
use crate::types::{
    Amount, AssetSymbol, Currency, DepositId, Timestamp, TransferId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Account events
    UserRegistered(UserRegisteredEvent),
    AccountDeleted(AccountDeletedEvent),
    AccountRestored(AccountRestoredEvent),
    AccountPurged(AccountPurgedEvent),

    // Credential events
    PinChanged(PinChangedEvent),
    TwoFactorChanged(TwoFactorChangedEvent),

    // Deposit events
    DepositRequested(DepositRequestedEvent),
    DepositConfirmed(DepositConfirmedEvent),
    DepositCancelled(DepositCancelledEvent),
    DepositFailed(DepositFailedEvent),
    DepositExpired(DepositExpiredEvent),

    // Balance events
    BalanceCredited(BalanceCreditedEvent),
    BalanceDebited(BalanceDebitedEvent),

    // Transfer events
    TransferExecuted(TransferExecutedEvent),

    // Trade events
    TradeExecuted(TradeExecutedEvent),

    // KYC events
    KycSubmitted(KycSubmittedEvent),
    KycReviewed(KycReviewedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredEvent {
    pub user_id: UserId,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDeletedEvent {
    pub user_id: UserId,
    pub by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRestoredEvent {
    pub user_id: UserId,
    pub by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPurgedEvent {
    pub user_id: UserId,
    pub by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinChangedEvent {
    pub user_id: UserId,
    pub first_time: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorChangedEvent {
    pub user_id: UserId,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequestedEvent {
    pub user_id: UserId,
    pub deposit_id: DepositId,
    pub amount: Amount,
    pub currency: Currency,
    pub method: DepositMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositConfirmedEvent {
    pub user_id: UserId,
    pub deposit_id: DepositId,
    pub amount: Amount,
    pub new_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCancelledEvent {
    pub user_id: UserId,
    pub deposit_id: DepositId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositFailedEvent {
    pub user_id: UserId,
    pub deposit_id: DepositId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositExpiredEvent {
    pub user_id: UserId,
    pub deposit_id: DepositId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceCreditedEvent {
    pub user_id: UserId,
    pub amount: Amount,
    pub new_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceDebitedEvent {
    pub user_id: UserId,
    pub amount: Amount,
    pub new_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferExecutedEvent {
    pub transfer_id: TransferId,
    pub sender: UserId,
    pub receiver: UserId,
    pub amount_sent: Amount,
    pub amount_received: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecutedEvent {
    pub user_id: UserId,
    pub symbol: AssetSymbol,
    pub quantity: Decimal,
    pub price: Decimal,
    pub is_buy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycSubmittedEvent {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycReviewedEvent {
    pub user_id: UserId,
    pub reviewer: UserId,
    pub status: KycStatus,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventCollector {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventCollector {
    // oldest events drop first once the buffer is full
    fn emit(&mut self, event: Event) {
        if self.events.len() >= self.max_events {
            self.events.remove(0);
        }
        self.events.push(event);
    }
}
