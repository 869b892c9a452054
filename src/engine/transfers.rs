// 17.11 engine/transfers.rs: withdrawals and P2P transfers. both sit behind
// the full gate: active account, verification, transfer PIN, and whatever
// second factor is enrolled. the two-sided balance move runs as one unit of
// work, so no interleaving can observe money in flight.

use super::core::LedgerEngine;
use crate::auth;
use crate::error::LedgerError;
use crate::events::{BalanceDebitedEvent, EventPayload, TransferExecutedEvent};
use crate::idgen;
use crate::journal::JournalKind;
use crate::transfer::{ReceiverRef, Transfer};
use crate::types::{Amount, TransferId, UserId};
use crate::user::User;

impl LedgerEngine {
    // the common gate for money leaving an account
    fn gate_outbound(
        &self,
        actor: UserId,
        pin: &str,
        two_factor_code: Option<&str>,
    ) -> Result<User, LedgerError> {
        let user = self.require_active(actor)?;
        if !self.is_verified(actor)? {
            return Err(LedgerError::Forbidden);
        }
        auth::verify_pin(&user, pin)?;
        let now = self.time();
        self.store
            .with_user_mut(actor, |user| auth::verify_two_factor(user, two_factor_code, &self.config, now))?;
        Ok(user)
    }

    // 17.12: withdrawal. immediate debit in the account currency, journaled
    // as Withdrawal. external payout rails are out of scope; the ledger only
    // guarantees the money is gone exactly once.
    pub fn withdraw(
        &self,
        actor: UserId,
        amount: Amount,
        pin: &str,
        two_factor_code: Option<&str>,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("withdrawal amount must be positive"));
        }
        let user = self.gate_outbound(actor, pin, two_factor_code)?;
        let now = self.time();
        let currency = user.preferred_currency.clone();

        let new_balance = self.store.with_portfolio(actor, |portfolio, journal| {
            portfolio.debit(amount)?;
            journal.append(
                actor,
                JournalKind::Withdrawal,
                amount,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(portfolio.balance)
        })?;

        log::info!("user {actor} withdrew {amount} {currency}");
        self.emit(EventPayload::BalanceDebited(BalanceDebitedEvent {
            user_id: actor,
            amount,
            new_balance,
        }));
        Ok(())
    }

    // 17.13: receiver resolution. email or account number, never the sender,
    // never a deleted account. an email match without an account number is
    // reported as not provisioned, distinct from not found.
    fn resolve_receiver(&self, sender: UserId, raw: &str) -> Result<User, LedgerError> {
        let receiver = match ReceiverRef::parse(raw)? {
            ReceiverRef::Email(email) => {
                let user = self
                    .store
                    .find_by_email(&email)
                    .filter(|u| u.is_active())
                    .ok_or(LedgerError::ReceiverNotFound)?;
                if user.account_number.is_none() {
                    return Err(LedgerError::ReceiverNotProvisioned);
                }
                user
            }
            ReceiverRef::AccountNumber(number) => self
                .store
                .find_by_account_number(&number)
                .filter(|u| u.is_active())
                .ok_or(LedgerError::ReceiverNotFound)?,
        };
        if receiver.id == sender {
            return Err(LedgerError::ReceiverNotFound);
        }
        Ok(receiver)
    }

    // 17.14: P2P transfer. what leaves the sender is in the sender's
    // currency; what arrives is converted into the receiver's. both journal
    // entries and the transfer record are written under the pair locks.
    pub fn transfer(
        &self,
        actor: UserId,
        receiver: &str,
        amount: Amount,
        pin: &str,
        two_factor_code: Option<&str>,
        note: Option<String>,
    ) -> Result<TransferId, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("transfer amount must be positive"));
        }
        let sender = self.gate_outbound(actor, pin, two_factor_code)?;
        let receiver = self.resolve_receiver(actor, receiver)?;

        let sender_currency = sender.preferred_currency.clone();
        let receiver_currency = receiver.preferred_currency.clone();
        let received = self
            .rates
            .read()
            .convert(amount, &sender_currency, &receiver_currency)?;

        let now = self.time();
        let id = idgen::transaction_reference(now);
        self.store.with_portfolio_pair(actor, receiver.id, |from, to, journal| {
            from.debit(amount)?;
            to.credit(received);
            journal.append(
                actor,
                JournalKind::TransferOut {
                    transfer_id: id.clone(),
                    peer: receiver.id,
                },
                amount,
                sender_currency.clone(),
                from.balance,
                now,
            );
            journal.append(
                receiver.id,
                JournalKind::TransferIn {
                    transfer_id: id.clone(),
                    peer: actor,
                },
                received,
                receiver_currency.clone(),
                to.balance,
                now,
            );
            Ok(())
        })?;

        self.transfers.lock().push(Transfer {
            id: id.clone(),
            sender: actor,
            receiver: receiver.id,
            amount_sent: amount,
            sender_currency,
            amount_received: received,
            receiver_currency,
            note,
            executed_at: now,
        });

        log::info!("transfer {id}: user {actor} sent {amount} to user {}", receiver.id);
        self.emit(EventPayload::TransferExecuted(TransferExecutedEvent {
            transfer_id: id.clone(),
            sender: actor,
            receiver: receiver.id,
            amount_sent: amount,
            amount_received: received,
        }));
        Ok(id)
    }

    pub fn transfer_record(
        &self,
        actor: UserId,
        transfer_id: &TransferId,
    ) -> Result<Transfer, LedgerError> {
        let transfers = self.transfers.lock();
        let record = transfers
            .iter()
            .find(|t| &t.id == transfer_id)
            .cloned()
            .ok_or_else(|| LedgerError::TransferNotFound(transfer_id.clone()))?;
        drop(transfers);
        self.require_self_or_admin(actor, record.sender)
            .or_else(|_| self.require_self_or_admin(actor, record.receiver))?;
        Ok(record)
    }

    /// Transfers where the user is sender or receiver, newest first.
    pub fn transfers_of(&self, actor: UserId, target: UserId) -> Result<Vec<Transfer>, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        let transfers = self.transfers.lock();
        let mut out: Vec<Transfer> = transfers
            .iter()
            .filter(|t| t.sender == target || t.receiver == target)
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }
}
