// 17.8 engine/deposits.rs: the deposit flow. requests open a Pending
// deposit; the balance only moves when confirmation lands. admin top-ups
// take a shortcut through the same machinery so every credit has a deposit
// record behind it.

use super::core::LedgerEngine;
use crate::deposit::{Deposit, DepositMethod, DepositStatus, ProviderReference};
use crate::error::LedgerError;
use crate::events::{
    BalanceCreditedEvent, DepositCancelledEvent, DepositConfirmedEvent, DepositExpiredEvent,
    DepositFailedEvent, DepositRequestedEvent, EventPayload,
};
use crate::idgen;
use crate::journal::JournalKind;
use crate::types::{Amount, Currency, DepositId, UserId};
use crate::user::Role;

impl LedgerEngine {
    pub fn request_deposit(
        &self,
        actor: UserId,
        amount: Amount,
        currency: Currency,
        method: DepositMethod,
    ) -> Result<DepositId, LedgerError> {
        self.require_active(actor)?;
        if method == DepositMethod::AdminManual {
            return Err(LedgerError::Forbidden);
        }
        let id = idgen::deposit_id();
        let deposit = Deposit::new(id.clone(), actor, amount, currency.clone(), method, self.time())?;
        self.deposits.insert(id.clone(), deposit);

        log::info!("deposit {id} requested by user {actor}: {amount} {currency}");
        self.emit(EventPayload::DepositRequested(DepositRequestedEvent {
            user_id: actor,
            deposit_id: id.clone(),
            amount,
            currency,
            method,
        }));
        Ok(id)
    }

    /// Binds the provider's identifiers; moves Pending to Processing.
    pub fn attach_provider(
        &self,
        deposit_id: &DepositId,
        provider: ProviderReference,
    ) -> Result<(), LedgerError> {
        let now = self.time();
        let mut deposit = self
            .deposits
            .get_mut(deposit_id)
            .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.clone()))?;
        deposit.attach_provider(provider, now)
    }

    // 17.9: confirmation. the state transition decides whether to credit;
    // a repeated webhook for an already-Completed deposit credits nothing.
    pub fn confirm_deposit(&self, deposit_id: &DepositId) -> Result<bool, LedgerError> {
        let now = self.time();
        let (user_id, amount, currency) = {
            let mut deposit = self
                .deposits
                .get_mut(deposit_id)
                .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.clone()))?;
            if !deposit.confirm(now)? {
                return Ok(false);
            }
            (deposit.user_id, deposit.amount, deposit.currency.clone())
        };

        let new_balance = self.store.with_portfolio(user_id, |portfolio, journal| {
            portfolio.credit(amount);
            journal.append(
                user_id,
                JournalKind::Deposit {
                    deposit_id: deposit_id.clone(),
                },
                amount,
                currency,
                portfolio.balance,
                now,
            );
            Ok(portfolio.balance)
        })?;

        log::info!("deposit {deposit_id} confirmed, user {user_id} credited {amount}");
        self.emit(EventPayload::DepositConfirmed(DepositConfirmedEvent {
            user_id,
            deposit_id: deposit_id.clone(),
            amount,
            new_balance,
        }));
        Ok(true)
    }

    pub fn cancel_deposit(&self, actor: UserId, deposit_id: &DepositId) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        let user_id = {
            let mut deposit = self
                .deposits
                .get_mut(deposit_id)
                .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.clone()))?;
            deposit.cancel(actor, now)?;
            deposit.user_id
        };
        self.emit(EventPayload::DepositCancelled(DepositCancelledEvent {
            user_id,
            deposit_id: deposit_id.clone(),
        }));
        Ok(())
    }

    pub fn fail_deposit(&self, deposit_id: &DepositId) -> Result<(), LedgerError> {
        let now = self.time();
        let user_id = {
            let mut deposit = self
                .deposits
                .get_mut(deposit_id)
                .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.clone()))?;
            deposit.fail(now)?;
            deposit.user_id
        };
        self.emit(EventPayload::DepositFailed(DepositFailedEvent {
            user_id,
            deposit_id: deposit_id.clone(),
        }));
        Ok(())
    }

    /// Expiry sweep. Call periodically; returns the deposits it expired.
    pub fn sweep_expired_deposits(&self) -> Vec<DepositId> {
        let now = self.time();
        let mut expired = Vec::new();
        for mut entry in self.deposits.iter_mut() {
            if entry.is_expired(now, self.config.deposit_expiry_hours) {
                entry.expire(now);
                expired.push((entry.id.clone(), entry.user_id));
            }
        }
        let mut ids = Vec::with_capacity(expired.len());
        for (deposit_id, user_id) in expired {
            log::info!("deposit {deposit_id} expired");
            self.emit(EventPayload::DepositExpired(DepositExpiredEvent {
                user_id,
                deposit_id: deposit_id.clone(),
            }));
            ids.push(deposit_id);
        }
        ids
    }

    pub fn deposit(&self, actor: UserId, deposit_id: &DepositId) -> Result<Deposit, LedgerError> {
        let deposit = self
            .deposits
            .get(deposit_id)
            .map(|d| d.value().clone())
            .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.clone()))?;
        self.require_self_or_admin(actor, deposit.user_id)?;
        Ok(deposit)
    }

    pub fn deposits_of(&self, actor: UserId, target: UserId) -> Result<Vec<Deposit>, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        let mut out: Vec<Deposit> = self
            .deposits
            .iter()
            .filter(|d| d.user_id == target)
            .map(|d| d.value().clone())
            .collect();
        out.sort_by_key(|d| d.created_at);
        out.reverse();
        Ok(out)
    }

    // 17.10: admin top-up. credits the balance and synthesizes a Completed
    // ADMIN_MANUAL deposit so the statement and the deposit list agree.
    // staff admins may only top up users assigned to them.
    pub fn admin_top_up(
        &self,
        actor: UserId,
        target: UserId,
        amount: Amount,
    ) -> Result<DepositId, LedgerError> {
        let staff = self.require_staff(actor)?;
        let target_user = self.store.user(target)?;
        if staff.role == Role::StaffAdmin && target_user.assigned_staff != Some(actor) {
            return Err(LedgerError::Forbidden);
        }
        if amount.is_zero() {
            return Err(LedgerError::validation("top-up amount must be positive"));
        }

        let now = self.time();
        let id = idgen::deposit_id();
        let currency = target_user.preferred_currency.clone();
        let mut record = Deposit::new(
            id.clone(),
            target,
            amount,
            currency.clone(),
            DepositMethod::AdminManual,
            now,
        )?;
        record.confirm(now)?;
        debug_assert_eq!(record.status, DepositStatus::Completed);

        let new_balance = self.store.with_portfolio(target, |portfolio, journal| {
            portfolio.credit(amount);
            journal.append(
                target,
                JournalKind::AdminCredit {
                    deposit_id: id.clone(),
                },
                amount,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(portfolio.balance)
        })?;
        self.deposits.insert(id.clone(), record);

        log::info!("admin {actor} topped up user {target} by {amount}");
        self.emit(EventPayload::BalanceCredited(BalanceCreditedEvent {
            user_id: target,
            amount,
            new_balance,
        }));
        Ok(id)
    }
}
