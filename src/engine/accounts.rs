// 17.3 engine/accounts.rs: registration, authentication, credentials,
// two-factor, KYC review, and account lifecycle.

use super::core::LedgerEngine;
use crate::auth;
use crate::error::LedgerError;
use crate::events::{
    AccountDeletedEvent, AccountPurgedEvent, AccountRestoredEvent, EventPayload, KycReviewedEvent,
    KycSubmittedEvent, PinChangedEvent, TwoFactorChangedEvent, UserRegisteredEvent,
};
use crate::kyc::{KycDecision, KycFields, KycVerification};
use crate::types::{Currency, Email, UserId};
use crate::user::{Role, User};

impl LedgerEngine {
    // 17.4: registration. email uniqueness and the account number
    // reservation both happen under the store's locks, so concurrent
    // registrations never collide.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        currency: Currency,
    ) -> Result<UserId, LedgerError> {
        let email = Email::parse(email)
            .ok_or_else(|| LedgerError::validation("malformed email address"))?;
        if password.len() < auth::MIN_PASSWORD_LEN {
            return Err(LedgerError::validation(format!(
                "password must be at least {} characters",
                auth::MIN_PASSWORD_LEN
            )));
        }
        let hash = bcrypt::hash(password, self.config.bcrypt_cost)
            .map_err(|e| LedgerError::validation(format!("hashing failed: {e}")))?;

        let now = self.time();
        let user_id = self.store.insert_user(email, hash, currency, now)?;
        let number = self.store.assign_account_number(
            user_id,
            self.config.account_number_len,
            self.config.id_retry_attempts,
        )?;

        log::info!("registered user {user_id} with account number {number}");
        self.emit(EventPayload::UserRegistered(UserRegisteredEvent {
            user_id,
            account_number: number.as_str().to_string(),
        }));
        Ok(user_id)
    }

    /// Password login. Deleted accounts and unknown emails fail the same way.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserId, LedgerError> {
        let email = Email::parse(email).ok_or(LedgerError::InvalidCredential)?;
        let user = self
            .store
            .find_by_email(&email)
            .ok_or(LedgerError::InvalidCredential)?;
        if !user.is_active() || !user.verify_password(password) {
            return Err(LedgerError::InvalidCredential);
        }
        Ok(user.id)
    }

    // credentials

    pub fn set_transfer_pin(
        &self,
        actor: UserId,
        new_pin: &str,
        current_pin: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        let first_time = self.store.with_user_mut(actor, |user| {
            let first_time = !user.has_pin();
            auth::set_pin(user, new_pin, current_pin, &self.config, now)?;
            Ok(first_time)
        })?;
        self.emit(EventPayload::PinChanged(PinChangedEvent {
            user_id: actor,
            first_time,
        }));
        Ok(())
    }

    pub fn change_password(
        &self,
        actor: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store
            .with_user_mut(actor, |user| auth::change_password(user, current, new, &self.config, now))
    }

    // two-factor

    /// Starts APP enrollment; returns the base32 secret for the
    /// authenticator app.
    pub fn setup_app_2fa(&self, actor: UserId) -> Result<String, LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store
            .with_user_mut(actor, |user| Ok(auth::setup_app_2fa(user, now)))
    }

    pub fn confirm_app_2fa(&self, actor: UserId, code: &str) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store
            .with_user_mut(actor, |user| auth::confirm_app_2fa(user, code, &self.config, now))?;
        self.emit(EventPayload::TwoFactorChanged(TwoFactorChangedEvent {
            user_id: actor,
            method: "APP".to_string(),
        }));
        Ok(())
    }

    pub fn setup_email_2fa(&self, actor: UserId) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store.with_user_mut(actor, |user| {
            auth::setup_email_2fa(user, now);
            Ok(())
        })?;
        self.emit(EventPayload::TwoFactorChanged(TwoFactorChangedEvent {
            user_id: actor,
            method: "EMAIL".to_string(),
        }));
        Ok(())
    }

    /// Mints a single-use email code. The caller is responsible for
    /// delivering it; the engine never sends mail.
    pub fn issue_email_code(&self, actor: UserId) -> Result<String, LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store
            .with_user_mut(actor, |user| auth::issue_email_code(user, now))
    }

    pub fn disable_two_factor(
        &self,
        actor: UserId,
        password: &str,
        code: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        self.store.with_user_mut(actor, |user| {
            auth::disable_two_factor(user, password, code, &self.config, now)
        })?;
        self.emit(EventPayload::TwoFactorChanged(TwoFactorChangedEvent {
            user_id: actor,
            method: "NONE".to_string(),
        }));
        Ok(())
    }

    // KYC

    // 17.5: one live submission per user; a new one overwrites it unless it
    // was already approved.
    pub fn submit_kyc(&self, actor: UserId, fields: KycFields) -> Result<(), LedgerError> {
        self.require_active(actor)?;
        let now = self.time();
        let mut kyc = self.kyc.write();
        if let Some(existing) = kyc.get(&actor) {
            if !existing.can_resubmit() {
                return Err(LedgerError::InvalidTransition {
                    from: "APPROVED",
                    action: "submit KYC",
                });
            }
        }
        kyc.insert(actor, KycVerification::submit(actor, fields, now)?);
        drop(kyc);
        self.emit(EventPayload::KycSubmitted(KycSubmittedEvent { user_id: actor }));
        Ok(())
    }

    pub fn review_kyc(
        &self,
        actor: UserId,
        target: UserId,
        decision: KycDecision,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let now = self.time();
        let mut kyc = self.kyc.write();
        let submission = kyc.get_mut(&target).ok_or(LedgerError::KycNotFound)?;
        submission.review(actor, decision, now)?;
        let status = submission.status;
        drop(kyc);

        log::info!("KYC for user {target} reviewed by {actor}: {status:?}");
        self.emit(EventPayload::KycReviewed(KycReviewedEvent {
            user_id: target,
            reviewer: actor,
            status,
        }));
        Ok(())
    }

    pub fn kyc_of(&self, actor: UserId, target: UserId) -> Result<KycVerification, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        self.kyc
            .read()
            .get(&target)
            .cloned()
            .ok_or(LedgerError::KycNotFound)
    }

    /// The gate withdrawals and transfers check. Admin roles bypass it.
    pub fn is_verified(&self, user_id: UserId) -> Result<bool, LedgerError> {
        let user = self.store.user(user_id)?;
        if user.role != Role::User || user.admin_verified {
            return Ok(true);
        }
        Ok(self
            .kyc
            .read()
            .get(&user_id)
            .is_some_and(|k| k.is_approved()))
    }

    // admin user management

    /// Promotes an account to Admin while no admin exists yet. Deployments
    /// call this once for their first operator account.
    pub fn bootstrap_admin(&self, user_id: UserId) -> Result<(), LedgerError> {
        if self.store.users().iter().any(|u| u.is_admin()) {
            return Err(LedgerError::Forbidden);
        }
        let now = self.time();
        self.store.with_user_mut(user_id, |user| {
            user.role = Role::Admin;
            user.admin_verified = true;
            user.touch(now);
            Ok(())
        })
    }

    pub fn admin_verify_user(&self, actor: UserId, target: UserId) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let now = self.time();
        self.store.with_user_mut(target, |user| {
            user.admin_verified = true;
            user.touch(now);
            Ok(())
        })
    }

    pub fn set_role(&self, actor: UserId, target: UserId, role: Role) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        if actor == target {
            return Err(LedgerError::validation("cannot change your own role"));
        }
        let now = self.time();
        self.store.with_user_mut(target, |user| {
            user.role = role;
            user.touch(now);
            Ok(())
        })
    }

    pub fn assign_staff(
        &self,
        actor: UserId,
        staff: UserId,
        target: UserId,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let staff_user = self.store.user(staff)?;
        if staff_user.role != Role::StaffAdmin {
            return Err(LedgerError::validation("assignee is not a staff admin"));
        }
        let now = self.time();
        self.store.with_user_mut(target, |user| {
            user.assigned_staff = Some(staff);
            user.touch(now);
            Ok(())
        })
    }

    // lifecycle

    // 17.6: soft delete. the account number stays reserved and the journal
    // untouched; only login and acting are cut off.
    pub fn soft_delete(&self, actor: UserId, target: UserId) -> Result<(), LedgerError> {
        self.require_self_or_admin(actor, target)?;
        let now = self.time();
        self.store.with_user_mut(target, |user| {
            if !user.is_active() {
                return Err(LedgerError::InvalidTransition {
                    from: "deleted",
                    action: "soft delete",
                });
            }
            user.soft_delete(now);
            Ok(())
        })?;
        log::info!("user {target} soft-deleted by {actor}");
        self.emit(EventPayload::AccountDeleted(AccountDeletedEvent {
            user_id: target,
            by: actor,
        }));
        Ok(())
    }

    pub fn restore(&self, actor: UserId, target: UserId) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let now = self.time();
        self.store.with_user_mut(target, |user| {
            if user.is_active() {
                return Err(LedgerError::InvalidTransition {
                    from: "active",
                    action: "restore",
                });
            }
            user.restore(now);
            Ok(())
        })?;
        self.emit(EventPayload::AccountRestored(AccountRestoredEvent {
            user_id: target,
            by: actor,
        }));
        Ok(())
    }

    // 17.7: permanent deletion. a user may delete their own account once it
    // holds nothing; admins may delete anyone but themselves. journal,
    // deposit, transfer, and KYC records referencing the user cascade away.
    pub fn purge(&self, actor: UserId, target: UserId) -> Result<User, LedgerError> {
        let actor_user = self.require_active(actor)?;
        if actor == target {
            if actor_user.is_admin() {
                return Err(LedgerError::validation(
                    "cannot permanently delete your own account",
                ));
            }
        } else if !actor_user.is_admin() {
            return Err(LedgerError::Forbidden);
        }
        let user = self.store.permanent_delete(target)?;

        self.deposits.retain(|_, d| d.user_id != target);
        self.transfers
            .lock()
            .retain(|t| t.sender != target && t.receiver != target);
        self.kyc.write().remove(&target);

        log::warn!("user {target} permanently deleted by {actor}");
        self.emit(EventPayload::AccountPurged(AccountPurgedEvent {
            user_id: target,
            by: actor,
        }));
        Ok(user)
    }
}
