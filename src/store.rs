// 16.0 store.rs: in-memory state with the locking discipline. users and
// their lookup indexes live behind one RwLock so index and record never
// disagree. portfolios get one mutex each so unrelated users never contend.
// the journal has its own mutex, always taken after portfolio locks.
//
// lock order, strictly: users -> portfolio (sorted by UserId when two) ->
// journal. nothing here takes them the other way.

use crate::error::LedgerError;
use crate::idgen;
use crate::journal::Journal;
use crate::portfolio::Portfolio;
use crate::types::{AccountNumber, Currency, Email, Timestamp, UserId};
use crate::user::User;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct UserTable {
    users: HashMap<UserId, User>,
    by_email: HashMap<Email, UserId>,
    // retains soft-deleted users' numbers so they cannot be re-issued
    by_account: HashMap<AccountNumber, UserId>,
}

pub struct LedgerStore {
    table: RwLock<UserTable>,
    portfolios: DashMap<UserId, Arc<Mutex<Portfolio>>>,
    journal: Mutex<Journal>,
    next_user_id: AtomicU64,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(UserTable::default()),
            portfolios: DashMap::new(),
            journal: Mutex::new(Journal::new()),
            next_user_id: AtomicU64::new(1),
        }
    }

    // 16.1: registration inserts the user and its email index under the
    // users write lock, so a concurrent duplicate email loses cleanly. the
    // portfolio is created lazily on first access.
    pub fn insert_user(
        &self,
        email: Email,
        password_hash: String,
        currency: Currency,
        now: Timestamp,
    ) -> Result<UserId, LedgerError> {
        let mut table = self.table.write();
        if table.by_email.contains_key(&email) {
            return Err(LedgerError::validation("email already registered"));
        }
        let id = UserId(self.next_user_id.fetch_add(1, Ordering::Relaxed));
        let user = User::new(id, email.clone(), password_hash, currency, now);
        table.by_email.insert(email, id);
        table.users.insert(id, user);
        Ok(id)
    }

    // 16.2: account numbers are random, so allocation is a bounded retry
    // against the reservation index. candidates are generated outside the
    // write lock; only the check-and-reserve holds it, so a collision costs
    // one more short lock round instead of serializing the generation.
    pub fn assign_account_number(
        &self,
        user_id: UserId,
        len: usize,
        attempts: usize,
    ) -> Result<AccountNumber, LedgerError> {
        for _ in 0..attempts {
            let candidate = idgen::account_number(len);
            let mut table = self.table.write();
            if let Some(existing) = table
                .users
                .get(&user_id)
                .ok_or(LedgerError::UserNotFound(user_id))?
                .account_number
                .clone()
            {
                return Ok(existing);
            }
            if table.by_account.contains_key(&candidate) {
                continue;
            }
            table.by_account.insert(candidate.clone(), user_id);
            if let Some(user) = table.users.get_mut(&user_id) {
                user.account_number = Some(candidate.clone());
            }
            return Ok(candidate);
        }
        Err(LedgerError::DuplicateIdentifier)
    }

    pub fn user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.table
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    pub fn find_by_email(&self, email: &Email) -> Option<User> {
        let table = self.table.read();
        let id = table.by_email.get(email)?;
        table.users.get(id).cloned()
    }

    pub fn find_by_account_number(&self, number: &AccountNumber) -> Option<User> {
        let table = self.table.read();
        let id = table.by_account.get(number)?;
        table.users.get(id).cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.table.read().users.values().cloned().collect()
    }

    pub fn with_user<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&User) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let table = self.table.read();
        let user = table
            .users
            .get(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        f(user)
    }

    pub fn with_user_mut<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut User) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut table = self.table.write();
        let user = table
            .users
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        f(user)
    }

    // portfolios are created lazily on first access, with zero balances.
    // the entry API makes concurrent first access idempotent. the users lock
    // is held across the insert so a permanent delete cannot slip between
    // the existence check and the entry.
    fn portfolio_handle(&self, user_id: UserId) -> Result<Arc<Mutex<Portfolio>>, LedgerError> {
        if let Some(entry) = self.portfolios.get(&user_id) {
            return Ok(Arc::clone(&entry));
        }
        let table = self.table.read();
        let user = table
            .users
            .get(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        let entry = self.portfolios.entry(user_id).or_insert_with(|| {
            Arc::new(Mutex::new(Portfolio::new(
                user_id,
                user.preferred_currency.clone(),
                user.created_at,
            )))
        });
        Ok(Arc::clone(&entry))
    }

    // a permanent delete detaches the map entry while holding its mutex, so
    // a handle fetched before the delete fails this check once it finally
    // gets the lock, instead of mutating a dead portfolio.
    fn is_live(&self, user_id: UserId, handle: &Arc<Mutex<Portfolio>>) -> bool {
        self.portfolios
            .get(&user_id)
            .is_some_and(|entry| Arc::ptr_eq(&entry, handle))
    }

    pub fn read_portfolio<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&Portfolio) -> T,
    ) -> Result<T, LedgerError> {
        let handle = self.portfolio_handle(user_id)?;
        let portfolio = handle.lock();
        if !self.is_live(user_id, &handle) {
            return Err(LedgerError::UserNotFound(user_id));
        }
        Ok(f(&portfolio))
    }

    // 16.3: the unit of work for one portfolio. the closure sees the
    // portfolio and the journal under the same locks; if it fails, the
    // portfolio snapshot is restored and the journal tail dropped, so a
    // multi-step mutation never half-applies.
    pub fn with_portfolio<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut Portfolio, &mut Journal) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let handle = self.portfolio_handle(user_id)?;
        let mut portfolio = handle.lock();
        if !self.is_live(user_id, &handle) {
            return Err(LedgerError::UserNotFound(user_id));
        }
        let mut journal = self.journal.lock();

        let snapshot = portfolio.clone();
        let mark = journal.len();
        match f(&mut portfolio, &mut journal) {
            Ok(value) => Ok(value),
            Err(err) => {
                *portfolio = snapshot;
                journal.truncate(mark);
                Err(err)
            }
        }
    }

    // 16.4: two-portfolio unit of work for transfers. locks are taken in
    // UserId order regardless of transfer direction, so two opposite
    // transfers between the same pair cannot deadlock.
    pub fn with_portfolio_pair<T>(
        &self,
        first: UserId,
        second: UserId,
        f: impl FnOnce(&mut Portfolio, &mut Portfolio, &mut Journal) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        if first == second {
            return Err(LedgerError::validation("cannot pair a portfolio with itself"));
        }
        let first_handle = self.portfolio_handle(first)?;
        let second_handle = self.portfolio_handle(second)?;

        let (mut low, mut high) = if first < second {
            (first_handle.lock(), second_handle.lock())
        } else {
            (second_handle.lock(), first_handle.lock())
        };
        if !self.is_live(first, &first_handle) {
            return Err(LedgerError::UserNotFound(first));
        }
        if !self.is_live(second, &second_handle) {
            return Err(LedgerError::UserNotFound(second));
        }
        let (a, b) = if first < second {
            (&mut *low, &mut *high)
        } else {
            (&mut *high, &mut *low)
        };
        let mut journal = self.journal.lock();

        let snapshot_a = a.clone();
        let snapshot_b = b.clone();
        let mark = journal.len();
        match f(a, b, &mut journal) {
            Ok(value) => Ok(value),
            Err(err) => {
                *a = snapshot_a;
                *b = snapshot_b;
                journal.truncate(mark);
                Err(err)
            }
        }
    }

    pub fn with_journal<T>(&self, f: impl FnOnce(&Journal) -> T) -> T {
        f(&self.journal.lock())
    }

    // 16.5: permanent deletion. refuses while any funds or holdings remain;
    // the emptiness check, the cascade over journal rows, and every removal
    // run before the portfolio and journal guards are released, so a handle
    // fetched before the delete fails its liveness check instead of writing
    // a journal row for a user that no longer exists.
    pub fn permanent_delete(&self, user_id: UserId) -> Result<User, LedgerError> {
        let mut table = self.table.write();
        if !table.users.contains_key(&user_id) {
            return Err(LedgerError::UserNotFound(user_id));
        }
        // a never-touched portfolio is empty by definition
        let handle = self.portfolios.get(&user_id).map(|entry| Arc::clone(&entry));
        let guard = handle.as_ref().map(|h| h.lock());
        if let Some(portfolio) = &guard {
            if !portfolio.is_empty() {
                return Err(LedgerError::BalanceNotEmpty);
            }
        }
        let mut journal = self.journal.lock();
        journal.purge_user(user_id);

        // detach while the portfolio mutex is still held
        self.portfolios.remove(&user_id);
        let user = table
            .users
            .remove(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        table.by_email.remove(&user.email);
        if let Some(number) = &user.account_number {
            table.by_account.remove(number);
        }

        drop(journal);
        drop(guard);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalKind;
    use crate::types::Amount;
    use rust_decimal_macros::dec;

    fn store_with_user() -> (LedgerStore, UserId) {
        let store = LedgerStore::new();
        let id = store
            .insert_user(
                Email::parse("alice@example.com").unwrap(),
                "hash".into(),
                Currency::usd(),
                Timestamp::from_millis(0),
            )
            .unwrap();
        (store, id)
    }

    #[test]
    fn duplicate_email_rejected() {
        let (store, _) = store_with_user();
        assert!(store
            .insert_user(
                Email::parse("ALICE@example.com").unwrap(),
                "hash".into(),
                Currency::usd(),
                Timestamp::from_millis(1),
            )
            .is_err());
    }

    #[test]
    fn account_number_assignment_is_idempotent() {
        let (store, id) = store_with_user();
        let first = store.assign_account_number(id, 10, 10).unwrap();
        let second = store.assign_account_number(id, 10, 10).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            store.find_by_account_number(&first).unwrap().id,
            id
        );
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let (store, id) = store_with_user();
        store
            .with_portfolio(id, |p, _| {
                p.credit(Amount::new(dec!(100)).unwrap());
                Ok(())
            })
            .unwrap();

        let result: Result<(), LedgerError> = store.with_portfolio(id, |p, j| {
            p.credit(Amount::new(dec!(50)).unwrap());
            j.append(
                id,
                JournalKind::Withdrawal,
                Amount::new(dec!(50)).unwrap(),
                Currency::usd(),
                p.balance,
                Timestamp::from_millis(1),
            );
            Err(LedgerError::validation("boom"))
        });
        assert!(result.is_err());

        let balance = store.read_portfolio(id, |p| p.balance).unwrap();
        assert_eq!(balance.value(), dec!(100));
        assert_eq!(store.with_journal(|j| j.len()), 0);
    }

    #[test]
    fn pair_rolls_back_both_sides() {
        let (store, a) = store_with_user();
        let b = store
            .insert_user(
                Email::parse("bob@example.com").unwrap(),
                "hash".into(),
                Currency::usd(),
                Timestamp::from_millis(0),
            )
            .unwrap();
        store
            .with_portfolio(a, |p, _| {
                p.credit(Amount::new(dec!(100)).unwrap());
                Ok(())
            })
            .unwrap();

        let result: Result<(), LedgerError> = store.with_portfolio_pair(a, b, |pa, pb, _| {
            pa.debit(Amount::new(dec!(40)).unwrap())?;
            pb.credit(Amount::new(dec!(40)).unwrap());
            Err(LedgerError::validation("boom"))
        });
        assert!(result.is_err());

        assert_eq!(
            store.read_portfolio(a, |p| p.balance).unwrap().value(),
            dec!(100)
        );
        assert!(store.read_portfolio(b, |p| p.balance).unwrap().is_zero());
    }

    #[test]
    fn pair_requires_distinct_users() {
        let (store, a) = store_with_user();
        assert!(store
            .with_portfolio_pair(a, a, |_, _, _| Ok(()))
            .is_err());
    }

    #[test]
    fn delete_requires_empty_portfolio() {
        let (store, id) = store_with_user();
        store
            .with_portfolio(id, |p, _| {
                p.credit(Amount::new(dec!(1)).unwrap());
                Ok(())
            })
            .unwrap();
        assert_eq!(
            store.permanent_delete(id).unwrap_err(),
            LedgerError::BalanceNotEmpty
        );

        store
            .with_portfolio(id, |p, _| p.debit(Amount::new(dec!(1)).unwrap()))
            .unwrap();
        let user = store.permanent_delete(id).unwrap();
        assert_eq!(user.id, id);
        assert!(store.user(id).is_err());
    }

    #[test]
    fn detached_handle_cannot_credit_after_delete() {
        let (store, id) = store_with_user();
        // simulates a writer that grabbed its handle before the delete ran
        let stale = store.portfolio_handle(id).unwrap();
        store.permanent_delete(id).unwrap();

        assert!(!store.is_live(id, &stale));
        let result = store.with_portfolio(id, |p, j| {
            p.credit(Amount::new(dec!(100)).unwrap());
            j.append(
                id,
                JournalKind::Withdrawal,
                Amount::new(dec!(100)).unwrap(),
                Currency::usd(),
                p.balance,
                Timestamp::from_millis(1),
            );
            Ok(())
        });
        assert_eq!(result, Err(LedgerError::UserNotFound(id)));
        assert_eq!(store.with_journal(|j| j.len()), 0);
    }

    #[test]
    fn racing_credits_leave_no_orphan_journal_rows() {
        use std::thread;

        for _ in 0..50 {
            let (store, id) = store_with_user();
            let store = Arc::new(store);

            let writer = {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let _ = store.with_portfolio(id, |p, j| {
                        p.credit(Amount::new(dec!(10)).unwrap());
                        j.append(
                            id,
                            JournalKind::Withdrawal,
                            Amount::new(dec!(10)).unwrap(),
                            Currency::usd(),
                            p.balance,
                            Timestamp::from_millis(1),
                        );
                        Ok(())
                    });
                })
            };
            let deleter = {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let _ = store.permanent_delete(id);
                })
            };
            writer.join().unwrap();
            deleter.join().unwrap();

            // whichever won, a deleted user never leaves journal rows behind
            if store.user(id).is_err() {
                assert_eq!(store.with_journal(|j| j.entries_for(id).len()), 0);
            }
        }
    }
}
