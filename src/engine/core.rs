// 17.1 engine/core.rs: main engine struct. holds the store, the open
// deposits and executed transfers, KYC submissions, the rate table, and the
// event buffer. every entry point takes &self; interior locks do the
// serialization (see store.rs for the lock order).

use crate::config::LedgerConfig;
use crate::convert::{RateSource, RateTable};
use crate::deposit::Deposit;
use crate::error::LedgerError;
use crate::events::{Event, EventCollector, EventEmitter, EventPayload};
use crate::journal::JournalEntry;
use crate::kyc::KycVerification;
use crate::portfolio::Portfolio;
use crate::settings::{SettingsStore, SignalStrength};
use crate::store::LedgerStore;
use crate::transfer::Transfer;
use crate::types::{Amount, DepositId, Timestamp, UserId};
use crate::user::{Role, User};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicI64, Ordering};

pub struct LedgerEngine {
    pub(super) config: LedgerConfig,
    pub(super) store: LedgerStore,
    pub(super) deposits: DashMap<DepositId, Deposit>,
    pub(super) transfers: Mutex<Vec<Transfer>>,
    pub(super) kyc: RwLock<std::collections::HashMap<UserId, KycVerification>>,
    pub(super) rates: RwLock<RateTable>,
    pub(super) settings: Mutex<SettingsStore>,
    pub(super) events: Mutex<EventCollector>,
    clock_millis: AtomicI64,
}

impl LedgerEngine {
    pub fn new(config: LedgerConfig) -> Self {
        let rates = RateTable::new(config.base_currency.clone(), Timestamp::from_millis(0));
        let events = EventCollector::new(config.max_events);
        Self {
            config,
            store: LedgerStore::new(),
            deposits: DashMap::new(),
            transfers: Mutex::new(Vec::new()),
            kyc: RwLock::new(std::collections::HashMap::new()),
            rates: RwLock::new(rates),
            settings: Mutex::new(SettingsStore::new()),
            events: Mutex::new(events),
            clock_millis: AtomicI64::new(0),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // logical clock. tests and the simulator drive it explicitly.
    pub fn set_time(&self, timestamp: Timestamp) {
        self.clock_millis.store(timestamp.as_millis(), Ordering::SeqCst);
    }

    pub fn time(&self) -> Timestamp {
        Timestamp::from_millis(self.clock_millis.load(Ordering::SeqCst))
    }

    pub fn advance_time(&self, millis: i64) {
        self.clock_millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub(super) fn emit(&self, payload: EventPayload) {
        let mut events = self.events.lock();
        let id = events.next_id();
        events.emit(Event::new(id, self.time(), payload));
    }

    pub fn drain_events(&self) -> Vec<Event> {
        let mut events = self.events.lock();
        let out = events.events().to_vec();
        events.clear();
        out
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().events().to_vec()
    }

    // 17.2: actor gates. every entry point resolves its actor through one of
    // these, so a deleted account can neither act nor be acted through.
    pub(super) fn require_active(&self, actor: UserId) -> Result<User, LedgerError> {
        let user = self.store.user(actor)?;
        if !user.is_active() {
            return Err(LedgerError::Unauthorized);
        }
        Ok(user)
    }

    pub(super) fn require_admin(&self, actor: UserId) -> Result<User, LedgerError> {
        let user = self.require_active(actor)?;
        if user.role != Role::Admin {
            return Err(LedgerError::Forbidden);
        }
        Ok(user)
    }

    pub(super) fn require_staff(&self, actor: UserId) -> Result<User, LedgerError> {
        let user = self.require_active(actor)?;
        match user.role {
            Role::Admin | Role::StaffAdmin => Ok(user),
            Role::User => Err(LedgerError::Forbidden),
        }
    }

    /// Self or any admin; everything else is Forbidden.
    pub(super) fn require_self_or_admin(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Result<User, LedgerError> {
        let user = self.require_active(actor)?;
        if actor == target || user.is_admin() {
            Ok(user)
        } else {
            Err(LedgerError::Forbidden)
        }
    }

    // read-side accessors

    pub fn balance_of(&self, actor: UserId, target: UserId) -> Result<Amount, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        self.store.read_portfolio(target, |p| p.balance)
    }

    pub fn portfolio_of(&self, actor: UserId, target: UserId) -> Result<Portfolio, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        self.store.read_portfolio(target, |p| p.clone())
    }

    pub fn history_of(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        self.store.with_journal(|j| Ok(j.entries_for(target)))
    }

    pub fn user_of(&self, actor: UserId, target: UserId) -> Result<User, LedgerError> {
        self.require_self_or_admin(actor, target)?;
        self.store.user(target)
    }

    pub fn list_users(&self, actor: UserId) -> Result<Vec<User>, LedgerError> {
        self.require_staff(actor)?;
        Ok(self.store.users())
    }

    // exchange rates

    pub fn set_rate(
        &self,
        actor: UserId,
        currency: crate::types::Currency,
        rate: rust_decimal::Decimal,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        self.rates.write().insert(currency, rate);
        Ok(())
    }

    /// Pulls a fresh rate set if the table is stale. Never blocks a ledger
    /// mutation: conversions read whatever rates are loaded.
    pub fn refresh_rates(&self, source: &dyn RateSource) -> Result<bool, LedgerError> {
        let now = self.time();
        {
            let rates = self.rates.read();
            if !rates.is_stale(now, self.config.rate_refresh_secs) {
                return Ok(false);
            }
        }
        let base = self.rates.read().base().clone();
        let fresh = source.fetch(&base)?;
        let count = fresh.len();
        self.rates.write().replace(fresh, now);
        log::info!("exchange rates refreshed, {count} currencies");
        Ok(true)
    }

    pub fn rates(&self) -> RateTable {
        self.rates.read().clone()
    }

    // operator settings

    pub fn signal_strength(&self) -> SignalStrength {
        self.settings.lock().signal_strength()
    }

    pub fn set_signal_strength(&self, actor: UserId, value: u8) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        self.settings.lock().set_signal_strength(value, actor, self.time())
    }
}
