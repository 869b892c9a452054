// ledger-core: account ledger and transfer engine.
// correctness-first architecture: no balance moves without a journal entry.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, Amount, Currency, AccountNumber, Email
//   2.x  error.rs: the LedgerError taxonomy
//   3.x  convert.rs: rate table, base-currency pivot conversion
//   4.x  idgen.rs: account numbers, transfer references, email codes
//   5.x  totp.rs: RFC 6238 codes for APP two-factor
//   6.x  user.rs: user aggregate: role, lifecycle, credentials
//   7.x  portfolio.rs: balances, trading room, asset holdings
//   8.x  journal.rs: append-only record of every balance move
//   9.x  auth.rs: PIN, password, two-factor enrollment and checks
//   10.x deposit.rs: deposit state machine
//   11.x kyc.rs: identity verification and admin review
//   12.x transfer.rs: receiver resolution, transfer records
//   13.x events.rs: state transition events for audit
//   14.x config.rs: windows, identifier lengths, env presets
//   15.x settings.rs: operator-tunable runtime settings
//   16.x store.rs: locking discipline, units of work, rollback
//   17.x engine/: entry points: accounts, deposits, transfers, trades

// core ledger modules
pub mod convert;
pub mod deposit;
pub mod engine;
pub mod events;
pub mod journal;
pub mod kyc;
pub mod portfolio;
pub mod transfer;
pub mod types;
pub mod user;

// credential and identifier modules
pub mod auth;
pub mod idgen;
pub mod totp;

// integration modules
pub mod config;
pub mod error;
pub mod settings;
pub mod store;

// re exports for convenience
pub use convert::*;
pub use deposit::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use journal::*;
pub use kyc::*;
pub use portfolio::*;
pub use transfer::*;
pub use types::*;
pub use user::*;
pub use config::{ConfigError, LedgerConfig};
pub use settings::{SettingsStore, SignalStrength};
pub use store::LedgerStore;
