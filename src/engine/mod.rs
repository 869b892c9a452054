// 17.0: the ledger engine. coordinates accounts, deposits, transfers, trades,
// and KYC review over the shared store. deterministic and event-driven with
// no external I/O; rate fetching and code delivery happen behind traits at
// the edges.

mod accounts;
mod core;
mod deposits;
mod trades;
mod transfers;

pub use core::LedgerEngine;
