// 8.0 journal.rs: append-only record of every balance mutation. each entry
// carries the balance after the mutation, so the journal doubles as an audit
// trail and a reconciliation source. entries are only removed when a failed
// multi-step operation rolls back the uncommitted tail (store.rs owns that).

use crate::types::{Amount, AssetSymbol, Currency, DepositId, JournalId, Timestamp, TransferId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalKind {
    Deposit { deposit_id: DepositId },
    AdminCredit { deposit_id: DepositId },
    Withdrawal,
    TransferOut { transfer_id: TransferId, peer: UserId },
    TransferIn { transfer_id: TransferId, peer: UserId },
    TradeBuy { symbol: AssetSymbol, quantity: Decimal, price: Decimal },
    TradeSell { symbol: AssetSymbol, quantity: Decimal, price: Decimal },
    TradingRoomFund,
    TradingRoomDefund,
}

impl JournalKind {
    /// Whether the entry's amount moved the main balance up or down.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            JournalKind::Deposit { .. }
                | JournalKind::AdminCredit { .. }
                | JournalKind::TransferIn { .. }
                | JournalKind::TradeSell { .. }
                | JournalKind::TradingRoomDefund
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalId,
    pub user_id: UserId,
    pub kind: JournalKind,
    pub amount: Amount,
    pub currency: Currency,
    /// Main balance immediately after this entry was applied.
    pub balance_after: Amount,
    pub at: Timestamp,
}

#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    next_id: u64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        user_id: UserId,
        kind: JournalKind,
        amount: Amount,
        currency: Currency,
        balance_after: Amount,
        at: Timestamp,
    ) -> JournalId {
        let id = JournalId(self.next_id);
        self.next_id += 1;
        self.entries.push(JournalEntry {
            id,
            user_id,
            kind,
            amount,
            currency,
            balance_after,
            at,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Newest-first history for one user.
    pub fn entries_for(&self, user_id: UserId) -> Vec<JournalEntry> {
        let mut out: Vec<JournalEntry> = self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    /// Rollback hook: drops entries appended after `len`. The id counter is
    /// not rewound, so ids stay unique across a rollback.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Cascade hook for permanent account deletion.
    pub(crate) fn purge_user(&mut self, user_id: UserId) {
        self.entries.retain(|e| e.user_id != user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amt(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let mut j = Journal::new();
        let a = j.append(
            UserId(1),
            JournalKind::Withdrawal,
            amt(dec!(10)),
            Currency::usd(),
            amt(dec!(90)),
            Timestamp::from_millis(0),
        );
        let b = j.append(
            UserId(1),
            JournalKind::Withdrawal,
            amt(dec!(10)),
            Currency::usd(),
            amt(dec!(80)),
            Timestamp::from_millis(1),
        );
        assert_eq!(a, JournalId(0));
        assert_eq!(b, JournalId(1));
    }

    #[test]
    fn history_is_per_user_newest_first() {
        let mut j = Journal::new();
        for (user, balance) in [(1u64, dec!(10)), (2, dec!(5)), (1, dec!(20))] {
            j.append(
                UserId(user),
                JournalKind::Deposit {
                    deposit_id: DepositId("d".into()),
                },
                amt(dec!(5)),
                Currency::usd(),
                amt(balance),
                Timestamp::from_millis(0),
            );
        }
        let history = j.entries_for(UserId(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].balance_after, amt(dec!(20)));
        assert_eq!(history[1].balance_after, amt(dec!(10)));
    }

    #[test]
    fn truncate_drops_tail_but_not_ids() {
        let mut j = Journal::new();
        j.append(
            UserId(1),
            JournalKind::Withdrawal,
            amt(dec!(1)),
            Currency::usd(),
            amt(dec!(9)),
            Timestamp::from_millis(0),
        );
        let mark = j.len();
        j.append(
            UserId(1),
            JournalKind::Withdrawal,
            amt(dec!(1)),
            Currency::usd(),
            amt(dec!(8)),
            Timestamp::from_millis(1),
        );
        j.truncate(mark);
        assert_eq!(j.len(), 1);
        let next = j.append(
            UserId(1),
            JournalKind::Withdrawal,
            amt(dec!(1)),
            Currency::usd(),
            amt(dec!(8)),
            Timestamp::from_millis(2),
        );
        assert_eq!(next, JournalId(2));
    }
}
