// 17.15 engine/trades.rs: asset trades against the user's own balance and
// trading-room funding. trades settle instantly at the caller-supplied price;
// the ledger only enforces that cash and positions stay consistent.

use super::core::LedgerEngine;
use crate::error::LedgerError;
use crate::events::{EventPayload, TradeExecutedEvent};
use crate::journal::JournalKind;
use crate::types::{Amount, AssetSymbol, UserId};
use rust_decimal::Decimal;

impl LedgerEngine {
    pub fn buy_asset(
        &self,
        actor: UserId,
        symbol: AssetSymbol,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let user = self.require_active(actor)?;
        let now = self.time();
        let currency = user.preferred_currency.clone();
        let cost = Amount::new(quantity * price)
            .ok_or_else(|| LedgerError::validation("trade cost is not representable"))?;

        self.store.with_portfolio(actor, |portfolio, journal| {
            portfolio.apply_buy(symbol.clone(), quantity, price)?;
            journal.append(
                actor,
                JournalKind::TradeBuy {
                    symbol: symbol.clone(),
                    quantity,
                    price,
                },
                cost,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(())
        })?;

        self.emit(EventPayload::TradeExecuted(TradeExecutedEvent {
            user_id: actor,
            symbol,
            quantity,
            price,
            is_buy: true,
        }));
        Ok(())
    }

    pub fn sell_asset(
        &self,
        actor: UserId,
        symbol: AssetSymbol,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let user = self.require_active(actor)?;
        let now = self.time();
        let currency = user.preferred_currency.clone();
        let proceeds = Amount::new(quantity * price)
            .ok_or_else(|| LedgerError::validation("trade proceeds are not representable"))?;

        self.store.with_portfolio(actor, |portfolio, journal| {
            portfolio.apply_sell(&symbol, quantity, price)?;
            journal.append(
                actor,
                JournalKind::TradeSell {
                    symbol: symbol.clone(),
                    quantity,
                    price,
                },
                proceeds,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(())
        })?;

        self.emit(EventPayload::TradeExecuted(TradeExecutedEvent {
            user_id: actor,
            symbol,
            quantity,
            price,
            is_buy: false,
        }));
        Ok(())
    }

    pub fn fund_trading_room(&self, actor: UserId, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("amount must be positive"));
        }
        let user = self.require_active(actor)?;
        let now = self.time();
        let currency = user.preferred_currency.clone();
        self.store.with_portfolio(actor, |portfolio, journal| {
            portfolio.fund_trading_room(amount)?;
            journal.append(
                actor,
                JournalKind::TradingRoomFund,
                amount,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(())
        })
    }

    pub fn defund_trading_room(&self, actor: UserId, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("amount must be positive"));
        }
        let user = self.require_active(actor)?;
        let now = self.time();
        let currency = user.preferred_currency.clone();
        self.store.with_portfolio(actor, |portfolio, journal| {
            portfolio.defund_trading_room(amount)?;
            journal.append(
                actor,
                JournalKind::TradingRoomDefund,
                amount,
                currency.clone(),
                portfolio.balance,
                now,
            );
            Ok(())
        })
    }

    /// Admin cleanup of a zero-quantity holding. A live position refuses.
    pub fn remove_holding(
        &self,
        actor: UserId,
        target: UserId,
        symbol: &AssetSymbol,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        self.store
            .with_portfolio(target, |portfolio, _| portfolio.remove_holding(symbol))
    }
}
