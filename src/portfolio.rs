// 7.0 portfolio.rs: per-user balances and asset holdings. the main balance
// and the trading-room balance are both fiat Amounts in the account currency;
// holdings track quantity, average entry price, and total invested per symbol.
// every mutation here is pure state arithmetic; authorization and journaling
// happen in the engine.

use crate::error::LedgerError;
use crate::types::{Amount, AssetSymbol, Currency, Timestamp, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Residual quantities below this are flushed to zero after a sell.
const DUST_THRESHOLD: Decimal = dec!(0.00000001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: AssetSymbol,
    pub quantity: Decimal,
    /// Weighted average entry price per unit, in the portfolio currency.
    pub average_price: Decimal,
    pub total_invested: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: UserId,
    pub balance: Amount,
    pub trading_room_balance: Amount,
    pub currency: Currency,
    holdings: HashMap<AssetSymbol, Holding>,
    pub created_at: Timestamp,
}

impl Portfolio {
    pub fn new(user_id: UserId, currency: Currency, created_at: Timestamp) -> Self {
        Self {
            user_id,
            balance: Amount::zero(),
            trading_room_balance: Amount::zero(),
            currency,
            holdings: HashMap::new(),
            created_at,
        }
    }

    pub fn credit(&mut self, amount: Amount) {
        self.balance = self.balance.add(amount);
    }

    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            })?;
        Ok(())
    }

    /// Moves funds from the main balance into the trading room.
    pub fn fund_trading_room(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.debit(amount)?;
        self.trading_room_balance = self.trading_room_balance.add(amount);
        Ok(())
    }

    /// Moves funds from the trading room back to the main balance.
    pub fn defund_trading_room(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.trading_room_balance = self.trading_room_balance.checked_sub(amount).ok_or(
            LedgerError::InsufficientFunds {
                requested: amount,
                available: self.trading_room_balance,
            },
        )?;
        self.balance = self.balance.add(amount);
        Ok(())
    }

    pub fn holding(&self, symbol: &AssetSymbol) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    // 7.1: buy debits the cash cost and folds the fill into the weighted
    // average entry price.
    pub fn apply_buy(
        &mut self,
        symbol: AssetSymbol,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "trade quantity and price must be positive",
            ));
        }
        let cost = Amount::new(quantity * price)
            .ok_or_else(|| LedgerError::validation("trade cost is not representable"))?;
        self.debit(cost)?;

        let holding = self.holdings.entry(symbol.clone()).or_insert(Holding {
            symbol,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            total_invested: Amount::zero(),
        });
        let new_quantity = holding.quantity + quantity;
        holding.total_invested = holding.total_invested.add(cost);
        holding.average_price = holding.total_invested.value() / new_quantity;
        holding.quantity = new_quantity;
        Ok(())
    }

    // 7.2: sell credits the proceeds at the given price and reduces the
    // position pro rata. residual dust below 1e-8 closes the position.
    pub fn apply_sell(
        &mut self,
        symbol: &AssetSymbol,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "trade quantity and price must be positive",
            ));
        }
        let holding = self
            .holdings
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::validation(format!("no position in {symbol}")))?;
        if quantity > holding.quantity {
            return Err(LedgerError::validation(format!(
                "cannot sell {quantity} of {symbol}: only {} held",
                holding.quantity
            )));
        }

        let proceeds = Amount::new(quantity * price)
            .ok_or_else(|| LedgerError::validation("trade proceeds are not representable"))?;
        let remaining = holding.quantity - quantity;
        if remaining < DUST_THRESHOLD {
            self.holdings.remove(symbol);
        } else {
            let sold_fraction = quantity / holding.quantity;
            let released = Amount::new(holding.total_invested.value() * sold_fraction)
                .unwrap_or_else(Amount::zero);
            holding.total_invested = holding
                .total_invested
                .checked_sub(released)
                .unwrap_or_else(Amount::zero);
            holding.quantity = remaining;
        }
        self.credit(proceeds);
        Ok(())
    }

    /// Admin-only removal. Refuses unless the position is exactly zero.
    pub fn remove_holding(&mut self, symbol: &AssetSymbol) -> Result<(), LedgerError> {
        match self.holdings.get(symbol) {
            None => Ok(()),
            Some(h) if h.quantity.is_zero() => {
                self.holdings.remove(symbol);
                Ok(())
            }
            Some(_) => Err(LedgerError::AssetInUse(symbol.clone())),
        }
    }

    /// Precondition for permanent account deletion.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.trading_room_balance.is_zero() && self.holdings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> AssetSymbol {
        AssetSymbol::new("BTC").unwrap()
    }

    fn portfolio_with(balance: Decimal) -> Portfolio {
        let mut p = Portfolio::new(UserId(1), Currency::usd(), Timestamp::from_millis(0));
        p.credit(Amount::new(balance).unwrap());
        p
    }

    #[test]
    fn debit_guards_overdraft() {
        let mut p = portfolio_with(dec!(50));
        let err = p.debit(Amount::new(dec!(75)).unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(p.balance.value(), dec!(50));
    }

    #[test]
    fn trading_room_round_trip() {
        let mut p = portfolio_with(dec!(100));
        p.fund_trading_room(Amount::new(dec!(40)).unwrap()).unwrap();
        assert_eq!(p.balance.value(), dec!(60));
        assert_eq!(p.trading_room_balance.value(), dec!(40));

        p.defund_trading_room(Amount::new(dec!(15)).unwrap()).unwrap();
        assert_eq!(p.balance.value(), dec!(75));
        assert_eq!(p.trading_room_balance.value(), dec!(25));

        assert!(p
            .defund_trading_room(Amount::new(dec!(100)).unwrap())
            .is_err());
    }

    #[test]
    fn buy_averages_entry_price() {
        let mut p = portfolio_with(dec!(1000));
        p.apply_buy(btc(), dec!(2), dec!(100)).unwrap();
        p.apply_buy(btc(), dec!(2), dec!(200)).unwrap();

        let h = p.holding(&btc()).unwrap();
        assert_eq!(h.quantity, dec!(4));
        assert_eq!(h.average_price, dec!(150));
        assert_eq!(h.total_invested.value(), dec!(600));
        assert_eq!(p.balance.value(), dec!(400));
    }

    #[test]
    fn sell_reduces_position_pro_rata() {
        let mut p = portfolio_with(dec!(400));
        p.apply_buy(btc(), dec!(4), dec!(100)).unwrap();
        p.apply_sell(&btc(), dec!(1), dec!(150)).unwrap();

        let h = p.holding(&btc()).unwrap();
        assert_eq!(h.quantity, dec!(3));
        assert_eq!(h.total_invested.value(), dec!(300));
        assert_eq!(p.balance.value(), dec!(150));
    }

    #[test]
    fn sell_full_position_removes_holding() {
        let mut p = portfolio_with(dec!(100));
        p.apply_buy(btc(), dec!(1), dec!(100)).unwrap();
        p.apply_sell(&btc(), dec!(1), dec!(120)).unwrap();
        assert!(p.holding(&btc()).is_none());
        assert_eq!(p.balance.value(), dec!(120));
    }

    #[test]
    fn sell_leaving_dust_removes_holding() {
        let mut p = portfolio_with(dec!(100));
        p.apply_buy(btc(), dec!(1), dec!(100)).unwrap();
        p.apply_sell(&btc(), dec!(0.999999999), dec!(100)).unwrap();
        assert!(p.holding(&btc()).is_none());
    }

    #[test]
    fn cannot_oversell() {
        let mut p = portfolio_with(dec!(100));
        p.apply_buy(btc(), dec!(1), dec!(100)).unwrap();
        assert!(p.apply_sell(&btc(), dec!(2), dec!(100)).is_err());
    }

    #[test]
    fn remove_holding_refuses_live_position() {
        let mut p = portfolio_with(dec!(100));
        p.apply_buy(btc(), dec!(1), dec!(100)).unwrap();
        assert_eq!(
            p.remove_holding(&btc()).unwrap_err(),
            LedgerError::AssetInUse(btc())
        );
        p.apply_sell(&btc(), dec!(1), dec!(100)).unwrap();
        assert!(p.remove_holding(&btc()).is_ok());
    }

    #[test]
    fn emptiness_check() {
        let mut p = Portfolio::new(UserId(1), Currency::usd(), Timestamp::from_millis(0));
        assert!(p.is_empty());
        p.credit(Amount::new(dec!(0.01)).unwrap());
        assert!(!p.is_empty());
    }
}
