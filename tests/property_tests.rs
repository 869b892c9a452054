//! Property-based tests for the ledger math.
//!
//! These tests verify invariants hold under random inputs.

use ledger_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $100,000
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 100
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 5.0
}

fn test_portfolio(balance: Decimal) -> Portfolio {
    let mut p = Portfolio::new(UserId(1), Currency::usd(), Timestamp::from_millis(0));
    p.credit(Amount::new(balance).unwrap());
    p
}

proptest! {
    /// The main balance can never go below zero, whatever the op sequence.
    #[test]
    fn balance_never_negative(
        initial in cents_strategy(),
        ops in proptest::collection::vec((any::<bool>(), cents_strategy()), 1..50),
    ) {
        let mut p = test_portfolio(initial);
        for (is_credit, value) in ops {
            let amount = Amount::new(value).unwrap();
            if is_credit {
                p.credit(amount);
            } else {
                let _ = p.debit(amount);
            }
            prop_assert!(p.balance >= Amount::zero());
        }
    }

    /// Moving funds between main and trading room never creates or destroys
    /// money.
    #[test]
    fn trading_room_conserves_total(
        initial in cents_strategy(),
        ops in proptest::collection::vec((any::<bool>(), cents_strategy()), 1..50),
    ) {
        let mut p = test_portfolio(initial);
        let total = p.balance.add(p.trading_room_balance);
        for (fund, value) in ops {
            let amount = Amount::new(value).unwrap();
            let _ = if fund {
                p.fund_trading_room(amount)
            } else {
                p.defund_trading_room(amount)
            };
            prop_assert_eq!(p.balance.add(p.trading_room_balance), total);
        }
    }

    /// Buying and then selling the whole position at the same price returns
    /// exactly the cash spent.
    #[test]
    fn buy_sell_round_trip_returns_cash(
        quantity in quantity_strategy(),
        price in cents_strategy(),
    ) {
        let cost = quantity * price;
        prop_assume!(Amount::new(cost).is_some());
        let mut p = test_portfolio(cost.round_dp(2) + dec!(1));
        let before = p.balance;
        let btc = AssetSymbol::new("BTC").unwrap();

        p.apply_buy(btc.clone(), quantity, price).unwrap();
        p.apply_sell(&btc, quantity, price).unwrap();

        prop_assert_eq!(p.balance, before);
        prop_assert!(p.holding(&btc).is_none());
    }

    /// A partial sell leaves exactly the unsold remainder, unless the
    /// remainder is dust.
    #[test]
    fn partial_sell_keeps_remainder(
        quantity in quantity_strategy(),
        sell_fraction_pct in 1u32..100u32,
        price in cents_strategy(),
    ) {
        prop_assume!(Amount::new(quantity * price).is_some());
        let mut p = test_portfolio((quantity * price).round_dp(2) + dec!(1));
        let btc = AssetSymbol::new("BTC").unwrap();
        p.apply_buy(btc.clone(), quantity, price).unwrap();

        let sell_quantity = (quantity * Decimal::from(sell_fraction_pct) / dec!(100)).round_dp(4);
        prop_assume!(sell_quantity > Decimal::ZERO && sell_quantity <= quantity);
        p.apply_sell(&btc, sell_quantity, price).unwrap();

        match p.holding(&btc) {
            Some(h) => prop_assert_eq!(h.quantity, quantity - sell_quantity),
            // remainder was dust
            None => prop_assert!(quantity - sell_quantity < dec!(0.00000001)),
        }
    }

    /// Conversion output is always a valid quantized amount, and identity
    /// conversion is exact.
    #[test]
    fn conversion_output_well_formed(
        value in cents_strategy(),
        rate_from in rate_strategy(),
        rate_to in rate_strategy(),
    ) {
        let eur = Currency::new("EUR").unwrap();
        let gbp = Currency::new("GBP").unwrap();
        let table = RateTable::new(Currency::usd(), Timestamp::from_millis(0))
            .with_rate(eur.clone(), rate_from)
            .with_rate(gbp.clone(), rate_to);

        let amount = Amount::new(value).unwrap();
        prop_assert_eq!(table.convert(amount, &eur, &eur).unwrap(), amount);

        let out = table.convert(amount, &eur, &gbp).unwrap();
        prop_assert!(out >= Amount::zero());
        prop_assert_eq!(out.value(), out.value().round_dp(2));
    }

    /// Subtracting what was added gets back the original amount.
    #[test]
    fn amount_add_sub_inverse(a in cents_strategy(), b in cents_strategy()) {
        let a = Amount::new(a).unwrap();
        let b = Amount::new(b).unwrap();
        prop_assert_eq!(a.add(b).checked_sub(b), Some(a));
        prop_assert_eq!(a.add(b).checked_sub(a), Some(b));
    }

    /// Generated account numbers always parse and keep their length.
    #[test]
    fn generated_account_numbers_parse(len in 8usize..=20) {
        let number = idgen::account_number(len);
        prop_assert_eq!(number.as_str().len(), len);
        prop_assert!(AccountNumber::parse(number.as_str()).is_some());
    }

    /// Any all-digit string of 8+ characters resolves as an account number,
    /// never as an email.
    #[test]
    fn receiver_digit_heuristic(digits in proptest::collection::vec(0u8..10, 8..20)) {
        let raw: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        match ReceiverRef::parse(&raw).unwrap() {
            ReceiverRef::AccountNumber(n) => prop_assert_eq!(n.as_str(), raw.as_str()),
            ReceiverRef::Email(_) => prop_assert!(false, "digits must not resolve as email"),
        }
    }

    /// A code generated for any instant inside the drift window verifies.
    #[test]
    fn totp_window_accepts_nearby_codes(
        now in 100_000i64..2_000_000_000i64,
        drift in -2i64..=2i64,
    ) {
        let secret = b"an-arbitrary-test-secret";
        let code = totp::code_at(secret, now + drift * 30, 30, 6);
        prop_assert!(totp::verify(secret, &code, now, 30, 2, 6));
    }
}
