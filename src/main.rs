//! Account Ledger Simulation.
//!
//! Demonstrates the full ledger lifecycle including registration, deposits,
//! P2P transfers with currency conversion, asset trades, KYC review, and
//! account deletion.

use ledger_core::*;
use rust_decimal_macros::dec;

fn main() {
    env_logger::init();

    println!("Account Ledger and Transfer Engine Simulation");
    println!("Registration, Deposits, Transfers, Trades, Lifecycle\n");

    scenario_1_registration_and_deposit();
    scenario_2_p2p_transfer();
    scenario_3_cross_currency_transfer();
    scenario_4_asset_trading();
    scenario_5_kyc_review();
    scenario_6_deposit_expiry();
    scenario_7_account_lifecycle();

    println!("\nAll simulations completed successfully.");
}

fn amount(v: rust_decimal::Decimal) -> Amount {
    Amount::new(v).expect("positive literal")
}

/// Engine with an admin account already provisioned.
fn engine_with_admin() -> (LedgerEngine, UserId) {
    let engine = LedgerEngine::new(LedgerConfig::development());
    engine.set_time(Timestamp::from_millis(1_700_000_000_000));

    let admin = engine
        .register("admin@ledger.test", "admin-password", Currency::usd())
        .expect("admin registration");
    // the first account bootstraps itself into the admin role
    engine.bootstrap_admin(admin).expect("admin bootstrap");
    (engine, admin)
}

/// Registration, PIN setup, and a confirmed deposit.
fn scenario_1_registration_and_deposit() {
    println!("Scenario 1: Registration and Deposit\n");

    let (engine, _) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();
    let user = engine.user_of(alice, alice).unwrap();
    println!("  Alice registered with account number {}", user.account_number.as_ref().unwrap());

    engine.set_transfer_pin(alice, "1234", None).unwrap();

    let deposit_id = engine
        .request_deposit(alice, amount(dec!(500)), Currency::usd(), DepositMethod::Crypto)
        .unwrap();
    engine
        .attach_provider(
            &deposit_id,
            ProviderReference {
                external_id: "prov-001".into(),
                pay_address: Some("bc1q-demo".into()),
                pay_amount: Some("0.012".into()),
            },
        )
        .unwrap();
    engine.confirm_deposit(&deposit_id).unwrap();

    let balance = engine.balance_of(alice, alice).unwrap();
    println!("  Deposit confirmed, balance: {balance} USD");
    // a second webhook for the same deposit credits nothing
    assert!(!engine.confirm_deposit(&deposit_id).unwrap());
    println!("  Duplicate confirmation ignored, balance still {balance} USD\n");
}

/// Same-currency transfer by account number.
fn scenario_2_p2p_transfer() {
    println!("Scenario 2: P2P Transfer\n");

    let (engine, admin) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();
    let bob = engine
        .register("bob@ledger.test", "battery-staple", Currency::usd())
        .unwrap();

    engine.set_transfer_pin(alice, "1234", None).unwrap();
    engine.admin_verify_user(admin, alice).unwrap();
    engine.admin_top_up(admin, alice, amount(dec!(1000))).unwrap();

    let bob_number = engine
        .user_of(bob, bob)
        .unwrap()
        .account_number
        .unwrap();
    let transfer_id = engine
        .transfer(alice, bob_number.as_str(), amount(dec!(250)), "1234", None, Some("lunch".into()))
        .unwrap();

    println!("  Transfer {transfer_id} executed");
    println!("  Alice: {} USD", engine.balance_of(alice, alice).unwrap());
    println!("  Bob:   {} USD\n", engine.balance_of(bob, bob).unwrap());
}

/// EUR receiver, USD sender; amounts pivot through the base currency.
fn scenario_3_cross_currency_transfer() {
    println!("Scenario 3: Cross-Currency Transfer\n");

    let (engine, admin) = engine_with_admin();
    let eur = Currency::new("EUR").unwrap();
    engine.set_rate(admin, eur.clone(), dec!(0.9)).unwrap();

    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();
    let claire = engine
        .register("claire@ledger.test", "paperclip-nine", eur)
        .unwrap();

    engine.set_transfer_pin(alice, "1234", None).unwrap();
    engine.admin_verify_user(admin, alice).unwrap();
    engine.admin_top_up(admin, alice, amount(dec!(100))).unwrap();

    engine
        .transfer(alice, "claire@ledger.test", amount(dec!(100)), "1234", None, None)
        .unwrap();

    println!("  Alice sent 100.00 USD");
    println!("  Claire received {} EUR\n", engine.balance_of(claire, claire).unwrap());
}

/// Buys, sells, and the trading room balance.
fn scenario_4_asset_trading() {
    println!("Scenario 4: Asset Trading\n");

    let (engine, admin) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();
    engine.admin_top_up(admin, alice, amount(dec!(10000))).unwrap();

    let btc = AssetSymbol::new("BTC").unwrap();
    engine.buy_asset(alice, btc.clone(), dec!(0.1), dec!(50000)).unwrap();
    engine.buy_asset(alice, btc.clone(), dec!(0.1), dec!(40000)).unwrap();

    let portfolio = engine.portfolio_of(alice, alice).unwrap();
    let holding = portfolio.holding(&btc).unwrap();
    println!("  Position: {} BTC, average entry {}", holding.quantity, holding.average_price);

    engine.sell_asset(alice, btc.clone(), dec!(0.2), dec!(60000)).unwrap();
    println!("  Sold at 60000, balance: {} USD", engine.balance_of(alice, alice).unwrap());

    engine.fund_trading_room(alice, amount(dec!(2000))).unwrap();
    let portfolio = engine.portfolio_of(alice, alice).unwrap();
    println!(
        "  Trading room funded: main {} / room {}\n",
        portfolio.balance, portfolio.trading_room_balance
    );
}

/// Submission, rejection with reason, resubmission, approval.
fn scenario_5_kyc_review() {
    println!("Scenario 5: KYC Review\n");

    let (engine, admin) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();

    let fields = KycFields {
        full_name: "Alice Example".into(),
        date_of_birth: "1990-01-01".into(),
        country: "BR".into(),
        document_type: "PASSPORT".into(),
        document_number: "X123456".into(),
    };
    engine.submit_kyc(alice, fields.clone()).unwrap();
    engine
        .review_kyc(
            admin,
            alice,
            KycDecision::Reject {
                reason: "document unreadable".into(),
            },
        )
        .unwrap();
    println!(
        "  First submission rejected: {:?}",
        engine.kyc_of(alice, alice).unwrap().rejection_reason
    );

    engine.submit_kyc(alice, fields).unwrap();
    engine.review_kyc(admin, alice, KycDecision::Approve).unwrap();
    println!(
        "  Resubmission approved, verified: {}\n",
        engine.is_verified(alice).unwrap()
    );
}

/// Pending deposits expire after the configured window.
fn scenario_6_deposit_expiry() {
    println!("Scenario 6: Deposit Expiry\n");

    let (engine, _) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();

    let deposit_id = engine
        .request_deposit(alice, amount(dec!(50)), Currency::usd(), DepositMethod::BankTransfer)
        .unwrap();

    engine.advance_time(25 * 3_600_000);
    let expired = engine.sweep_expired_deposits();
    println!("  Swept {} expired deposit(s)", expired.len());
    assert_eq!(expired, vec![deposit_id.clone()]);
    assert!(engine.confirm_deposit(&deposit_id).is_err());
    println!("  Expired deposit can no longer be confirmed\n");
}

/// Soft delete, restore, and the guarded permanent delete.
fn scenario_7_account_lifecycle() {
    println!("Scenario 7: Account Lifecycle\n");

    let (engine, admin) = engine_with_admin();
    let alice = engine
        .register("alice@ledger.test", "correct-horse", Currency::usd())
        .unwrap();
    engine.admin_top_up(admin, alice, amount(dec!(10))).unwrap();

    engine.soft_delete(alice, alice).unwrap();
    assert!(engine.authenticate("alice@ledger.test", "correct-horse").is_err());
    println!("  Alice soft-deleted; login refused");

    engine.restore(admin, alice).unwrap();
    println!("  Admin restored the account");

    // permanent deletion refuses while funds remain
    assert!(matches!(
        engine.purge(admin, alice),
        Err(LedgerError::BalanceNotEmpty)
    ));
    engine.admin_verify_user(admin, alice).unwrap();
    engine.set_transfer_pin(alice, "1234", None).unwrap();
    engine.withdraw(alice, amount(dec!(10)), "1234", None).unwrap();
    engine.purge(admin, alice).unwrap();
    println!("  Emptied and permanently deleted\n");
}
