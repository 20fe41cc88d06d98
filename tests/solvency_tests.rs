//! Solvency invariant tests.
//!
//! These tests drive the engine with random operation sequences and verify the
//! invariants that keep a market solvent after every committed step.

use lending_core::health::value_of;
use lending_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const LOAN: AssetId = AssetId(1);
const COLLATERAL: AssetId = AssetId(2);
const LIQUIDATOR: AccountId = AccountId(99);
const USERS: u64 = 4;

#[derive(Debug, Clone)]
enum Op {
    Supply(u64, u128),
    Withdraw(u64, u128),
    WithdrawAll(u64),
    SupplyCollateral(u64, u128),
    WithdrawCollateral(u64, u128),
    Borrow(u64, u128),
    Repay(u64, u128),
    RepayAll(u64),
    Accrue(u128),
    CollateralPrice(usize),
    Liquidate(u64, u128),
}

const COLLATERAL_PRICES: [Decimal; 6] = [dec!(0.05), dec!(0.5), dec!(0.8), dec!(1.0), dec!(1.5), dec!(2.0)];

// amounts are whole tokens of `unit` base units each, plus an odd remainder
// so conversions at large scale still round
fn op_strategy(unit: u128) -> impl Strategy<Value = Op> {
    let user = 1u64..=USERS;
    let amount = move |max: u128| (1u128..max, 0u128..1_000).prop_map(move |(a, dust)| a * unit + dust);
    prop_oneof![
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::Supply(u, a)),
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::Withdraw(u, a)),
        user.clone().prop_map(Op::WithdrawAll),
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::SupplyCollateral(u, a)),
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::WithdrawCollateral(u, a)),
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::Borrow(u, a)),
        (user.clone(), amount(10_000)).prop_map(|(u, a)| Op::Repay(u, a)),
        user.clone().prop_map(Op::RepayAll),
        amount(500).prop_map(Op::Accrue),
        (0usize..COLLATERAL_PRICES.len()).prop_map(Op::CollateralPrice),
        (user, amount(20_000)).prop_map(|(u, a)| Op::Liquidate(u, a)),
    ]
}

fn setup() -> (Engine, MarketId) {
    setup_scaled(1)
}

fn setup_scaled(unit: u128) -> (Engine, MarketId) {
    let mut engine = Engine::new(LendingConfig::single_tier(dec!(0.8))).unwrap();
    let market = engine.create_market(MarketParams::new(LOAN, COLLATERAL, 0)).unwrap();
    engine.oracle_mut().set_price(LOAN, OraclePrice::new_unchecked(dec!(1)));
    engine.oracle_mut().set_price(COLLATERAL, OraclePrice::new_unchecked(dec!(1)));

    for user in 1..=USERS {
        engine.custody_mut().mint(AccountId(user), LOAN, 1_000_000 * unit);
        engine.custody_mut().mint(AccountId(user), COLLATERAL, 1_000_000 * unit);
    }
    engine.custody_mut().mint(LIQUIDATOR, LOAN, 10_000_000 * unit);
    (engine, market)
}

fn apply(engine: &mut Engine, market: MarketId, op: &Op) -> Result<(), EngineError> {
    match *op {
        Op::Supply(u, a) => engine.supply(market, AccountId(u), AccountId(u), a).map(|_| ()),
        Op::Withdraw(u, a) => engine
            .withdraw(market, AccountId(u), AccountId(u), AccountId(u), Amount::Assets(a))
            .map(|_| ()),
        Op::WithdrawAll(u) => {
            let shares = engine.position(market, AccountId(u)).supply_shares;
            engine
                .withdraw(market, AccountId(u), AccountId(u), AccountId(u), Amount::Shares(shares))
                .map(|_| ())
        }
        Op::SupplyCollateral(u, a) => engine.supply_collateral(market, AccountId(u), AccountId(u), a),
        Op::WithdrawCollateral(u, a) => {
            engine.withdraw_collateral(market, AccountId(u), AccountId(u), AccountId(u), a)
        }
        Op::Borrow(u, a) => engine
            .borrow(market, AccountId(u), AccountId(u), AccountId(u), a)
            .map(|_| ()),
        Op::Repay(u, a) => engine
            .repay(market, AccountId(u), AccountId(u), Amount::Assets(a))
            .map(|_| ()),
        Op::RepayAll(u) => {
            let shares = engine.position(market, AccountId(u)).borrow_shares;
            engine
                .repay(market, AccountId(u), AccountId(u), Amount::Shares(shares))
                .map(|_| ())
        }
        Op::Accrue(interest) => engine.accrue_interest(market, interest),
        Op::CollateralPrice(i) => {
            engine
                .oracle_mut()
                .set_price(COLLATERAL, OraclePrice::new_unchecked(COLLATERAL_PRICES[i]));
            Ok(())
        }
        Op::Liquidate(u, a) => engine.liquidate(LIQUIDATOR, market, AccountId(u), a).map(|_| ()),
    }
}

fn snapshot(engine: &Engine, market: MarketId) -> (PoolTotals, Vec<Position>, u128, u128) {
    let pool = engine.market(market).unwrap().pool;
    let positions = (1..=USERS).map(|u| engine.position(market, AccountId(u))).collect();
    (
        pool,
        positions,
        engine.custody().vault_balance(LOAN),
        engine.custody().vault_balance(COLLATERAL),
    )
}

fn check_invariants(engine: &Engine, market: MarketId) -> Result<(), TestCaseError> {
    let pool = engine.market(market).unwrap().pool;

    // liquidity invariant
    prop_assert!(
        pool.total_borrow_assets <= pool.total_supply_assets,
        "borrowed {} > supplied {}",
        pool.total_borrow_assets,
        pool.total_supply_assets
    );

    // share totals are exactly the sum of position shares
    let mut supply_shares = 0u128;
    let mut borrow_shares = 0u128;
    let mut collateral = 0u128;
    for (_, position) in engine.positions().in_market(market) {
        supply_shares += position.supply_shares;
        borrow_shares += position.borrow_shares;
        collateral += position.collateral;
    }
    prop_assert_eq!(supply_shares, pool.total_supply_shares);
    prop_assert_eq!(borrow_shares, pool.total_borrow_shares);

    // no debt without shares to owe it
    if pool.total_borrow_shares == 0 {
        prop_assert_eq!(pool.total_borrow_assets, 0);
    }

    // the vault holds every unit of collateral and all idle liquidity
    prop_assert_eq!(collateral, engine.custody().vault_balance(COLLATERAL));
    prop_assert!(
        engine.custody().vault_balance(LOAN) >= pool.available_liquidity(),
        "vault {} below idle liquidity {}",
        engine.custody().vault_balance(LOAN),
        pool.available_liquidity()
    );
    Ok(())
}

fn run_ops(unit: u128, ops: &[Op]) -> Result<(), TestCaseError> {
    let (mut engine, market) = setup_scaled(unit);

    for op in ops {
        let before = snapshot(&engine, market);
        let events_before = engine.events().len();

        if let Err(e) = apply(&mut engine, market, op) {
            prop_assert_eq!(snapshot(&engine, market), before, "{:?} failed with {} but changed state", op, e);
            prop_assert_eq!(engine.events().len(), events_before);
        }

        check_invariants(&engine, market)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Invariants hold after every committed operation; failed operations change nothing
    #[test]
    fn invariants_hold_under_random_operations(
        ops in proptest::collection::vec(op_strategy(1), 1..60),
    ) {
        run_ops(1, &ops)?;
    }

    /// Same sequences in 18-decimal tokens
    #[test]
    fn invariants_hold_at_token_scale(
        ops in proptest::collection::vec(op_strategy(WAD), 1..60),
    ) {
        run_ops(WAD, &ops)?;
    }

    /// Liquidation never seizes more than held nor repays more than owed
    #[test]
    fn liquidation_stays_within_position(
        collateral in 1_000u128..1_000_000,
        leverage_pct in 50u128..=100,
        loan_price_bps in 10_001i64..40_000,
        max_collateral in 1u128..2_000_000,
    ) {
        let (mut engine, market) = setup();
        let borrower = AccountId(1);
        let lender = AccountId(2);
        engine.custody_mut().mint(lender, LOAN, 10_000_000);
        engine.custody_mut().mint(borrower, COLLATERAL, collateral);
        engine.supply(market, lender, lender, 10_000_000).unwrap();
        engine.supply_collateral(market, borrower, borrower, collateral).unwrap();

        let debt = collateral * 8 / 10 * leverage_pct / 100;
        prop_assume!(debt > 0);
        engine.borrow(market, borrower, borrower, borrower, debt).unwrap();

        engine.oracle_mut().set_price(LOAN, OraclePrice::new_unchecked(Decimal::new(loan_price_bps, 4)));
        prop_assume!(!engine.is_healthy(market, borrower).unwrap());

        let before = engine.position(market, borrower);
        let owed = engine.borrow_assets_of(market, borrower).unwrap();

        if let Ok(result) = engine.liquidate(LIQUIDATOR, market, borrower, max_collateral) {
            let after = engine.position(market, borrower);

            prop_assert!(result.seized_collateral <= before.collateral);
            prop_assert!(result.seized_collateral <= max_collateral);
            prop_assert!(result.repaid_assets <= owed);
            prop_assert!(result.repaid_shares <= before.borrow_shares);
            prop_assert_eq!(after.collateral, before.collateral - result.seized_collateral);
            prop_assert!(after.borrow_shares < before.borrow_shares);
            prop_assert_eq!(result.collateral_delta, -(result.seized_collateral as i128));
            prop_assert_eq!(result.borrow_delta, -(result.repaid_assets as i128));
            check_invariants(&engine, market)?;
        }
    }

    /// When collateral covers the debt plus incentive, liquidation lowers the
    /// debt-to-collateral ratio or clears the debt
    #[test]
    fn liquidation_improves_covered_positions(
        collateral in 10_000u128..1_000_000,
        loan_price_bps in 10_100i64..11_000,
        seize_pct in 10u128..=100,
    ) {
        let (mut engine, market) = setup();
        let borrower = AccountId(1);
        let lender = AccountId(2);
        engine.custody_mut().mint(lender, LOAN, 10_000_000);
        engine.custody_mut().mint(borrower, COLLATERAL, collateral);
        engine.supply(market, lender, lender, 10_000_000).unwrap();
        engine.supply_collateral(market, borrower, borrower, collateral).unwrap();
        engine.borrow(market, borrower, borrower, borrower, collateral * 8 / 10).unwrap();

        let loan_price = OraclePrice::new_unchecked(Decimal::new(loan_price_bps, 4));
        let collateral_price = OraclePrice::new_unchecked(dec!(1));
        engine.oracle_mut().set_price(LOAN, loan_price);
        prop_assume!(!engine.is_healthy(market, borrower).unwrap());

        // (debt value, collateral value); ratios compare by cross-multiplying
        let values = |engine: &Engine| -> Option<(U256, U256)> {
            let debt = engine.borrow_assets_of(market, borrower).unwrap();
            let held = engine.position(market, borrower).collateral;
            if held == 0 {
                return None;
            }
            Some((
                value_of(debt, loan_price, Rounding::Up).unwrap(),
                value_of(held, collateral_price, Rounding::Down).unwrap(),
            ))
        };

        let (debt_before, held_before) = values(&engine).unwrap();
        let seize = (collateral * seize_pct / 100).max(1_000);
        let result = engine.liquidate(LIQUIDATOR, market, borrower, seize).unwrap();

        match values(&engine) {
            Some((debt_after, held_after)) => {
                let debt_left = engine.borrow_assets_of(market, borrower).unwrap();
                prop_assert!(
                    debt_left == 0 || debt_after * held_before < debt_before * held_after,
                    "ratio {}/{} -> {}/{}",
                    debt_before,
                    held_before,
                    debt_after,
                    held_after
                );
            }
            None => prop_assert_eq!(engine.position(market, borrower).borrow_shares, 0),
        }
        prop_assert!(result.repaid_assets > 0);
    }

    /// Liquidation after a price move works on positions of 1e18 to 1e30 base units
    #[test]
    fn liquidation_at_token_scale(
        collateral in WAD..WAD * 1_000_000_000_000,
        leverage_pct in 90u128..=100,
        loan_price_bps in 12_000i64..40_000,
        seize_pct in 1u128..=100,
    ) {
        let (mut engine, market) = setup();
        let borrower = AccountId(1);
        let lender = AccountId(2);
        engine.custody_mut().mint(lender, LOAN, collateral);
        engine.custody_mut().mint(borrower, COLLATERAL, collateral);
        engine.custody_mut().mint(LIQUIDATOR, LOAN, collateral);
        engine.supply(market, lender, lender, collateral).unwrap();
        engine.supply_collateral(market, borrower, borrower, collateral).unwrap();

        let debt = collateral / 10 * 8 / 100 * leverage_pct;
        engine.borrow(market, borrower, borrower, borrower, debt).unwrap();
        prop_assert_eq!(engine.supply_assets_of(market, lender).unwrap(), collateral);

        engine.oracle_mut().set_price(LOAN, OraclePrice::new_unchecked(Decimal::new(loan_price_bps, 4)));
        prop_assert!(!engine.is_healthy(market, borrower).unwrap());

        let before = engine.position(market, borrower);
        let owed = engine.borrow_assets_of(market, borrower).unwrap();
        let seize = (collateral / 100 * seize_pct).max(1);
        let result = engine.liquidate(LIQUIDATOR, market, borrower, seize).unwrap();

        prop_assert!(result.seized_collateral <= seize);
        prop_assert!(result.repaid_assets <= owed);
        prop_assert!(result.repaid_assets > 0);
        prop_assert!(engine.position(market, borrower).borrow_shares < before.borrow_shares);
        check_invariants(&engine, market)?;
    }

    /// An aborting batch either commits every item or leaves the market untouched
    #[test]
    fn aborting_batch_is_all_or_nothing(
        healthy_index in 0usize..3,
        make_one_healthy in any::<bool>(),
    ) {
        let (mut engine, market) = setup();
        let lender = AccountId(4);
        engine.supply(market, lender, lender, 100_000).unwrap();

        let mut items = Vec::new();
        for u in 1..=3u64 {
            let borrower = AccountId(u);
            engine.supply_collateral(market, borrower, borrower, 10_000).unwrap();
            let debt = if make_one_healthy && (u as usize - 1) == healthy_index { 2_000 } else { 8_000 };
            engine.borrow(market, borrower, borrower, borrower, debt).unwrap();
            items.push(LiquidationItem { market_id: market, borrower, max_collateral: 3_000 });
        }
        engine.oracle_mut().set_price(LOAN, OraclePrice::new_unchecked(dec!(1.2)));

        let before = snapshot(&engine, market);
        let result = engine.liquidate_batch(LIQUIDATOR, &items, BatchPolicy::AbortOnFailure);

        if make_one_healthy {
            match result {
                Err(EngineError::BatchItemFailed { index, source }) => {
                    prop_assert_eq!(index, healthy_index);
                    let is_healthy_error = matches!(*source, EngineError::PositionHealthy { .. });
                    prop_assert!(is_healthy_error);
                }
                other => prop_assert!(false, "expected batch failure, got {:?}", other),
            }
            prop_assert_eq!(snapshot(&engine, market), before);
        } else {
            let batch = result.unwrap();
            prop_assert_eq!(batch.succeeded().count(), 3);
            prop_assert!(batch.total_collateral_delta < 0);
        }
        check_invariants(&engine, market)?;
    }
}
