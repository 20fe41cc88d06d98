//! Lending Market Core Simulation.
//!
//! Walks the engine through its lifecycle: supplying liquidity, borrowing
//! against collateral, health gating, interest, liquidations in single and
//! batch form, and bad debt after a collateral crash.

use lending_core::health::value_of;
use lending_core::math::unscale_decimal;
use lending_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const USDC: AssetId = AssetId(1);
const WETH: AssetId = AssetId(2);

fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lending_core=warn".into()),
        )
        .init();

    println!("Lending Market Core Simulation");
    println!("Isolated Markets, Share Accounting, Tiered LLTV\n");

    scenario_1_health_gating()?;
    scenario_2_price_shock_liquidation()?;
    scenario_3_risk_tiers()?;
    scenario_4_interest_and_exit()?;
    scenario_5_batch_policies()?;
    scenario_6_bad_debt()?;
    scenario_7_stress_test()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn price(value: Decimal) -> OraclePrice {
    OraclePrice::new_unchecked(value)
}

// one market at lltv 0.8, both prices at 1.0, lender has supplied `liquidity`
fn single_market(liquidity: u128) -> Result<(Engine, MarketId), EngineError> {
    let mut engine = Engine::new(LendingConfig::single_tier(dec!(0.8)))?;
    engine.set_time(Timestamp::now());
    let market = engine.create_market(MarketParams::new(USDC, WETH, 0))?;
    engine.oracle_mut().set_price(USDC, price(dec!(1)));
    engine.oracle_mut().set_price(WETH, price(dec!(1)));

    let lender = AccountId(1);
    engine.custody_mut().mint(lender, USDC, liquidity);
    engine.supply(market, lender, lender, liquidity)?;
    Ok((engine, market))
}

/// Borrowing is capped by collateral value times LLTV.
fn scenario_1_health_gating() -> Result<(), EngineError> {
    println!("Scenario 1: Health Gating\n");

    let (mut engine, market) = single_market(1_000)?;
    let borrower = AccountId(2);
    engine.custody_mut().mint(borrower, WETH, 100);
    engine.supply_collateral(market, borrower, borrower, 100)?;

    if let Some(state) = engine.market(market) {
        println!("  Borrower posts 100 WETH @ $1, LLTV {}", state.lltv);
    }

    match engine.borrow(market, borrower, borrower, borrower, 81) {
        Ok(_) => println!("  Borrow 81 USDC: accepted (unexpected)"),
        Err(e) => println!("  Borrow 81 USDC: rejected, {}", e),
    }

    engine.borrow(market, borrower, borrower, borrower, 80)?;
    let health = engine.position_health(market, borrower)?;
    println!("  Borrow 80 USDC: accepted");
    println!(
        "  Debt value ${}, max ${}, health factor {}\n",
        dollars(health.borrow_value),
        dollars(health.max_borrow_value),
        health.health_factor().unwrap_or(Decimal::ZERO)
    );
    Ok(())
}

/// Loan asset doubles in price and the borrower gets liquidated.
fn scenario_2_price_shock_liquidation() -> Result<(), EngineError> {
    println!("Scenario 2: Price Shock Liquidation\n");

    let (mut engine, market) = single_market(1_000)?;
    let borrower = AccountId(2);
    let liquidator = AccountId(3);
    engine.custody_mut().mint(borrower, WETH, 1_000);
    engine.custody_mut().mint(liquidator, USDC, 1_000);

    engine.supply_collateral(market, borrower, borrower, 1_000)?;
    engine.borrow(market, borrower, borrower, borrower, 800)?;
    println!("  Borrower: 1000 WETH collateral, 800 USDC debt");

    if let Err(e) = engine.borrow(market, borrower, borrower, borrower, 1) {
        println!("  One more USDC: rejected, {}", e);
    }

    engine.oracle_mut().set_price(USDC, price(dec!(2)));
    println!("  USDC reprices to $2, healthy: {}", engine.is_healthy(market, borrower)?);

    let worth_before = net_worth(&engine, liquidator, dec!(2), dec!(1))?;
    let result = engine.liquidate(liquidator, market, borrower, 500)?;
    let worth_after = net_worth(&engine, liquidator, dec!(2), dec!(1))?;

    println!(
        "  Liquidator seizes {} WETH, repays {} USDC (deltas {}, {})",
        result.seized_collateral, result.repaid_assets, result.collateral_delta, result.borrow_delta
    );
    println!("  Liquidator net worth: ${} -> ${}", dollars(worth_before), dollars(worth_after));

    let position = engine.position(market, borrower);
    println!(
        "  Borrower left with {} WETH, {} USDC debt\n",
        position.collateral,
        engine.borrow_assets_of(market, borrower)?
    );
    Ok(())
}

fn net_worth(engine: &Engine, account: AccountId, usdc_price: Decimal, weth_price: Decimal) -> Result<U256, EngineError> {
    let usdc = value_of(engine.custody().balance_of(account, USDC), price(usdc_price), Rounding::Down)?;
    let weth = value_of(engine.custody().balance_of(account, WETH), price(weth_price), Rounding::Down)?;
    usdc.checked_add(weth).ok_or(EngineError::MathOverflow)
}

// values carry ORACLE_PRICE_SCALE; shown as plain dollars
fn dollars(value: U256) -> Decimal {
    unscale_decimal(value).unwrap_or_default()
}

/// One asset pair, one market per risk bucket.
fn scenario_3_risk_tiers() -> Result<(), EngineError> {
    println!("Scenario 3: Risk Tiers\n");

    let mut engine = Engine::new(LendingConfig::bucketed())?;
    let buckets: Vec<usize> = engine.registry().iter().map(|(bucket, _)| bucket).collect();

    for bucket in buckets {
        let market = engine.create_market(MarketParams::new(USDC, WETH, bucket))?;
        if let Some(state) = engine.market(market) {
            println!(
                "  Bucket {}: market {:?}, LLTV {}, incentive {:.4}",
                bucket, market, state.lltv, state.incentive
            );
        }
    }

    let again = engine.create_market(MarketParams::new(USDC, WETH, 0))?;
    println!("  Re-creating bucket 0 returns {:?}", again);

    match engine.create_market(MarketParams::new(USDC, WETH, 99)) {
        Ok(_) => println!("  Bucket 99: accepted (unexpected)\n"),
        Err(e) => println!("  Bucket 99: {}\n", e),
    }
    Ok(())
}

/// Interest lifts the supply share price; lenders exit by shares without dust.
fn scenario_4_interest_and_exit() -> Result<(), EngineError> {
    println!("Scenario 4: Interest and Exit\n");

    let (mut engine, market) = single_market(10_000)?;
    let lender = AccountId(1);
    let borrower = AccountId(2);
    engine.custody_mut().mint(borrower, WETH, 10_000);
    engine.custody_mut().mint(borrower, USDC, 1_000);

    engine.supply_collateral(market, borrower, borrower, 10_000)?;
    engine.borrow(market, borrower, borrower, borrower, 5_000)?;
    println!(
        "  Utilization after borrow: {}%",
        engine
            .market(market)
            .and_then(|m| m.utilization())
            .map(|u| u * dec!(100))
            .unwrap_or_default()
    );

    engine.advance_time(30 * 24 * 60 * 60 * 1000);
    engine.accrue_interest(market, 250)?;
    println!("  250 USDC interest accrued after 30 days");
    println!("  Borrower owes {}", engine.borrow_assets_of(market, borrower)?);
    println!("  Lender can withdraw {}", engine.supply_assets_of(market, lender)?);

    let debt_shares = engine.position(market, borrower).borrow_shares;
    let repaid = engine.repay(market, borrower, borrower, Amount::Shares(debt_shares))?;
    println!("  Borrower repays all shares for {} USDC", repaid.assets);

    let supply_shares = engine.position(market, lender).supply_shares;
    let withdrawn = engine.withdraw(market, lender, lender, lender, Amount::Shares(supply_shares))?;
    println!("  Lender exits with {} USDC\n", withdrawn.assets);
    Ok(())
}

/// The same failing batch under both policies.
fn scenario_5_batch_policies() -> Result<(), EngineError> {
    println!("Scenario 5: Batch Liquidation Policies\n");

    for policy in [BatchPolicy::AbortOnFailure, BatchPolicy::SkipFailed] {
        let (mut engine, market) = single_market(3_000)?;
        let liquidator = AccountId(9);
        engine.custody_mut().mint(liquidator, USDC, 10_000);

        let mut items = Vec::new();
        for (i, collateral) in [1_000u128, 1_000, 1_000].into_iter().enumerate() {
            let borrower = AccountId(10 + i as u64);
            engine.custody_mut().mint(borrower, WETH, collateral);
            engine.supply_collateral(market, borrower, borrower, collateral)?;
            // the middle borrower stays conservative and survives the shock
            let debt = if i == 1 { 300 } else { 800 };
            engine.borrow(market, borrower, borrower, borrower, debt)?;
            items.push(LiquidationItem {
                market_id: market,
                borrower,
                max_collateral: 400,
            });
        }

        engine.oracle_mut().set_price(USDC, price(dec!(1.5)));

        match engine.liquidate_batch(liquidator, &items, policy) {
            Ok(batch) => println!(
                "  {:?}: {} liquidated, {} skipped, deltas ({}, {})",
                policy,
                batch.succeeded().count(),
                batch.failed().count(),
                batch.total_collateral_delta,
                batch.total_borrow_delta
            ),
            Err(e) => println!("  {:?}: {}", policy, e),
        }
    }
    println!();
    Ok(())
}

/// Collateral crash leaves debt nothing can cover; lenders absorb it.
fn scenario_6_bad_debt() -> Result<(), EngineError> {
    println!("Scenario 6: Bad Debt\n");

    let (mut engine, market) = single_market(1_000)?;
    let lender = AccountId(1);
    let borrower = AccountId(2);
    let liquidator = AccountId(3);
    engine.custody_mut().mint(borrower, WETH, 1_000);
    engine.custody_mut().mint(liquidator, USDC, 1_000);

    engine.supply_collateral(market, borrower, borrower, 1_000)?;
    engine.borrow(market, borrower, borrower, borrower, 800)?;

    engine.oracle_mut().set_price(WETH, price(dec!(0.1)));
    println!("  WETH crashes to $0.10: 1000 WETH now backs 800 USDC of debt");

    let result = engine.liquidate(liquidator, market, borrower, u128::MAX)?;
    println!(
        "  Liquidator takes all {} WETH for {} USDC, {} USDC written off",
        result.seized_collateral, result.repaid_assets, result.bad_debt
    );
    println!("  Lender claim falls to {} USDC\n", engine.supply_assets_of(market, lender)?);
    Ok(())
}

/// Many borrowers, a volatile price path, sweeping liquidations.
fn scenario_7_stress_test() -> Result<(), EngineError> {
    println!("Scenario 7: Stress Test\n");

    let (mut engine, market) = single_market(1_000_000)?;
    let keeper = AccountId(999);
    engine.custody_mut().mint(keeper, USDC, 1_000_000);

    let num_borrowers = 20u64;
    for i in 0..num_borrowers {
        let borrower = AccountId(100 + i);
        let collateral = 10_000 + u128::from(i) * 500;
        engine.custody_mut().mint(borrower, WETH, collateral);
        engine.supply_collateral(market, borrower, borrower, collateral)?;

        // leverage from 50% up to 78.5% of the allowed maximum: 0.8 * (0.5 + 0.015i)
        let debt = collateral * (400 + 12 * u128::from(i)) / 1_000;
        engine.borrow(market, borrower, borrower, borrower, debt)?;
    }
    println!("  {} borrowers opened positions", num_borrowers);

    let prices = [dec!(0.95), dec!(0.9), dec!(1.0), dec!(0.8), dec!(0.7), dec!(0.75), dec!(0.6)];
    let mut liquidations = 0;
    let mut bad_debt = 0u128;

    for weth in prices {
        engine.oracle_mut().set_price(WETH, price(weth));
        let items: Vec<LiquidationItem> = engine
            .unhealthy_positions(market)?
            .into_iter()
            .map(|borrower| LiquidationItem {
                market_id: market,
                borrower,
                max_collateral: 2_000,
            })
            .collect();

        let batch = engine.liquidate_batch(keeper, &items, BatchPolicy::SkipFailed)?;
        liquidations += batch.succeeded().count();
        bad_debt += batch.succeeded().map(|r| r.bad_debt).sum::<u128>();
        println!("  WETH ${}: {} liquidations", weth, batch.succeeded().count());
    }

    let pool = engine.market(market).map(|m| m.pool).unwrap_or_default();
    println!("  Total liquidations: {}, bad debt {}", liquidations, bad_debt);
    println!(
        "  Pool: supplied {}, borrowed {}, invariant holds: {}",
        pool.total_supply_assets,
        pool.total_borrow_assets,
        pool.check_liquidity().is_ok()
    );
    println!("  Events generated: {}", engine.events().len());
    Ok(())
}
