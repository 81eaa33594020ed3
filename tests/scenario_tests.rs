//! Full-engine trading scenarios.
//!
//! Each test walks the account through a complete storyline (orders, ticks,
//! closes) and pins the resulting ledger down to exact decimal values.
//! VIP 0 rates apply throughout: maker 0.0002, taker 0.0005.

use perp_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn snapshot(entries: &[(&str, Decimal, Decimal)]) -> MarketSnapshot {
    entries
        .iter()
        .map(|(symbol, price, volume)| {
            (
                symbol.to_string(),
                SymbolTick {
                    price: Price::new_unchecked(*price),
                    volume: *volume,
                },
            )
        })
        .collect()
}

/// A limit buy larger than the tick's volume fills piecewise across steps
/// and keeps merging into the same position.
#[test]
fn partial_fill_carries_over() {
    let mut account = Account::new(dec!(5_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    account.place_order("BTCUSDT", dec!(5), dec!(1_000), Side::Long, false);

    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(2))]));

    // Filled 2: margin 200, maker fee 2000 * 0.0002 = 0.4.
    assert_eq!(account.positions().len(), 1);
    let position = &account.positions()[0];
    assert_eq!(position.quantity, dec!(2));
    assert_eq!(position.entry_price.value(), dec!(1_000));
    assert_eq!(position.initial_margin.value(), dec!(200));
    assert_eq!(account.balance().value(), dec!(4_799.6));
    assert_eq!(account.open_orders().len(), 1);
    assert_eq!(account.open_orders()[0].quantity, dec!(3));

    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));

    // Remaining 3 filled: margin 300, fee 0.6; one merged position.
    assert!(account.open_orders().is_empty());
    let position = &account.positions()[0];
    assert_eq!(position.quantity, dec!(5));
    assert_eq!(position.entry_price.value(), dec!(1_000));
    assert_eq!(account.balance().value(), dec!(4_499.0));
    assert_eq!(account.used_margin().value(), dec!(500));
}

/// In one-way mode an opposing order reduces the standing position instead
/// of opening the other side.
#[test]
fn one_way_auto_reduce() {
    let mut account = Account::new(dec!(10_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();

    account.place_order("BTCUSDT", dec!(2), dec!(9_000), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(9_000), dec!(10))]));
    assert_eq!(account.positions()[0].quantity, dec!(2));
    assert_eq!(account.positions()[0].side, Side::Long);

    account.place_order("BTCUSDT", dec!(1), dec!(9_000), Side::Short, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(9_000), dec!(10))]));

    let positions = account.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].side, Side::Long);
    assert_eq!(positions[0].quantity, dec!(1));
}

/// Hedge mode: several same-side openers end the step as one position with
/// a volume-weighted entry at the fill price.
#[test]
fn hedge_mode_openers_merge() {
    let mut account = Account::new(dec!(10_000), 0);
    account.set_position_mode(true);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();

    for quantity in [dec!(1), dec!(2), dec!(3)] {
        account.place_order("BTCUSDT", quantity, dec!(10_000), Side::Long, false);
    }
    account.step(&snapshot(&[("BTCUSDT", dec!(9_000), dec!(10))]));

    let positions = account.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(6));
    assert_eq!(positions[0].entry_price.value(), dec!(9_000));
    assert_eq!(positions[0].notional.value(), dec!(54_000));
}

/// Hedge mode carries a long and a short on the same symbol at once; a side
/// move nets their pnl.
#[test]
fn hedge_mode_holds_both_sides() {
    let mut account = Account::new(dec!(100_000), 0);
    account.set_position_mode(true);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();

    account.place_order("BTCUSDT", dec!(2), dec!(30_000), Side::Long, false);
    account.place_order("BTCUSDT", dec!(1), dec!(30_000), Side::Short, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(30_000), dec!(999_999))]));

    assert_eq!(account.positions().len(), 2);

    account.step(&snapshot(&[("BTCUSDT", dec!(31_000), dec!(0))]));
    // Long +2000, short -1000.
    assert_eq!(account.total_unrealized_pnl().value(), dec!(1_000));
}

/// A crash below the maintenance threshold wipes the whole account.
#[test]
fn liquidation_resets_everything() {
    let mut account = Account::new(dec!(2_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    account.place_order("BTCUSDT", dec!(4), dec!(500), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(500), dec!(10))]));
    assert_eq!(account.positions().len(), 1);

    account.step(&snapshot(&[("BTCUSDT", dec!(50), dec!(10))]));

    assert_eq!(account.balance().value(), dec!(0));
    assert_eq!(account.used_margin().value(), dec!(0));
    assert!(account.positions().is_empty());
    assert!(account.open_orders().is_empty());
    assert!(account
        .events()
        .iter()
        .any(|e| matches!(e, AccountEvent::Liquidated { .. })));
}

/// Leverage increase whose margin delta exceeds the wallet but not equity:
/// unrealized pnl covers the difference and the balance goes negative.
#[test]
fn margin_delta_covered_by_pnl_drives_balance_negative() {
    let mut account = Account::new(dec!(600), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(20)).unwrap();

    // 1 BTC at 10000: margin 500, taker fee 5, balance 95.
    account.place_order("BTCUSDT", dec!(1), dec!(0), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(10_000), dec!(5))]));
    assert_eq!(account.balance().value(), dec!(95));

    // Price doubles: +10000 unrealized.
    account.step(&snapshot(&[("BTCUSDT", dec!(20_000), dec!(0))]));
    assert_eq!(account.total_unrealized_pnl().value(), dec!(10_000));

    // 20x -> 10x needs another 500 of margin; only pnl covers it.
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    assert_eq!(account.balance().value(), dec!(-405));
    assert_eq!(account.used_margin().value(), dec!(1_000));
    assert!(account.equity().value() > Decimal::ZERO);
}

/// Opening and fully closing at the same price costs exactly the two fees;
/// margin round-trips through the wallet.
#[test]
fn open_close_round_trip_costs_only_fees() {
    let mut account = Account::new(dec!(50_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();

    account.place_order("BTCUSDT", dec!(2), dec!(0), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(10_000), dec!(10))]));
    account.close_position("BTCUSDT", dec!(0));
    account.step(&snapshot(&[("BTCUSDT", dec!(10_000), dec!(10))]));

    assert!(account.positions().is_empty());
    assert_eq!(account.used_margin().value(), dec!(0));
    // Open fee 20000 * 0.0005 = 10, close fee likewise 10.
    assert_eq!(account.balance().value(), dec!(50_000) - dec!(20));
}

/// A cancelled order can never fill afterwards.
#[test]
fn cancelled_order_never_fills() {
    let mut account = Account::new(dec!(10_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    account.place_order("BTCUSDT", dec!(3), dec!(1_000), Side::Long, false);

    // Partial fill, then cancel the leftover.
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(1))]));
    assert_eq!(account.positions()[0].quantity, dec!(1));
    let order_id = account.open_orders()[0].id;
    account.cancel_order_by_id(order_id);

    let balance = account.balance();
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(100))]));
    assert_eq!(account.positions()[0].quantity, dec!(1));
    assert_eq!(account.balance(), balance);
}

/// Closing twice without a step queues a duplicate closer; once the first
/// one empties the position the duplicate stays queued, and a later close
/// call finds nothing to close.
#[test]
fn duplicate_close_becomes_inert() {
    let mut account = Account::new(dec!(10_000), 0);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    account.place_order("BTCUSDT", dec!(1), dec!(0), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));

    account.close_position("BTCUSDT", dec!(0));
    account.close_position("BTCUSDT", dec!(0));
    assert_eq!(account.open_orders().len(), 2);

    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));
    assert!(account.positions().is_empty());
    assert_eq!(account.open_orders().len(), 1);

    // With no position left, further closes are no-ops.
    account.close_position("BTCUSDT", dec!(0));
    assert_eq!(account.open_orders().len(), 1);
}

/// Reduce-only orders shrink matching exposure and evaporate when none is
/// left, across steps.
#[test]
fn reduce_only_lifecycle() {
    let mut account = Account::new(dec!(10_000), 0);
    account.set_position_mode(true);
    account.set_symbol_leverage("BTCUSDT", dec!(10)).unwrap();
    account.place_order("BTCUSDT", dec!(2), dec!(0), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));

    // Oversized reduce-only long: closes 2, carries the remaining 3.
    account.place_order("BTCUSDT", dec!(5), dec!(0), Side::Long, true);
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));
    assert!(account.positions().is_empty());
    assert_eq!(account.open_orders().len(), 1);
    assert!(account.open_orders()[0].reduce_only);

    // Nothing left to reduce: the residual evaporates.
    account.step(&snapshot(&[("BTCUSDT", dec!(1_000), dec!(10))]));
    assert!(account.open_orders().is_empty());
    assert!(account.positions().is_empty());
}

/// Two symbols settle independently against one snapshot; profits on one
/// leg offset losses on the other inside a single equity pool.
#[test]
fn cross_margin_spans_symbols() {
    let mut account = Account::new(dec!(50_000), 1);
    account.set_symbol_leverage("BTCUSDT", dec!(20)).unwrap();
    account.set_symbol_leverage("ETHUSDT", dec!(20)).unwrap();

    // VIP 1: maker 0.00016, taker 0.00040.
    account.place_order("BTCUSDT", dec!(2), dec!(20_000), Side::Long, false);
    account.place_order("ETHUSDT", dec!(10), dec!(0), Side::Short, false);
    account.step(&snapshot(&[
        ("BTCUSDT", dec!(20_000), dec!(10)),
        ("ETHUSDT", dec!(2_000), dec!(20)),
    ]));

    // BTC: margin 2000, maker fee 6.4. ETH: margin 1000, taker fee 8.
    assert_eq!(account.balance().value(), dec!(46_985.6));
    assert_eq!(account.used_margin().value(), dec!(3_000));

    account.step(&snapshot(&[
        ("BTCUSDT", dec!(21_000), dec!(0)),
        ("ETHUSDT", dec!(1_900), dec!(0)),
    ]));
    // Long +2000, short +1000.
    assert_eq!(account.total_unrealized_pnl().value(), dec!(3_000));
    assert_eq!(account.equity().value(), dec!(49_985.6));
}

/// Fee and tier tables are injected: a zero-fee schedule with a single
/// coarse tier changes the ledger accordingly.
#[test]
fn injected_tables_replace_defaults() {
    let fees = FeeSchedule::new(vec![FeeRate {
        maker: Decimal::ZERO,
        taker: Decimal::ZERO,
    }]);
    let tiers = MarginTierTable::new(vec![MarginTier {
        notional_cap: Decimal::MAX,
        maintenance_margin_rate: dec!(0.1),
        max_leverage: Leverage::new(dec!(5)).unwrap(),
    }]);
    let mut account = Account::with_config(dec!(10_000), 0, fees, tiers);
    account.set_symbol_leverage("BTCUSDT", dec!(5)).unwrap();

    account.place_order("BTCUSDT", dec!(1), dec!(0), Side::Long, false);
    account.step(&snapshot(&[("BTCUSDT", dec!(5_000), dec!(10))]));

    // No fees, margin 1000, maintenance 500.
    assert_eq!(account.balance().value(), dec!(9_000));
    assert_eq!(account.positions()[0].maintenance_margin.value(), dec!(500));
}
