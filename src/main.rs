//! End-to-end venue simulation.
//!
//! Drives the full pipeline: a synthetic candle series plays the exchange,
//! flows through the exchange-side channel into the preprocessing worker,
//! and the strategy loop consumes the market channel, stepping a
//! cross-margin account against every tick.

use perp_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const SYMBOL: &str = "BTCUSDT";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perp_sim=info".into()),
        )
        .init();

    println!("Perpetual venue simulation");
    println!("candles -> exchange channel -> preprocessor -> market channel -> account\n");

    let exchange_channel = Arc::new(Channel::unbounded());
    let mut preprocessor = Preprocessor::new(Arc::clone(&exchange_channel));
    preprocessor.start();
    let market_channel = preprocessor.market_channel();

    let feeder = {
        let exchange_channel = Arc::clone(&exchange_channel);
        thread::spawn(move || {
            for kline in synthetic_candles() {
                if !exchange_channel.send(kline) {
                    break;
                }
            }
            exchange_channel.close();
        })
    };

    let mut account = Account::new(dec!(100_000), 0);
    account
        .set_symbol_leverage(SYMBOL, dec!(10))
        .expect("leverage for fresh symbol");

    // Market-buy into the first tick, scale half out mid-run.
    account.place_order(SYMBOL, dec!(2), dec!(0), Side::Long, false);

    let mut steps = 0u32;
    let mut last_snapshot = MarketSnapshot::new();
    while let Some(kline) = market_channel.recv() {
        let batch: HashMap<String, Kline> = HashMap::from([(SYMBOL.to_string(), kline)]);
        let snapshot = batch.step_map();
        account.step(&snapshot);
        last_snapshot = snapshot;
        steps += 1;

        if steps == 30 {
            account.place_order(SYMBOL, dec!(1), dec!(0), Side::Short, false);
            println!(
                "step {steps}: scaling out 1, equity {} (pnl {})",
                account.equity(),
                account.total_unrealized_pnl()
            );
        }
    }

    feeder.join().expect("feeder thread");
    preprocessor.stop();

    // Flatten whatever is left at the final price.
    account.close_position(SYMBOL, dec!(0));
    account.step(&last_snapshot);

    println!("\nsteps processed:  {steps}");
    println!("final balance:    {}", account.balance());
    println!("final equity:     {}", account.equity());
    println!("used margin:      {}", account.used_margin());
    println!("open positions:   {}", account.positions().len());
    println!("open orders:      {}", account.open_orders().len());

    let events = account.take_events();
    let fills = events
        .iter()
        .filter(|e| matches!(e, AccountEvent::Opened { .. } | AccountEvent::Closed { .. }))
        .count();
    println!("events recorded:  {} ({} fills)", events.len(), fills);
}

/// Deterministic price path: a climb, a dip, and a recovery around 30k.
fn synthetic_candles() -> Vec<Kline> {
    let mut candles = Vec::with_capacity(60);
    let mut price = dec!(30_000);
    for i in 0..60i64 {
        let drift = match i {
            0..=19 => dec!(40),
            20..=34 => dec!(-65),
            _ => dec!(55),
        };
        let open = price;
        price += drift;
        let (high, low) = if drift >= Decimal::ZERO {
            (price + dec!(10), open - dec!(10))
        } else {
            (open + dec!(10), price - dec!(10))
        };
        candles.push(Kline {
            open_time: 1_733_497_260_000 + i * 60_000,
            open,
            high,
            low,
            close: price,
            volume: dec!(5),
            close_time: 1_733_497_319_999 + i * 60_000,
            quote_volume: price * dec!(5),
            trade_count: 40,
            taker_buy_base_volume: dec!(2.5),
            taker_buy_quote_volume: price * dec!(2.5),
        });
    }
    candles
}
