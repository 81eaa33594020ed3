//! Market data carriers and the capability seams around the engine.
//!
//! The account only ever consumes a `symbol -> (price, available volume)`
//! snapshot per step. Candles, feeds, and any richer DTOs fan into that
//! narrow view through [`MarketView`].

use crate::position::Position;
use crate::types::{Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One candlestick as replayed from historical data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    /// Milliseconds since epoch.
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
    pub quote_volume: Decimal,
    pub trade_count: u32,
    pub taker_buy_base_volume: Decimal,
    pub taker_buy_quote_volume: Decimal,
}

impl Kline {
    /// The engine-facing view of this candle: trades at the close, offering
    /// the candle's full base volume.
    pub fn tick(&self) -> Option<SymbolTick> {
        Price::new(self.close).map(|price| SymbolTick {
            price,
            volume: self.volume,
        })
    }
}

/// What the matching tick sees for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTick {
    pub price: Price,
    /// Volume available to fill against this step.
    pub volume: Decimal,
}

/// Per-step input to [`crate::Account::step`].
pub type MarketSnapshot = HashMap<String, SymbolTick>;

/// Anything that can produce the per-step snapshot. DTO carriers implement
/// this; the engine's contract stays fixed at the snapshot shape.
pub trait MarketView {
    fn step_map(&self) -> MarketSnapshot;
}

/// A batch of candles keyed by symbol is the canonical carrier.
impl MarketView for HashMap<String, Kline> {
    fn step_map(&self) -> MarketSnapshot {
        self.iter()
            .filter_map(|(symbol, kline)| kline.tick().map(|t| (symbol.clone(), t)))
            .collect()
    }
}

/// Order submission DTO for the data-feed surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: Decimal,
    /// `<= 0` means market.
    pub price: Decimal,
    pub side: Side,
    pub reduce_only: bool,
}

/// Venue-facing capability consumed by strategies: subscribe to market data
/// and position updates, submit orders. Implementations may target a real
/// venue or the simulator.
pub trait DataFeed<M> {
    fn on_market_data(&mut self, callback: Box<dyn FnMut(&M) + Send>);
    fn on_position_update(&mut self, callback: Box<dyn FnMut(&Position) + Send>);
    fn send_order(&mut self, request: OrderRequest);
}
