//! Simulated perpetual futures venue.
//!
//! A replayable candle stream feeds a per-account matching and settlement
//! engine through channel plumbing. The account engine does cross-margin
//! accounting with tiered maintenance requirements, symbol-scoped leverage,
//! one-way and hedge position modes, reduce-only semantics, partial fills,
//! weighted-average position merging, and full forced liquidation. All
//! engine computation is deterministic and pure; the only threads live in
//! the channel and preprocessing layers.

pub mod account;
pub mod channel;
pub mod config;
pub mod events;
pub mod history;
pub mod market;
pub mod order;
pub mod position;
pub mod preprocess;
pub mod types;

pub use account::{Account, AccountError};
pub use channel::{Channel, OverflowPolicy};
pub use config::{FeeRate, FeeSchedule, MarginTier, MarginTierTable};
pub use events::AccountEvent;
pub use history::{HistoryError, KlineHistory};
pub use market::{DataFeed, Kline, MarketSnapshot, MarketView, OrderRequest, SymbolTick};
pub use order::Order;
pub use position::Position;
pub use preprocess::Preprocessor;
pub use types::{Leverage, OrderId, PositionId, Price, Quote, Side, EPSILON};
