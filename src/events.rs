//! Account event log.
//!
//! Every state change in the account produces an event. Consumers (the demo
//! strategy loop, data-feed position callbacks, tests) drain these between
//! steps; the account itself never reads them back.

use crate::types::{OrderId, PositionId, Price, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountEvent {
    OrderPlaced {
        order_id: OrderId,
        symbol: String,
        side: Side,
        quantity: Decimal,
        price: Option<Price>,
        reduce_only: bool,
    },
    OrderCancelled {
        order_id: OrderId,
    },
    /// An opener fill created or grew a position.
    Opened {
        order_id: OrderId,
        position_id: PositionId,
        symbol: String,
        side: Side,
        quantity: Decimal,
        fill_price: Price,
        fee: Quote,
    },
    /// A closer or reduce-only fill shrank a position.
    Closed {
        order_id: OrderId,
        position_id: PositionId,
        symbol: String,
        quantity: Decimal,
        fill_price: Price,
        realized_pnl: Quote,
        fee: Quote,
    },
    /// Equity fell below total maintenance margin; everything was wiped.
    Liquidated {
        equity: Quote,
        maintenance_required: Quote,
    },
}

/// Append-only buffer the account writes into.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<AccountEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: AccountEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AccountEvent] {
        &self.events
    }

    /// Hand the buffered events to the caller and start a fresh buffer.
    pub fn take(&mut self) -> Vec<AccountEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
