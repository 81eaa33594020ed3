//! Order intents.
//!
//! An order is one symbol, a remaining quantity, and a price that selects
//! market (absent) or limit (present). Engine-generated closers additionally
//! carry the id of the position they unwind. Orders never touch the balance
//! at submission time; all money moves during the matching tick.

use crate::types::{OrderId, PositionId, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    /// Remaining quantity. Decreases as fills apply; the order dies at <= epsilon.
    pub quantity: Decimal,
    /// `None` = market order, `Some` = limit order.
    pub price: Option<Price>,
    pub side: Side,
    pub reduce_only: bool,
    /// Set on engine-generated closers; openers never carry a target.
    pub target_position: Option<PositionId>,
}

impl Order {
    pub fn new_open(
        id: OrderId,
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Option<Price>,
        side: Side,
        reduce_only: bool,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            quantity,
            price,
            side,
            reduce_only,
            target_position: None,
        }
    }

    pub fn new_close(
        id: OrderId,
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Option<Price>,
        side: Side,
        target: PositionId,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            quantity,
            price,
            side,
            reduce_only: false,
            target_position: Some(target),
        }
    }

    pub fn is_market(&self) -> bool {
        self.price.is_none()
    }

    pub fn is_closer(&self) -> bool {
        self.target_position.is_some()
    }

    /// Market orders always match. A long limit matches when the tick trades
    /// at or below its price, a short limit at or above.
    pub fn eligible_at(&self, current: Price) -> bool {
        match self.price {
            None => true,
            Some(limit) => match self.side {
                Side::Long => current <= limit,
                Side::Short => current >= limit,
            },
        }
    }
}
