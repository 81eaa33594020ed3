// Open exposure tracking. pnl = (mark - entry) * qty * side sign.
// Positions grow by same-opener fills, collapse into siblings on the
// post-step merge, and shrink through closers and reduce-only fills.

use crate::types::{Leverage, OrderId, PositionId, Price, Quote, Side, EPSILON};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// Opener that created this position.
    pub order_id: OrderId,
    pub symbol: String,
    pub quantity: Decimal,
    /// Weighted-average entry across all fills merged into this position.
    pub entry_price: Price,
    pub side: Side,
    /// Recomputed on mark-to-market; stale when the symbol missed a tick.
    pub unrealized_pnl: Quote,
    /// entry_price * quantity, maintained on every mutation.
    pub notional: Quote,
    pub initial_margin: Quote,
    pub maintenance_margin: Quote,
    /// Accumulated opening fees. Informational only; released pro rata on
    /// closes but never flows back to the wallet.
    pub fee: Quote,
    pub leverage: Leverage,
    pub fee_rate: Decimal,
}

/// Proportional amounts freed by a partial or full close.
#[derive(Debug, Clone, Copy)]
pub struct Released {
    pub initial_margin: Quote,
    pub maintenance_margin: Quote,
    pub fee: Quote,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PositionId,
        order_id: OrderId,
        symbol: impl Into<String>,
        quantity: Decimal,
        entry_price: Price,
        side: Side,
        initial_margin: Quote,
        maintenance_margin: Quote,
        fee: Quote,
        leverage: Leverage,
        fee_rate: Decimal,
    ) -> Self {
        Self {
            id,
            order_id,
            symbol: symbol.into(),
            quantity,
            entry_price,
            side,
            unrealized_pnl: Quote::zero(),
            notional: Quote::new(entry_price.value() * quantity),
            initial_margin,
            maintenance_margin,
            fee,
            leverage,
            fee_rate,
        }
    }

    pub fn is_dust(&self) -> bool {
        self.quantity <= EPSILON
    }

    /// Recompute unrealized pnl against a fresh mark.
    pub fn mark(&mut self, current: Price) {
        let pnl = (current.value() - self.entry_price.value()) * self.quantity * self.side.sign();
        self.unrealized_pnl = Quote::new(pnl);
    }

    /// Pnl realized by closing `close_qty` at `fill_price`.
    pub fn realized_pnl(&self, close_qty: Decimal, fill_price: Price) -> Quote {
        let pnl = (fill_price.value() - self.entry_price.value()) * close_qty * self.side.sign();
        Quote::new(pnl)
    }

    /// Fold a further fill of the originating opener into this position:
    /// notional-weighted entry, summed margins and fees.
    pub fn merge_fill(
        &mut self,
        fill_qty: Decimal,
        fill_price: Price,
        initial_margin: Quote,
        maintenance_margin: Quote,
        fee: Quote,
    ) {
        let fill_notional = fill_qty * fill_price.value();
        let new_qty = self.quantity + fill_qty;
        self.entry_price =
            Price::new_unchecked((self.notional.value() + fill_notional) / new_qty);
        self.quantity = new_qty;
        self.notional = Quote::new(self.notional.value() + fill_notional);
        self.initial_margin = self.initial_margin.add(initial_margin);
        self.maintenance_margin = self.maintenance_margin.add(maintenance_margin);
        self.fee = self.fee.add(fee);
    }

    /// Collapse a sibling position (same symbol and side) into this one.
    pub fn absorb(&mut self, other: Position) {
        debug_assert_eq!(self.symbol, other.symbol);
        debug_assert_eq!(self.side, other.side);
        let new_qty = self.quantity + other.quantity;
        self.entry_price =
            Price::new_unchecked((self.notional.value() + other.notional.value()) / new_qty);
        self.quantity = new_qty;
        self.notional = Quote::new(self.notional.value() + other.notional.value());
        self.initial_margin = self.initial_margin.add(other.initial_margin);
        self.maintenance_margin = self.maintenance_margin.add(other.maintenance_margin);
        self.fee = self.fee.add(other.fee);
        self.unrealized_pnl = self.unrealized_pnl.add(other.unrealized_pnl);
    }

    /// Shrink by `close_qty`, releasing margins and fee pro rata.
    /// The entry price never changes on reduction.
    pub fn reduce(&mut self, close_qty: Decimal) -> Released {
        debug_assert!(close_qty > Decimal::ZERO && close_qty <= self.quantity);
        let ratio = close_qty / self.quantity;

        let released = Released {
            initial_margin: Quote::new(self.initial_margin.value() * ratio),
            maintenance_margin: Quote::new(self.maintenance_margin.value() * ratio),
            fee: Quote::new(self.fee.value() * ratio),
        };

        self.quantity -= close_qty;
        self.notional = Quote::new(self.entry_price.value() * self.quantity);
        self.initial_margin = self.initial_margin.sub(released.initial_margin);
        self.maintenance_margin = self.maintenance_margin.sub(released.maintenance_margin);
        self.fee = self.fee.sub(released.fee);

        released
    }
}
