//! Order intake: submission, the one-way reverse-order rewrite, symbol
//! closes, and cancellation. Nothing here moves money; fills happen in the
//! matching tick.

use super::Account;
use crate::events::AccountEvent;
use crate::order::Order;
use crate::types::{OrderId, PositionId, Price, Side, EPSILON};
use rust_decimal::Decimal;
use tracing::{debug, warn};

impl Account {
    /// Queue an order. `price <= 0` selects a market order, `price > 0` a
    /// limit order. Non-positive quantities are ignored.
    ///
    /// In one-way mode an order opposing the symbol's standing position is
    /// rewritten at admission into a closer against that position, plus a
    /// fresh opener for any surplus quantity (surplus is dropped for
    /// reduce-only orders, which must not create exposure).
    pub fn place_order(
        &mut self,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        side: Side,
        reduce_only: bool,
    ) {
        if quantity <= Decimal::ZERO {
            warn!(symbol, %quantity, "order ignored: quantity must be positive");
            return;
        }
        let price = Price::new(price);

        if !self.hedge_mode {
            let opposing = self
                .positions
                .iter()
                .find(|p| p.symbol == symbol && p.side == side.opposite())
                .map(|p| (p.id, p.quantity));

            if let Some((target, standing_qty)) = opposing {
                let close_qty = quantity.min(standing_qty);
                let closer_id = self.next_order_id();
                debug!(
                    symbol,
                    order = %closer_id,
                    position = %target,
                    %close_qty,
                    "one-way rewrite: opposing order becomes a closer"
                );
                self.push_order(Order::new_close(
                    closer_id, symbol, close_qty, price, side, target,
                ));

                let surplus = quantity - standing_qty;
                if surplus > EPSILON {
                    if reduce_only {
                        debug!(symbol, %surplus, "reduce-only surplus dropped");
                    } else {
                        let opener_id = self.next_order_id();
                        self.push_order(Order::new_open(
                            opener_id, symbol, surplus, price, side, false,
                        ));
                    }
                }
                return;
            }
        }

        let id = self.next_order_id();
        debug!(symbol, order = %id, %side, %quantity, market = price.is_none(), "order placed");
        self.push_order(Order::new_open(id, symbol, quantity, price, side, reduce_only));
    }

    /// Queue a closer for every position in the symbol (both sides in hedge
    /// mode). `price <= 0` closes at market.
    pub fn close_position(&mut self, symbol: &str, price: Decimal) {
        self.close_matching(symbol, None, price);
    }

    /// Hedge-mode variant: close only the positions on the given side.
    pub fn close_position_side(&mut self, symbol: &str, side: Side, price: Decimal) {
        self.close_matching(symbol, Some(side), price);
    }

    fn close_matching(&mut self, symbol: &str, side: Option<Side>, price: Decimal) {
        let price = Price::new(price);
        let targets: Vec<(PositionId, Decimal, Side)> = self
            .positions
            .iter()
            .filter(|p| p.symbol == symbol && side.map_or(true, |s| p.side == s))
            .map(|p| (p.id, p.quantity, p.side))
            .collect();

        if targets.is_empty() {
            warn!(symbol, "close ignored: no matching position");
            return;
        }

        for (target, quantity, position_side) in targets {
            let id = self.next_order_id();
            debug!(symbol, order = %id, position = %target, %quantity, "closer queued");
            self.push_order(Order::new_close(
                id,
                symbol,
                quantity,
                price,
                position_side.opposite(),
                target,
            ));
        }
    }

    /// Remove the open order with this id. Fills already applied stay
    /// applied; calling again with the same id is a no-op.
    pub fn cancel_order_by_id(&mut self, id: OrderId) {
        let before = self.open_orders.len();
        self.open_orders.retain(|o| o.id != id);
        if self.open_orders.len() == before {
            warn!(order = %id, "cancel ignored: no such open order");
        } else {
            debug!(order = %id, "order cancelled");
            self.emit(AccountEvent::OrderCancelled { order_id: id });
        }
    }

    fn push_order(&mut self, order: Order) {
        self.emit(AccountEvent::OrderPlaced {
            order_id: order.id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
            reduce_only: order.reduce_only,
        });
        self.open_orders.push(order);
    }
}
