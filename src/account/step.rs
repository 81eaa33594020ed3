//! The matching tick.
//!
//! `step` advances the whole account against one market snapshot, in fixed
//! phase order: match open orders, prune dust positions, merge same-side
//! siblings, mark to market, then check the liquidation threshold. Orders
//! that cannot be admitted this tick (tier cap, equity) carry over unchanged
//! and retry on every subsequent step.

use super::Account;
use crate::events::AccountEvent;
use crate::market::MarketSnapshot;
use crate::order::Order;
use crate::position::Position;
use crate::types::{OrderId, Price, PositionId, Quote, EPSILON};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

impl Account {
    /// One matching tick against a `symbol -> (price, available volume)`
    /// snapshot. Symbols absent from the snapshot leave their orders queued
    /// and their positions' pnl stale.
    pub fn step(&mut self, market: &MarketSnapshot) {
        self.match_orders(market);
        self.prune_dust();
        self.merge_siblings();
        self.mark_to_market(market);
        self.check_liquidation();
    }

    /// Phase A: walk open orders in insertion order. Every order sees the
    /// tick's full available volume; fills do not consume a shared budget
    /// within one step.
    fn match_orders(&mut self, market: &MarketSnapshot) {
        let fees = self.fee_rates();
        let orders = std::mem::take(&mut self.open_orders);
        let mut carry = Vec::with_capacity(orders.len());

        for mut order in orders {
            let Some(tick) = market.get(&order.symbol).copied() else {
                carry.push(order);
                continue;
            };
            if tick.volume <= Decimal::ZERO || !order.eligible_at(tick.price) {
                carry.push(order);
                continue;
            }
            let fill_qty = order.quantity.min(tick.volume);
            if fill_qty < EPSILON {
                carry.push(order);
                continue;
            }
            let fee_rate = if order.is_market() { fees.taker } else { fees.maker };

            if let Some(target) = order.target_position {
                match self.position_index(target) {
                    // Target already gone (or emptied earlier this step);
                    // keep the closer queued untouched.
                    None => carry.push(order),
                    Some(idx) => {
                        let close_qty = fill_qty.min(self.positions[idx].quantity);
                        if close_qty < EPSILON {
                            carry.push(order);
                            continue;
                        }
                        self.apply_close(idx, order.id, close_qty, tick.price, fee_rate);
                        order.quantity -= close_qty;
                        if order.quantity > EPSILON {
                            carry.push(order);
                        }
                    }
                }
            } else if order.reduce_only {
                let found = self.positions.iter().position(|p| {
                    p.symbol == order.symbol && p.side == order.side && !p.is_dust()
                });
                match found {
                    None => {
                        // Nothing left to reduce; the order evaporates.
                        debug!(order = %order.id, symbol = %order.symbol, "reduce-only dropped");
                    }
                    Some(idx) => {
                        let close_qty = fill_qty.min(self.positions[idx].quantity);
                        self.apply_close(idx, order.id, close_qty, tick.price, fee_rate);
                        order.quantity -= close_qty;
                        if order.quantity > EPSILON {
                            carry.push(order);
                        }
                    }
                }
            } else if self.apply_open(&order, fill_qty, tick.price, fee_rate) {
                order.quantity -= fill_qty;
                if order.quantity > EPSILON {
                    carry.push(order);
                }
            } else {
                carry.push(order);
            }
        }

        self.open_orders = carry;
    }

    /// Settle a closing fill against the position at `idx`. Realizes pnl,
    /// refunds initial margin pro rata, and charges a fresh closing fee on
    /// the closed notional. The prorated slice of the position's stored
    /// opening fee is released but stays informational; it never hits the
    /// wallet.
    fn apply_close(
        &mut self,
        idx: usize,
        order_id: OrderId,
        close_qty: Decimal,
        fill_price: Price,
        fee_rate: Decimal,
    ) {
        let fee = Quote::new(close_qty * fill_price.value() * fee_rate);

        let position = &mut self.positions[idx];
        let realized = position.realized_pnl(close_qty, fill_price);
        let released = position.reduce(close_qty);
        let position_id = position.id;
        let symbol = position.symbol.clone();
        let now_dust = position.is_dust();

        self.balance = self
            .balance
            .add(released.initial_margin)
            .add(realized)
            .sub(fee);
        self.used_margin = self.used_margin.sub(released.initial_margin);

        if now_dust {
            self.order_position.retain(|_, pid| *pid != position_id);
        }

        debug!(
            order = %order_id,
            position = %position_id,
            %close_qty,
            price = %fill_price,
            pnl = %realized,
            "close fill"
        );
        self.emit(AccountEvent::Closed {
            order_id,
            position_id,
            symbol,
            quantity: close_qty,
            fill_price,
            realized_pnl: realized,
            fee,
        });
    }

    /// Settle an opening fill. Returns false (order carries over) when the
    /// symbol leverage breaks the tier cap at this notional or equity cannot
    /// cover margin plus fee.
    fn apply_open(
        &mut self,
        order: &Order,
        fill_qty: Decimal,
        fill_price: Price,
        fee_rate: Decimal,
    ) -> bool {
        let leverage = self.symbol_leverage(&order.symbol);
        let notional = fill_qty * fill_price.value();
        let tier = self.tiers.lookup(notional);

        if leverage.value() > tier.max_leverage.value() {
            warn!(
                order = %order.id,
                symbol = %order.symbol,
                %leverage,
                cap = %tier.max_leverage,
                %notional,
                "fill rejected: leverage above tier cap"
            );
            return false;
        }

        let initial = notional / leverage.value();
        let maintenance = notional * tier.maintenance_margin_rate;
        let fee = notional * fee_rate;
        let required = initial + fee;
        let equity = self.equity();
        if equity.value() < required {
            debug!(
                order = %order.id,
                %required,
                %equity,
                "fill deferred: not enough equity"
            );
            return false;
        }

        self.balance = self.balance.sub(Quote::new(required));
        self.used_margin = self.used_margin.add(Quote::new(initial));

        // A prior partial fill of this opener keeps growing its position.
        let existing = self
            .order_position
            .get(&order.id)
            .copied()
            .and_then(|pid| self.position_index(pid));

        let position_id = match existing {
            Some(idx) => {
                let position = &mut self.positions[idx];
                position.merge_fill(
                    fill_qty,
                    fill_price,
                    Quote::new(initial),
                    Quote::new(maintenance),
                    Quote::new(fee),
                );
                position.id
            }
            None => {
                let id = self.next_position_id();
                let position = Position::new(
                    id,
                    order.id,
                    order.symbol.clone(),
                    fill_qty,
                    fill_price,
                    order.side,
                    Quote::new(initial),
                    Quote::new(maintenance),
                    Quote::new(fee),
                    leverage,
                    fee_rate,
                );
                self.positions.push(position);
                self.order_position.insert(order.id, id);
                id
            }
        };

        debug!(
            order = %order.id,
            position = %position_id,
            symbol = %order.symbol,
            %fill_qty,
            price = %fill_price,
            "open fill"
        );
        self.emit(AccountEvent::Opened {
            order_id: order.id,
            position_id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: fill_qty,
            fill_price,
            fee: Quote::new(fee),
        });
        true
    }

    /// Phase B: drop dust positions and stale association entries.
    fn prune_dust(&mut self) {
        self.positions.retain(|p| !p.is_dust());

        let live: HashSet<PositionId> = self.positions.iter().map(|p| p.id).collect();
        let open: HashSet<OrderId> = self.open_orders.iter().map(|o| o.id).collect();
        self.order_position
            .retain(|order_id, position_id| open.contains(order_id) && live.contains(position_id));
    }

    /// Phase C: collapse positions sharing (symbol, side) into one, under
    /// notional-weighted entry pricing. Runs in both modes; one-way mode
    /// never holds opposing siblings so this only folds same-side openers.
    fn merge_siblings(&mut self) {
        let old = std::mem::take(&mut self.positions);
        let mut merged: Vec<Position> = Vec::with_capacity(old.len());
        let mut remap: HashMap<PositionId, PositionId> = HashMap::new();

        for position in old {
            match merged
                .iter_mut()
                .find(|p| p.symbol == position.symbol && p.side == position.side)
            {
                Some(survivor) => {
                    remap.insert(position.id, survivor.id);
                    survivor.absorb(position);
                }
                None => merged.push(position),
            }
        }

        self.positions = merged;
        if !remap.is_empty() {
            for position_id in self.order_position.values_mut() {
                if let Some(&survivor) = remap.get(position_id) {
                    *position_id = survivor;
                }
            }
        }
    }

    /// Phase D: refresh unrealized pnl where the snapshot has a price.
    /// Symbols without a tick keep their previous (stale) pnl.
    fn mark_to_market(&mut self, market: &MarketSnapshot) {
        for position in self.positions.iter_mut() {
            if let Some(tick) = market.get(&position.symbol) {
                position.mark(tick.price);
            }
        }
    }

    /// Phase E: full liquidation when equity no longer covers the summed
    /// maintenance margin. Wallet, margin, positions, orders, associations:
    /// everything resets.
    fn check_liquidation(&mut self) {
        let maintenance: Quote = self
            .positions
            .iter()
            .map(|p| p.maintenance_margin)
            .sum();
        let equity = self.equity();
        if equity >= maintenance {
            return;
        }

        warn!(%equity, required = %maintenance, "liquidation triggered");
        self.balance = Quote::zero();
        self.used_margin = Quote::zero();
        self.positions.clear();
        self.open_orders.clear();
        self.order_position.clear();
        self.emit(AccountEvent::Liquidated {
            equity,
            maintenance_required: maintenance,
        });
    }
}
