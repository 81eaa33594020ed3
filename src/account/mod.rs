//! Cross-margin account engine.
//!
//! One account owns a wallet balance, per-symbol leverage, open orders, open
//! positions, and the opener-to-position association map. Orders only queue
//! intents; every transfer of money (margin, fees, pnl) happens inside
//! [`Account::step`], which matches queued orders against a market snapshot.
//!
//! The balance may go negative under cross margin as long as unrealized pnl
//! keeps total equity positive. When equity drops below the summed
//! maintenance margin the whole account is liquidated.

mod leverage;
mod orders;
mod step;

use crate::config::{FeeRate, FeeSchedule, MarginTierTable};
use crate::events::{AccountEvent, EventLog};
use crate::order::Order;
use crate::position::Position;
use crate::types::{Leverage, OrderId, PositionId, Quote};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Account {
    balance: Quote,
    /// Sum of initial margins across open positions.
    used_margin: Quote,
    vip_level: u8,
    hedge_mode: bool,
    symbol_leverage: HashMap<String, Leverage>,
    open_orders: Vec<Order>,
    positions: Vec<Position>,
    /// Opener order id -> position it has been filling into.
    order_position: HashMap<OrderId, PositionId>,
    next_order_id: u64,
    next_position_id: u64,
    fees: FeeSchedule,
    tiers: MarginTierTable,
    events: EventLog,
}

impl Account {
    /// Account with the stock fee schedule and margin tier table.
    pub fn new(initial_balance: Decimal, vip_level: u8) -> Self {
        Self::with_config(
            initial_balance,
            vip_level,
            FeeSchedule::default(),
            MarginTierTable::default(),
        )
    }

    /// Account with injected configuration tables. Starts in one-way mode.
    pub fn with_config(
        initial_balance: Decimal,
        vip_level: u8,
        fees: FeeSchedule,
        tiers: MarginTierTable,
    ) -> Self {
        Self {
            balance: Quote::new(initial_balance),
            used_margin: Quote::zero(),
            vip_level,
            hedge_mode: false,
            symbol_leverage: HashMap::new(),
            open_orders: Vec::new(),
            positions: Vec::new(),
            order_position: HashMap::new(),
            next_order_id: 1,
            next_position_id: 1,
            fees,
            tiers,
            events: EventLog::new(),
        }
    }

    /// Raw wallet balance; negative is legal under cross margin.
    pub fn balance(&self) -> Quote {
        self.balance
    }

    pub fn total_unrealized_pnl(&self) -> Quote {
        self.positions.iter().map(|p| p.unrealized_pnl).sum()
    }

    /// balance + total unrealized pnl. The admission quantity for new margin.
    pub fn equity(&self) -> Quote {
        self.balance.add(self.total_unrealized_pnl())
    }

    pub fn used_margin(&self) -> Quote {
        self.used_margin
    }

    pub fn vip_level(&self) -> u8 {
        self.vip_level
    }

    pub fn is_hedge_mode(&self) -> bool {
        self.hedge_mode
    }

    /// Configured leverage for a symbol, defaulting to 1x when unset.
    pub fn symbol_leverage(&self, symbol: &str) -> Leverage {
        self.symbol_leverage
            .get(symbol)
            .copied()
            .unwrap_or_else(Leverage::one)
    }

    pub fn open_orders(&self) -> &[Order] {
        &self.open_orders
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn events(&self) -> &[AccountEvent] {
        self.events.events()
    }

    /// Drain buffered events, e.g. to fan them into position-update callbacks.
    pub fn take_events(&mut self) -> Vec<AccountEvent> {
        self.events.take()
    }

    /// Switch between one-way and hedge mode. Refused while any position is
    /// open: reinterpreting existing exposure under the other mode is
    /// ill-defined.
    pub fn set_position_mode(&mut self, hedge: bool) {
        if !self.positions.is_empty() {
            warn!(
                open_positions = self.positions.len(),
                "position mode change refused while positions are open"
            );
            return;
        }
        if self.hedge_mode != hedge {
            info!(hedge, "position mode changed");
        }
        self.hedge_mode = hedge;
    }

    fn fee_rates(&self) -> FeeRate {
        self.fees.lookup(self.vip_level)
    }

    fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn next_position_id(&mut self) -> PositionId {
        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        id
    }

    fn position_index(&self, id: PositionId) -> Option<usize> {
        self.positions.iter().position(|p| p.id == id)
    }

    fn emit(&mut self, event: AccountEvent) {
        self.events.push(event);
    }
}

/// Failures surfaced by account mutators. Matching-time admission failures
/// are not errors; the affected order simply retries on the next step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("leverage must be > 0, got {0}")]
    InvalidLeverage(Decimal),

    #[error("leverage {requested} exceeds tier cap {cap} at notional {notional}")]
    TierCapExceeded {
        requested: Decimal,
        cap: Decimal,
        notional: Decimal,
    },

    #[error("insufficient equity: need {required}, have {available}")]
    InsufficientEquity { required: Quote, available: Quote },
}
