//! Per-symbol leverage configuration and the margin adjustment protocol.
//!
//! Raising or lowering leverage on a symbol with live positions re-reserves
//! initial margin for every one of them atomically: either all positions and
//! the wallet move together, or nothing changes.

use super::{Account, AccountError};
use crate::types::{Leverage, Quote};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

impl Account {
    /// Set the leverage for a symbol. Fails on non-positive values, on tier
    /// caps, and on insufficient equity for the extra margin; in every
    /// failure case the stored leverage and all positions are untouched.
    pub fn set_symbol_leverage(
        &mut self,
        symbol: &str,
        new_leverage: Decimal,
    ) -> Result<(), AccountError> {
        let leverage = Leverage::new(new_leverage).ok_or_else(|| {
            warn!(symbol, %new_leverage, "leverage must be > 0");
            AccountError::InvalidLeverage(new_leverage)
        })?;

        if !self.symbol_leverage.contains_key(symbol) {
            self.symbol_leverage.insert(symbol.to_string(), leverage);
            info!(symbol, %leverage, "leverage set");
            return Ok(());
        }

        self.adjust_positions_for_leverage(symbol, leverage)?;
        let old = self.symbol_leverage.insert(symbol.to_string(), leverage);
        info!(symbol, old = %old.expect("prior leverage"), new = %leverage, "leverage changed");
        Ok(())
    }

    /// Re-margin every position in the symbol for the new leverage.
    ///
    /// Validates the tier cap per position and the equity needed for the
    /// aggregate margin delta before touching anything.
    fn adjust_positions_for_leverage(
        &mut self,
        symbol: &str,
        new_leverage: Leverage,
    ) -> Result<(), AccountError> {
        let mut delta = Decimal::ZERO;
        let mut updates: Vec<(usize, Decimal, Decimal)> = Vec::new();

        for (idx, position) in self
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.symbol == symbol)
        {
            let notional = position.notional.value();
            let tier = self.tiers.lookup(notional);
            if new_leverage.value() > tier.max_leverage.value() {
                warn!(
                    symbol,
                    requested = %new_leverage,
                    cap = %tier.max_leverage,
                    %notional,
                    "leverage change refused: tier cap"
                );
                return Err(AccountError::TierCapExceeded {
                    requested: new_leverage.value(),
                    cap: tier.max_leverage.value(),
                    notional,
                });
            }

            let new_initial = notional / new_leverage.value();
            let new_maintenance = notional * tier.maintenance_margin_rate;
            delta += new_initial - position.initial_margin.value();
            updates.push((idx, new_initial, new_maintenance));
        }

        if delta > Decimal::ZERO && self.equity().value() < delta {
            let available = self.equity();
            warn!(
                symbol,
                required = %delta,
                %available,
                "leverage change refused: not enough equity for extra margin"
            );
            return Err(AccountError::InsufficientEquity {
                required: Quote::new(delta),
                available,
            });
        }

        // Commit: wallet first, then every position.
        self.balance = self.balance.sub(Quote::new(delta));
        self.used_margin = self.used_margin.add(Quote::new(delta));
        for (idx, new_initial, new_maintenance) in updates {
            let position = &mut self.positions[idx];
            position.initial_margin = Quote::new(new_initial);
            position.maintenance_margin = Quote::new(new_maintenance);
            position.leverage = new_leverage;
        }
        debug!(symbol, margin_delta = %delta, "positions re-margined");
        Ok(())
    }
}
