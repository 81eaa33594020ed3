//! Venue configuration: VIP fee schedule and tiered margin table.
//!
//! Both tables are injected through the account constructor so tests can
//! supply alternates; `Default` ships the stock schedules.

use crate::types::Leverage;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Maker/taker fee rates for one VIP level, as fractions of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate {
    pub maker: Decimal,
    pub taker: Decimal,
}

/// Fee rates indexed by VIP level 0..=9. Unknown levels fall back to VIP 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    rates: Vec<FeeRate>,
}

impl FeeSchedule {
    pub fn new(rates: Vec<FeeRate>) -> Self {
        assert!(!rates.is_empty(), "fee schedule needs at least VIP 0");
        Self { rates }
    }

    pub fn lookup(&self, vip_level: u8) -> FeeRate {
        self.rates
            .get(vip_level as usize)
            .copied()
            .unwrap_or(self.rates[0])
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(vec![
            FeeRate { maker: dec!(0.00020), taker: dec!(0.00050) }, // VIP 0
            FeeRate { maker: dec!(0.00016), taker: dec!(0.00040) }, // VIP 1
            FeeRate { maker: dec!(0.00014), taker: dec!(0.00035) }, // VIP 2
            FeeRate { maker: dec!(0.00012), taker: dec!(0.00032) }, // VIP 3
            FeeRate { maker: dec!(0.00010), taker: dec!(0.00030) }, // VIP 4
            FeeRate { maker: dec!(0.00008), taker: dec!(0.00027) }, // VIP 5
            FeeRate { maker: dec!(0.00006), taker: dec!(0.00025) }, // VIP 6
            FeeRate { maker: dec!(0.00004), taker: dec!(0.00022) }, // VIP 7
            FeeRate { maker: dec!(0.00002), taker: dec!(0.00020) }, // VIP 8
            FeeRate { maker: dec!(0.00001), taker: dec!(0.00017) }, // VIP 9
        ])
    }
}

/// One margin bracket: positions whose notional falls at or below
/// `notional_cap` pay `maintenance_margin_rate` and may lever up to
/// `max_leverage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginTier {
    pub notional_cap: Decimal,
    pub maintenance_margin_rate: Decimal,
    pub max_leverage: Leverage,
}

/// Margin tiers sorted ascending by notional cap, last cap effectively
/// unbounded. Rates rise and leverage caps fall as notional grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginTierTable {
    tiers: Vec<MarginTier>,
}

impl MarginTierTable {
    pub fn new(tiers: Vec<MarginTier>) -> Self {
        assert!(!tiers.is_empty(), "margin table needs at least one tier");
        debug_assert!(
            tiers.windows(2).all(|w| w[0].notional_cap < w[1].notional_cap),
            "tiers must be sorted ascending by notional cap"
        );
        Self { tiers }
    }

    /// First tier whose cap is >= the notional. A notional exactly on a cap
    /// resolves to that tier, not the next one.
    pub fn lookup(&self, notional: Decimal) -> MarginTier {
        for tier in &self.tiers {
            if notional <= tier.notional_cap {
                return *tier;
            }
        }
        *self.tiers.last().expect("table is non-empty")
    }

    pub fn tiers(&self) -> &[MarginTier] {
        &self.tiers
    }
}

impl Default for MarginTierTable {
    fn default() -> Self {
        let lev = |v: Decimal| Leverage::new(v).expect("static leverage");
        Self::new(vec![
            MarginTier {
                notional_cap: dec!(50_000),
                maintenance_margin_rate: dec!(0.005),
                max_leverage: lev(dec!(100)),
            },
            MarginTier {
                notional_cap: dec!(250_000),
                maintenance_margin_rate: dec!(0.01),
                max_leverage: lev(dec!(50)),
            },
            MarginTier {
                notional_cap: dec!(1_000_000),
                maintenance_margin_rate: dec!(0.015),
                max_leverage: lev(dec!(33)),
            },
            MarginTier {
                notional_cap: dec!(5_000_000),
                maintenance_margin_rate: dec!(0.025),
                max_leverage: lev(dec!(20)),
            },
            MarginTier {
                notional_cap: dec!(10_000_000),
                maintenance_margin_rate: dec!(0.05),
                max_leverage: lev(dec!(10)),
            },
            MarginTier {
                notional_cap: Decimal::MAX,
                maintenance_margin_rate: dec!(0.075),
                max_leverage: lev(dec!(8)),
            },
        ])
    }
}
