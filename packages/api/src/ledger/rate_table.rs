//! Commission rates by partner tier and referral level.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::sea_orm_active_enums::PartnerTier;

/// Rates for one tier. A zero rate means that tier earns nothing at that
/// level and no commission row is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierRates {
    pub level1: Decimal,
    pub level2: Decimal,
}

/// Static lookup of commission percentages. Loaded from configuration at
/// startup; the compiled-in default matches the standard partner program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    tiers: HashMap<PartnerTier, TierRates>,
}

impl Default for RateTable {
    fn default() -> Self {
        let mut tiers = HashMap::new();
        tiers.insert(
            PartnerTier::Bloom,
            TierRates {
                level1: Decimal::new(500, 4),
                level2: Decimal::ZERO,
            },
        );
        tiers.insert(
            PartnerTier::L1,
            TierRates {
                level1: Decimal::new(2000, 4),
                level2: Decimal::new(1000, 4),
            },
        );
        tiers.insert(
            PartnerTier::L2,
            TierRates {
                level1: Decimal::new(2500, 4),
                level2: Decimal::new(1200, 4),
            },
        );
        tiers.insert(
            PartnerTier::L3,
            TierRates {
                level1: Decimal::new(3000, 4),
                level2: Decimal::new(1500, 4),
            },
        );
        Self { tiers }
    }
}

impl RateTable {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Rate for `tier` at referral `level`. Unknown tiers and levels
    /// outside the two-level graph earn nothing.
    pub fn rate(&self, tier: PartnerTier, level: i16) -> Decimal {
        let Some(rates) = self.tiers.get(&tier) else {
            return Decimal::ZERO;
        };
        match level {
            1 => rates.level1,
            2 => rates.level2,
            _ => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let table = RateTable::default();
        assert_eq!(table.rate(PartnerTier::L1, 1), Decimal::new(2000, 4));
        assert_eq!(table.rate(PartnerTier::L1, 2), Decimal::new(1000, 4));
        assert_eq!(table.rate(PartnerTier::L3, 1), Decimal::new(3000, 4));
        assert_eq!(table.rate(PartnerTier::Bloom, 2), Decimal::ZERO);
    }

    #[test]
    fn test_out_of_graph_levels_earn_nothing() {
        let table = RateTable::default();
        assert_eq!(table.rate(PartnerTier::L3, 3), Decimal::ZERO);
        assert_eq!(table.rate(PartnerTier::L3, 0), Decimal::ZERO);
    }

    #[test]
    fn test_from_json_overrides_defaults() {
        let table = RateTable::from_json(
            r#"{"l1": {"level1": "0.22", "level2": "0.11"}}"#,
        )
        .unwrap();
        assert_eq!(table.rate(PartnerTier::L1, 1), Decimal::new(22, 2));
        assert_eq!(table.rate(PartnerTier::L1, 2), Decimal::new(11, 2));
        // Tiers absent from the config earn nothing rather than panicking.
        assert_eq!(table.rate(PartnerTier::L2, 1), Decimal::ZERO);
    }

    #[test]
    fn test_round_trips_through_json() {
        let table = RateTable::default();
        let raw = serde_json::to_string(&table).unwrap();
        assert_eq!(RateTable::from_json(&raw).unwrap(), table);
    }
}
