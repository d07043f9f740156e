//! Read-only conversion funnel aggregation.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
};
use serde::Serialize;

use crate::{
    entity::{referral, sea_orm_active_enums::ConversionStatus},
    ledger::error::LedgerError,
};

/// Funnel stages in progression order.
pub const STAGES: [ConversionStatus; 4] = [
    ConversionStatus::Experiencing,
    ConversionStatus::InCamp,
    ConversionStatus::Purchased365,
    ConversionStatus::BecamePartner,
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunnelStage {
    pub status: ConversionStatus,
    /// Referrals currently sitting at this stage.
    pub count: u64,
    /// Referrals at this stage or any later one.
    pub reached: u64,
    /// `reached` relative to the previous stage's `reached`, 4 decimal
    /// places. The first stage is measured against the partner's total.
    pub rate_from_previous: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunnelReport {
    pub partner_id: String,
    pub total_referrals: u64,
    pub stages: Vec<FunnelStage>,
}

/// Builds the report from per-stage counts. Pure; the route feeds it from a
/// grouped count query and the numbers may lag the ledger slightly.
pub fn build_report(partner_id: &str, counts: &HashMap<ConversionStatus, u64>) -> FunnelReport {
    let total: u64 = STAGES.iter().map(|s| counts.get(s).copied().unwrap_or(0)).sum();

    let mut stages = Vec::with_capacity(STAGES.len());
    let mut previous_reached = total;
    // Walk backwards so `reached` is a running suffix sum.
    let mut reached_acc = 0u64;
    let mut reached = [0u64; STAGES.len()];
    for (idx, status) in STAGES.iter().enumerate().rev() {
        reached_acc += counts.get(status).copied().unwrap_or(0);
        reached[idx] = reached_acc;
    }

    for (idx, status) in STAGES.iter().enumerate() {
        let count = counts.get(status).copied().unwrap_or(0);
        let rate = if previous_reached == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(reached[idx]) / Decimal::from(previous_reached))
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        };
        stages.push(FunnelStage {
            status: *status,
            count,
            reached: reached[idx],
            rate_from_previous: rate,
        });
        previous_reached = reached[idx];
    }

    FunnelReport {
        partner_id: partner_id.to_string(),
        total_referrals: total,
        stages,
    }
}

#[derive(Debug, FromQueryResult)]
struct StageCount {
    status: ConversionStatus,
    count: i64,
}

/// Counts the partner's level-1 referrals per funnel stage and derives the
/// stage-to-stage conversion rates.
pub async fn funnel_report<C: ConnectionTrait>(
    conn: &C,
    partner_id: &str,
) -> Result<FunnelReport, LedgerError> {
    let rows = referral::Entity::find()
        .select_only()
        .column_as(referral::Column::ConversionStatus, "status")
        .column_as(referral::Column::Id.count(), "count")
        .filter(referral::Column::PartnerId.eq(partner_id))
        .filter(referral::Column::Level.eq(1i16))
        .group_by(referral::Column::ConversionStatus)
        .into_model::<StageCount>()
        .all(conn)
        .await?;

    let counts: HashMap<ConversionStatus, u64> = rows
        .into_iter()
        .map(|row| (row.status, row.count.max(0) as u64))
        .collect();

    Ok(build_report(partner_id, &counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(experiencing: u64, in_camp: u64, purchased: u64, partner: u64) -> HashMap<ConversionStatus, u64> {
        HashMap::from([
            (ConversionStatus::Experiencing, experiencing),
            (ConversionStatus::InCamp, in_camp),
            (ConversionStatus::Purchased365, purchased),
            (ConversionStatus::BecamePartner, partner),
        ])
    }

    #[test]
    fn test_reached_is_cumulative_from_the_back() {
        let report = build_report("p1", &counts(40, 30, 20, 10));
        assert_eq!(report.total_referrals, 100);
        let reached: Vec<u64> = report.stages.iter().map(|s| s.reached).collect();
        assert_eq!(reached, vec![100, 60, 30, 10]);
    }

    #[test]
    fn test_stage_rates() {
        let report = build_report("p1", &counts(40, 30, 20, 10));
        // 60 of 100 moved past experiencing, 30 of 60 reached purchase,
        // 10 of 30 became partners.
        assert_eq!(report.stages[0].rate_from_previous, Decimal::ONE);
        assert_eq!(report.stages[1].rate_from_previous, Decimal::new(6000, 4));
        assert_eq!(report.stages[2].rate_from_previous, Decimal::new(5000, 4));
        assert_eq!(report.stages[3].rate_from_previous, Decimal::new(3333, 4));
    }

    #[test]
    fn test_empty_funnel_has_zero_rates() {
        let report = build_report("p1", &HashMap::new());
        assert_eq!(report.total_referrals, 0);
        for stage in &report.stages {
            assert_eq!(stage.count, 0);
            assert_eq!(stage.rate_from_previous, Decimal::ZERO);
        }
    }
}
