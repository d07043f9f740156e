//! Commission ledger: order fan-out, cancellation, maturation sweep.

use chrono::{Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, sea_query::Condition,
};

use crate::{
    cas,
    entity::{
        commission, partner, referral,
        sea_orm_active_enums::{CommissionStatus, PartnerTier},
    },
    events::{DynEventPublisher, PlatformEvent},
    ledger::{error::LedgerError, rate_table::RateTable},
};

/// A qualifying order notification from the settlement collaborator.
/// Deliveries may be repeated; processing is idempotent per order.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub order_id: String,
    pub order_type: String,
    pub order_amount: Decimal,
    pub buyer_user_id: String,
}

/// One earning partner in the buyer's referral chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEntry {
    pub partner_id: String,
    pub tier: PartnerTier,
    pub level: i16,
}

/// A commission row before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommission {
    pub partner_id: String,
    pub level: i16,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Computes the commission rows an order produces, without touching the
/// database. Amounts are exact decimal products of the order amount and the
/// tier rate, rounded half-up to cents only when the product carries more
/// precision than the ledger stores.
pub fn plan_commissions(
    order_amount: Decimal,
    chain: &[ChainEntry],
    rates: &RateTable,
) -> Vec<PlannedCommission> {
    chain
        .iter()
        .filter_map(|entry| {
            let rate = rates.rate(entry.tier, entry.level);
            if rate.is_zero() {
                return None;
            }
            let amount = (order_amount * rate)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            Some(PlannedCommission {
                partner_id: entry.partner_id.clone(),
                level: entry.level,
                rate,
                amount,
            })
        })
        .collect()
}

/// Order qualification check. Only positive order amounts can earn
/// commission; settlement systems do emit zero-amount (fully discounted)
/// and negative (correction) notifications.
pub fn validate_order(event: &OrderEvent) -> Result<(), LedgerError> {
    if event.order_amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidOrder(format!(
            "order amount must be positive, got {}",
            event.order_amount
        )));
    }
    Ok(())
}

/// Resolves the buyer's referral chain: the level-1 edge names the direct
/// earning partner, the buyer's level-2 edge (if any) the upstream one.
async fn resolve_chain<C: ConnectionTrait>(
    db: &C,
    buyer_user_id: &str,
) -> Result<Vec<ChainEntry>, LedgerError> {
    let edges = referral::Entity::find()
        .filter(referral::Column::ReferredUserId.eq(buyer_user_id))
        .order_by_asc(referral::Column::Level)
        .all(db)
        .await?;

    // No level-1 edge means the buyer is organic; level-2 alone cannot
    // exist but would earn nothing either way.
    if !edges.iter().any(|e| e.level == 1) {
        return Ok(Vec::new());
    }

    let mut chain = Vec::with_capacity(2);
    for edge in edges {
        let Some(earning_partner) = partner::Entity::find_by_id(&edge.partner_id).one(db).await?
        else {
            return Err(LedgerError::NotFound("partner"));
        };
        chain.push(ChainEntry {
            partner_id: earning_partner.id,
            tier: earning_partner.tier,
            level: edge.level,
        });
    }
    Ok(chain)
}

/// Fans a settled order out to the buyer's referral chain.
///
/// Idempotent per order: if a level-1 commission already exists for the
/// order the existing set is returned unchanged, and a lost insert race
/// (duplicate delivery processed concurrently) re-reads instead of
/// duplicating. Orders with a non-positive amount are rejected.
pub async fn record_order<C>(
    db: &C,
    rates: &RateTable,
    maturation_window: Duration,
    event: OrderEvent,
) -> Result<Vec<commission::Model>, LedgerError>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_order(&event)?;

    let existing = existing_for_order(db, &event.order_id).await?;
    if existing.iter().any(|c| c.commission_level == 1) {
        return Ok(existing);
    }

    let chain = resolve_chain(db, &event.buyer_user_id).await?;
    let planned = plan_commissions(event.order_amount, &chain, rates);
    if planned.is_empty() {
        return Ok(Vec::new());
    }

    let now = Utc::now().naive_utc();
    let confirm_at = now + maturation_window;
    let models: Vec<commission::Model> = planned
        .into_iter()
        .map(|p| commission::Model {
            id: bloom_types::create_id(),
            order_id: event.order_id.clone(),
            order_type: event.order_type.clone(),
            order_amount: event.order_amount,
            partner_id: p.partner_id,
            commission_level: p.level,
            commission_rate: p.rate,
            commission_amount: p.amount,
            status: CommissionStatus::Pending,
            confirm_at,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let active: Vec<commission::ActiveModel> = models
        .iter()
        .cloned()
        .map(commission::ActiveModel::from)
        .collect();

    let inserted = db
        .transaction::<_, (), LedgerError>(|txn| {
            Box::pin(async move {
                commission::Entity::insert_many(active)
                    .exec(txn)
                    .await
                    .map_err(LedgerError::from)?;
                Ok(())
            })
        })
        .await
        .map_err(LedgerError::from);

    match inserted {
        Ok(()) => {
            tracing::info!(
                order_id = %event.order_id,
                entries = models.len(),
                "Recorded pending commissions"
            );
            Ok(models)
        }
        // The (orderId, commissionLevel) unique index caught a concurrent
        // duplicate delivery; the winner's rows are the ledger's truth.
        Err(err) if err.is_unique_violation() => existing_for_order(db, &event.order_id).await,
        Err(err) => Err(err),
    }
}

async fn existing_for_order<C: ConnectionTrait>(
    db: &C,
    order_id: &str,
) -> Result<Vec<commission::Model>, LedgerError> {
    Ok(commission::Entity::find()
        .filter(commission::Column::OrderId.eq(order_id))
        .order_by_asc(commission::Column::CommissionLevel)
        .all(db)
        .await?)
}

/// Refund/chargeback signal: cancels every still-pending commission for the
/// order. Idempotent; commissions already confirmed are left untouched (no
/// clawback). Returns the number of rows cancelled.
pub async fn cancel_order<C: ConnectionTrait>(
    db: &C,
    order_id: &str,
) -> Result<u64, LedgerError> {
    let now = Utc::now().naive_utc();
    let set = commission::ActiveModel {
        status: Set(CommissionStatus::Cancelled),
        updated_at: Set(now),
        ..Default::default()
    };
    let guard = Condition::all()
        .add(commission::Column::OrderId.eq(order_id))
        .add(commission::Column::Status.eq(CommissionStatus::Pending));

    match cas::transition::<commission::Entity, _>(db, set, guard).await? {
        cas::Transition::Won { rows } => {
            tracing::info!(order_id, cancelled = rows, "Cancelled pending commissions");
            Ok(rows)
        }
        cas::Transition::Lost => Ok(0),
    }
}

/// One pass of the maturation sweep: flips due `Pending` entries to
/// `Confirmed` in bounded batches. Each row transition is its own guarded
/// update, so a cancellation racing the sweep always wins or loses cleanly
/// and a crash mid-sweep leaves no half-matured batch.
pub async fn mature_due<C: ConnectionTrait>(
    db: &C,
    events: &DynEventPublisher,
    batch_size: u64,
) -> Result<u64, LedgerError> {
    let mut confirmed_total = 0u64;

    loop {
        let now = Utc::now().naive_utc();
        let due = commission::Entity::find()
            .filter(commission::Column::Status.eq(CommissionStatus::Pending))
            .filter(commission::Column::ConfirmAt.lte(now))
            .order_by_asc(commission::Column::ConfirmAt)
            .limit(batch_size)
            .all(db)
            .await?;
        let batch_len = due.len() as u64;

        for entry in due {
            let set = commission::ActiveModel {
                status: Set(CommissionStatus::Confirmed),
                confirmed_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            };
            let guard = Condition::all()
                .add(commission::Column::Id.eq(entry.id.clone()))
                .add(commission::Column::Status.eq(CommissionStatus::Pending));

            if cas::transition::<commission::Entity, _>(db, set, guard)
                .await?
                .won()
            {
                confirmed_total += 1;
                events
                    .publish(PlatformEvent::CommissionConfirmed {
                        commission_id: entry.id,
                        partner_id: entry.partner_id,
                        order_id: entry.order_id,
                        commission_level: entry.commission_level,
                        commission_amount: entry.commission_amount,
                    })
                    .await;
            }
        }

        if batch_len < batch_size {
            break;
        }
    }

    if confirmed_total > 0 {
        tracing::info!(confirmed = confirmed_total, "Matured due commissions");
    }
    Ok(confirmed_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_l1_l2() -> Vec<ChainEntry> {
        vec![
            ChainEntry {
                partner_id: "p1b".into(),
                tier: PartnerTier::L1,
                level: 1,
            },
            ChainEntry {
                partner_id: "p1".into(),
                tier: PartnerTier::L1,
                level: 2,
            },
        ]
    }

    #[test]
    fn test_plan_both_levels_exact_amounts() {
        // ¥365 order, L1 rates 20% / 10%: ¥73.00 and ¥36.50 exactly.
        let planned = plan_commissions(
            Decimal::new(36500, 2),
            &chain_l1_l2(),
            &RateTable::default(),
        );
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].partner_id, "p1b");
        assert_eq!(planned[0].level, 1);
        assert_eq!(planned[0].amount, Decimal::new(7300, 2));
        assert_eq!(planned[1].partner_id, "p1");
        assert_eq!(planned[1].level, 2);
        assert_eq!(planned[1].amount, Decimal::new(3650, 2));
    }

    #[test]
    fn test_plan_amounts_equal_rate_product() {
        let amount = Decimal::new(36500, 2);
        let rates = RateTable::default();
        for planned in plan_commissions(amount, &chain_l1_l2(), &rates) {
            assert_eq!(planned.amount, amount * planned.rate);
        }
    }

    #[test]
    fn test_plan_skips_zero_rate_levels() {
        // Bloom-tier upstream earns nothing at level 2.
        let chain = vec![
            ChainEntry {
                partner_id: "p1b".into(),
                tier: PartnerTier::L1,
                level: 1,
            },
            ChainEntry {
                partner_id: "p0".into(),
                tier: PartnerTier::Bloom,
                level: 2,
            },
        ];
        let planned = plan_commissions(Decimal::new(10000, 2), &chain, &RateTable::default());
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].partner_id, "p1b");
    }

    #[test]
    fn test_plan_rounds_sub_cent_products_half_up() {
        // ¥33.33 at 20% is ¥6.666, stored as ¥6.67.
        let chain = vec![ChainEntry {
            partner_id: "p1".into(),
            tier: PartnerTier::L1,
            level: 1,
        }];
        let planned = plan_commissions(Decimal::new(3333, 2), &chain, &RateTable::default());
        assert_eq!(planned[0].amount, Decimal::new(667, 2));
    }

    #[test]
    fn test_plan_empty_chain_is_organic() {
        assert!(plan_commissions(Decimal::new(36500, 2), &[], &RateTable::default()).is_empty());
    }

    fn order(amount: Decimal) -> OrderEvent {
        OrderEvent {
            order_id: "o1".into(),
            order_type: "purchase_365".into(),
            order_amount: amount,
            buyer_user_id: "u2".into(),
        }
    }

    #[test]
    fn test_non_positive_orders_are_invalid() {
        assert!(matches!(
            validate_order(&order(Decimal::ZERO)),
            Err(LedgerError::InvalidOrder(_))
        ));
        assert!(matches!(
            validate_order(&order(Decimal::new(-36500, 2))),
            Err(LedgerError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_positive_orders_qualify() {
        assert!(validate_order(&order(Decimal::new(36500, 2))).is_ok());
        assert!(validate_order(&order(Decimal::new(1, 2))).is_ok());
    }
}
