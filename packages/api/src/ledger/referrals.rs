//! Referral graph construction and lifecycle updates.
//!
//! The graph has a fixed depth of two. A claim inserts the level-1 edge and,
//! when the owning partner was itself recruited, a single level-2 edge one
//! hop up. The schema's unique index on (`referredUserId`, `level`) is the
//! serialization point that makes "one referrer per user" hold when the same
//! user redeems two codes concurrently.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    sea_query::{Expr, ExprTrait as _},
};

use crate::{
    entity::{partner, redemption_code, referral, sea_orm_active_enums::ConversionStatus},
    ledger::error::LedgerError,
};

/// Records the referral edges for a freshly claimed code.
///
/// Must run inside the same transaction as the claim itself, so a claimant
/// who turns out to be already referred rolls the code consumption back
/// instead of burning the code without a referral.
pub async fn record_claim<C: ConnectionTrait>(
    db: &C,
    code: &redemption_code::Model,
    claiming_user_id: &str,
) -> Result<Vec<referral::Model>, LedgerError> {
    let existing = referral::Entity::find()
        .filter(referral::Column::ReferredUserId.eq(claiming_user_id))
        .filter(referral::Column::Level.eq(1i16))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(LedgerError::AlreadyReferred);
    }

    let now = Utc::now().naive_utc();
    let mut created = Vec::with_capacity(2);

    let level1 = referral::ActiveModel {
        id: Set(bloom_types::create_id()),
        partner_id: Set(code.partner_id.clone()),
        referred_user_id: Set(claiming_user_id.to_string()),
        level: Set(1),
        parent_referral_id: Set(None),
        conversion_status: Set(ConversionStatus::Experiencing),
        has_joined_group: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let level1 = insert_edge(db, level1).await?;
    increment_counter(db, &code.partner_id, partner::Column::TotalReferrals, now).await?;

    // One hop up: if the owning partner's own account was recruited, that
    // recruiter earns a level-2 edge. Never propagated further.
    if let Some(upstream) = upstream_partner_of(db, &code.partner_id).await? {
        let level2 = referral::ActiveModel {
            id: Set(bloom_types::create_id()),
            partner_id: Set(upstream.clone()),
            referred_user_id: Set(claiming_user_id.to_string()),
            level: Set(2),
            parent_referral_id: Set(Some(level1.id.clone())),
            conversion_status: Set(ConversionStatus::Experiencing),
            has_joined_group: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let level2 = insert_edge(db, level2).await?;
        increment_counter(db, &upstream, partner::Column::TotalL2Referrals, now).await?;
        created.push(level2);
    }

    created.insert(0, level1);
    Ok(created)
}

async fn insert_edge<C: ConnectionTrait>(
    db: &C,
    edge: referral::ActiveModel,
) -> Result<referral::Model, LedgerError> {
    edge.insert(db).await.map_err(|err| {
        let err = LedgerError::from(err);
        // Two redemptions by the same user raced past the pre-check; the
        // unique index on (referredUserId, level) decides the winner.
        if err.is_unique_violation() {
            LedgerError::AlreadyReferred
        } else {
            err
        }
    })
}

/// The partner whose recruit the owning partner's own user account is, if
/// any. This is the single upstream hop of the two-level graph.
async fn upstream_partner_of<C: ConnectionTrait>(
    db: &C,
    partner_id: &str,
) -> Result<Option<String>, LedgerError> {
    let Some(owner) = partner::Entity::find_by_id(partner_id).one(db).await? else {
        return Err(LedgerError::NotFound("partner"));
    };
    let upstream = referral::Entity::find()
        .filter(referral::Column::ReferredUserId.eq(owner.user_id))
        .filter(referral::Column::Level.eq(1i16))
        .one(db)
        .await?;
    Ok(upstream.map(|r| r.partner_id))
}

/// Atomic counter bump, co-located with the referral insert in the same
/// transaction rather than applied as a separate best-effort update.
async fn increment_counter<C: ConnectionTrait>(
    db: &C,
    partner_id: &str,
    column: partner::Column,
    now: chrono::NaiveDateTime,
) -> Result<(), LedgerError> {
    partner::Entity::update_many()
        .col_expr(column, Expr::col(column).add(1))
        .col_expr(partner::Column::UpdatedAt, Expr::value(now))
        .filter(partner::Column::Id.eq(partner_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Stages a conversion update may move *to*, from earlier stages only. A
/// stale or replayed lifecycle event can never move a user backwards.
pub fn earlier_stages(target: ConversionStatus) -> &'static [ConversionStatus] {
    match target {
        ConversionStatus::Experiencing => &[],
        ConversionStatus::InCamp => &[ConversionStatus::Experiencing],
        ConversionStatus::Purchased365 => {
            &[ConversionStatus::Experiencing, ConversionStatus::InCamp]
        }
        ConversionStatus::BecamePartner => &[
            ConversionStatus::Experiencing,
            ConversionStatus::InCamp,
            ConversionStatus::Purchased365,
        ],
    }
}

/// Advances the funnel stage of every referral row for `user_id` (both
/// levels track the same recruit). Forward-only and idempotent.
pub async fn advance_conversion<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    status: ConversionStatus,
) -> Result<u64, LedgerError> {
    let from = earlier_stages(status);
    if from.is_empty() {
        return Ok(0);
    }
    let now = Utc::now().naive_utc();
    let result = referral::Entity::update_many()
        .col_expr(referral::Column::ConversionStatus, Expr::value(status))
        .col_expr(referral::Column::UpdatedAt, Expr::value(now))
        .filter(referral::Column::ReferredUserId.eq(user_id))
        .filter(referral::Column::ConversionStatus.is_in(from.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Marks the recruit as having joined the community group. Idempotent.
pub async fn mark_group_joined<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<u64, LedgerError> {
    let now = Utc::now().naive_utc();
    let result = referral::Entity::update_many()
        .col_expr(referral::Column::HasJoinedGroup, Expr::value(true))
        .col_expr(referral::Column::UpdatedAt, Expr::value(now))
        .filter(referral::Column::ReferredUserId.eq(user_id))
        .filter(referral::Column::HasJoinedGroup.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_moves_forward_only() {
        assert!(earlier_stages(ConversionStatus::Experiencing).is_empty());
        assert_eq!(
            earlier_stages(ConversionStatus::InCamp),
            &[ConversionStatus::Experiencing]
        );
        assert!(
            earlier_stages(ConversionStatus::BecamePartner)
                .contains(&ConversionStatus::Purchased365)
        );
    }

    #[test]
    fn test_no_stage_precedes_itself() {
        for status in [
            ConversionStatus::Experiencing,
            ConversionStatus::InCamp,
            ConversionStatus::Purchased365,
            ConversionStatus::BecamePartner,
        ] {
            assert!(!earlier_stages(status).contains(&status));
        }
    }
}
