//! Withdrawal processor: balance-checked submission and admin resolution.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect, TransactionTrait, sea_query::Condition,
};
use serde::Deserialize;

use crate::{
    cas,
    entity::{partner, sea_orm_active_enums::WithdrawalStatus, withdrawal_request},
    ledger::{balance, error::LedgerError},
};

#[derive(Debug, Clone)]
pub struct SubmitWithdrawal {
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_info: serde_json::Value,
}

/// Admin resolution of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    MarkPaid,
}

/// Requested amounts must be strictly positive; the balance ceiling is
/// checked later, under the partner-row lock.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// The closed transition table: which current statuses each decision may
/// act on, and where it lands. Anything else is a conflict.
pub fn transition_for(decision: Decision) -> (&'static [WithdrawalStatus], WithdrawalStatus) {
    match decision {
        Decision::Approve => (&[WithdrawalStatus::Pending], WithdrawalStatus::Approved),
        Decision::Reject => (
            &[WithdrawalStatus::Pending, WithdrawalStatus::Approved],
            WithdrawalStatus::Rejected,
        ),
        Decision::MarkPaid => (&[WithdrawalStatus::Approved], WithdrawalStatus::Paid),
    }
}

/// Submits a withdrawal request, reserving the amount immediately.
///
/// The partner row is locked (`SELECT ... FOR UPDATE`) for the duration of
/// the balance check and the insert, which serializes submissions per
/// partner: two concurrent requests can never both pass the check against a
/// stale balance. Different partners do not contend.
pub async fn submit<C>(
    db: &C,
    partner_id: &str,
    req: SubmitWithdrawal,
) -> Result<withdrawal_request::Model, LedgerError>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_amount(req.amount)?;

    let partner_id = partner_id.to_string();
    let created = db
        .transaction::<_, withdrawal_request::Model, LedgerError>(|txn| {
            Box::pin(async move {
                let locked = partner::Entity::find_by_id(&partner_id)
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or(LedgerError::NotFound("partner"))?;

                let balance = balance::available_balance(txn, &locked.id).await?;
                if req.amount > balance.available {
                    return Err(LedgerError::InsufficientBalance {
                        available: balance.available,
                        requested: req.amount,
                    });
                }

                let now = Utc::now().naive_utc();
                let request = withdrawal_request::ActiveModel {
                    id: Set(bloom_types::create_id()),
                    partner_id: Set(locked.id),
                    amount: Set(req.amount),
                    payment_method: Set(req.payment_method),
                    payment_info: Set(req.payment_info),
                    status: Set(WithdrawalStatus::Pending),
                    resolved_by: Set(None),
                    resolved_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                Ok(request.insert(txn).await?)
            })
        })
        .await?;

    tracing::info!(
        request_id = %created.id,
        partner_id = %created.partner_id,
        amount = %created.amount,
        "Withdrawal request submitted"
    );
    Ok(created)
}

/// Applies an admin decision via a guarded status transition. Losing the
/// guard (another admin resolved first, or the request is in a state the
/// decision does not act on) is a conflict, not a fault.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    request_id: &str,
    decision: Decision,
    admin_id: &str,
) -> Result<withdrawal_request::Model, LedgerError> {
    let request = withdrawal_request::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound("withdrawal request"))?;

    let (from, to) = transition_for(decision);
    let now = Utc::now().naive_utc();
    let set = withdrawal_request::ActiveModel {
        status: Set(to),
        resolved_by: Set(Some(admin_id.to_string())),
        resolved_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    };
    let guard = Condition::all()
        .add(withdrawal_request::Column::Id.eq(request.id.as_str()))
        .add(withdrawal_request::Column::Status.is_in(from.iter().copied()));

    if !cas::transition::<withdrawal_request::Entity, _>(db, set, guard)
        .await?
        .won()
    {
        return Err(LedgerError::Conflict);
    }

    let resolved = withdrawal_request::Entity::find_by_id(&request.id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound("withdrawal request"))?;

    tracing::info!(
        request_id = %resolved.id,
        partner_id = %resolved.partner_id,
        status = ?resolved.status,
        "Withdrawal request resolved"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_only_acts_on_pending() {
        let (from, to) = transition_for(Decision::Approve);
        assert_eq!(from, &[WithdrawalStatus::Pending]);
        assert_eq!(to, WithdrawalStatus::Approved);
    }

    #[test]
    fn test_reject_releases_from_pending_or_approved() {
        let (from, to) = transition_for(Decision::Reject);
        assert!(from.contains(&WithdrawalStatus::Pending));
        assert!(from.contains(&WithdrawalStatus::Approved));
        assert!(!from.contains(&WithdrawalStatus::Paid));
        assert_eq!(to, WithdrawalStatus::Rejected);
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(Decimal::new(-5000, 2)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(validate_amount(Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn test_paid_is_terminal() {
        for decision in [Decision::Approve, Decision::Reject, Decision::MarkPaid] {
            let (from, _) = transition_for(decision);
            assert!(!from.contains(&WithdrawalStatus::Paid));
            assert!(!from.contains(&WithdrawalStatus::Rejected));
        }
    }
}
