//! Derived partner balance.
//!
//! The available balance is never stored: it is always the confirmed
//! commission total minus everything reserved by non-rejected withdrawal
//! requests, computed over whatever connection the caller provides. The
//! withdrawal processor calls this inside its partner-row lock for a
//! strongly consistent read; reporting surfaces call it on the pool and
//! tolerate slight staleness.

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
};
use serde::Serialize;

use crate::{
    entity::{
        commission, sea_orm_active_enums::{CommissionStatus, WithdrawalStatus}, withdrawal_request,
    },
    ledger::error::LedgerError,
};

/// Statuses that reserve balance. Everything except `Rejected`: a pending
/// request holds its amount from submission, and paid ones stay subtracted
/// forever.
pub const RESERVING_STATUSES: [WithdrawalStatus; 3] = [
    WithdrawalStatus::Pending,
    WithdrawalStatus::Approved,
    WithdrawalStatus::Paid,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceBreakdown {
    pub confirmed_total: Decimal,
    pub reserved_total: Decimal,
    pub available: Decimal,
}

/// The balance identity, separated so the arithmetic is testable without a
/// database.
pub fn breakdown(confirmed_total: Decimal, reserved_total: Decimal) -> BalanceBreakdown {
    BalanceBreakdown {
        confirmed_total,
        reserved_total,
        available: confirmed_total - reserved_total,
    }
}

#[derive(Debug, FromQueryResult)]
struct SumRow {
    total: Option<Decimal>,
}

pub async fn available_balance<C: ConnectionTrait>(
    conn: &C,
    partner_id: &str,
) -> Result<BalanceBreakdown, LedgerError> {
    let confirmed = commission::Entity::find()
        .select_only()
        .column_as(commission::Column::CommissionAmount.sum(), "total")
        .filter(commission::Column::PartnerId.eq(partner_id))
        .filter(commission::Column::Status.eq(CommissionStatus::Confirmed))
        .into_model::<SumRow>()
        .one(conn)
        .await?
        .and_then(|row| row.total)
        .unwrap_or(Decimal::ZERO);

    let reserved = withdrawal_request::Entity::find()
        .select_only()
        .column_as(withdrawal_request::Column::Amount.sum(), "total")
        .filter(withdrawal_request::Column::PartnerId.eq(partner_id))
        .filter(withdrawal_request::Column::Status.is_in(RESERVING_STATUSES))
        .into_model::<SumRow>()
        .one(conn)
        .await?
        .and_then(|row| row.total)
        .unwrap_or(Decimal::ZERO);

    Ok(breakdown(confirmed, reserved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_subtracts_reservations() {
        let b = breakdown(Decimal::new(20000, 2), Decimal::new(5000, 2));
        assert_eq!(b.available, Decimal::new(15000, 2));
    }

    #[test]
    fn test_breakdown_of_empty_ledger_is_zero() {
        let b = breakdown(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(b.available, Decimal::ZERO);
    }

    #[test]
    fn test_rejected_requests_do_not_reserve() {
        assert!(!RESERVING_STATUSES.contains(&WithdrawalStatus::Rejected));
        assert!(RESERVING_STATUSES.contains(&WithdrawalStatus::Pending));
        assert!(RESERVING_STATUSES.contains(&WithdrawalStatus::Paid));
    }
}
