//! Closed status enumerations shared by the ledger entities.
//!
//! Every lifecycle field in the schema is a database enum mapped to one of
//! these types, so a status that is not handled exhaustively fails to
//! compile instead of silently falling through.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Commission tier of a partner. `Bloom` is the free entry tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "PartnerTier")]
#[serde(rename_all = "snake_case")]
pub enum PartnerTier {
    #[sea_orm(string_value = "bloom")]
    Bloom,
    #[sea_orm(string_value = "l1")]
    L1,
    #[sea_orm(string_value = "l2")]
    L2,
    #[sea_orm(string_value = "l3")]
    L3,
}

/// What a redemption code grants on claim.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "EntryType")]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// Redemption code lifecycle. Only `Available -> Redeemed` and
/// `Available -> Expired` are legal, both applied as guarded updates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "CodeStatus")]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// How far a referred user has progressed through the product funnel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ConversionStatus")]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    #[sea_orm(string_value = "experiencing")]
    Experiencing,
    #[sea_orm(string_value = "in_camp")]
    InCamp,
    #[sea_orm(string_value = "purchased_365")]
    Purchased365,
    #[sea_orm(string_value = "became_partner")]
    BecamePartner,
}

/// Commission lifecycle. `Pending` rows mature into `Confirmed` after the
/// maturation window, or flip to `Cancelled` on a refund signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "CommissionStatus")]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Withdrawal request lifecycle. `Pending`, `Approved` and `Paid` all
/// reserve the requested amount against the partner's balance; only
/// `Rejected` releases it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "WithdrawalStatus")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "paid")]
    Paid,
}
