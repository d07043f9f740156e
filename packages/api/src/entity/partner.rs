//! `SeaORM` Entity for affiliate partners

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A partner who recruits users through redemption codes and earns
/// commissions on their purchases. Partners are never deleted, only
/// deactivated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Partner")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// The partner's own end-user account. Used to walk one hop up the
    /// referral graph: if this user was itself referred, that referrer
    /// earns level-2 commissions.
    #[sea_orm(column_name = "userId", column_type = "Text", unique)]
    pub user_id: String,
    /// Public-facing partner code shown to recruits
    #[sea_orm(column_name = "partnerCode", column_type = "Text", unique)]
    pub partner_code: String,
    /// Commission tier, determines rates via the rate table
    pub tier: super::sea_orm_active_enums::PartnerTier,
    /// Count of level-1 referrals. Incremented in the same transaction
    /// that inserts the referral row.
    #[sea_orm(column_name = "totalReferrals")]
    pub total_referrals: i32,
    /// Count of level-2 referrals, maintained the same way
    #[sea_orm(column_name = "totalL2Referrals")]
    pub total_l2_referrals: i32,
    #[sea_orm(column_name = "isActive")]
    pub is_active: bool,
    /// When the partnership lapses unless renewed
    #[sea_orm(column_name = "expiresAt", nullable)]
    pub expires_at: Option<DateTime>,
    #[sea_orm(column_name = "renewedAt", nullable)]
    pub renewed_at: Option<DateTime>,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::redemption_code::Entity")]
    RedemptionCode,
    #[sea_orm(has_many = "super::referral::Entity")]
    Referral,
    #[sea_orm(has_many = "super::commission::Entity")]
    Commission,
    #[sea_orm(has_many = "super::withdrawal_request::Entity")]
    WithdrawalRequest,
}

impl Related<super::redemption_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RedemptionCode.def()
    }
}

impl Related<super::referral::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Referral.def()
    }
}

impl Related<super::commission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commission.def()
    }
}

impl Related<super::withdrawal_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
