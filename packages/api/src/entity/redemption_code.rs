//! `SeaORM` Entity for single-use redemption codes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single-use code that grants its claimant a referral relationship and
/// initial product quota. Claimed at most once; the `Available -> Redeemed`
/// transition is a compare-and-set on `status`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "RedemptionCode")]
pub struct Model {
    /// The code itself, globally unique
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub code: String,
    /// Administrative batch this code was generated in
    #[sea_orm(column_name = "batchName", column_type = "Text")]
    pub batch_name: String,
    /// The partner who hands this code out and earns the referral
    #[sea_orm(column_name = "partnerId", column_type = "Text")]
    pub partner_id: String,
    /// What claiming the code grants
    #[sea_orm(column_name = "entryType")]
    pub entry_type: super::sea_orm_active_enums::EntryType,
    /// Initial product quota granted to the claimant
    #[sea_orm(column_name = "quotaAmount")]
    pub quota_amount: i32,
    /// Entry price for paid codes (0 for free codes)
    #[sea_orm(column_name = "entryPrice", column_type = "Decimal(Some((12, 2)))")]
    pub entry_price: Decimal,
    /// Marketing channel the batch was distributed through, if any
    #[sea_orm(column_name = "sourceChannel", column_type = "Text", nullable)]
    pub source_channel: Option<String>,
    pub status: super::sea_orm_active_enums::CodeStatus,
    #[sea_orm(column_name = "expiresAt", nullable)]
    pub expires_at: Option<DateTime>,
    #[sea_orm(column_name = "redeemedBy", column_type = "Text", nullable)]
    pub redeemed_by: Option<String>,
    #[sea_orm(column_name = "redeemedAt", nullable)]
    pub redeemed_at: Option<DateTime>,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Partner,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
