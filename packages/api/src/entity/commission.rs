//! `SeaORM` Entity for commission ledger entries

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One commission earned from a qualifying order. The schema carries a
/// unique index on (`orderId`, `commissionLevel`) so redelivered order
/// notifications can never duplicate earnings. Rows are never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Commission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// The order that generated this commission
    #[sea_orm(column_name = "orderId", column_type = "Text")]
    pub order_id: String,
    /// Product category of the order (e.g. "purchase_365", "camp")
    #[sea_orm(column_name = "orderType", column_type = "Text")]
    pub order_type: String,
    #[sea_orm(column_name = "orderAmount", column_type = "Decimal(Some((12, 2)))")]
    pub order_amount: Decimal,
    /// The partner earning this commission
    #[sea_orm(column_name = "partnerId", column_type = "Text")]
    pub partner_id: String,
    /// Referral level this commission was earned at (1 or 2)
    #[sea_orm(column_name = "commissionLevel")]
    pub commission_level: i16,
    /// Rate applied, snapshotted from the rate table at creation time
    #[sea_orm(column_name = "commissionRate", column_type = "Decimal(Some((5, 4)))")]
    pub commission_rate: Decimal,
    /// `orderAmount * commissionRate`, exact decimal arithmetic
    #[sea_orm(column_name = "commissionAmount", column_type = "Decimal(Some((12, 2)))")]
    pub commission_amount: Decimal,
    pub status: super::sea_orm_active_enums::CommissionStatus,
    /// When the pending entry becomes payable, absent a refund
    #[sea_orm(column_name = "confirmAt")]
    pub confirm_at: DateTime,
    #[sea_orm(column_name = "confirmedAt", nullable)]
    pub confirmed_at: Option<DateTime>,
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
