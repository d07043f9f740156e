//! `SeaORM` Entity for partner withdrawal requests

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A request to pay out accumulated balance. Inserted only while holding
/// the partner row lock, with the balance check in the same transaction,
/// so concurrent submissions cannot jointly over-withdraw.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "WithdrawalRequest")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "partnerId", column_type = "Text")]
    pub partner_id: String,
    /// Amount reserved against the partner's balance from submission on
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    /// Payout channel (e.g. "alipay", "bank_transfer")
    #[sea_orm(column_name = "paymentMethod", column_type = "Text")]
    pub payment_method: String,
    /// Channel-specific payout details, opaque to the ledger
    #[sea_orm(column_name = "paymentInfo")]
    pub payment_info: Json,
    pub status: super::sea_orm_active_enums::WithdrawalStatus,
    /// Admin who resolved the request, if resolved
    #[sea_orm(column_name = "resolvedBy", column_type = "Text", nullable)]
    pub resolved_by: Option<String>,
    #[sea_orm(column_name = "resolvedAt", nullable)]
    pub resolved_at: Option<DateTime>,
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
