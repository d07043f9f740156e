//! `SeaORM` Entity for the two-level referral graph

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One edge of the referral graph. The schema carries a unique index on
/// (`referredUserId`, `level`), which is what makes "at most one referrer
/// per user" hold under concurrent redemptions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Referral")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// The partner earning from this edge
    #[sea_orm(column_name = "partnerId", column_type = "Text")]
    pub partner_id: String,
    /// The recruited user
    #[sea_orm(column_name = "referredUserId", column_type = "Text")]
    pub referred_user_id: String,
    /// 1 = direct recruit, 2 = recruit-of-a-recruit. The graph has a fixed
    /// depth of two; level-2 edges are never propagated further.
    pub level: i16,
    /// For level-2 rows, the level-1 row that produced this edge
    #[sea_orm(column_name = "parentReferralId", column_type = "Text", nullable)]
    pub parent_referral_id: Option<String>,
    /// Funnel stage of the recruited user
    #[sea_orm(column_name = "conversionStatus")]
    pub conversion_status: super::sea_orm_active_enums::ConversionStatus,
    /// Whether the recruit joined the community group
    #[sea_orm(column_name = "hasJoinedGroup")]
    pub has_joined_group: bool,
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
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentReferralId",
        to = "Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Parent,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
