use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PurchaseReturnStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "settled")]
    Settled,
}

/// Return of goods to a supplier. Settling decrements warehouse stock with
/// the same guarded primitive posting uses: a return that would push stock
/// negative, or that targets a (item, warehouse) pair with no stock row, is
/// rejected rather than defaulted to another warehouse.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_returns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub return_number: String,
    pub return_date: DateTime<Utc>,
    pub warehouse_id: Uuid,
    pub supplier_id: Uuid,
    pub status: PurchaseReturnStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_return_line::Entity")]
    PurchaseReturnLine,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
}

impl Related<super::purchase_return_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseReturnLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
