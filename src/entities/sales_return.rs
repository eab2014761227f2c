use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum SalesReturnStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "settled")]
    Settled,
}

/// Return of goods from a customer. Settling increments warehouse stock.
/// A settled return that references a delivery note blocks cancellation of
/// that note.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_returns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub return_number: String,
    pub return_date: DateTime<Utc>,
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
    pub delivery_note_id: Option<Uuid>,
    pub status: SalesReturnStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_return_line::Entity")]
    SalesReturnLine,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::delivery_note::Entity",
        from = "Column::DeliveryNoteId",
        to = "super::delivery_note::Column::Id"
    )]
    DeliveryNote,
}

impl Related<super::sales_return_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesReturnLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
