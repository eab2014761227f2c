use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_return_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sales_return_id: Uuid,
    pub line_no: i32,
    pub item_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_return::Entity",
        from = "Column::SalesReturnId",
        to = "super::sales_return::Column::Id"
    )]
    SalesReturn,
}

impl Related<super::sales_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesReturn.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
