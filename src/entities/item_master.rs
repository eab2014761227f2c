use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog item. Identity is immutable; the reorder thresholds and the
/// dropship flag are maintained by master-data CRUD outside this crate.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_master")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    pub unit_of_measure: String,
    pub min_stock: i32,
    pub max_stock: Option<i32>,
    pub is_dropship_eligible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouse_stock::Entity")]
    WarehouseStock,
    #[sea_orm(has_many = "super::supplier_offer::Entity")]
    SupplierOffer,
}

impl Related<super::warehouse_stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseStock.def()
    }
}

impl Related<super::supplier_offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierOffer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
