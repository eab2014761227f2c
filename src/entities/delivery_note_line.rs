use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a line gets fulfilled. One sourcing mode per line; a quantity is
/// never split between stock and dropship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum LineSourcing {
    #[sea_orm(string_value = "stock")]
    Stock,
    #[sea_orm(string_value = "dropship")]
    Dropship,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl LineSourcing {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSourcing::Stock => "stock",
            LineSourcing::Dropship => "dropship",
            LineSourcing::Custom => "custom",
        }
    }
}

/// Sub-status of a dropship line. Advances forward only:
/// pending -> ordered -> received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DropshipStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "received")]
    Received,
}

impl DropshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropshipStatus::Pending => "pending",
            DropshipStatus::Ordered => "ordered",
            DropshipStatus::Received => "received",
        }
    }

    /// Position in the forward-only progression.
    pub fn rank(&self) -> u8 {
        match self {
            DropshipStatus::Pending => 0,
            DropshipStatus::Ordered => 1,
            DropshipStatus::Received => 2,
        }
    }
}

/// A delivery note line. Catalog lines carry `item_id`; custom (ad-hoc)
/// lines carry `description` instead and never touch warehouse stock.
/// `posted_at` marks the moment the line shipped; after a partial post,
/// unposted lines stay attached for a follow-up shipment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_note_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub delivery_note_id: Uuid,
    pub line_no: i32,
    pub sourcing: LineSourcing,
    pub item_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub supplier_id: Option<Uuid>,
    pub dropship_status: Option<DropshipStatus>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery_note::Entity",
        from = "Column::DeliveryNoteId",
        to = "super::delivery_note::Column::Id"
    )]
    DeliveryNote,
}

impl Related<super::delivery_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryNote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }
}
