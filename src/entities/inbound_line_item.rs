use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item of an inbound movement. `remaining_quantity` starts equal to
/// `quantity` and is consumed by FIFO/lot tracking elsewhere; this service
/// only initializes it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub lot_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub remaining_quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inbound_movement::Entity",
        from = "Column::MovementId",
        to = "super::inbound_movement::Column::Id",
        on_delete = "Cascade"
    )]
    InboundMovement,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::inbound_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InboundMovement.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
