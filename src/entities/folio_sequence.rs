use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The two movement series a sequence row can govern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Inbound,
    Outbound,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(MovementType::Inbound),
            "outbound" => Some(MovementType::Outbound),
            _ => None,
        }
    }
}

/// One row per movement type. Holds the current series label (possibly
/// empty) and the next folio to hand out. `next_folio` must stay at least
/// one above the highest folio persisted for (movement type, series).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "folio_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub movement_type: String,
    pub series: String,
    pub next_folio: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
