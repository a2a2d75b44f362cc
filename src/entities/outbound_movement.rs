use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which split bucket an outbound sub-order carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Covered by the requester's fixed fund
    Normal,
    /// Drawn from general stock beyond the fund
    Voucher,
    /// Backordered; no ledger was touched
    Pending,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Normal => "normal",
            MovementKind::Voucher => "voucher",
            MovementKind::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(MovementKind::Normal),
            "voucher" => Some(MovementKind::Voucher),
            "pending" => Some(MovementKind::Pending),
            _ => None,
        }
    }
}

/// Whether the sub-order's stock decrement has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentState {
    Fulfilled,
    AwaitingFulfillment,
}

impl FulfillmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentState::Fulfilled => "fulfilled",
            FulfillmentState::AwaitingFulfillment => "awaiting_fulfillment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fulfilled" => Some(FulfillmentState::Fulfilled),
            "awaiting_fulfillment" => Some(FulfillmentState::AwaitingFulfillment),
            _ => None,
        }
    }
}

/// Header lifecycle state. `completed` is set by the external
/// mark-fulfilled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementStatus {
    Created,
    Completed,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Created => "created",
            MovementStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(MovementStatus::Created),
            "completed" => Some(MovementStatus::Completed),
            _ => None,
        }
    }
}

/// Outbound movement header. Sub-orders spawned from one withdrawal request
/// share an `origin_id`. The (series, folio) pair is unique per series.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbound_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reason: String,
    pub notes: Option<String>,
    pub total_value: Decimal,
    pub status: String,
    pub kind: String,
    pub fulfillment: String,
    pub origin_id: Option<Uuid>,
    pub requester_id: Uuid,
    pub series: String,
    pub folio: String,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn kind(&self) -> Option<MovementKind> {
        MovementKind::from_str(&self.kind)
    }

    pub fn fulfillment(&self) -> Option<FulfillmentState> {
        FulfillmentState::from_str(&self.fulfillment)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::outbound_line_item::Entity")]
    OutboundLineItem,
}

impl Related<super::outbound_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutboundLineItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
