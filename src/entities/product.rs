use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived product status, recomputed after every stock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Normal,
    Low,
    Expired,
    OutOfStock,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Normal => "normal",
            ProductStatus::Low => "low",
            ProductStatus::Expired => "expired",
            ProductStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(ProductStatus::Normal),
            "low" => Some(ProductStatus::Low),
            "expired" => Some(ProductStatus::Expired),
            "out_of_stock" => Some(ProductStatus::OutOfStock),
            _ => None,
        }
    }

    /// Derives the status from on-hand quantity and expiration date.
    /// Zero stock wins over expiration; expiration wins over low stock.
    pub fn derive(
        quantity_on_hand: i32,
        expiration_date: Option<NaiveDate>,
        low_stock_threshold: i32,
        today: NaiveDate,
    ) -> Self {
        if quantity_on_hand <= 0 {
            return ProductStatus::OutOfStock;
        }
        if let Some(expiration) = expiration_date {
            if expiration < today {
                return ProductStatus::Expired;
            }
        }
        if quantity_on_hand <= low_stock_threshold {
            return ProductStatus::Low;
        }
        ProductStatus::Normal
    }
}

/// Product catalog row. Owned by catalog management; this service only
/// mutates `quantity_on_hand`, `status` and `updated_at`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity_on_hand: i32,
    pub expiration_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::outbound_line_item::Entity")]
    OutboundLineItem,
    #[sea_orm(has_many = "super::inbound_line_item::Entity")]
    InboundLineItem,
}

impl Related<super::outbound_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutboundLineItem.def()
    }
}

impl Related<super::inbound_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InboundLineItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn zero_stock_wins_over_expiration() {
        let status = ProductStatus::derive(0, Some(date(2020, 1, 1)), 10, date(2025, 6, 1));
        assert_eq!(status, ProductStatus::OutOfStock);
    }

    #[test]
    fn past_expiration_marks_expired() {
        let status = ProductStatus::derive(50, Some(date(2025, 5, 31)), 10, date(2025, 6, 1));
        assert_eq!(status, ProductStatus::Expired);
    }

    #[test]
    fn at_threshold_is_low() {
        assert_eq!(
            ProductStatus::derive(10, None, 10, date(2025, 6, 1)),
            ProductStatus::Low
        );
        assert_eq!(
            ProductStatus::derive(11, None, 10, date(2025, 6, 1)),
            ProductStatus::Normal
        );
    }

    #[test]
    fn expiring_today_is_not_expired() {
        let status = ProductStatus::derive(50, Some(date(2025, 6, 1)), 10, date(2025, 6, 1));
        assert_eq!(status, ProductStatus::Normal);
    }
}
