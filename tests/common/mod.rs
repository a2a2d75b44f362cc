//! Shared harness for the integration tests: a fresh in-memory SQLite
//! database per test plus fixture helpers for products and fund rows.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use almacen_api::{
    db::{establish_connection, run_migrations, DbConfig, DbPool},
    entities::{fixed_fund_allocation, product},
    events::{Event, EventSender},
};

/// Single-connection pool so every test gets its own private in-memory
/// database that survives across queries.
pub async fn setup_db() -> Arc<DbPool> {
    let pool = establish_connection(DbConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..DbConfig::default()
    })
    .await
    .expect("Failed to connect to in-memory sqlite");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Arc::new(pool)
}

pub fn event_channel() -> (Arc<EventSender>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(EventSender::new(tx)), rx)
}

pub fn dec(value: i32) -> Decimal {
    Decimal::new((value as i64) * 100, 2)
}

pub async fn create_product(
    db: &DbPool,
    sku: &str,
    quantity_on_hand: i32,
    unit_price: Decimal,
) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Producto {}", sku)),
        sku: Set(sku.to_string()),
        unit_price: Set(unit_price),
        quantity_on_hand: Set(quantity_on_hand),
        expiration_date: Set(None),
        status: Set("normal".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to create product")
}

pub async fn create_fund(
    db: &DbPool,
    requester_id: Uuid,
    product_id: Uuid,
    available_quantity: i32,
) -> fixed_fund_allocation::Model {
    fixed_fund_allocation::ActiveModel {
        id: Set(Uuid::new_v4()),
        requester_id: Set(requester_id),
        product_id: Set(product_id),
        available_quantity: Set(available_quantity),
        status: Set("active".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to create fixed-fund allocation")
}

pub async fn on_hand(db: &DbPool, product_id: Uuid) -> i32 {
    product::Entity::find_by_id(product_id)
        .one(db)
        .await
        .expect("Failed to query product")
        .expect("Product not found")
        .quantity_on_hand
}

pub async fn product_status(db: &DbPool, product_id: Uuid) -> String {
    product::Entity::find_by_id(product_id)
        .one(db)
        .await
        .expect("Failed to query product")
        .expect("Product not found")
        .status
}

pub async fn fund_available(db: &DbPool, requester_id: Uuid, product_id: Uuid) -> i32 {
    fixed_fund_allocation::Entity::find()
        .filter(fixed_fund_allocation::Column::RequesterId.eq(requester_id))
        .filter(fixed_fund_allocation::Column::ProductId.eq(product_id))
        .one(db)
        .await
        .expect("Failed to query fund allocation")
        .expect("Fund allocation not found")
        .available_quantity
}
