//! Inventory ledger: guarded on-hand mutations with derived-status recompute.
//!
//! Every mutation runs inside the caller's transaction; the guard against a
//! negative result is the authoritative check, not a separate optimistic read.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::product::{self, Entity as Product, ProductStatus};
use crate::errors::ServiceError;

/// Outcome of a single stock mutation, reported to callers for events.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub old_quantity: i32,
    pub new_quantity: i32,
    pub status: ProductStatus,
}

pub async fn get_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Option<product::Model>, ServiceError> {
    Product::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Applies a signed quantity delta to a product's on-hand stock and
/// recomputes its derived status. Refuses to commit a negative result.
pub async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
    delta: i32,
    low_stock_threshold: i32,
) -> Result<StockAdjustment, ServiceError> {
    let old_quantity = product.quantity_on_hand;
    let new_quantity = old_quantity + delta;
    if new_quantity < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "product {} ({}): on hand {}, requested change {}",
            product.name, product.id, old_quantity, delta
        )));
    }

    let status = ProductStatus::derive(
        new_quantity,
        product.expiration_date,
        low_stock_threshold,
        Utc::now().date_naive(),
    );

    let mut active: product::ActiveModel = product.clone().into();
    active.quantity_on_hand = Set(new_quantity);
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    Ok(StockAdjustment {
        product_id: product.id,
        old_quantity,
        new_quantity,
        status,
    })
}
