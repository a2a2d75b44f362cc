//! Fixed-fund ledger: per (requester, product) pre-authorized quantities.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::fixed_fund_allocation::{
    self, Entity as FixedFundAllocation, FundStatus,
};
use crate::errors::ServiceError;

/// Looks up the requester's active allocation for a product, if any.
pub async fn active_allocation<C: ConnectionTrait>(
    conn: &C,
    requester_id: Uuid,
    product_id: Uuid,
) -> Result<Option<fixed_fund_allocation::Model>, ServiceError> {
    FixedFundAllocation::find()
        .filter(fixed_fund_allocation::Column::RequesterId.eq(requester_id))
        .filter(fixed_fund_allocation::Column::ProductId.eq(product_id))
        .filter(fixed_fund_allocation::Column::Status.eq(FundStatus::Active.as_str()))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Decrements an allocation by `amount`, bounded by what is actually
/// available so the no-fund branch can never over-decrement.
pub async fn decrement<C: ConnectionTrait>(
    conn: &C,
    allocation: &fixed_fund_allocation::Model,
    amount: i32,
) -> Result<i32, ServiceError> {
    let applied = amount.min(allocation.available_quantity).max(0);
    if applied == 0 {
        return Ok(0);
    }

    let mut active: fixed_fund_allocation::ActiveModel = allocation.clone().into();
    active.available_quantity = Set(allocation.available_quantity - applied);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    Ok(applied)
}

/// Restores quantity to the requester's active allocation, if one exists.
/// Used when a fulfilled normal sub-order is deleted.
pub async fn restore<C: ConnectionTrait>(
    conn: &C,
    requester_id: Uuid,
    product_id: Uuid,
    amount: i32,
) -> Result<(), ServiceError> {
    if amount <= 0 {
        return Ok(());
    }
    let Some(allocation) = active_allocation(conn, requester_id, product_id).await? else {
        return Ok(());
    };

    let mut active: fixed_fund_allocation::ActiveModel = allocation.clone().into();
    active.available_quantity = Set(allocation.available_quantity + amount);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    Ok(())
}
