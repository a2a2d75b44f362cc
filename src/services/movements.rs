//! Movement store: transactional persistence of inbound/outbound headers and
//! line items, deletion with reversal rules, and origin-group read-back.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::folio_sequence::MovementType;
use crate::entities::{
    inbound_line_item,
    inbound_movement::{self, Entity as InboundMovement},
    outbound_line_item,
    outbound_movement::{self, Entity as OutboundMovement, FulfillmentState, MovementKind,
        MovementStatus},
    product::{self, Entity as Product},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{fixed_fund, folio, stock};

/// One line of a new outbound header, already priced.
#[derive(Debug, Clone)]
pub struct NewOutboundLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// A new outbound header plus its lines, persisted as one unit.
#[derive(Debug, Clone)]
pub struct NewOutboundMovement {
    pub kind: MovementKind,
    pub fulfillment: FulfillmentState,
    pub reason: String,
    pub notes: Option<String>,
    pub origin_id: Option<Uuid>,
    pub requester_id: Uuid,
    pub lines: Vec<NewOutboundLine>,
}

/// Persists an outbound header and its lines inside the caller's
/// transaction. Issues the folio, computes the total from the lines and
/// refuses empty or non-positive input.
pub(crate) async fn create_outbound_in<C: sea_orm::ConnectionTrait>(
    conn: &C,
    new: NewOutboundMovement,
) -> Result<outbound_movement::Model, ServiceError> {
    if new.lines.is_empty() {
        return Err(ServiceError::InvalidOperation(
            "movement requires at least one line item".to_string(),
        ));
    }
    for line in &new.lines {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
    }

    let issued = folio::issue(conn, MovementType::Outbound).await?;
    let total_value: Decimal = new
        .lines
        .iter()
        .map(|l| Decimal::from(l.quantity) * l.unit_price)
        .sum();

    let header = outbound_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        reason: Set(new.reason),
        notes: Set(new.notes),
        total_value: Set(total_value),
        status: Set(MovementStatus::Created.as_str().to_string()),
        kind: Set(new.kind.as_str().to_string()),
        fulfillment: Set(new.fulfillment.as_str().to_string()),
        origin_id: Set(new.origin_id),
        requester_id: Set(new.requester_id),
        series: Set(issued.series),
        folio: Set(issued.folio),
        ..Default::default()
    };
    let header = header.insert(conn).await.map_err(ServiceError::DatabaseError)?;

    let items: Vec<outbound_line_item::ActiveModel> = new
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| outbound_line_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            movement_id: Set(header.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            position: Set(position as i32),
        })
        .collect();
    outbound_line_item::Entity::insert_many(items)
        .exec(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(header)
}

/// Request/response types for inbound receipts
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInboundRequest {
    pub source_type: Option<String>,
    pub supplier_reference: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub lines: Vec<InboundLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the product's catalog price when omitted
    pub unit_price: Option<Decimal>,
    pub lot_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundMovementDetail {
    pub movement: inbound_movement::Model,
    pub lines: Vec<inbound_line_item::Model>,
}

/// A reconstructed origin group: every sub-order spawned from one
/// withdrawal request, with lines and product names.
#[derive(Debug, Clone, Serialize)]
pub struct OriginGroup {
    pub origin_id: Uuid,
    pub movements: Vec<MovementWithLines>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementWithLines {
    pub movement: outbound_movement::Model,
    pub lines: Vec<LineWithProduct>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineWithProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Service for persisting and deleting movements
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    low_stock_threshold: i32,
}

impl MovementService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            event_sender,
            low_stock_threshold,
        }
    }

    /// Creates an inbound receipt: header + lines + folio + stock increment,
    /// all in one transaction.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn create_inbound(
        &self,
        request: CreateInboundRequest,
    ) -> Result<InboundMovementDetail, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for line in &request.lines {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "cantidad for product {} must be positive",
                    line.product_id
                )));
            }
        }

        let low_stock_threshold = self.low_stock_threshold;
        let (detail, adjustments) = self
            .db
            .transaction::<_, (InboundMovementDetail, Vec<stock::StockAdjustment>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let mut products: HashMap<Uuid, product::Model> = HashMap::new();
                        for line in &request.lines {
                            if !products.contains_key(&line.product_id) {
                                let found = stock::get_product(txn, line.product_id)
                                    .await?
                                    .ok_or_else(|| {
                                        ServiceError::ValidationError(format!(
                                            "unknown product {}",
                                            line.product_id
                                        ))
                                    })?;
                                products.insert(line.product_id, found);
                            }
                        }

                        let issued = folio::issue(txn, MovementType::Inbound).await?;
                        let total_value: Decimal = request
                            .lines
                            .iter()
                            .map(|l| {
                                let price = l.unit_price.unwrap_or_else(|| {
                                    products[&l.product_id].unit_price
                                });
                                Decimal::from(l.quantity) * price
                            })
                            .sum();

                        let header = inbound_movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            source_type: Set(request.source_type.clone()),
                            supplier_reference: Set(request.supplier_reference.clone()),
                            notes: Set(request.notes.clone()),
                            total_value: Set(total_value),
                            series: Set(issued.series),
                            folio: Set(issued.folio),
                            ..Default::default()
                        };
                        let header = header
                            .insert(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        let items: Vec<inbound_line_item::ActiveModel> = request
                            .lines
                            .iter()
                            .map(|l| inbound_line_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                movement_id: Set(header.id),
                                product_id: Set(l.product_id),
                                quantity: Set(l.quantity),
                                unit_price: Set(l
                                    .unit_price
                                    .unwrap_or_else(|| products[&l.product_id].unit_price)),
                                lot_number: Set(l.lot_number.clone()),
                                expiration_date: Set(l.expiration_date),
                                remaining_quantity: Set(l.quantity),
                            })
                            .collect();
                        inbound_line_item::Entity::insert_many(items)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        // Receipt increments stock per product (summed across lines)
                        let mut deltas: HashMap<Uuid, i32> = HashMap::new();
                        for line in &request.lines {
                            *deltas.entry(line.product_id).or_insert(0) += line.quantity;
                        }
                        let mut adjustments = Vec::with_capacity(deltas.len());
                        for (product_id, delta) in deltas {
                            let adjustment = stock::apply_delta(
                                txn,
                                &products[&product_id],
                                delta,
                                low_stock_threshold,
                            )
                            .await?;
                            adjustments.push(adjustment);
                        }

                        let lines = inbound_line_item::Entity::find()
                            .filter(inbound_line_item::Column::MovementId.eq(header.id))
                            .all(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        Ok((InboundMovementDetail { movement: header, lines }, adjustments))
                    })
                },
            )
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            movement_id = %detail.movement.id,
            folio = %detail.movement.folio,
            "inbound movement created"
        );
        self.event_sender
            .send_or_log(Event::MovementCreated {
                movement_type: MovementType::Inbound.as_str().to_string(),
                movement_id: detail.movement.id,
                series: detail.movement.series.clone(),
                folio: detail.movement.folio.clone(),
            })
            .await;
        self.emit_stock_events(&adjustments).await;

        Ok(detail)
    }

    /// Deletes an inbound receipt, reversing its stock increment. Refuses
    /// when the reversal would drive any product's on-hand below zero,
    /// naming every offending product.
    #[instrument(skip(self))]
    pub async fn delete_inbound(&self, id: Uuid) -> Result<(), ServiceError> {
        let low_stock_threshold = self.low_stock_threshold;
        let (series, folio, adjustments) = self
            .db
            .transaction::<_, (String, String, Vec<stock::StockAdjustment>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let header = InboundMovement::find_by_id(id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("inbound movement {} not found", id))
                            })?;
                        let lines = inbound_line_item::Entity::find()
                            .filter(inbound_line_item::Column::MovementId.eq(id))
                            .all(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        let mut deltas: HashMap<Uuid, i32> = HashMap::new();
                        for line in &lines {
                            *deltas.entry(line.product_id).or_insert(0) += line.quantity;
                        }

                        let mut products: HashMap<Uuid, product::Model> = HashMap::new();
                        let mut shortfalls = Vec::new();
                        for (&product_id, &delta) in &deltas {
                            let found =
                                stock::get_product(txn, product_id).await?.ok_or_else(|| {
                                    ServiceError::InternalError(format!(
                                        "product {} referenced by movement {} no longer exists",
                                        product_id, id
                                    ))
                                })?;
                            if found.quantity_on_hand < delta {
                                shortfalls.push(format!(
                                    "{} ({}): on hand {}, receipt {}",
                                    found.name, found.id, found.quantity_on_hand, delta
                                ));
                            }
                            products.insert(product_id, found);
                        }
                        if !shortfalls.is_empty() {
                            return Err(ServiceError::ValidationError(format!(
                                "deleting this receipt would drive stock negative: {}",
                                shortfalls.join("; ")
                            )));
                        }

                        let mut adjustments = Vec::with_capacity(deltas.len());
                        for (product_id, delta) in deltas {
                            let adjustment = stock::apply_delta(
                                txn,
                                &products[&product_id],
                                -delta,
                                low_stock_threshold,
                            )
                            .await?;
                            adjustments.push(adjustment);
                        }

                        inbound_line_item::Entity::delete_many()
                            .filter(inbound_line_item::Column::MovementId.eq(id))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;
                        InboundMovement::delete_by_id(id)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        Ok((header.series, header.folio, adjustments))
                    })
                },
            )
            .await
            .map_err(unwrap_transaction_error)?;

        folio::reclaim_best_effort(&self.db, MovementType::Inbound, &series).await;
        self.event_sender
            .send_or_log(Event::MovementDeleted {
                movement_type: MovementType::Inbound.as_str().to_string(),
                movement_id: id,
                series,
                folio,
            })
            .await;
        self.emit_stock_events(&adjustments).await;

        Ok(())
    }

    /// Deletes an outbound sub-order. Fulfilled headers get their stock
    /// decrement reversed; normal fulfilled headers additionally restore the
    /// requester's fixed fund where an active allocation still exists.
    #[instrument(skip(self))]
    pub async fn delete_outbound(&self, id: Uuid) -> Result<(), ServiceError> {
        let low_stock_threshold = self.low_stock_threshold;
        let (series, folio, adjustments) = self
            .db
            .transaction::<_, (String, String, Vec<stock::StockAdjustment>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let header = OutboundMovement::find_by_id(id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "outbound movement {} not found",
                                    id
                                ))
                            })?;
                        let lines = outbound_line_item::Entity::find()
                            .filter(outbound_line_item::Column::MovementId.eq(id))
                            .all(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        let fulfilled =
                            header.fulfillment() == Some(FulfillmentState::Fulfilled);
                        let is_normal = header.kind() == Some(MovementKind::Normal);

                        let mut adjustments = Vec::new();
                        if fulfilled {
                            let mut deltas: HashMap<Uuid, i32> = HashMap::new();
                            for line in &lines {
                                *deltas.entry(line.product_id).or_insert(0) += line.quantity;
                            }
                            for (product_id, delta) in deltas {
                                let found = stock::get_product(txn, product_id)
                                    .await?
                                    .ok_or_else(|| {
                                        ServiceError::InternalError(format!(
                                            "product {} referenced by movement {} no longer exists",
                                            product_id, id
                                        ))
                                    })?;
                                let adjustment = stock::apply_delta(
                                    txn,
                                    &found,
                                    delta,
                                    low_stock_threshold,
                                )
                                .await?;
                                adjustments.push(adjustment);

                                if is_normal {
                                    fixed_fund::restore(
                                        txn,
                                        header.requester_id,
                                        product_id,
                                        delta,
                                    )
                                    .await?;
                                }
                            }
                        }

                        outbound_line_item::Entity::delete_many()
                            .filter(outbound_line_item::Column::MovementId.eq(id))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;
                        OutboundMovement::delete_by_id(id)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::DatabaseError)?;

                        Ok((header.series, header.folio, adjustments))
                    })
                },
            )
            .await
            .map_err(unwrap_transaction_error)?;

        folio::reclaim_best_effort(&self.db, MovementType::Outbound, &series).await;
        self.event_sender
            .send_or_log(Event::MovementDeleted {
                movement_type: MovementType::Outbound.as_str().to_string(),
                movement_id: id,
                series,
                folio,
            })
            .await;
        self.emit_stock_events(&adjustments).await;

        Ok(())
    }

    /// Reconstructs the full disposition of one withdrawal request: every
    /// sub-order sharing the origin id, ordered by creation time, with lines
    /// and product names.
    #[instrument(skip(self))]
    pub async fn get_by_origin_id(&self, origin_id: Uuid) -> Result<OriginGroup, ServiceError> {
        let movements = OutboundMovement::find()
            .filter(outbound_movement::Column::OriginId.eq(origin_id))
            .order_by_asc(outbound_movement::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        if movements.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no movements recorded for origin {}",
                origin_id
            )));
        }

        let movement_ids: Vec<Uuid> = movements.iter().map(|m| m.id).collect();
        let lines = outbound_line_item::Entity::find()
            .filter(outbound_line_item::Column::MovementId.is_in(movement_ids))
            .order_by_asc(outbound_line_item::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let product_names: HashMap<Uuid, String> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let movements = movements
            .into_iter()
            .map(|movement| {
                let lines = lines
                    .iter()
                    .filter(|l| l.movement_id == movement.id)
                    .map(|l| LineWithProduct {
                        product_id: l.product_id,
                        product_name: product_names
                            .get(&l.product_id)
                            .cloned()
                            .unwrap_or_default(),
                        quantity: l.quantity,
                        unit_price: l.unit_price,
                    })
                    .collect();
                MovementWithLines { movement, lines }
            })
            .collect();

        Ok(OriginGroup {
            origin_id,
            movements,
        })
    }

    async fn emit_stock_events(&self, adjustments: &[stock::StockAdjustment]) {
        for adjustment in adjustments {
            self.event_sender
                .send_or_log(Event::StockAdjusted {
                    product_id: adjustment.product_id,
                    old_quantity: adjustment.old_quantity,
                    new_quantity: adjustment.new_quantity,
                    status: adjustment.status.as_str().to_string(),
                })
                .await;
        }
    }
}

pub(crate) fn unwrap_transaction_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
