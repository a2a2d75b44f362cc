//! Outbound-request allocation engine.
//!
//! A withdrawal request is split per product into three buckets: the part
//! covered by the requester's fixed fund (authorized), the part drawn from
//! general stock beyond the fund (voucher) and the part that cannot be
//! satisfied (pending). Each non-empty bucket becomes one outbound sub-order;
//! all sub-orders from one request share an origin id. Stock and fund are
//! mutated in the same transaction that persists the sub-orders.

use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::outbound_movement::{FulfillmentState, MovementKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::movements::{
    create_outbound_in, unwrap_transaction_error, NewOutboundLine, NewOutboundMovement,
};
use crate::services::{fixed_fund, stock};

/// Engine policy knobs, sourced from the global configuration.
#[derive(Debug, Clone, Copy)]
pub struct AllocationPolicy {
    /// Whether a requester without a fixed fund may draw from on-hand stock
    pub allow_requests_beyond_stock: bool,
    pub low_stock_threshold: i32,
}

impl AllocationPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            allow_requests_beyond_stock: cfg.allow_requests_beyond_stock,
            low_stock_threshold: cfg.low_stock_threshold,
        }
    }
}

/// How a product's request was resolved. The two pending-producing paths
/// stay distinct: `NoFund` marks the explicit no-allocation branch,
/// `PartiallyPending` the insufficient-stock path inside the fund formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitOutcome {
    /// Fully covered by the fixed fund
    Authorized,
    /// Fund exhausted, remainder covered from stock
    VoucherIssued,
    /// Stock ran out inside the fund path; remainder backordered
    PartiallyPending,
    /// No active fixed-fund allocation for this requester/product
    NoFund,
}

impl SplitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitOutcome::Authorized => "autorizado",
            SplitOutcome::VoucherIssued => "vale",
            SplitOutcome::PartiallyPending => "pendiente",
            SplitOutcome::NoFund => "sin_fondo",
        }
    }
}

/// Per-product three-way split. Always conserves the requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantitySplit {
    pub authorized: i32,
    pub voucher: i32,
    pub pending: i32,
    pub outcome: SplitOutcome,
}

/// Splits one product's requested quantity against the requester's fund
/// balance and the on-hand stock.
///
/// The fund is always exhausted before stock backs a voucher; pending is the
/// last resort and never touches a ledger. The authorized and voucher parts
/// together never exceed on-hand stock, so the accompanying decrement cannot
/// go negative.
pub fn split_quantities(
    requested: i32,
    fund_available: i32,
    on_hand: i32,
    allow_beyond_stock: bool,
) -> QuantitySplit {
    debug_assert!(requested > 0);
    let on_hand = on_hand.max(0);

    // Explicit no-fund branch: a missing, inactive or exhausted allocation
    // all behave as "no fund", gated by the policy switch.
    if fund_available <= 0 {
        if !allow_beyond_stock {
            return QuantitySplit {
                authorized: 0,
                voucher: 0,
                pending: requested,
                outcome: SplitOutcome::NoFund,
            };
        }
        let authorized = requested.min(on_hand);
        return QuantitySplit {
            authorized,
            voucher: 0,
            pending: requested - authorized,
            outcome: SplitOutcome::NoFund,
        };
    }

    if requested <= fund_available {
        // Fully covered by the fund, bounded by what is physically on hand.
        let authorized = requested.min(on_hand);
        let pending = requested - authorized;
        return QuantitySplit {
            authorized,
            voucher: 0,
            pending,
            outcome: if pending > 0 {
                SplitOutcome::PartiallyPending
            } else {
                SplitOutcome::Authorized
            },
        };
    }

    let excess = requested - fund_available;
    if on_hand >= requested {
        QuantitySplit {
            authorized: fund_available,
            voucher: excess,
            pending: 0,
            outcome: SplitOutcome::VoucherIssued,
        }
    } else if on_hand >= fund_available {
        // Stock covers the fund; whatever is left over backs the voucher.
        let voucher = excess.min(on_hand - fund_available);
        QuantitySplit {
            authorized: fund_available,
            voucher,
            pending: excess - voucher,
            outcome: SplitOutcome::PartiallyPending,
        }
    } else {
        QuantitySplit {
            authorized: fund_available.min(on_hand),
            voucher: 0,
            pending: requested - fund_available.min(on_hand),
            outcome: SplitOutcome::PartiallyPending,
        }
    }
}

/// A withdrawal request as received from the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AllocationRequest {
    pub requester_id: Uuid,
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<AllocationLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLine {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the product's catalog price when omitted
    pub unit_price: Option<Decimal>,
}

/// Per-product disposition reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBreakdown {
    pub product_id: Uuid,
    pub requested: i32,
    pub authorized: i32,
    pub voucher: i32,
    pub pending: i32,
    pub outcome: SplitOutcome,
}

/// Ids of the sub-orders generated by one allocation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedMovements {
    pub normal: Option<Uuid>,
    pub voucher: Option<Uuid>,
    pub pending: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationResult {
    pub origin_id: Uuid,
    pub movements: GeneratedMovements,
    pub breakdown: Vec<ProductBreakdown>,
}

/// The allocation engine service
#[derive(Clone)]
pub struct AllocationService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    policy: AllocationPolicy,
}

impl AllocationService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, policy: AllocationPolicy) -> Self {
        Self {
            db,
            event_sender,
            policy,
        }
    }

    /// Runs the three-way split for every product in the request and
    /// persists up to three linked sub-orders plus the ledger mutations, all
    /// inside one transaction. Nothing is retried automatically; on failure
    /// the caller decides whether to resubmit.
    #[instrument(skip(self, request), fields(requester_id = %request.requester_id, lines = request.lines.len()))]
    pub async fn allocate(
        &self,
        request: AllocationRequest,
    ) -> Result<AllocationResult, ServiceError> {
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

        let merged = merge_lines(&request.lines);
        let policy = self.policy;
        let requester_id = request.requester_id;
        let reason = request.reason.clone();
        let notes = request.notes.clone();

        let (result, adjustments) = self
            .db
            .transaction::<_, (AllocationResult, Vec<stock::StockAdjustment>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let origin_id = Uuid::new_v4();

                        // Snapshot every product and fund row, compute splits
                        let mut breakdown = Vec::with_capacity(merged.len());
                        let mut resolved = Vec::with_capacity(merged.len());
                        for line in &merged {
                            let product = stock::get_product(txn, line.product_id)
                                .await?
                                .ok_or_else(|| {
                                    ServiceError::ValidationError(format!(
                                        "unknown product {}",
                                        line.product_id
                                    ))
                                })?;
                            let fund = fixed_fund::active_allocation(
                                txn,
                                requester_id,
                                line.product_id,
                            )
                            .await?;
                            let fund_available =
                                fund.as_ref().map_or(0, |f| f.available_quantity);

                            let split = split_quantities(
                                line.quantity,
                                fund_available,
                                product.quantity_on_hand,
                                policy.allow_requests_beyond_stock,
                            );
                            breakdown.push(ProductBreakdown {
                                product_id: line.product_id,
                                requested: line.quantity,
                                authorized: split.authorized,
                                voucher: split.voucher,
                                pending: split.pending,
                                outcome: split.outcome,
                            });

                            let unit_price = line.unit_price.unwrap_or(product.unit_price);
                            resolved.push((product, fund, split, unit_price));
                        }

                        // Group the buckets into up to three sub-orders
                        let bucket = |extract: fn(&QuantitySplit) -> i32| -> Vec<NewOutboundLine> {
                            resolved
                                .iter()
                                .filter(|(_, _, split, _)| extract(split) > 0)
                                .map(|(product, _, split, unit_price)| NewOutboundLine {
                                    product_id: product.id,
                                    quantity: extract(split),
                                    unit_price: *unit_price,
                                })
                                .collect()
                        };
                        let normal_lines = bucket(|s| s.authorized);
                        let voucher_lines = bucket(|s| s.voucher);
                        let pending_lines = bucket(|s| s.pending);

                        let mut movements = GeneratedMovements::default();
                        if !normal_lines.is_empty() {
                            let header = create_outbound_in(
                                txn,
                                NewOutboundMovement {
                                    kind: MovementKind::Normal,
                                    fulfillment: FulfillmentState::Fulfilled,
                                    reason: reason.clone(),
                                    notes: notes.clone(),
                                    origin_id: Some(origin_id),
                                    requester_id,
                                    lines: normal_lines,
                                },
                            )
                            .await?;
                            movements.normal = Some(header.id);
                        }
                        if !voucher_lines.is_empty() {
                            let header = create_outbound_in(
                                txn,
                                NewOutboundMovement {
                                    kind: MovementKind::Voucher,
                                    fulfillment: FulfillmentState::Fulfilled,
                                    reason: format!("{} (vale)", reason),
                                    notes: Some(annotate(&notes, "vale", origin_id)),
                                    origin_id: Some(origin_id),
                                    requester_id,
                                    lines: voucher_lines,
                                },
                            )
                            .await?;
                            movements.voucher = Some(header.id);
                        }
                        if !pending_lines.is_empty() {
                            let header = create_outbound_in(
                                txn,
                                NewOutboundMovement {
                                    kind: MovementKind::Pending,
                                    fulfillment: FulfillmentState::AwaitingFulfillment,
                                    reason: format!("{} (pendiente)", reason),
                                    notes: Some(annotate(&notes, "pendiente", origin_id)),
                                    origin_id: Some(origin_id),
                                    requester_id,
                                    lines: pending_lines,
                                },
                            )
                            .await?;
                            movements.pending = Some(header.id);
                        }

                        // Ledger mutations: stock for authorized + voucher,
                        // fund (bounded) for the authorized part only.
                        let mut adjustments = Vec::new();
                        for (product, fund, split, _) in &resolved {
                            let outgoing = split.authorized + split.voucher;
                            if outgoing > 0 {
                                let adjustment = stock::apply_delta(
                                    txn,
                                    product,
                                    -outgoing,
                                    policy.low_stock_threshold,
                                )
                                .await?;
                                adjustments.push(adjustment);
                            }
                            if split.authorized > 0 {
                                if let Some(fund) = fund {
                                    fixed_fund::decrement(txn, fund, split.authorized).await?;
                                }
                            }
                        }

                        Ok((
                            AllocationResult {
                                origin_id,
                                movements,
                                breakdown,
                            },
                            adjustments,
                        ))
                    })
                },
            )
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            origin_id = %result.origin_id,
            normal = ?result.movements.normal,
            voucher = ?result.movements.voucher,
            pending = ?result.movements.pending,
            "allocation completed"
        );

        let movement_ids: Vec<(MovementKind, Uuid)> = [
            (MovementKind::Normal, result.movements.normal),
            (MovementKind::Voucher, result.movements.voucher),
            (MovementKind::Pending, result.movements.pending),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.map(|id| (kind, id)))
        .collect();
        self.event_sender
            .send_or_log(Event::AllocationCompleted {
                origin_id: result.origin_id,
                requester_id,
                movement_ids,
                timestamp: chrono::Utc::now(),
            })
            .await;
        for adjustment in &adjustments {
            self.event_sender
                .send_or_log(Event::StockAdjusted {
                    product_id: adjustment.product_id,
                    old_quantity: adjustment.old_quantity,
                    new_quantity: adjustment.new_quantity,
                    status: adjustment.status.as_str().to_string(),
                })
                .await;
        }

        Ok(result)
    }
}

/// Sums repeated lines for the same product, preserving first-seen order.
/// The first explicit price given for a product wins.
fn merge_lines(lines: &[AllocationLine]) -> Vec<AllocationLine> {
    let mut merged: Vec<AllocationLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(existing) = merged.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity += line.quantity;
            if existing.unit_price.is_none() {
                existing.unit_price = line.unit_price;
            }
        } else {
            merged.push(line.clone());
        }
    }
    merged
}

fn annotate(notes: &Option<String>, label: &str, origin_id: Uuid) -> String {
    match notes {
        Some(n) => format!("{} | {} de la solicitud {}", n, label, origin_id),
        None => format!("{} de la solicitud {}", label, origin_id),
    }
}
