//! Inbound endpoints: stock receipts and their deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::movements::{CreateInboundRequest, InboundLineRequest};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EntradaRequest {
    pub tipo_origen: Option<String>,
    pub referencia_proveedor: Option<String>,
    pub observaciones: Option<String>,
    pub partidas: Vec<PartidaEntradaRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PartidaEntradaRequest {
    pub id_producto: Uuid,
    pub cantidad: i32,
    pub precio: Option<Decimal>,
    pub lote: Option<String>,
    pub fecha_caducidad: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntradaResponse {
    pub id: Uuid,
    pub serie: String,
    pub folio: String,
    pub total: Decimal,
    pub fecha_creacion: DateTime<Utc>,
    pub partidas: Vec<PartidaEntradaResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PartidaEntradaResponse {
    pub id_producto: Uuid,
    pub cantidad: i32,
    pub precio: Decimal,
    pub lote: Option<String>,
    pub fecha_caducidad: Option<NaiveDate>,
    pub cantidad_disponible: i32,
}

pub fn inbound_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_entrada))
        .route("/:id", delete(delete_entrada))
}

/// Register a stock receipt
#[utoipa::path(
    post,
    path = "/api/v1/entradas",
    request_body = EntradaRequest,
    responses(
        (status = 201, description = "Receipt created", body = EntradaResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Folio conflict", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "entradas"
)]
pub async fn create_entrada(
    State(state): State<AppState>,
    Json(body): Json<EntradaRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = CreateInboundRequest {
        source_type: body.tipo_origen,
        supplier_reference: body.referencia_proveedor,
        notes: body.observaciones,
        lines: body
            .partidas
            .into_iter()
            .map(|p| InboundLineRequest {
                product_id: p.id_producto,
                quantity: p.cantidad,
                unit_price: p.precio,
                lot_number: p.lote,
                expiration_date: p.fecha_caducidad,
            })
            .collect(),
    };

    let detail = state.movement_service.create_inbound(request).await?;

    let response = EntradaResponse {
        id: detail.movement.id,
        serie: detail.movement.series,
        folio: detail.movement.folio,
        total: detail.movement.total_value,
        fecha_creacion: detail.movement.created_at,
        partidas: detail
            .lines
            .into_iter()
            .map(|l| PartidaEntradaResponse {
                id_producto: l.product_id,
                cantidad: l.quantity,
                precio: l.unit_price,
                lote: l.lot_number,
                fecha_caducidad: l.expiration_date,
                cantidad_disponible: l.remaining_quantity,
            })
            .collect(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Delete a stock receipt, reversing its stock increment
#[utoipa::path(
    delete,
    path = "/api/v1/entradas/{id}",
    params(("id" = Uuid, Path, description = "Inbound movement id")),
    responses(
        (status = 204, description = "Receipt deleted"),
        (status = 400, description = "Reversal would drive stock negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Receipt not found", body = crate::errors::ErrorResponse)
    ),
    tag = "entradas"
)]
pub async fn delete_entrada(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.movement_service.delete_inbound(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
