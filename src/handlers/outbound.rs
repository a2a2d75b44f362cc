//! Outbound endpoints: withdrawal-request allocation, origin-group
//! read-back and sub-order deletion. Field names follow the established
//! wire contract (motivo / partidas / solicitudes_generadas / validaciones).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::outbound_movement::{self, MovementKind};
use crate::errors::ServiceError;
use crate::services::allocation::{AllocationLine, AllocationRequest};
use crate::services::movements::MovementWithLines;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SolicitudSalidaRequest {
    pub motivo: String,
    pub observaciones: Option<String>,
    pub partidas: Vec<PartidaRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PartidaRequest {
    pub id_producto: Uuid,
    pub cantidad: i32,
    pub precio: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SolicitudSalidaResponse {
    pub success: bool,
    pub origen_id: Uuid,
    pub solicitudes_generadas: SolicitudesGeneradas,
    pub validaciones: Vec<ValidacionProducto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SolicitudesGeneradas {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vale: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pendiente: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidacionProducto {
    pub id_producto: Uuid,
    pub solicitado: i32,
    pub autorizado: i32,
    pub vale: i32,
    pub pendiente: i32,
    pub resultado: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrupoSolicitudResponse {
    pub origen_id: Uuid,
    pub solicitudes: Vec<SolicitudDetalle>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SolicitudDetalle {
    pub id: Uuid,
    pub tipo: String,
    pub motivo: String,
    pub observaciones: Option<String>,
    pub estado_surtido: String,
    pub serie: String,
    pub folio: String,
    pub total: Decimal,
    pub fecha_creacion: DateTime<Utc>,
    pub partidas: Vec<PartidaDetalle>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PartidaDetalle {
    pub id_producto: Uuid,
    pub producto: String,
    pub cantidad: i32,
    pub precio: Decimal,
}

/// Wire label for a sub-order kind
fn kind_label(movement: &outbound_movement::Model) -> String {
    match movement.kind() {
        Some(MovementKind::Normal) => "original".to_string(),
        Some(MovementKind::Voucher) => "vale".to_string(),
        Some(MovementKind::Pending) => "pendiente".to_string(),
        None => movement.kind.clone(),
    }
}

pub fn outbound_router() -> Router<AppState> {
    Router::new()
        .route("/solicitudes", post(create_solicitud))
        .route("/solicitudes/:origen_id", axum::routing::get(get_solicitud_group))
        .route("/:id", delete(delete_outbound))
}

/// Create a withdrawal request and run the allocation split
#[utoipa::path(
    post,
    path = "/api/v1/salidas/solicitudes",
    request_body = SolicitudSalidaRequest,
    responses(
        (status = 200, description = "Request allocated", body = SolicitudSalidaResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Folio conflict", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "salidas"
)]
pub async fn create_solicitud(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SolicitudSalidaRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let requester_id = super::requester_id(&headers)?;

    let request = AllocationRequest {
        requester_id,
        reason: body.motivo,
        notes: body.observaciones,
        lines: body
            .partidas
            .into_iter()
            .map(|p| AllocationLine {
                product_id: p.id_producto,
                quantity: p.cantidad,
                unit_price: p.precio,
            })
            .collect(),
    };

    let result = state.allocation_service.allocate(request).await?;

    let response = SolicitudSalidaResponse {
        success: true,
        origen_id: result.origin_id,
        solicitudes_generadas: SolicitudesGeneradas {
            original: result.movements.normal,
            vale: result.movements.voucher,
            pendiente: result.movements.pending,
        },
        validaciones: result
            .breakdown
            .into_iter()
            .map(|b| ValidacionProducto {
                id_producto: b.product_id,
                solicitado: b.requested,
                autorizado: b.authorized,
                vale: b.voucher,
                pendiente: b.pending,
                resultado: b.outcome.as_str().to_string(),
            })
            .collect(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Read back every sub-order spawned from one withdrawal request
#[utoipa::path(
    get,
    path = "/api/v1/salidas/solicitudes/{origen_id}",
    params(("origen_id" = Uuid, Path, description = "Origin id shared by the sub-orders")),
    responses(
        (status = 200, description = "Origin group returned", body = GrupoSolicitudResponse),
        (status = 404, description = "No movements for this origin", body = crate::errors::ErrorResponse)
    ),
    tag = "salidas"
)]
pub async fn get_solicitud_group(
    State(state): State<AppState>,
    Path(origen_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let group = state.movement_service.get_by_origin_id(origen_id).await?;

    let solicitudes = group
        .movements
        .into_iter()
        .map(|MovementWithLines { movement, lines }| SolicitudDetalle {
            id: movement.id,
            tipo: kind_label(&movement),
            estado_surtido: movement.fulfillment.clone(),
            motivo: movement.reason.clone(),
            observaciones: movement.notes.clone(),
            serie: movement.series.clone(),
            folio: movement.folio.clone(),
            total: movement.total_value,
            fecha_creacion: movement.created_at,
            partidas: lines
                .into_iter()
                .map(|l| PartidaDetalle {
                    id_producto: l.product_id,
                    producto: l.product_name,
                    cantidad: l.quantity,
                    precio: l.unit_price,
                })
                .collect(),
        })
        .collect();

    Ok(Json(GrupoSolicitudResponse {
        origen_id,
        solicitudes,
    }))
}

/// Delete an outbound sub-order, reversing its ledger effects
#[utoipa::path(
    delete,
    path = "/api/v1/salidas/{id}",
    params(("id" = Uuid, Path, description = "Outbound movement id")),
    responses(
        (status = 204, description = "Movement deleted"),
        (status = 404, description = "Movement not found", body = crate::errors::ErrorResponse)
    ),
    tag = "salidas"
)]
pub async fn delete_outbound(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.movement_service.delete_outbound(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
