//! Folio sequencer: per (movement type, series) monotonic document numbers.
//!
//! Issuance runs inside the caller's transaction so the sequence row update
//! serializes concurrent callers. Reclaim runs after a deletion commits and
//! is best-effort: it only compacts the top of the sequence and never rolls
//! a deletion back.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::entities::folio_sequence::{self, Entity as FolioSequence, MovementType};
use crate::entities::{inbound_movement, outbound_movement};
use crate::errors::ServiceError;

/// A folio handed out for a new movement header.
#[derive(Debug, Clone)]
pub struct IssuedFolio {
    pub series: String,
    pub folio: String,
}

/// Issues the next folio for the movement type's current series and advances
/// the sequence. Refuses with a conflict when a persisted movement already
/// holds the number: that means the sequence state is out of sync with the
/// data and needs manual reconciliation, not silent renumbering.
pub async fn issue<C: ConnectionTrait>(
    conn: &C,
    movement_type: MovementType,
) -> Result<IssuedFolio, ServiceError> {
    let sequence = load_or_init(conn, movement_type).await?;
    let folio = sequence.next_folio.to_string();

    if folio_exists(conn, movement_type, &sequence.series, &folio).await? {
        return Err(ServiceError::Conflict(format!(
            "folio {} already persisted for {} series '{}'; sequence requires reconciliation",
            folio,
            movement_type.as_str(),
            sequence.series
        )));
    }

    let series = sequence.series.clone();
    let mut active: folio_sequence::ActiveModel = sequence.clone().into();
    active.next_folio = Set(sequence.next_folio + 1);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    Ok(IssuedFolio { series, folio })
}

/// Recomputes `next_folio` after a deletion: 1 when no movements remain in
/// the series, otherwise max(surviving numeric folio) + 1. Only the top of
/// the sequence is reclaimed; interior gaps stay. Writes only on change.
pub async fn reclaim(
    db: &DbPool,
    movement_type: MovementType,
    series: &str,
) -> Result<(), ServiceError> {
    let Some(sequence) = FolioSequence::find_by_id(movement_type.as_str())
        .one(db)
        .await
        .map_err(ServiceError::DatabaseError)?
    else {
        debug!(
            movement_type = movement_type.as_str(),
            "no folio sequence row; nothing to reclaim"
        );
        return Ok(());
    };

    if sequence.series != series {
        debug!(
            movement_type = movement_type.as_str(),
            current_series = %sequence.series,
            deleted_series = %series,
            "deleted movement belongs to a past series; skipping reclaim"
        );
        return Ok(());
    }

    let max_numeric = max_numeric_folio(db, movement_type, series).await?;
    let next_folio = max_numeric.map_or(1, |max| max + 1);

    if next_folio != sequence.next_folio {
        info!(
            movement_type = movement_type.as_str(),
            %series,
            old_next = sequence.next_folio,
            new_next = next_folio,
            "reclaiming folio sequence"
        );
        let mut active: folio_sequence::ActiveModel = sequence.into();
        active.next_folio = Set(next_folio);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::DatabaseError)?;
    }

    Ok(())
}

/// Reclaim wrapper for callers that have already committed a deletion: a
/// failure is logged and swallowed, leaving the sequence conservatively
/// ahead of the true maximum. Folios may gap but are never reused while a
/// row still holds them.
pub async fn reclaim_best_effort(db: &DbPool, movement_type: MovementType, series: &str) {
    if let Err(e) = reclaim(db, movement_type, series).await {
        warn!(
            movement_type = movement_type.as_str(),
            %series,
            error = %e,
            "folio reclaim failed; sequence left ahead of persisted maximum"
        );
    }
}

async fn load_or_init<C: ConnectionTrait>(
    conn: &C,
    movement_type: MovementType,
) -> Result<folio_sequence::Model, ServiceError> {
    if let Some(sequence) = FolioSequence::find_by_id(movement_type.as_str())
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
    {
        return Ok(sequence);
    }

    let fresh = folio_sequence::ActiveModel {
        movement_type: Set(movement_type.as_str().to_string()),
        series: Set(String::new()),
        next_folio: Set(1),
        updated_at: Set(Some(Utc::now())),
    };
    fresh.insert(conn).await.map_err(ServiceError::DatabaseError)
}

async fn folio_exists<C: ConnectionTrait>(
    conn: &C,
    movement_type: MovementType,
    series: &str,
    folio: &str,
) -> Result<bool, ServiceError> {
    let count = match movement_type {
        MovementType::Outbound => outbound_movement::Entity::find()
            .filter(outbound_movement::Column::Series.eq(series))
            .filter(outbound_movement::Column::Folio.eq(folio))
            .count(conn)
            .await
            .map_err(ServiceError::DatabaseError)?,
        MovementType::Inbound => inbound_movement::Entity::find()
            .filter(inbound_movement::Column::Series.eq(series))
            .filter(inbound_movement::Column::Folio.eq(folio))
            .count(conn)
            .await
            .map_err(ServiceError::DatabaseError)?,
    };
    Ok(count > 0)
}

/// Maximum purely-numeric folio persisted for (type, series). Non-numeric
/// folios (legacy imports) are ignored; parsing happens in Rust so sqlite
/// and postgres agree.
async fn max_numeric_folio(
    db: &DbPool,
    movement_type: MovementType,
    series: &str,
) -> Result<Option<i64>, ServiceError> {
    let folios: Vec<String> = match movement_type {
        MovementType::Outbound => outbound_movement::Entity::find()
            .select_only()
            .column(outbound_movement::Column::Folio)
            .filter(outbound_movement::Column::Series.eq(series))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?,
        MovementType::Inbound => inbound_movement::Entity::find()
            .select_only()
            .column(inbound_movement::Column::Folio)
            .filter(inbound_movement::Column::Series.eq(series))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?,
    };

    Ok(folios
        .iter()
        .filter_map(|f| f.trim().parse::<i64>().ok())
        .max())
}
