//! Almacen API Library
//!
//! Warehouse backend whose core is the outbound-request allocation engine
//! (fixed-fund / voucher / pending splitting) and the sequential folio
//! numbering subsystem for inbound and outbound movements.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use services::allocation::{AllocationPolicy, AllocationService};
use services::movements::MovementService;

/// Shared application state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub allocation_service: AllocationService,
    pub movement_service: MovementService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let sender = Arc::new(event_sender.clone());
        let allocation_service = AllocationService::new(
            db.clone(),
            sender.clone(),
            AllocationPolicy::from_config(&config),
        );
        let movement_service =
            MovementService::new(db.clone(), sender, config.low_stock_threshold);

        Self {
            db,
            config,
            event_sender,
            allocation_service,
            movement_service,
        }
    }
}

/// Builds the application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1/salidas", handlers::outbound::outbound_router())
        .nest("/api/v1/entradas", handlers::inbound::inbound_router())
        .with_state(state)
}
