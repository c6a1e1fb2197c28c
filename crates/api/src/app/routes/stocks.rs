use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use bullion_core::StockId;
use bullion_inventory::{InventoryLogFilter, Stock};

use crate::app::services::{AppServices, run_blocking};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_stock))
        .route("/:id", get(get_stock))
        .route("/:id/inventory", get(get_inventory))
}

pub async fn register_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterStockRequest>,
) -> axum::response::Response {
    let mut stock = match Stock::new(StockId::new(), body.code, body.name, body.cost_center) {
        Ok(s) => s,
        Err(e) => return errors::engine_error_to_response(e.into()),
    };
    if let Some(karat) = body.karat.filter(|k| !k.trim().is_empty()) {
        stock = stock.with_karat(karat);
    }
    if body.is_pcs {
        stock = stock.counted_in_pieces();
    }

    match run_blocking(&services, move |engine| engine.register_stock(stock)).await {
        Ok(stock) => (StatusCode::CREATED, Json(stock)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StockId = match errors::parse_id(&id, "stock") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match run_blocking(&services, move |engine| engine.stock(id)).await {
        Ok(stock) => (StatusCode::OK, Json(stock)).into_response(),
        Err(resp) => resp,
    }
}

/// Running totals plus the movement log of one stock item.
pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StockId = match errors::parse_id(&id, "stock") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let read = run_blocking(&services, move |engine| {
        let aggregate = engine.inventory_for(id)?;
        let logs = engine.inventory_logs(&InventoryLogFilter {
            stock_id: Some(id),
            ..InventoryLogFilter::default()
        })?;
        Ok((aggregate, logs))
    })
    .await;
    let (aggregate, logs) = match read {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    (
        StatusCode::OK,
        Json(json!({
            "aggregate": aggregate,
            "logs": logs,
        })),
    )
        .into_response()
}
