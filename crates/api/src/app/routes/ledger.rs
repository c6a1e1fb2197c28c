use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use bullion_accounting::EntryFilter;

use crate::app::services::{AppServices, run_blocking};
use crate::app::dto;

pub fn router() -> Router {
    Router::new().route("/", get(list_entries))
}

/// Ledger entries in posting order, optionally narrowed to a party and/or draft.
pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::LedgerParams>,
) -> axum::response::Response {
    let (party_id, draft_id) = match params.ids() {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    let filter = EntryFilter {
        party_id,
        draft_id,
        ..EntryFilter::default()
    };
    match run_blocking(&services, move |engine| engine.ledger_entries(&filter)).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(resp) => resp,
    }
}
