use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use bullion_infra::{OpeningBalance, TransferRequest};

use crate::app::services::{AppServices, run_blocking};
use crate::app::dto;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(transfer).get(list_transfers))
        .route("/opening", post(opening_balance))
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<TransferRequest>,
) -> axum::response::Response {
    let user = actor.user_id();
    match run_blocking(&services, move |engine| engine.transfer(body, user)).await {
        Ok(transfer) => (StatusCode::CREATED, Json(transfer)).into_response(),
        Err(resp) => resp,
    }
}

/// Posting an opening balance again restates it, so this is not a 201.
pub async fn opening_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<OpeningBalance>,
) -> axum::response::Response {
    let user = actor.user_id();
    match run_blocking(&services, move |engine| engine.opening_balance_transfer(body, user)).await {
        Ok(transfer) => (StatusCode::OK, Json(transfer)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::LedgerParams>,
) -> axum::response::Response {
    let (party, _) = match params.ids() {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    match run_blocking(&services, move |engine| engine.fund_transfers(party)).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(resp) => resp,
    }
}
