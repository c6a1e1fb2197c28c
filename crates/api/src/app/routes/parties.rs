use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use bullion_core::PartyId;

use crate::app::services::{AppServices, run_blocking};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_party))
        .route("/:id", get(get_party))
}

pub async fn register_party(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterPartyRequest>,
) -> axum::response::Response {
    match run_blocking(&services, move |engine| engine.register_party(body.kind, &body.name)).await {
        Ok(party) => (StatusCode::CREATED, Json(party)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_party(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PartyId = match errors::parse_id(&id, "party") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match run_blocking(&services, move |engine| engine.party(id)).await {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(resp) => resp,
    }
}
