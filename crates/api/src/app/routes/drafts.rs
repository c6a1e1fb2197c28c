use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use bullion_core::DraftId;
use bullion_drafts::{DraftPatch, NewDraft};

use crate::app::services::{AppServices, run_blocking};
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_draft).get(list_drafts))
        .route("/:id", get(get_draft).patch(update_draft).delete(delete_draft))
}

pub async fn create_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<NewDraft>,
) -> axum::response::Response {
    let user = actor.user_id();
    match run_blocking(&services, move |engine| engine.create_draft(body, user)).await {
        Ok(draft) => (StatusCode::CREATED, Json(draft)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_drafts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListDraftsParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match run_blocking(&services, move |engine| engine.list_drafts(&query)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DraftId = match errors::parse_id(&id, "draft") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match run_blocking(&services, move |engine| engine.get_draft(id)).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(resp) => resp,
    }
}

/// Field updates and status changes share this endpoint; a `status` that is
/// not a defined transition from the current one is ignored.
pub async fn update_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<DraftPatch>,
) -> axum::response::Response {
    let id: DraftId = match errors::parse_id(&id, "draft") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let user = actor.user_id();
    match run_blocking(&services, move |engine| engine.update_draft(id, body, user)).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn delete_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DraftId = match errors::parse_id(&id, "draft") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let user = actor.user_id();
    match run_blocking(&services, move |engine| engine.delete_draft(id, user)).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(resp) => resp,
    }
}
