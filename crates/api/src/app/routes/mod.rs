use axum::Router;

pub mod drafts;
pub mod ledger;
pub mod parties;
pub mod stocks;
pub mod system;
pub mod transfers;

/// Router for all engine endpoints (everything except `/health`).
pub fn router() -> Router {
    Router::new()
        .nest("/parties", parties::router())
        .nest("/stocks", stocks::router())
        .nest("/drafts", drafts::router())
        .nest("/transfers", transfers::router())
        .nest("/ledger", ledger::router())
}
