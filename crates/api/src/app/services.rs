use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use tracing::{error, info};

use bullion_infra::{Config, Engine, EngineResult, InMemoryStore};

use crate::app::errors::{engine_error_to_response, json_error};

/// Everything the handlers share.
pub struct AppServices {
    pub engine: Engine<InMemoryStore>,
}

pub fn build_services(config: &Config) -> EngineResult<AppServices> {
    let engine = Engine::new(InMemoryStore::new(), &config.engine)?;
    info!(
        draft_prefix = %config.engine.draft_prefix,
        underflow_policy = ?config.engine.underflow_policy,
        default_currency = %config.engine.default_currency,
        "engine ready"
    );
    Ok(AppServices { engine })
}

/// Run an engine call on the blocking pool.
///
/// A unit of work holds the store's mutex until it commits, so engine calls
/// never run on the async workers. Engine errors come back as their HTTP
/// response.
pub async fn run_blocking<T, F>(services: &Arc<AppServices>, call: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&Engine<InMemoryStore>) -> EngineResult<T> + Send + 'static,
{
    let services = Arc::clone(services);
    match tokio::task::spawn_blocking(move || call(&services.engine)).await {
        Ok(result) => result.map_err(engine_error_to_response),
        Err(join) => {
            error!(error = %join, "engine call did not complete");
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "engine call did not complete",
            ))
        }
    }
}
