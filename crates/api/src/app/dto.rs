use serde::Deserialize;

use bullion_core::{DraftId, PartyId};
use bullion_drafts::DraftStatus;
use bullion_infra::DraftQuery;
use bullion_parties::PartyKind;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterPartyRequest {
    #[serde(default)]
    pub kind: PartyKind,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStockRequest {
    pub code: String,
    pub name: String,
    pub cost_center: String,
    pub karat: Option<String>,
    #[serde(default)]
    pub is_pcs: bool,
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListDraftsParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub party: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListDraftsParams {
    pub fn into_query(self) -> Result<DraftQuery, axum::response::Response> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<DraftStatus>().map_err(|_| {
                errors::json_error(
                    axum::http::StatusCode::BAD_REQUEST,
                    "invalid_status",
                    "status must be one of: draft, confirmed, rejected",
                )
            })?),
            None => None,
        };
        let party_id = optional_id::<PartyId>(self.party.as_deref(), "party")?;

        Ok(DraftQuery {
            search: self.search,
            status,
            party_id,
            limit: self.limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerParams {
    pub party: Option<String>,
    pub draft: Option<String>,
}

impl LedgerParams {
    pub fn ids(&self) -> Result<(Option<PartyId>, Option<DraftId>), axum::response::Response> {
        Ok((
            optional_id(self.party.as_deref(), "party")?,
            optional_id(self.draft.as_deref(), "draft")?,
        ))
    }
}

fn optional_id<T: std::str::FromStr>(
    raw: Option<&str>,
    what: &'static str,
) -> Result<Option<T>, axum::response::Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => errors::parse_id(raw, what).map(Some),
        None => Ok(None),
    }
}
