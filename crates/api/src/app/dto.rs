use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seatwise_core::{MemberId, TenantId, UnitId};
use seatwise_infra::aggregation::MemberProfile;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[serde(alias = "email")]
    pub contact_address: String,
    pub display_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseSeatsRequest {
    pub seats: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateSeatRequest {
    pub member_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitFilterQuery {
    pub unit_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedMemberResponse {
    pub member: MemberProfile,
    pub invite_token: String,
    pub invite_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub member_id: MemberId,
    pub invite_token: String,
    pub invite_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub identity: String,
    pub email: Option<String>,
}

// -------------------------
// Path / query parsing
// -------------------------

pub fn parse_tenant_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid tenant id"))
}

pub fn parse_member_id(raw: &str) -> Result<MemberId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid member id"))
}

pub fn parse_unit_id(raw: &str) -> Result<UnitId, axum::response::Response> {
    UnitId::new(raw).map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid unit id"))
}

/// `?unit_id=` with an empty value means no filter.
pub fn parse_unit_filter(query: &UnitFilterQuery) -> Result<Option<UnitId>, axum::response::Response> {
    match query.unit_id.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_unit_id(raw).map(Some),
    }
}
