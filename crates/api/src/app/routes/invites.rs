use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use seatwise_infra::aggregation::MemberProfile;
use seatwise_tenancy::InviteToken;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Public preview of a pending invite: tenant, invitee and expiry.
pub async fn preview_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Path(token): Path<String>,
) -> axum::response::Response {
    let token = InviteToken::from_raw(token);
    match services.roster.verify_invite(&token).await {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(e) => errors::roster_error_to_response(e),
    }
}

/// Link the calling identity to the invited member holding `token`. The
/// token's email claim, when present, must match the invited address.
pub async fn accept_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(token): Path<String>,
) -> axum::response::Response {
    let token = InviteToken::from_raw(token);
    match services
        .roster
        .accept_invite(&token, principal.identity(), principal.email())
        .await
    {
        Ok(member) => (StatusCode::OK, Json(MemberProfile::from(&member))).into_response(),
        Err(e) => errors::roster_error_to_response(e),
    }
}
