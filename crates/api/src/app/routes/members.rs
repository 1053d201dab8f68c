use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use seatwise_infra::aggregation::MemberProfile;
use seatwise_tenancy::NewMember;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
    Json(body): Json<dto::AddMemberRequest>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ctx = match services.gate.authorize(tenant_id, principal.identity()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::authz_error_to_response(e),
    };

    let input = NewMember {
        contact: body.contact_address,
        display_name: body.display_name,
        job_title: body.job_title,
    };
    match services.roster.add_member(&ctx, input).await {
        Ok((member, token)) => (
            StatusCode::CREATED,
            Json(dto::InvitedMemberResponse {
                member: MemberProfile::from(&member),
                invite_token: token.as_str().to_string(),
                invite_expires_at: member.invite_expires_at(),
            }),
        )
            .into_response(),
        Err(e) => errors::roster_error_to_response(e),
    }
}

pub async fn reissue_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, member_id)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let member_id = match dto::parse_member_id(&member_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ctx = match services.gate.authorize(tenant_id, principal.identity()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::authz_error_to_response(e),
    };

    match services.roster.reissue_invite(&ctx, member_id).await {
        Ok((member, token)) => (
            StatusCode::OK,
            Json(dto::InviteResponse {
                member_id,
                invite_token: token.as_str().to_string(),
                invite_expires_at: member.invite_expires_at(),
            }),
        )
            .into_response(),
        Err(e) => errors::roster_error_to_response(e),
    }
}

pub async fn deactivate_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, member_id)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let member_id = match dto::parse_member_id(&member_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ctx = match services.gate.authorize(tenant_id, principal.identity()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::authz_error_to_response(e),
    };

    match services.roster.deactivate_member(&ctx, member_id).await {
        Ok(member) => (StatusCode::OK, Json(MemberProfile::from(&member))).into_response(),
        Err(e) => errors::roster_error_to_response(e),
    }
}
