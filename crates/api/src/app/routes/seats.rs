use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use seatwise_auth::Permission;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn pool_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, unit_id)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_id = match dto::parse_unit_id(&unit_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) = services
        .gate
        .authorize_for(tenant_id, principal.identity(), &Permission::VIEW_REPORTS)
        .await
    {
        return errors::authz_error_to_response(e);
    }

    match services.ledger.pool_status(tenant_id, &unit_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => errors::licensing_error_to_response(e),
    }
}

pub async fn purchase_seats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, unit_id)): Path<(String, String)>,
    Json(body): Json<dto::PurchaseSeatsRequest>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_id = match dto::parse_unit_id(&unit_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ctx = match services.gate.authorize(tenant_id, principal.identity()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::authz_error_to_response(e),
    };

    match services.ledger.purchase(&ctx, &unit_id, body.seats).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => errors::licensing_error_to_response(e),
    }
}

pub async fn allocate_seat(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, unit_id)): Path<(String, String)>,
    Json(body): Json<dto::AllocateSeatRequest>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_id = match dto::parse_unit_id(&unit_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let member_id = match dto::parse_member_id(&body.member_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ctx = match services.gate.authorize(tenant_id, principal.identity()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::authz_error_to_response(e),
    };

    match services.ledger.allocate(&ctx, &unit_id, member_id).await {
        Ok(enrollment) => (StatusCode::CREATED, Json(enrollment)).into_response(),
        Err(e) => errors::licensing_error_to_response(e),
    }
}

pub async fn release_seat(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, unit_id, member_id)): Path<(String, String, String)>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_id = match dto::parse_unit_id(&unit_id) {
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

    match services.ledger.release(&ctx, &unit_id, member_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::licensing_error_to_response(e),
    }
}
