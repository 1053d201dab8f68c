use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn get_dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
    Query(query): Query<dto::UnitFilterQuery>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_filter = match dto::parse_unit_filter(&query) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .dashboard
        .build_dashboard(tenant_id, principal.identity(), unit_filter.as_ref())
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::dashboard_error_to_response(e),
    }
}

pub async fn export_csv(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
    Query(query): Query<dto::UnitFilterQuery>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_filter = match dto::parse_unit_filter(&query) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .dashboard
        .export_csv(tenant_id, principal.identity(), unit_filter.as_ref())
        .await
    {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"dashboard.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(e) => errors::dashboard_error_to_response(e),
    }
}

pub async fn get_member_detail(
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

    match services
        .dashboard
        .member_detail(tenant_id, principal.identity(), member_id)
        .await
    {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::dashboard_error_to_response(e),
    }
}

pub async fn licensed_units(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match dto::parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.dashboard.licensed_units(tenant_id, principal.identity()).await {
        Ok(units) => (StatusCode::OK, Json(units)).into_response(),
        Err(e) => errors::dashboard_error_to_response(e),
    }
}
