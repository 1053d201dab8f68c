use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use seatwise_auth::AuthzError;
use seatwise_core::DomainError;
use seatwise_infra::aggregation::DashboardError;
use seatwise_infra::roster::RosterError;
use seatwise_licensing::LicensingError;
use seatwise_tenancy::InviteError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn internal(code: &'static str, err: &dyn std::fmt::Display) -> axum::response::Response {
    error!(code, error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error")
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match &err {
        AuthzError::NotAnAdmin => json_error(StatusCode::FORBIDDEN, "permission_denied", err.to_string()),
        AuthzError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        AuthzError::TenantSuspended => json_error(StatusCode::FORBIDDEN, "tenant_suspended", err.to_string()),
        AuthzError::TenantNotFound => json_error(StatusCode::NOT_FOUND, "tenant_not_found", err.to_string()),
        AuthzError::Directory(e) => internal("directory_error", e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn licensing_error_to_response(err: LicensingError) -> axum::response::Response {
    match err {
        LicensingError::SeatsExhausted { .. } => {
            json_error(StatusCode::CONFLICT, "seats_exhausted", err.to_string())
        }
        LicensingError::Contention { .. } => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "contention", err.to_string())
        }
        LicensingError::MemberNotActive { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "member_not_active", err.to_string())
        }
        LicensingError::MemberNotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "member_not_found", err.to_string())
        }
        LicensingError::PoolNotFound { .. } => json_error(StatusCode::NOT_FOUND, "pool_not_found", err.to_string()),
        LicensingError::Authz(e) => authz_error_to_response(e),
        LicensingError::Domain(e) => domain_error_to_response(e),
        LicensingError::Store(ref msg) => internal("store_error", msg),
    }
}

pub fn roster_error_to_response(err: RosterError) -> axum::response::Response {
    match err {
        RosterError::Authz(e) => authz_error_to_response(e),
        RosterError::Domain(e) => domain_error_to_response(e),
        RosterError::Invite(e) => invite_error_to_response(e),
        RosterError::MemberNotFound { .. } => json_error(StatusCode::NOT_FOUND, "member_not_found", err.to_string()),
        RosterError::InviteNotFound => json_error(StatusCode::NOT_FOUND, "invite_not_found", err.to_string()),
        RosterError::DuplicateContact(_) => json_error(StatusCode::CONFLICT, "duplicate_contact", err.to_string()),
        RosterError::Conflict => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        RosterError::Licensing(e) => licensing_error_to_response(e),
        RosterError::Directory(ref e) => internal("directory_error", e),
    }
}

fn invite_error_to_response(err: InviteError) -> axum::response::Response {
    match err {
        InviteError::Expired => json_error(StatusCode::GONE, "invite_expired", err.to_string()),
        InviteError::AlreadyUsed => json_error(StatusCode::CONFLICT, "invite_used", err.to_string()),
        InviteError::TokenMismatch | InviteError::NotInvited => {
            json_error(StatusCode::NOT_FOUND, "invite_not_found", err.to_string())
        }
        InviteError::EmailMismatch => json_error(StatusCode::FORBIDDEN, "email_mismatch", err.to_string()),
    }
}

pub fn dashboard_error_to_response(err: DashboardError) -> axum::response::Response {
    match err {
        DashboardError::Authz(e) => authz_error_to_response(e),
        DashboardError::MemberNotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "member_not_found", err.to_string())
        }
        DashboardError::Licensing(e) => licensing_error_to_response(e),
        DashboardError::Directory(ref e) => internal("directory_error", e),
    }
}

#[cfg(test)]
mod tests {
    use seatwise_core::{TenantId, UnitId};

    use super::*;

    #[test]
    fn seat_errors_map_to_documented_statuses() {
        let unit_id = UnitId::new("U1").unwrap();
        let tenant_id = TenantId::new();

        let exhausted = licensing_error_to_response(LicensingError::SeatsExhausted {
            tenant_id,
            unit_id: unit_id.clone(),
        });
        assert_eq!(exhausted.status(), StatusCode::CONFLICT);

        let contention = licensing_error_to_response(LicensingError::Contention {
            tenant_id,
            unit_id,
            attempts: 5,
        });
        assert_eq!(contention.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn gate_errors_map_to_documented_statuses() {
        assert_eq!(authz_error_to_response(AuthzError::NotAnAdmin).status(), StatusCode::FORBIDDEN);
        assert_eq!(authz_error_to_response(AuthzError::TenantNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            roster_error_to_response(RosterError::Invite(InviteError::Expired)).status(),
            StatusCode::GONE
        );
    }
}
