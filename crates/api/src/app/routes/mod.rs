use axum::{
    routing::{delete, get, post},
    Router,
};

pub mod dashboard;
pub mod invites;
pub mod members;
pub mod seats;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/tenants/:tenant_id/dashboard", get(dashboard::get_dashboard))
        .route("/tenants/:tenant_id/dashboard.csv", get(dashboard::export_csv))
        .route("/tenants/:tenant_id/members", post(members::add_member))
        .route(
            "/tenants/:tenant_id/members/:member_id",
            get(dashboard::get_member_detail).delete(members::deactivate_member),
        )
        .route("/tenants/:tenant_id/members/:member_id/invite", post(members::reissue_invite))
        .route("/tenants/:tenant_id/units", get(dashboard::licensed_units))
        .route(
            "/tenants/:tenant_id/units/:unit_id/seats",
            get(seats::pool_status).post(seats::purchase_seats),
        )
        .route("/tenants/:tenant_id/units/:unit_id/enrollments", post(seats::allocate_seat))
        .route(
            "/tenants/:tenant_id/units/:unit_id/enrollments/:member_id",
            delete(seats::release_seat),
        )
        .route("/invites/:token/accept", post(invites::accept_invite))
}
