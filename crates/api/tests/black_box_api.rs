use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use seatwise_api::app::services::AppServices;
use seatwise_auth::{AdminGrant, JwtClaims, Permission};
use seatwise_core::{IdentityId, SystemClock, TenantId, UnitId};
use seatwise_infra::config::ServiceConfig;
use seatwise_progress::ProgressRecord;
use seatwise_tenancy::Tenant;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    tenant_id: TenantId,
    owner: IdentityId,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over in-memory services, bound to an ephemeral port,
    /// with one tenant and its owner seeded.
    async fn spawn() -> Self {
        let config = ServiceConfig::default().with_jwt_secret(JWT_SECRET);
        let services = Arc::new(AppServices::in_memory(config, Arc::new(SystemClock)));

        let tenant_id = TenantId::new();
        let owner = IdentityId::new();
        services
            .directory
            .upsert_tenant(Tenant::onboard(tenant_id, "Acme", Utc::now()).unwrap());
        services.directory.grant_admin(AdminGrant::owner(tenant_id, owner));

        let app = seatwise_api::app::build_router(JWT_SECRET, services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            tenant_id,
            owner,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn tenant_url(&self, path: &str) -> String {
        format!("{}/tenants/{}{}", self.base_url, self.tenant_id, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: IdentityId, email: Option<&str>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: email.map(str::to_string),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Invite `name`, accept as a fresh identity, and return (member id, identity).
async fn onboard_member(
    client: &reqwest::Client,
    srv: &TestServer,
    owner_token: &str,
    name: &str,
) -> (String, IdentityId) {
    let email = format!("{}@example.com", name.to_lowercase());
    let res = client
        .post(srv.tenant_url("/members"))
        .bearer_auth(owner_token)
        .json(&json!({ "contactAddress": email, "displayName": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let member_id = body["member"]["memberId"].as_str().unwrap().to_string();
    let invite = body["inviteToken"].as_str().unwrap().to_string();
    assert_eq!(invite.len(), 64);

    // Invite preview needs no bearer token.
    let res = client
        .get(srv.url(&format!("/invites/{invite}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let preview: serde_json::Value = res.json().await.unwrap();
    assert_eq!(preview["tenantName"], "Acme");
    assert_eq!(preview["memberId"].as_str().unwrap(), member_id);
    assert_eq!(preview["contactAddress"].as_str().unwrap(), email);

    let identity = IdentityId::new();
    let res = client
        .post(srv.url(&format!("/invites/{invite}/accept")))
        .bearer_auth(mint_jwt(identity, Some(&email)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let accepted: serde_json::Value = res.json().await.unwrap();
    assert_eq!(accepted["status"], "active");

    let res = client
        .get(srv.url(&format!("/invites/{invite}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    (member_id, identity)
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = client
        .get(srv.tenant_url("/dashboard"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_echoes_token_subject() {
    let srv = TestServer::spawn().await;
    let who = IdentityId::new();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(who, Some("ada@example.com")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["identity"].as_str().unwrap(), who.to_string());
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn seats_and_dashboard_end_to_end() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner_token = mint_jwt(srv.owner, None);

    let res = client
        .post(srv.tenant_url("/units/U1/seats"))
        .bearer_auth(&owner_token)
        .json(&json!({ "seats": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let pool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(pool["total"], 2);
    assert_eq!(pool["available"], 2);

    let (a, a_identity) = onboard_member(&client, &srv, &owner_token, "A").await;
    let (b, b_identity) = onboard_member(&client, &srv, &owner_token, "B").await;
    let (c, _) = onboard_member(&client, &srv, &owner_token, "C").await;

    for member in [&a, &b] {
        let res = client
            .post(srv.tenant_url("/units/U1/enrollments"))
            .bearer_auth(&owner_token)
            .json(&json!({ "memberId": member }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .post(srv.tenant_url("/units/U1/enrollments"))
        .bearer_auth(&owner_token)
        .json(&json!({ "memberId": c }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "seats_exhausted");

    let u1 = UnitId::new("U1").unwrap();
    srv.services.catalog.put(u1.clone(), "Rust Foundations", 10);
    srv.services
        .progress
        .put(a_identity, u1.clone(), ProgressRecord::new(100.0, Some(Utc::now())));
    srv.services.progress.put(
        b_identity,
        u1,
        ProgressRecord::new(30.0, Some(Utc::now() - ChronoDuration::days(10))),
    );

    let res = client
        .get(srv.tenant_url("/units"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let units: serde_json::Value = res.json().await.unwrap();
    assert_eq!(units.as_array().unwrap().len(), 1);
    assert_eq!(units[0]["unitId"], "U1");
    assert_eq!(units[0]["title"], "Rust Foundations");
    assert_eq!(units[0]["usedSeats"], 2);
    assert_eq!(units[0]["availableSeats"], 0);

    let res = client
        .get(srv.tenant_url("/dashboard"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let view: serde_json::Value = res.json().await.unwrap();

    let rows = view["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["memberId"].as_str().unwrap(), b);
    assert_eq!(rows[0]["status"], "at-risk");
    assert_eq!(rows[1]["memberId"].as_str().unwrap(), a);
    assert_eq!(rows[1]["status"], "completed");
    assert_eq!(rows[1]["unitTitle"], "Rust Foundations");
    assert_eq!(rows[1]["dataUnavailable"], false);

    assert_eq!(view["summary"]["totalMembers"], 3);
    assert_eq!(view["summary"]["completedCount"], 1);
    assert_eq!(view["summary"]["atRiskCount"], 1);

    let res = client
        .get(srv.tenant_url("/dashboard.csv?unit_id=U1"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    let csv = res.text().await.unwrap();
    assert!(csv.starts_with("Member Name,Email,"));
    assert_eq!(csv.lines().count(), 3);

    let res = client
        .get(srv.tenant_url(&format!("/members/{a}")))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detail["member"]["contactAddress"], "a@example.com");
    assert_eq!(detail["enrollments"].as_array().unwrap().len(), 1);
    assert!(detail["member"].get("inviteToken").is_none());
}

#[tokio::test]
async fn release_and_deactivate_free_seats() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner_token = mint_jwt(srv.owner, None);

    client
        .post(srv.tenant_url("/units/U1/seats"))
        .bearer_auth(&owner_token)
        .json(&json!({ "seats": 1 }))
        .send()
        .await
        .unwrap();
    let (a, _) = onboard_member(&client, &srv, &owner_token, "A").await;
    let (b, _) = onboard_member(&client, &srv, &owner_token, "B").await;

    let enroll = |member: String| {
        client
            .post(srv.tenant_url("/units/U1/enrollments"))
            .bearer_auth(&owner_token)
            .json(&json!({ "memberId": member }))
            .send()
    };

    assert_eq!(enroll(a.clone()).await.unwrap().status(), StatusCode::CREATED);

    // Releasing twice is fine.
    for _ in 0..2 {
        let res = client
            .delete(srv.tenant_url(&format!("/units/U1/enrollments/{a}")))
            .bearer_auth(&owner_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(enroll(b.clone()).await.unwrap().status(), StatusCode::CREATED);
    let res = client
        .delete(srv.tenant_url(&format!("/members/{b}")))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.tenant_url("/units/U1/seats"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    let pool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(pool["used"], 0);

    // Deactivated members cannot take a seat.
    let res = enroll(b).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn non_admins_and_other_tenants_are_denied() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let stranger = mint_jwt(IdentityId::new(), None);
    let res = client
        .get(srv.tenant_url("/dashboard"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "permission_denied");

    // The owner of one tenant is a stranger to every other tenant.
    let owner_token = mint_jwt(srv.owner, None);
    let res = client
        .get(srv.url(&format!("/tenants/{}/dashboard", TenantId::new())))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Reporting-only admins cannot buy seats.
    let reporter = IdentityId::new();
    srv.services.directory.grant_admin(AdminGrant::with_permissions(
        srv.tenant_id,
        reporter,
        [Permission::VIEW_REPORTS],
    ));
    let res = client
        .post(srv.tenant_url("/units/U1/seats"))
        .bearer_auth(mint_jwt(reporter, None))
        .json(&json!({ "seats": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = client
        .get(srv.url("/tenants/not-a-uuid/dashboard"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
