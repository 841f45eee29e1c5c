//! End-to-end tests through the router against in-memory SQLite.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tesoro_api::{AppState, create_router};
use tesoro_core::{ManualClock, SharedClock};
use tesoro_db::entities::sea_orm_active_enums::{AccountKind, ChequeStatus};
use tesoro_db::entities::{accounts, cheques, clients};
use tesoro_db::migration::Migrator;
use tesoro_shared::AppConfig;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    state: AppState,
    db: DatabaseConnection,
    org_id: Uuid,
    token: String,
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-07-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

async fn spawn_app() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let config: AppConfig = serde_json::from_value(json!({
        "database": { "url": "sqlite::memory:" },
        "jwt": { "secret": "api-test-secret" },
    }))
    .unwrap();
    let clock: SharedClock = Arc::new(ManualClock::new(start()));
    let state = AppState::new(db.clone(), &config, clock);

    let org_id = Uuid::new_v4();
    let token = state
        .jwt_service
        .issue_token(Uuid::new_v4(), org_id, "treasurer")
        .unwrap();

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        org_id,
        token,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> (StatusCode, header::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{uri}"))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        if let Some(key) = key {
            builder = builder.header("Idempotency-Key", key);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn account(&self, kind: AccountKind) -> Uuid {
        let id = Uuid::new_v4();
        accounts::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id),
            name: Set("Operating".to_string()),
            kind: Set(kind),
            is_active: Set(true),
            created_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }

    async fn cheque(&self, amount: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        cheques::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id),
            number: Set("00098765".to_string()),
            bank_name: Set("Banco Provincia".to_string()),
            drawer: Set("Maria Gomez".to_string()),
            amount: Set(amount),
            due_date: Set(start().date_naive()),
            status: Set(ChequeStatus::Cartera),
            client_id: Set(None),
            deposit_account_id: Set(None),
            deposit_movement_id: Set(None),
            rejection_reason: Set(None),
            endorsee: Set(None),
            void_reason: Set(None),
            created_at: Set(start().fixed_offset()),
            updated_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }

    async fn client(&self, credit_limit: Option<Decimal>) -> Uuid {
        let id = Uuid::new_v4();
        clients::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id),
            name: Set("Distribuidora Norte".to_string()),
            credit_limit: Set(credit_limit),
            is_blocked: Set(false),
            payment_terms_days: Set(30),
            created_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }
}

fn amount(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = spawn_app().await;
    let request = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Bank).await;

    let request = Request::builder()
        .uri(format!("/api/v1/accounts/{account}/balance"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri(format!("/api/v1/accounts/{account}/balance"))
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn keyed_movement_is_replayed_with_headers() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Cash).await;
    let payload = json!({ "direction": "INGRESO", "amount": "250", "description": "float" });
    let uri = format!("/accounts/{account}/movements");

    let (status, headers, first) = app.send("POST", &uri, Some("mv-1"), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["idempotency-replayed"], "false");
    assert_eq!(headers["idempotency-key"], "mv-1");
    assert_eq!(amount(&first["balance_after"]), dec!(250));

    let (status, headers, second) = app.send("POST", &uri, Some("mv-1"), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["idempotency-replayed"], "true");
    assert_eq!(second, first);

    let (_, _, page) = app.send("GET", &uri, None, None).await;
    assert_eq!(page["meta"]["total"], 1);
}

#[tokio::test]
async fn reused_key_with_another_body_is_a_conflict() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Cash).await;
    let uri = format!("/accounts/{account}/movements");

    app.send(
        "POST",
        &uri,
        Some("mv-2"),
        Some(json!({ "direction": "INGRESO", "amount": "10", "description": "a" })),
    )
    .await;
    let (status, _, body) = app
        .send(
            "POST",
            &uri,
            Some("mv-2"),
            Some(json!({ "direction": "INGRESO", "amount": "11", "description": "a" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "IDEMPOTENCY_CONFLICT");
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn invalid_amount_is_rendered_with_details() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Cash).await;

    let (status, _, body) = app
        .send(
            "POST",
            &format!("/accounts/{account}/movements"),
            None,
            Some(json!({ "direction": "EGRESO", "amount": "0", "description": "nothing" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");
    assert_eq!(amount(&body["details"]["amount"]), Decimal::ZERO);
}

#[tokio::test]
async fn oversized_idempotency_key_is_rejected() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Cash).await;
    let key = "x".repeat(256);

    let (status, _, body) = app
        .send(
            "POST",
            &format!("/accounts/{account}/movements"),
            Some(&key),
            Some(json!({ "direction": "INGRESO", "amount": "1", "description": "x" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_IDEMPOTENCY_KEY");
}

#[tokio::test]
async fn balance_reflects_writes_through_the_cache() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Bank).await;
    let balance_uri = format!("/accounts/{account}/balance");

    let (status, _, body) = app.send("GET", &balance_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["balance"]), Decimal::ZERO);

    app.send(
        "POST",
        &format!("/accounts/{account}/movements"),
        None,
        Some(json!({ "direction": "INGRESO", "amount": "700", "description": "deposit" })),
    )
    .await;

    let (_, _, body) = app.send("GET", &balance_uri, None, None).await;
    assert_eq!(amount(&body["balance"]), dec!(700));
    assert_eq!(body["movement_count"], 1);
}

#[tokio::test]
async fn cheque_deposit_and_bounce_over_http() {
    let app = spawn_app().await;
    let bank = app.account(AccountKind::Bank).await;
    let cheque = app.cheque(dec!(5000)).await;

    let (status, _, body) = app
        .send(
            "POST",
            &format!("/cheques/{cheque}/deposit"),
            Some("chq-dep"),
            Some(json!({ "account_id": bank })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cheque"]["status"], "DEPOSITED");
    assert_eq!(amount(&body["movement"]["balance_after"]), dec!(5000));

    let (status, _, body) = app.send("POST", &format!("/cheques/{cheque}/clear"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cheque"]["status"], "CLEARED");

    let (status, _, body) = app
        .send(
            "POST",
            &format!("/cheques/{cheque}/bounce"),
            None,
            Some(json!({ "reason": "too late" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_TRANSITION");
    assert_eq!(body["details"]["from"], "CLEARED");
    assert_eq!(body["details"]["to"], "BOUNCED");

    let (_, _, report) = app
        .send("GET", &format!("/accounts/{bank}/reconciliation"), None, None)
        .await;
    assert_eq!(report["movement_count"], 1);
    assert_eq!(report["chain_breaks"], json!([]));
}

#[tokio::test]
async fn credit_preview_reports_without_blocking() {
    let app = spawn_app().await;
    let client = app.client(Some(dec!(1000))).await;

    let (status, _, body) = app
        .send("GET", &format!("/clients/{client}/credit?amount=1500"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_proceed"], false);
    assert_eq!(body["requires_override"], true);
    assert_eq!(amount(&body["projected"]), dec!(1500));

    let (status, _, body) = app
        .send("GET", &format!("/clients/{client}/credit?amount=-5"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn other_organizations_are_invisible() {
    let app = spawn_app().await;
    let account = app.account(AccountKind::Bank).await;
    let outsider = app
        .state
        .jwt_service
        .issue_token(Uuid::new_v4(), Uuid::new_v4(), "treasurer")
        .unwrap();

    let request = Request::builder()
        .uri(format!("/api/v1/accounts/{account}/balance"))
        .header(header::AUTHORIZATION, format!("Bearer {outsider}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
