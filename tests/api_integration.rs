//! HTTP-level integration tests for the inventory server.
//!
//! Each test builds the real router over a temporary data directory and
//! drives it with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use chrono::Utc;
use http_body_util::BodyExt;
use hyper::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use stockroom::auth::hash_password;
use stockroom::portal::Roster;
use stockroom::{build_router, AppState, DatabaseConfig, DatabaseRegistry, ServerConfig};

const TEST_JWT_SECRET: &str = "test-secret-for-integration-tests";

// ── Test app builder ───────────────────────────────────────────

struct TestApp {
    router: axum::Router,
    _dir: TempDir,
}

async fn build_test_app() -> TestApp {
    build_test_app_with(|_| {}).await
}

async fn build_test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::for_data_dir(dir.path(), TEST_JWT_SECRET);

    std::fs::create_dir_all(&config.static_dir).unwrap();
    std::fs::write(config.static_dir.join("login.html"), "<h1>login</h1>").unwrap();
    std::fs::write(config.static_dir.join("dashboard.html"), "<h1>dashboard</h1>").unwrap();
    configure(&mut config);

    let databases = DatabaseRegistry::new(DatabaseConfig::new(dir.path(), 2));
    let users = databases.users().await.unwrap();
    for (name, password, role) in [
        ("dep1", "pass1", "user"),
        ("dep2", "pass2", "user"),
        ("admin", "adminpw", "admin"),
    ] {
        let hash = hash_password(password).unwrap();
        users.insert(name, &hash, role, Utc::now()).await.unwrap();
    }

    let state = AppState::new(config, databases, Roster::default());
    TestApp {
        router: build_router(state),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = self.send(req).await;
        let status = resp.status();
        (status, body_json(resp).await)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create_material(&self, token: &str, name: &str, category: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/materials",
                Some(token),
                Some(json!({ "name": name, "unit": "pcs", "category": category, "safety_stock": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

// ── Helper to read response body ───────────────────────────────

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_no_auth() {
    let app = build_test_app().await;
    let (status, body) = app.json(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = build_test_app().await;

    let (status, body) = app.json(Method::GET, "/api/materials", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app
        .json(Method::GET, "/api/materials", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_input() {
    let app = build_test_app().await;

    let (status, _) = app
        .json(Method::POST, "/api/login", None, Some(json!({ "username": "dep1" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "dep1", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_scan_flow_updates_stock() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;

    let created = app.create_material(&token, "Tape", "Office").await;
    assert_eq!(created["item_id"], "M0001");
    assert_eq!(created["barcode"], "BC-00M0001");

    // Lookup is case-insensitive
    let (status, material) = app
        .json(Method::GET, "/api/materials/barcode/bc-00m0001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(material["item_id"], "M0001");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/inventory/record",
            Some(&token),
            Some(json!({ "item_id": "M0001", "type": "in", "quantity": 5, "scan_mode": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["material"]["current_stock"], 5);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/barcode/record",
            Some(&token),
            Some(json!({ "item_id": "M0001", "type": "out", "quantity": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient stock");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/barcode/record",
            Some(&token),
            Some(json!({ "item_id": "M0001", "type": "out", "quantity": "4", "scan_mode": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["material"]["current_stock"], 1);

    let (_, rows) = app
        .json(Method::GET, "/api/out-records", Some(&token), None)
        .await;
    assert_eq!(rows[0]["source"], "掃碼");
    assert_eq!(rows[0]["handler"], "dep1");
    assert_eq!(rows[0]["user"], "dep1");

    let (_, summary) = app
        .json(Method::GET, "/api/materials/summary", Some(&token), None)
        .await;
    assert_eq!(summary, json!({ "total": 1, "lowStock": 1 }));

    // Deleting the outbound record restores the stock
    let id = rows[0]["id"].as_i64().unwrap();
    let (status, _) = app
        .json(Method::DELETE, &format!("/api/out-records/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::DELETE, &format!("/api/out-records/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, materials) = app.json(Method::GET, "/api/materials", Some(&token), None).await;
    assert_eq!(materials[0]["current_stock"], 5);
}

#[tokio::test]
async fn test_record_validation_order() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;

    let cases = [
        (json!({ "type": "in", "quantity": 1 }), StatusCode::BAD_REQUEST),
        (json!({ "item_id": "M9999", "type": "in", "quantity": 1 }), StatusCode::NOT_FOUND),
        (json!({ "item_id": "M0001", "type": "in", "quantity": 0 }), StatusCode::BAD_REQUEST),
        (json!({ "item_id": "M0001", "type": "sideways", "quantity": 1 }), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let (status, resp) = app
            .json(Method::POST, "/api/barcode/record", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(status, expected, "{body} -> {resp}");
    }
}

#[tokio::test]
async fn test_departments_are_isolated() {
    let app = build_test_app().await;
    let dep1 = app.login("dep1", "pass1").await;
    let dep2 = app.login("dep2", "pass2").await;

    app.create_material(&dep1, "Tape", "Office").await;

    let (_, mine) = app.json(Method::GET, "/api/materials", Some(&dep1), None).await;
    let (_, theirs) = app.json(Method::GET, "/api/materials", Some(&dep2), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(theirs.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_category_rules() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;

    let (status, created) = app
        .json(Method::POST, "/api/categories", Some(&token), Some(json!({ "name": "Office" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .json(Method::POST, "/api/categories", Some(&token), Some(json!({ "name": " office " })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(Method::POST, "/api/categories", Some(&token), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.create_material(&token, "Tape", "OFFICE").await;
    let (status, _) = app
        .json(Method::DELETE, &format!("/api/categories/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::DELETE, "/api/categories/9999", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_changes() {
    let app = build_test_app().await;
    let dep1 = app.login("dep1", "pass1").await;
    let admin = app.login("admin", "adminpw").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&dep1),
            Some(json!({ "username": "dep2", "old_password": "pass2", "new_password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&dep1),
            Some(json!({ "username": "dep1", "old_password": "nope", "new_password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&admin),
            Some(json!({ "username": "dep2", "new_password": "fresh" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("dep2", "fresh").await;

    let (status, _) = app.json(Method::GET, "/api/users", Some(&dep1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, users) = app.json(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_auto_auth_echoes_bearer_token() {
    let app = build_test_app().await;

    let (status, body) = app.json(Method::GET, "/api/auto-auth", Some("abc"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access_token"], "abc");

    let req = Request::builder()
        .uri("/api/auto-auth")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reports_need_a_period() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;

    let (status, _) = app
        .json(Method::GET, "/api/report/preview?report_type=in_records", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Browser links carry the token in the query string
    let uri = format!(
        "/api/report/preview?report_type=stock_summary&query_mode=month&year=2024&month=5&token={token}"
    );
    let resp = app
        .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(body_bytes(resp).await.starts_with(b"%PDF"));

    let req = Request::builder()
        .uri("/api/report/export_excel?report_type=low_stock_alert")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"low_stock_alert_report_"));
    assert!(body_bytes(resp).await.starts_with(b"PK"));
}

#[tokio::test]
async fn test_backup_is_a_sqlite_file() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;

    let req = Request::builder()
        .uri("/api/backup")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("dep1_backup_"));
    assert!(body_bytes(resp).await.starts_with(b"SQLite format 3"));
}

#[tokio::test]
async fn test_portal_accounts_filter() {
    let app = build_test_app().await;

    let (status, accounts) = app
        .json(Method::GET, "/api/portal/accounts?role=query", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 9);

    let (status, _) = app
        .json(Method::GET, "/api/portal/accounts?role=guest", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_static_pages_and_headers() {
    let app = build_test_app().await;

    let resp = app
        .send(Request::builder().uri("/some/page").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"<h1>login</h1>");

    let resp = app
        .send(Request::builder().uri("/dashboard.html").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CACHE_CONTROL],
        "no-store, no-cache, must-revalidate, max-age=0"
    );

    let resp = app
        .send(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["access-control-allow-private-network"], "true");
}

#[tokio::test]
async fn test_private_network_preflight() {
    let app = build_test_app().await;

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/materials")
        .header(header::ORIGIN, "http://192.168.1.20:8080")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header("access-control-request-private-network", "true")
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["access-control-allow-private-network"], "true");
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_password_fields_are_trimmed() {
    let app = build_test_app().await;
    let admin = app.login("admin", "adminpw").await;
    let dep1 = app.login("dep1", "pass1").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&admin),
            Some(json!({ "username": " dep2 ", "new_password": " spaced " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("dep2", "spaced").await;
    app.login("dep2", " spaced ").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&dep1),
            Some(json!({ "username": "dep1", "old_password": " pass1 ", "new_password": " next " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("dep1", "next").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/user/change-password",
            Some(&admin),
            Some(json!({ "username": "dep2", "new_password": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_answer_with_error_json() {
    let app = build_test_app().await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .body(Body::from(r#"{"username":"dep1","password":"pass1"}"#))
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());

    let token = app.login("dep1", "pass1").await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/materials",
            Some(&token),
            Some(json!({ "name": "Tape", "unit": "roll", "category": "Office", "safety_stock": "five" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_numeric_strings_are_accepted() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/materials",
            Some(&token),
            Some(json!({ "name": "Tape", "unit": "roll", "category": "Office", "safety_stock": "5" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/in-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": "3" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["stock"], 3);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/in-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": "three" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid quantity");

    let (_, materials) = app.json(Method::GET, "/api/materials", Some(&token), None).await;
    assert_eq!(materials[0]["safety_stock"], 5);
}

#[tokio::test]
async fn test_material_updates() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;
    app.create_material(&token, "Glue", "Office").await;

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/materials/M0002",
            Some(&token),
            Some(json!({ "barcode": " bc-00m0001 " })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/materials/M0002",
            Some(&token),
            Some(json!({ "name": "Wood glue", "safety_stock": 4, "barcode": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Wood glue");
    assert_eq!(body["safety_stock"], 4);
    assert_eq!(body["barcode"], Value::Null);

    let (status, body) = app
        .json(Method::PUT, "/api/materials/M0001", Some(&token), Some(json!({ "barcode": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["barcode"], Value::Null);
    assert_eq!(body["name"], "Tape");

    // A cleared barcode can be taken by another material
    let (status, body) = app
        .json(
            Method::PUT,
            "/api/materials/M0002",
            Some(&token),
            Some(json!({ "barcode": "BC-00M0001" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["barcode"], "BC-00M0001");

    let (status, _) = app
        .json(Method::PUT, "/api/materials/M0001", Some(&token), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::PUT, "/api/materials/M0404", Some(&token), Some(json!({ "name": "Nope" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_material_delete_removes_its_records() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;
    app.create_material(&token, "Glue", "Office").await;

    for (uri, item) in [("/api/in-records", "M0001"), ("/api/in-records", "M0002")] {
        let (status, _) = app
            .json(Method::POST, uri, Some(&token), Some(json!({ "material_id": item, "quantity": 4 })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .json(
            Method::POST,
            "/api/out-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .json(Method::DELETE, "/api/materials/M0001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::DELETE, "/api/materials/M0001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, inbound) = app.json(Method::GET, "/api/in-records", Some(&token), None).await;
    let inbound = inbound.as_array().unwrap();
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0]["material_id"], "M0002");
    let (_, outbound) = app.json(Method::GET, "/api/out-records", Some(&token), None).await;
    assert_eq!(outbound, json!([]));
}

#[tokio::test]
async fn test_manual_records() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;
    app.create_material(&token, "Tape", "Office").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/in-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": 5, "source": "vendor", "handler": "amy" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["stock"], 5);
    assert_eq!(body["record"]["quantity"], 5);
    assert_eq!(body["material"]["item_id"], "M0001");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/out-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient stock");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/out-records",
            Some(&token),
            Some(json!({ "material_id": "M0001", "quantity": 2, "user": "bo", "department": "Shop", "purpose": "class" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["stock"], 3);

    let cases = [
        (json!({ "quantity": 1 }), StatusCode::BAD_REQUEST),
        (json!({ "material_id": "M0001" }), StatusCode::BAD_REQUEST),
        (json!({ "material_id": "M0001", "quantity": -2 }), StatusCode::BAD_REQUEST),
        (json!({ "material_id": "M0404", "quantity": 1 }), StatusCode::NOT_FOUND),
    ];
    for (body, expected) in cases {
        let (status, resp) = app
            .json(Method::POST, "/api/in-records", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(status, expected, "{body} -> {resp}");
    }

    let (_, inbound) = app.json(Method::GET, "/api/in-records", Some(&token), None).await;
    assert_eq!(inbound[0]["source"], "vendor");
    assert_eq!(inbound[0]["handler"], "amy");
    let (_, outbound) = app.json(Method::GET, "/api/out-records", Some(&token), None).await;
    assert_eq!(outbound[0]["department"], "Shop");
    assert_eq!(outbound[0]["quantity"], 2);
}

#[tokio::test]
async fn test_register_and_account_lookups() {
    let app = build_test_app().await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": " newbie ", "password": " pw " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .json(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": "newbie", "password": "other" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let token = app.login("newbie", "pw").await;
    let (status, info) = app.json(Method::GET, "/api/userinfo", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["username"], "newbie");

    let (status, body) = app
        .json(Method::GET, "/api/get-db-uri?username=DEP3t", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let uri = body["db_uri"].as_str().unwrap();
    assert!(uri.starts_with("sqlite:///"), "{uri}");
    assert!(uri.ends_with("materials_3.db"), "{uri}");

    let (_, body) = app
        .json(Method::GET, "/api/get-db-uri?username=newbie", None, None)
        .await;
    assert!(body["db_uri"].as_str().unwrap().ends_with("materials.db"));

    let (status, _) = app.json(Method::GET, "/api/get-db-uri", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_registration_conflicts_cleanly() {
    let app = build_test_app().await;
    let body = json!({ "username": "racer", "password": "pw" });

    let (first, second) = tokio::join!(
        app.json(Method::POST, "/api/register", None, Some(body.clone())),
        app.json(Method::POST, "/api/register", None, Some(body.clone())),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn test_exclusive_login_queues_until_logout() {
    let app = build_test_app_with(|config| config.exclusive_login = true).await;
    let login = json!({ "username": "dep2", "password": "pass2" });

    let dep1 = app.login("dep1", "pass1").await;
    let (status, body) = app
        .json(Method::POST, "/api/login", None, Some(login.clone()))
        .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["error"].is_string());

    // The holder may log in again
    app.login("dep1", "pass1").await;

    let (status, _) = app.json(Method::POST, "/api/logout", Some(&dep1), None).await;
    assert_eq!(status, StatusCode::OK);

    app.login("dep2", "pass2").await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "dep1", "password": "pass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_barcode_sheet() {
    let app = build_test_app().await;
    let token = app.login("dep1", "pass1").await;

    let (status, _) = app
        .json(Method::GET, "/api/materials/barcodes.pdf", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.create_material(&token, "Tape", "Office").await;
    let req = Request::builder()
        .uri("/api/materials/barcodes.pdf")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(body_bytes(resp).await.starts_with(b"%PDF"));

    // Nothing left to draw once the only barcode is cleared
    let (status, _) = app
        .json(Method::PUT, "/api/materials/M0001", Some(&token), Some(json!({ "barcode": "" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .json(Method::GET, "/api/materials/barcodes.pdf", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_shipped_pages_use_the_portal_and_history() {
    let shipped = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
    let app = build_test_app_with(|config| config.static_dir = shipped).await;

    let resp = app
        .send(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(login.contains("/api/portal/accounts"));
    assert!(login.contains("e.ctrlKey"));

    let resp = app
        .send(Request::builder().uri("/scan.html").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let scan = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(scan.contains("localStorage.setItem(HISTORY_KEY"));
    assert!(scan.contains("HISTORY_LIMIT = 50"));
}
