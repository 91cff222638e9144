//! End-to-end tests for the pinvault HTTP API.
//!
//! These tests spin up the **real** router on an OS-assigned ephemeral port
//! with a temporary on-disk database, make actual HTTP requests via
//! `reqwest`, and carry the session cookie by hand.

use std::time::Duration;

use reqwest::header::{COOKIE, RETRY_AFTER, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use pinvault_store::{Database, SessionStore};
use pinvault_vault::crypto::generate_key;
use pinvault_vault::{Authenticator, Cipher, RateLimitPolicy};
use pinvault_web::{ClientAddressPolicy, SESSION_COOKIE, WebConfig, WebServer};

const PIN: &str = "1541";

// ── helpers ──────────────────────────────────────────────────────────────────

struct TestServer {
    base: String,
    client: Client,
    _dir: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn login(&self, pin: &str) -> Response {
        self.client
            .post(self.url("/login"))
            .json(&json!({ "pin": pin }))
            .send()
            .await
            .expect("request failed")
    }

    /// Log in with the configured PIN and return the `name=value` cookie pair.
    async fn session_cookie(&self) -> String {
        let resp = self.login(PIN).await;
        assert_eq!(resp.status(), StatusCode::OK);
        cookie_pair(&resp).expect("login must set a session cookie")
    }
}

/// Extract `pinvault_session=<id>` from a response's `Set-Cookie` header.
fn cookie_pair(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// Start a server with a configured PIN and the given tweaks.
async fn start_with(
    configure: impl FnOnce(&mut WebConfig),
    rate_limit: RateLimitPolicy,
) -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open_and_migrate(dir.path().join("vault.db"))
        .await
        .expect("open database");

    Authenticator::new(db.clone(), SessionStore::builder().build(), rate_limit)
        .configure_pin(PIN, false)
        .await
        .expect("configure PIN");

    let mut config = WebConfig {
        port: 0,
        ..WebConfig::default()
    };
    configure(&mut config);

    let cipher = Cipher::from_base64_key(&generate_key().unwrap()).unwrap();
    let server = WebServer::new(
        config,
        db,
        cipher,
        SessionStore::builder().build(),
        rate_limit,
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));

    tokio::spawn(async move {
        server
            .serve(listener, std::future::pending())
            .await
            .ok();
    });

    // Small yield so the listener is ready.
    tokio::time::sleep(Duration::from_millis(10)).await;

    TestServer {
        base,
        client: Client::new(),
        _dir: dir,
    }
}

async fn start_test_server() -> TestServer {
    start_with(|_| {}, RateLimitPolicy::default()).await
}

// ── POST /login ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_sets_hardened_session_cookie() {
    let srv = start_test_server().await;
    let resp = srv.login(PIN).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie header")
        .to_owned();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(!set_cookie.contains("Secure"));

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json, json!({ "success": true }));
}

#[tokio::test]
async fn secure_flag_follows_config() {
    let srv = start_with(|c| c.cookie_secure = true, RateLimitPolicy::default()).await;
    let resp = srv.login(PIN).await;
    let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_owned();
    assert!(set_cookie.contains("Secure"));
}

#[tokio::test]
async fn login_rejects_bad_format_and_wrong_pin() {
    let srv = start_test_server().await;

    let resp = srv.login("12a4").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid PIN format submitted");

    let resp = srv.login("0000").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie_pair(&resp).is_none());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Incorrect PIN");
}

#[tokio::test]
async fn login_rejects_malformed_body() {
    let srv = start_test_server().await;
    let resp = srv
        .client
        .post(srv.url("/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn repeated_failures_are_rate_limited() {
    let policy = RateLimitPolicy {
        max_attempts: 3,
        window: Duration::from_secs(300),
    };
    let srv = start_with(|_| {}, policy).await;

    for _ in 0..3 {
        assert_eq!(srv.login("0000").await.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the correct PIN is refused while limited.
    let resp = srv.login(PIN).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().get(RETRY_AFTER).is_some());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(
        json["error"],
        "Too many failed login attempts. Please try again later."
    );
}

#[tokio::test]
async fn header_policy_keys_rate_limit_per_forwarded_client() {
    let policy = RateLimitPolicy {
        max_attempts: 2,
        window: Duration::from_secs(300),
    };
    let srv = start_with(
        |c| {
            c.client_address = ClientAddressPolicy::Header {
                name: "X-Forwarded-For".into(),
            }
        },
        policy,
    )
    .await;

    let attempt = |forwarded: &'static str, pin: &'static str| {
        srv.client
            .post(srv.url("/login"))
            .header("X-Forwarded-For", forwarded)
            .json(&json!({ "pin": pin }))
            .send()
    };

    for _ in 0..2 {
        let resp = attempt("203.0.113.5", "0000").await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = attempt("203.0.113.5", PIN).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different forwarded client is unaffected.
    let resp = attempt("198.51.100.7", PIN).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rotates_presented_session() {
    let srv = start_test_server().await;
    let first = srv.session_cookie().await;

    let resp = srv
        .client
        .post(srv.url("/login"))
        .header(COOKIE, &first)
        .json(&json!({ "pin": PIN }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second = cookie_pair(&resp).unwrap();
    assert_ne!(first, second);

    // The old id is dead, the new one works.
    let resp = srv
        .client
        .get(srv.url("/passwords"))
        .header(COOKIE, &first)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = srv
        .client
        .get(srv.url("/passwords"))
        .header(COOKIE, &second)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ── /passwords ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn entry_endpoints_require_session() {
    let srv = start_test_server().await;

    let resp = srv.client.get(srv.url("/passwords")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Not authenticated");

    let resp = srv
        .client
        .post(srv.url("/passwords"))
        .json(&json!({ "website": "a", "username": "b", "password": "c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = srv
        .client
        .delete(srv.url("/passwords?id=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = srv
        .client
        .get(srv.url("/passwords"))
        .header(COOKIE, format!("{SESSION_COOKIE}=forged"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_list_delete_cycle() {
    let srv = start_test_server().await;
    let cookie = srv.session_cookie().await;

    let resp = srv
        .client
        .post(srv.url("/passwords"))
        .header(COOKIE, &cookie)
        .json(&json!({
            "website": "  example.com ",
            "username": "bob",
            "password": "secret1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert_eq!(created["website"], "example.com");
    assert_eq!(created["password"], "secret1");
    let id = created["id"].as_i64().expect("numeric id");

    let listed: Value = srv
        .client
        .get(srv.url("/api/passwords"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = listed.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], id);
    assert_eq!(rows[0]["username"], "bob");
    assert_eq!(rows[0]["password"], "secret1");

    let resp = srv
        .client
        .delete(srv.url(&format!("/passwords?id={id}")))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = srv
        .client
        .delete(srv.url(&format!("/passwords?id={id}")))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Entry not found");
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let srv = start_test_server().await;
    let cookie = srv.session_cookie().await;

    let resp = srv
        .client
        .post(srv.url("/passwords"))
        .header(COOKIE, &cookie)
        .json(&json!({ "website": "example.com", "username": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Missing required fields");
}

#[tokio::test]
async fn delete_rejects_bad_ids() {
    let srv = start_test_server().await;
    let cookie = srv.session_cookie().await;

    for query in ["", "?id=", "?id=abc", "?id=0", "?id=-4"] {
        let resp = srv
            .client
            .delete(srv.url(&format!("/passwords{query}")))
            .header(COOKIE, &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "query {query:?}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["error"], "Invalid or missing ID for deletion");
    }
}

#[tokio::test]
async fn unauthenticated_delete_with_malformed_query_is_401() {
    let srv = start_test_server().await;

    let resp = srv
        .client
        .delete(srv.url("/passwords?id=1&id=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn authenticated_delete_with_malformed_query_is_400() {
    let srv = start_test_server().await;
    let cookie = srv.session_cookie().await;

    let resp = srv
        .client
        .delete(srv.url("/api/passwords?id=1&id=2"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid or missing ID for deletion");
}

#[tokio::test]
async fn unsupported_method_is_405_with_error_body() {
    let srv = start_test_server().await;

    for (method, path) in [
        (reqwest::Method::PUT, "/passwords"),
        (reqwest::Method::GET, "/login"),
        (reqwest::Method::PATCH, "/api/passwords"),
    ] {
        let resp = srv
            .client
            .request(method.clone(), srv.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["error"], "Method not supported");
    }
}

// ── POST /logout ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_invalidates_session() {
    let srv = start_test_server().await;
    let cookie = srv.session_cookie().await;

    let resp = srv
        .client
        .post(srv.url("/api/logout"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp.headers()[SET_COOKIE].to_str().unwrap().to_owned();
    assert!(cleared.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cleared.contains("Max-Age=0"));

    let resp = srv
        .client
        .get(srv.url("/passwords"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── GET /health and static assets ────────────────────────────────────────────

#[tokio::test]
async fn health_reports_database() {
    let srv = start_test_server().await;

    for path in ["/health", "/api/health"] {
        let resp = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json, json!({ "status": "ok", "database": true }));
    }
}

#[tokio::test]
async fn static_dir_is_served() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), "<h1>pinvault</h1>").unwrap();
    let static_dir = assets.path().to_path_buf();

    let srv = start_with(
        move |c| c.static_dir = Some(static_dir),
        RateLimitPolicy::default(),
    )
    .await;

    let resp = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<h1>pinvault</h1>");

    // API routes still take precedence.
    let resp = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
