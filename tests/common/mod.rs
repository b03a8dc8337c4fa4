#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use skilltrack::auth::ResetNotifier;
use skilltrack::config::Config;
use skilltrack::state::{AppState, SharedState};
use skilltrack::store::Stores;
use skilltrack::store::memory::MemoryStore;

/// Captures reset tokens instead of emailing them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token)
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset_token(&self, email: &str, token: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-access-secret-that-is-long-enough".to_string(),
        jwt_refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
        access_token_ttl: Duration::minutes(15),
        refresh_token_ttl: Duration::days(7),
        reset_token_ttl: Duration::hours(1),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:0".to_string(),
        cors_origin: "*".to_string(),
        max_body_size: 1_048_576,
        db_max_connections: 5,
        db_acquire_timeout: Duration::seconds(5),
        log_level: "warn".to_string(),
        smtp: None,
    }
}

/// A running server. `store` is set when it runs on the in-memory backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Option<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: SharedState,
}

impl TestApp {
    pub fn memory(&self) -> &MemoryStore {
        self.store.as_ref().expect("app is not running on the memory store")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post("/api/auth/register", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post("/api/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> (Value, StatusCode) {
        self.post(
            "/api/auth/refresh-token",
            &json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    /// Register a user and return `(access_token, refresh_token)`.
    pub async fn signup(&self, email: &str, password: &str) -> (String, String) {
        let (body, status) = self.register(email, password).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        read(resp).await
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        read(resp).await
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        read(resp).await
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        read(resp).await
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        read(resp).await
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        read(resp).await
    }
}

async fn read(resp: reqwest::Response) -> (Value, StatusCode) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(json!(null));
    (body, status)
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let store = MemoryStore::new();
    let mut app = spawn_app_with_stores(config, Stores::from_memory(store.clone())).await;
    app.store = Some(store);
    app
}

pub async fn spawn_app_with_stores(config: Config, stores: Stores) -> TestApp {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(config, stores, notifier.clone());
    let app = skilltrack::build_app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store: None,
        notifier,
        state,
    }
}

/// A scratch Postgres database with migrations applied. `None` when
/// `DATABASE_URL` is not set, so the Postgres tests are skipped.
pub struct TestDb {
    pub pool: sqlx::PgPool,
    pub db_name: String,
    base_url: String,
}

fn replace_db_name(url: &str, db_name: &str) -> String {
    url.rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| url.to_string())
}

pub async fn spawn_db() -> Option<TestDb> {
    let _ = dotenvy::dotenv();
    let base_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())?;

    let db_name = format!(
        "skilltrack_test_{}",
        uuid::Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&replace_db_name(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");
    admin_pool.close().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&replace_db_name(&base_url, &db_name))
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(TestDb {
        pool,
        db_name,
        base_url,
    })
}

/// Drop the test database after tests complete.
pub async fn cleanup_db(db: TestDb) {
    db.pool.close().await;

    let admin_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&replace_db_name(&db.base_url, "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        db.db_name
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}
