//! End-to-end tests: auth service, product service and gateway on real
//! sockets, driven over HTTP.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use tollgate::routes::{AuthState, GatewayState, ProductState, ProductStore};
use tollgate::server::{self, RequestHandler};
use tollgate_auth::{
    Gate, InMemoryCredentialStore, LocalVerifier, LoginService, PublicPaths, RemoteVerifier, Role,
    SigningSecret, TokenMaker, TokenVerifier,
};

const SECRET: &str = "integration-secret-that-is-at-least-32-chars";

async fn spawn<H: RequestHandler>(handler: H) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::run(listener, Arc::new(handler)));
    addr
}

fn maker() -> TokenMaker {
    TokenMaker::new(&SigningSecret::new(SECRET).unwrap())
}

struct Stack {
    gateway: String,
    client: reqwest::Client,
}

/// Start all three services. `local` picks in-process verification at the gateway.
async fn start(local: bool) -> Stack {
    let store = InMemoryCredentialStore::with_demo_users().unwrap();
    let login = LoginService::new(Arc::new(store), maker(), Duration::from_secs(3600));
    let auth = spawn(AuthState::new(login)).await;
    let products = spawn(ProductState::new(ProductStore::new())).await;

    let verifier: Arc<dyn TokenVerifier> = if local {
        Arc::new(LocalVerifier::new(maker()))
    } else {
        Arc::new(
            RemoteVerifier::new(format!("http://{auth}/auth/validate"), Duration::from_secs(2)).unwrap(),
        )
    };
    let gate = Gate::new(PublicPaths::parse("/api/auth*,/health,/healthz").unwrap(), verifier);
    let gateway = GatewayState::new(
        gate,
        format!("http://{auth}"),
        format!("http://{products}"),
        Duration::from_secs(5),
    )
    .unwrap();
    let gateway = spawn(gateway).await;

    Stack {
        gateway: format!("http://{gateway}"),
        client: reqwest::Client::new(),
    }
}

impl Stack {
    async fn login(&self, login: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth", self.gateway))
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn token(&self, login: &str, password: &str) -> String {
        let body: Value = self.login(login, password).await.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, auth: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(format!("{}{}", self.gateway, path));
        if let Some(auth) = auth {
            req = req.header("Authorization", auth);
        }
        req.send().await.unwrap()
    }
}

#[tokio::test]
async fn test_login_then_access_protected_resource() {
    for local in [true, false] {
        let stack = start(local).await;

        let response = stack.login("admin", "admin123").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["user"]["login"], "admin");
        assert_eq!(body["user"]["isAdmin"], true);
        let token = body["token"].as_str().unwrap();

        let response = stack
            .get("/api/product", Some(&format!("Bearer {token}")))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "local={local}");
        let list: Value = response.json().await.unwrap();
        assert!(list.as_array().unwrap().is_empty());

        let response = stack.get("/api/me", Some(&format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let me: Value = response.json().await.unwrap();
        assert_eq!(me["login"], "admin");
    }
}

#[tokio::test]
async fn test_bad_credentials_get_identical_denials() {
    for local in [true, false] {
        let stack = start(local).await;
        let token = stack.token("user", "user123").await;
        let tampered = format!("Bearer {token}x");

        let mut bodies = Vec::new();
        for auth in [None, Some("Token abc"), Some(tampered.as_str())] {
            let response = stack.get("/api/product", auth).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "local={local} {auth:?}");
            bodies.push(response.text().await.unwrap());
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]), "{bodies:?}");
    }
}

#[tokio::test]
async fn test_expired_token_is_denied() {
    for local in [true, false] {
        let stack = start(local).await;
        let past = chrono::Utc::now() - chrono::Duration::hours(2);
        let (token, _) = maker()
            .issue_at(past, "id", "admin", Role::Elevated, Duration::from_secs(3600))
            .unwrap();

        let response = stack
            .get("/api/product", Some(&format!("Bearer {token}")))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "local={local}");
    }
}

#[tokio::test]
async fn test_wrong_password_and_unknown_login() {
    let stack = start(true).await;

    let wrong = stack.login("admin", "nope").await;
    let unknown = stack.login("nobody", "admin123").await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.text().await.unwrap(), unknown.text().await.unwrap());
}

#[tokio::test]
async fn test_product_crud_through_gateway() {
    let stack = start(false).await;
    let auth = format!("Bearer {}", stack.token("admin", "admin123").await);

    let response = stack
        .client
        .post(format!("{}/api/product", stack.gateway))
        .header("Authorization", &auth)
        .json(&json!({ "name": "Laptop", "price": 1200.5, "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    let response = stack
        .get(&format!("/api/product?id={id}"), Some(&auth))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = stack
        .client
        .delete(format!("{}/api/product?id={id}", stack.gateway))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = stack
        .get(&format!("/api/product?id={id}"), Some(&auth))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_paths_need_no_token() {
    let stack = start(false).await;

    let response = stack.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = response.json().await.unwrap();
    assert_eq!(health["verifier"], "remote");
}

#[tokio::test]
async fn test_unreachable_verifier_is_server_error() {
    let products = spawn(ProductState::new(ProductStore::new())).await;
    let gate = Gate::new(
        PublicPaths::parse("/api/auth*").unwrap(),
        Arc::new(RemoteVerifier::new("http://127.0.0.1:9/auth/validate", Duration::from_secs(1)).unwrap()),
    );
    let gateway = spawn(
        GatewayState::new(gate, "http://127.0.0.1:9", format!("http://{products}"), Duration::from_secs(2))
            .unwrap(),
    )
    .await;

    let response = reqwest::Client::new()
        .get(format!("http://{gateway}/api/product"))
        .header("Authorization", "Bearer a.b.c")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
