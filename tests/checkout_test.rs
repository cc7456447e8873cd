//! Checkout over real HTTP: the order service talks to a fake payment
//! service through the reqwest client and the circuit breaker.
//!
//! Orders are kept in memory, so no database is needed:
//!
//!   cargo test --test checkout_test

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::http::StatusCode as ActixStatus;
use actix_web::{web, App, HttpResponse, HttpServer};
use fastfood_order::domain::ports::{HttpClient, HttpClientError};
use fastfood_order::infrastructure::circuit_breaker::{
    CircuitBreaker, CircuitBreakerSettings, CircuitState,
};
use fastfood_order::infrastructure::http_client::{ReqwestClient, ResilientClient};
use fastfood_order::infrastructure::memory_order_repo::InMemoryOrderRepository;
use fastfood_order::{build_checkout_service, build_server};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

struct FakePayments {
    status: ActixStatus,
    bodies: Mutex<Vec<Value>>,
}

impl FakePayments {
    fn received(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn receive_payment(state: web::Data<FakePayments>, body: web::Json<Value>) -> HttpResponse {
    state.bodies.lock().unwrap().push(body.into_inner());
    HttpResponse::build(state.status).json(json!({}))
}

/// Starts a payment service that records every body it gets and answers
/// with `status`.
fn start_payments(status: ActixStatus) -> (String, web::Data<FakePayments>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
    let port = listener.local_addr().expect("addr failed").port();

    let state = web::Data::new(FakePayments {
        status,
        bodies: Mutex::new(Vec::new()),
    });
    let data = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/order-payment", web::post().to(receive_payment))
    })
    .workers(1)
    .listen(listener)
    .expect("listen failed")
    .run();
    tokio::spawn(server);

    (format!("http://127.0.0.1:{}", port), state)
}

async fn answer_late() -> HttpResponse {
    tokio::time::sleep(Duration::from_secs(2)).await;
    HttpResponse::Ok().json(json!({}))
}

/// Starts a payment service that answers every call after two seconds.
fn start_slow_payments() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
    let port = listener.local_addr().expect("addr failed").port();

    let server = HttpServer::new(|| App::new().route("/order-payment", web::post().to(answer_late)))
        .workers(1)
        .listen(listener)
        .expect("listen failed")
        .run();
    tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind failed")
        .local_addr()
        .expect("addr failed")
        .port()
}

/// Starts the order service against `payment_url` and waits until it answers.
async fn start_orders(payment_url: &str, settings: CircuitBreakerSettings) -> String {
    let breaker = Arc::new(CircuitBreaker::new("payment-service", settings));
    let payment_client =
        ReqwestClient::new(payment_url, Duration::from_secs(2)).expect("client build failed");
    let service = build_checkout_service(
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(ResilientClient::new(payment_client, breaker)),
    );

    let port = free_port();
    let server = build_server(service, "127.0.0.1", port).expect("Failed to bind server");
    tokio::spawn(server);

    let base = format!("http://127.0.0.1:{}", port);
    let http = Client::new();
    for _ in 0..50 {
        if http.get(&base).send().await.is_ok() {
            return base;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("order service did not start on {}", base);
}

async fn checkout(http: &Client, base: &str) -> reqwest::Response {
    http.post(format!("{}/v1/orders/checkout", base))
        .json(&json!({ "customer_id": 1, "items": [{ "id": 1, "quantity": 2 }] }))
        .send()
        .await
        .expect("checkout request failed")
}

async fn list_orders(http: &Client, base: &str) -> Vec<Value> {
    http.get(format!("{}/v1/orders", base))
        .send()
        .await
        .expect("list request failed")
        .json()
        .await
        .expect("list body is not JSON")
}

#[tokio::test]
async fn checkout_notifies_payment_service() {
    let (payment_url, payments) = start_payments(ActixStatus::OK);
    let base = start_orders(&payment_url, CircuitBreakerSettings::default()).await;
    let http = Client::new();

    let resp = checkout(&http, &base).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "id": 1 }));

    assert_eq!(
        payments.received(),
        vec![json!({ "id": 1, "payment_status_id": 1 })]
    );

    let orders = list_orders(&http, &base).await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "RECEIVED");
}

#[tokio::test]
async fn unreachable_payment_service_is_bad_gateway_and_order_is_kept() {
    let nobody_listening = format!("http://127.0.0.1:{}", free_port());
    let base = start_orders(&nobody_listening, CircuitBreakerSettings::default()).await;
    let http = Client::new();

    let resp = checkout(&http, &base).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let orders = list_orders(&http, &base).await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], 1);
    assert_eq!(orders[0]["status"], "RECEIVED");
}

#[tokio::test]
async fn open_breaker_stops_calling_payment_service() {
    let (payment_url, payments) = start_payments(ActixStatus::INTERNAL_SERVER_ERROR);
    let settings = CircuitBreakerSettings {
        failure_threshold: 2,
        timeout: Duration::from_secs(60),
        ..CircuitBreakerSettings::default()
    };
    let base = start_orders(&payment_url, settings).await;
    let http = Client::new();

    for _ in 0..2 {
        let resp = checkout(&http, &base).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "unexpected status code: 500");
    }
    assert_eq!(payments.received().len(), 2);

    let resp = checkout(&http, &base).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "circuit breaker is open");
    assert_eq!(payments.received().len(), 2);

    assert_eq!(list_orders(&http, &base).await.len(), 3);
}

#[tokio::test]
async fn kitchen_queue_follows_status_updates() {
    let (payment_url, _payments) = start_payments(ActixStatus::OK);
    let base = start_orders(&payment_url, CircuitBreakerSettings::default()).await;
    let http = Client::new();

    for _ in 0..3 {
        assert_eq!(checkout(&http, &base).await.status(), StatusCode::OK);
    }
    for (id, status) in [(2, "READY"), (3, "IN_PREPARATION")] {
        let resp = http
            .patch(format!("{}/v1/orders/{}", base, id))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let ids: Vec<i64> = list_orders(&http, &base)
        .await
        .iter()
        .filter_map(|o| o["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[tokio::test]
async fn concurrent_checkouts_get_distinct_ids() {
    let (payment_url, payments) = start_payments(ActixStatus::OK);
    let base = start_orders(&payment_url, CircuitBreakerSettings::default()).await;
    let http = Client::new();

    let responses = futures::future::join_all((0..10).map(|_| checkout(&http, &base))).await;

    let mut ids = Vec::new();
    for resp in responses {
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        ids.push(body["id"].as_i64().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
    assert_eq!(payments.received().len(), 10);
}

#[tokio::test]
async fn payment_timeouts_open_the_breaker() {
    let payment_url = start_slow_payments();
    let breaker = Arc::new(CircuitBreaker::new(
        "payment-service",
        CircuitBreakerSettings {
            failure_threshold: 2,
            timeout: Duration::from_secs(60),
            ..CircuitBreakerSettings::default()
        },
    ));
    let client = ResilientClient::new(
        ReqwestClient::new(&payment_url, Duration::from_millis(200)).expect("client build failed"),
        Arc::clone(&breaker),
    );

    for _ in 0..2 {
        let err = client
            .post("/order-payment", br#"{"id":1,"payment_status_id":1}"#.to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::Transport(_)), "got {:?}", err);
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let err = client
        .post("/order-payment", br#"{"id":1,"payment_status_id":1}"#.to_vec())
        .await
        .unwrap_err();
    assert_eq!(err, HttpClientError::CircuitOpen);
}
