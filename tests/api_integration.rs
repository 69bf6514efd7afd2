//! End-to-end tests driving the REST surface over a real TCP listener.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::{Value, json};

use giveaway_ledger::api;
use giveaway_ledger::app_state::AppState;
use giveaway_ledger::domain::{EventBus, PoolRegistry};
use giveaway_ledger::gateway::{SimulatedGateway, SimulationMode};
use giveaway_ledger::persistence::{MemoryTransactionLog, TransactionLog};
use giveaway_ledger::service::{ClaimLedger, StatsAggregator};

/// Boots the full router on an ephemeral port and returns its base URL.
async fn spawn_app(mode: SimulationMode) -> String {
    let registry = Arc::new(PoolRegistry::new());
    let event_bus = EventBus::new(64);
    let log: Arc<dyn TransactionLog> = Arc::new(MemoryTransactionLog::new());
    let gateway = Arc::new(SimulatedGateway::with_mode(mode, Duration::from_millis(5)));

    let ledger = Arc::new(ClaimLedger::new(
        Arc::clone(&registry),
        Arc::clone(&log),
        gateway,
        event_bus.clone(),
        Duration::from_millis(500),
    ));
    let stats = Arc::new(StatsAggregator::new(registry, log));

    let app_state = AppState {
        ledger,
        stats,
        event_bus,
    };
    let app = Router::new()
        .merge(api::build_router())
        .with_state(app_state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

async fn create_pool(client: &reqwest::Client, base: &str, total: u64, per_claim: u64) -> Value {
    let Ok(response) = client
        .post(format!("{base}/giveaway"))
        .json(&json!({ "totalAmount": total, "perClaimAmount": per_claim }))
        .send()
        .await
    else {
        panic!("create request failed");
    };
    assert_eq!(response.status(), 201);
    let Ok(body) = response.json::<Value>().await else {
        panic!("create response not JSON");
    };
    body
}

fn pool_id_of(body: &Value) -> &str {
    let Some(id) = body.get("poolId").and_then(Value::as_str) else {
        panic!("poolId missing from create response");
    };
    id
}

#[tokio::test]
async fn create_giveaway_returns_claim_code() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;

    let id = pool_id_of(&body);
    let Some(code) = body.get("claimCode").and_then(Value::as_str) else {
        panic!("claimCode missing");
    };
    assert!(code.starts_with("giveaway://claim/"));
    assert!(code.ends_with(id));
    assert_eq!(body.get("totalAmount").and_then(Value::as_u64), Some(100));
    assert_eq!(body.get("perClaimAmount").and_then(Value::as_u64), Some(30));
}

#[tokio::test]
async fn create_giveaway_rejects_invalid_amounts() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let Ok(response) = client
        .post(format!("{base}/giveaway"))
        .json(&json!({ "totalAmount": 10, "perClaimAmount": 30 }))
        .send()
        .await
    else {
        panic!("create request failed");
    };
    assert_eq!(response.status(), 400);
    let Ok(body) = response.json::<Value>().await else {
        panic!("error response not JSON");
    };
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn scan_disburses_one_share() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);

    let Ok(response) = client
        .post(format!("{base}/scan/{id}"))
        .json(&json!({ "participantId": "alice" }))
        .send()
        .await
    else {
        panic!("scan request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(body) = response.json::<Value>().await else {
        panic!("scan response not JSON");
    };
    assert_eq!(body.get("success").and_then(Value::as_bool), Some(true));
    assert_eq!(body.get("amount").and_then(Value::as_u64), Some(30));
    assert!(body.get("transactionId").and_then(Value::as_str).is_some());
}

#[tokio::test]
async fn exhausted_pool_reports_giveaway_ended() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    // 100 / 30 supports exactly three full shares.
    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);

    for participant in ["a", "b", "c"] {
        let Ok(response) = client
            .post(format!("{base}/scan/{id}"))
            .json(&json!({ "participantId": participant }))
            .send()
            .await
        else {
            panic!("scan request failed");
        };
        assert_eq!(response.status(), 200);
    }

    let Ok(response) = client
        .post(format!("{base}/scan/{id}"))
        .json(&json!({ "participantId": "d" }))
        .send()
        .await
    else {
        panic!("scan request failed");
    };
    assert_eq!(response.status(), 400);
    let Ok(body) = response.json::<Value>().await else {
        panic!("error response not JSON");
    };
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Giveaway has ended")
    );
}

#[tokio::test]
async fn unknown_pool_is_not_found() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let Ok(response) = client
        .post(format!("{base}/scan/{}", uuid::Uuid::new_v4()))
        .json(&json!({ "participantId": "alice" }))
        .send()
        .await
    else {
        panic!("scan request failed");
    };
    assert_eq!(response.status(), 404);
    let Ok(body) = response.json::<Value>().await else {
        panic!("error response not JSON");
    };
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Giveaway not found")
    );
}

#[tokio::test]
async fn failed_disbursement_reports_transaction_failed() {
    let base = spawn_app(SimulationMode::Fail).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);

    let Ok(response) = client
        .post(format!("{base}/scan/{id}"))
        .json(&json!({ "participantId": "alice" }))
        .send()
        .await
    else {
        panic!("scan request failed");
    };
    assert_eq!(response.status(), 500);
    let Ok(body) = response.json::<Value>().await else {
        panic!("error response not JSON");
    };
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Transaction failed")
    );

    // The failed claim must not consume pool funds.
    let Ok(stats) = client
        .get(format!("{base}/giveaway/{id}/stats"))
        .send()
        .await
    else {
        panic!("stats request failed");
    };
    let Ok(stats) = stats.json::<Value>().await else {
        panic!("stats response not JSON");
    };
    assert_eq!(
        stats.get("remainingAmount").and_then(Value::as_u64),
        Some(100)
    );
}

#[tokio::test]
async fn empty_participant_is_rejected() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);

    let Ok(response) = client
        .post(format!("{base}/scan/{id}"))
        .json(&json!({ "participantId": "  " }))
        .send()
        .await
    else {
        panic!("scan request failed");
    };
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn stats_reflect_committed_claims() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);

    for participant in ["alice", "bob"] {
        let Ok(response) = client
            .post(format!("{base}/scan/{id}"))
            .json(&json!({ "participantId": participant }))
            .send()
            .await
        else {
            panic!("scan request failed");
        };
        assert_eq!(response.status(), 200);
    }

    let Ok(response) = client
        .get(format!("{base}/giveaway/{id}/stats"))
        .send()
        .await
    else {
        panic!("stats request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(stats) = response.json::<Value>().await else {
        panic!("stats response not JSON");
    };
    assert_eq!(stats.get("totalAmount").and_then(Value::as_u64), Some(100));
    assert_eq!(
        stats.get("remainingAmount").and_then(Value::as_u64),
        Some(40)
    );
    assert_eq!(
        stats.get("transactionsCount").and_then(Value::as_u64),
        Some(2)
    );
    assert_eq!(stats.get("uniqueUsers").and_then(Value::as_u64), Some(2));
}

#[tokio::test]
async fn idempotent_retry_returns_same_receipt() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let body = create_pool(&client, &base, 100, 30).await;
    let id = pool_id_of(&body);
    let key = uuid::Uuid::new_v4();

    let mut amounts = Vec::new();
    for _ in 0..2 {
        let Ok(response) = client
            .post(format!("{base}/scan/{id}"))
            .json(&json!({ "participantId": "alice", "idempotencyKey": key }))
            .send()
            .await
        else {
            panic!("scan request failed");
        };
        assert_eq!(response.status(), 200);
        let Ok(body) = response.json::<Value>().await else {
            panic!("scan response not JSON");
        };
        amounts.push(body.get("amount").and_then(Value::as_u64));
    }
    assert_eq!(amounts, vec![Some(30), Some(30)]);

    // Only one share was actually taken.
    let Ok(stats) = client
        .get(format!("{base}/giveaway/{id}/stats"))
        .send()
        .await
    else {
        panic!("stats request failed");
    };
    let Ok(stats) = stats.json::<Value>().await else {
        panic!("stats response not JSON");
    };
    assert_eq!(
        stats.get("remainingAmount").and_then(Value::as_u64),
        Some(70)
    );
    assert_eq!(
        stats.get("transactionsCount").and_then(Value::as_u64),
        Some(1)
    );
}

#[cfg(feature = "swagger-ui")]
#[tokio::test]
async fn openapi_document_is_served() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let Ok(response) = client
        .get(format!("{base}/api-docs/openapi.json"))
        .send()
        .await
    else {
        panic!("openapi request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(doc) = response.json::<Value>().await else {
        panic!("openapi response not JSON");
    };
    let Some(paths) = doc.get("paths") else {
        panic!("openapi document has no paths");
    };
    assert!(paths.get("/giveaway").is_some());
    assert!(paths.get("/scan/{id}").is_some());
    assert!(paths.get("/health").is_some());
}

#[tokio::test]
async fn health_endpoint_is_up() {
    let base = spawn_app(SimulationMode::Succeed).await;
    let client = reqwest::Client::new();

    let Ok(response) = client.get(format!("{base}/health")).send().await else {
        panic!("health request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(body) = response.json::<Value>().await else {
        panic!("health response not JSON");
    };
    assert_eq!(
        body.get("status").and_then(Value::as_str),
        Some("healthy")
    );
}
