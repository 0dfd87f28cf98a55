//! HTTP backends against an in-process stand-in for the node API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use pump_backends::{
    CollectorSpec, DrainSpec, EnumeratorSpec,
    api::{ApiClient, ApiCollector, ApiDrain, ApiPinEnumerator},
};
use pump_engine::{
    Block, Collector, Drain, Enumerator, Identifier, IdentifierRecord, Pump, PumpConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
struct Node {
    blocks: Arc<HashMap<String, Vec<u8>>>,
    pins: Arc<Vec<String>>,
    stream_tail: Option<&'static str>,
    uploads: Arc<Mutex<Vec<Vec<u8>>>>,
}

fn api_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "Message": message, "Code": 0, "Type": "error" });
    (status, axum::Json(body)).into_response()
}

async fn block_get(
    State(node): State<Node>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(id) = query.get("arg") else {
        return api_error(StatusCode::BAD_REQUEST, "argument \"key\" is required");
    };
    match node.blocks.get(id) {
        Some(data) => data.clone().into_response(),
        None => api_error(StatusCode::INTERNAL_SERVER_ERROR, "block not found locally"),
    }
}

async fn block_put(State(node): State<Node>, body: Bytes) -> Response {
    node.uploads.lock().unwrap().push(body.to_vec());
    let body = serde_json::json!({ "Key": "bafkstored", "Size": body.len() });
    axum::Json(body).into_response()
}

async fn pin_ls(
    State(node): State<Node>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("type").map(String::as_str) != Some("recursive") {
        return api_error(StatusCode::BAD_REQUEST, "unexpected pin type");
    }

    if query.get("stream").map(String::as_str) == Some("true") {
        let mut body = String::new();
        for pin in node.pins.iter() {
            body.push_str(&serde_json::json!({ "Cid": pin, "Type": "recursive" }).to_string());
            body.push('\n');
        }
        if let Some(tail) = node.stream_tail {
            body.push_str(tail);
            body.push('\n');
        }
        return body.into_response();
    }

    let keys: serde_json::Map<String, serde_json::Value> = node
        .pins
        .iter()
        .map(|pin| (pin.clone(), serde_json::json!({ "Type": "recursive" })))
        .collect();
    axum::Json(serde_json::json!({ "Keys": keys })).into_response()
}

async fn spawn_node(node: Node) -> String {
    let router = Router::new()
        .route("/api/v0/block/get", post(block_get))
        .route("/api/v0/block/put", post(block_put))
        .route("/api/v0/pin/ls", post(pin_ls))
        .with_state(node);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn node_with_blocks(blocks: &[(&str, &str)]) -> Node {
    Node {
        blocks: Arc::new(
            blocks
                .iter()
                .map(|(id, data)| (id.to_string(), data.as_bytes().to_vec()))
                .collect(),
        ),
        ..Default::default()
    }
}

fn node_with_pins(pins: &[&str]) -> Node {
    Node {
        pins: Arc::new(pins.iter().map(|p| p.to_string()).collect()),
        ..Default::default()
    }
}

async fn collect_one(collector: &ApiCollector, id: &str) -> Block {
    let (in_tx, in_rx) = flume::unbounded();
    let (out_tx, out_rx) = flume::unbounded();
    in_tx.send(IdentifierRecord::ok(Identifier::new(id))).unwrap();
    drop(in_tx);
    collector.collect(in_rx, out_tx).await.unwrap();
    out_rx.recv_async().await.unwrap()
}

mod collector_tests {
    use super::*;

    #[tokio::test]
    async fn test_block_get() {
        let base = spawn_node(node_with_blocks(&[("QmHello", "hello world")])).await;
        let collector = ApiCollector::new(ApiClient::new(&base).unwrap());

        let block = collect_one(&collector, "QmHello").await;
        assert!(block.error.is_none());
        assert_eq!(block.data.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_missing_block_is_item_error() {
        let base = spawn_node(node_with_blocks(&[])).await;
        let collector = ApiCollector::new(ApiClient::new(&base).unwrap());

        let block = collect_one(&collector, "QmMissing").await;
        let error = block.error.expect("retrieval should fail");
        assert!(error.to_string().contains("block not found locally"));
        assert!(block.data.is_empty());
    }
}

mod drain_tests {
    use super::*;

    #[tokio::test]
    async fn test_block_put_sends_payload() {
        init_tracing();
        let node = Node::default();
        let uploads = node.uploads.clone();
        let base = spawn_node(node).await;
        let drain = ApiDrain::new(ApiClient::new(&base).unwrap());

        drain
            .write(&Block::new(Identifier::new("QmPayload"), "block payload bytes"))
            .await
            .unwrap();

        let uploads = uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let body = String::from_utf8_lossy(&uploads[0]);
        assert!(body.contains("name=\"data\""));
        assert!(body.contains("block payload bytes"));
    }

    #[tokio::test]
    async fn test_block_put_sends_binary_payload_intact() {
        init_tracing();
        let node = Node::default();
        let uploads = node.uploads.clone();
        let base = spawn_node(node).await;
        let drain = ApiDrain::new(ApiClient::new(&base).unwrap());

        let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        drain
            .write(&Block::new(Identifier::new("QmBinary"), payload.clone()))
            .await
            .unwrap();

        let uploads = uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(
            uploads[0]
                .windows(payload.len())
                .any(|window| window == payload.as_slice())
        );
    }

    #[tokio::test]
    async fn test_unreachable_node_is_item_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let drain = ApiDrain::new(ApiClient::new(&format!("http://{addr}")).unwrap());
        let result = drain
            .write(&Block::new(Identifier::new("QmPayload"), "data"))
            .await;
        assert!(result.is_err());
    }
}

mod pin_tests {
    use super::*;

    async fn enumerate(
        enumerator: &ApiPinEnumerator,
    ) -> (Result<(), pump_engine::BoxError>, Vec<IdentifierRecord>) {
        let (tx, rx) = flume::unbounded();
        let result = enumerator.produce(tx).await;
        (result, rx.drain().collect())
    }

    #[tokio::test]
    async fn test_listing_sets_total_and_sorts() {
        let base = spawn_node(node_with_pins(&["QmZeta", "QmAlpha", "QmMid"])).await;
        let enumerator = ApiPinEnumerator::new(ApiClient::new(&base).unwrap(), false);

        let (result, records) = enumerate(&enumerator).await;
        result.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["QmAlpha", "QmMid", "QmZeta"]);
        assert_eq!(enumerator.total_count(), 3);
    }

    #[tokio::test]
    async fn test_stream_grows_total_and_isolates_bad_lines() {
        init_tracing();
        let mut node = node_with_pins(&["QmOne", "QmTwo"]);
        node.stream_tail = Some("{broken");
        let base = spawn_node(node).await;
        let enumerator = ApiPinEnumerator::new(ApiClient::new(&base).unwrap(), true);

        let (result, records) = enumerate(&enumerator).await;
        result.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].error.is_none());
        assert!(records[1].error.is_none());
        assert!(records[2].error.is_some());
        assert_eq!(enumerator.total_count(), 3);
    }

    #[tokio::test]
    async fn test_stream_error_object_is_fatal() {
        let mut node = node_with_pins(&["QmOne"]);
        node.stream_tail = Some(r#"{"Message":"context canceled","Code":0,"Type":"error"}"#);
        let base = spawn_node(node).await;
        let enumerator = ApiPinEnumerator::new(ApiClient::new(&base).unwrap(), true);

        let (result, records) = enumerate(&enumerator).await;
        let err = result.expect_err("error object must be fatal");
        assert!(err.to_string().contains("context canceled"));
        assert_eq!(records.len(), 1);
    }
}

mod pump_tests {
    use super::*;

    /// Pins listed by one node, copied into a flat-file store.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_migrate_pins_to_flatfs() {
        init_tracing();
        let mut node = node_with_blocks(&[("QmA11", "alpha"), ("QmC33", "charlie")]);
        node.pins = Arc::new(vec![
            "QmA11".to_string(),
            "QmB22".to_string(),
            "QmC33".to_string(),
        ]);
        let base = spawn_node(node).await;
        let dir = tempfile::tempdir().unwrap();

        let enumerator = EnumeratorSpec::ApiPin {
            url: base.clone(),
            stream: true,
        }
        .build()
        .await
        .unwrap();
        let collector = CollectorSpec::Api { url: base }.build().await.unwrap();
        let drain = DrainSpec::FlatFs {
            path: dir.path().to_path_buf(),
        }
        .build()
        .await
        .unwrap();

        let report = Pump::new(PumpConfig::default().with_workers(2))
            .run(enumerator, collector, drain)
            .await
            .unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.retrieval_failures, 1);
        assert_eq!(
            std::fs::read(dir.path().join("A1").join("QmA11.data")).unwrap(),
            b"alpha"
        );
        assert_eq!(
            std::fs::read(dir.path().join("C3").join("QmC33.data")).unwrap(),
            b"charlie"
        );
        assert!(!dir.path().join("B2").join("QmB22.data").exists());
    }
}
