use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};
use marketplace_indexer::{Identity, ResolvedListing, SearchIndex};
use marketplace_search::ElasticsearchIndex;
use serde_json::{json, Value};

type Captured = Arc<Mutex<Vec<(String, String, Value)>>>;

async fn put_doc(
    State(captured): State<Captured>,
    Path((index, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> StatusCode {
    captured.lock().unwrap().push((index, id, body));
    StatusCode::CREATED
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn listing() -> ResolvedListing {
    ResolvedListing {
        id: "1-000-42".to_string(),
        status: "active".to_string(),
        seller: Identity::new("0xA"),
        events: vec![],
        content: json!({ "title": "Cargo bike" }).as_object().cloned().unwrap(),
    }
}

#[tokio::test]
async fn test_index_puts_document() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/:index/_doc/:id", put(put_doc))
        .with_state(captured.clone());
    let base = serve(router).await;

    let index = ElasticsearchIndex::new(base, "listings").unwrap();
    index
        .index("1-000-42", "0xA", Some("0x1220abcd"), &listing())
        .await
        .unwrap();

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let (index, id, body) = &captured[0];
    assert_eq!(index, "listings");
    assert_eq!(id, "1-000-42");
    assert_eq!(body["ownerAddress"], "0xA");
    assert_eq!(body["ipfsHash"], "0x1220abcd");
    assert_eq!(body["seller"]["id"], "0xA");
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let router = Router::new().route(
        "/:index/_doc/:id",
        put(|| async { (StatusCode::SERVICE_UNAVAILABLE, "cluster red") }),
    );
    let base = serve(router).await;

    let index = ElasticsearchIndex::new(base, "listings").unwrap();
    let err = index
        .index("1-000-42", "0xA", None, &listing())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}
