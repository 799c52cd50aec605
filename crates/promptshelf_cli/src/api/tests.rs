//! Client tests against an in-process mock backend.

use super::{api_url, error_message_for_response, normalize_server, ApiClient};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use promptshelf_core::models::{Direction, PromptDraft, PromptKind, ReferenceItem};
use promptshelf_core::pagination::{ListQuery, LoadOutcome, PaginatedList};
use promptshelf_core::ShelfError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    prompts: Vec<Value>,
    updates: Vec<Value>,
    deleted: Vec<usize>,
    reference_queries: Vec<HashMap<String, String>>,
    refresh_modes: Vec<String>,
    requests: usize,
}

type Shared = Arc<Mutex<MockState>>;

async fn get_prompts(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().expect("state");
    state.requests += 1;
    Json(Value::Array(state.prompts.clone()))
}

async fn add_prompt(State(state): State<Shared>, Json(item): Json<Value>) -> Json<Value> {
    let mut state = state.lock().expect("state");
    state.requests += 1;
    state.prompts.push(item);
    Json(Value::Array(state.prompts.clone()))
}

async fn update_prompt(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().expect("state");
    state.requests += 1;
    state.updates.push(body);
    Json(json!({ "success": true }))
}

async fn delete_prompt(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().expect("state");
    state.requests += 1;
    let index = body["index"].as_u64().expect("index") as usize;
    state.deleted.push(index);
    if index < state.prompts.len() {
        state.prompts.remove(index);
    }
    Json(Value::Array(state.prompts.clone()))
}

async fn lora_list() -> Json<Value> {
    Json(json!({
        "loras": [
            { "name": "Ink", "filename": "ink.safetensors", "category": "style",
              "trigger_words": ["ink wash"], "preview_url": "/prompt_manage/lora/preview?path=style/ink.mp4" },
            { "name": "Mecha", "category": "char" }
        ],
        "categories": ["style", "char"]
    }))
}

async fn lora_refresh(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mode = params.get("mode").cloned().unwrap_or_default();
    state.lock().expect("state").refresh_modes.push(mode);
    Json(json!({ "success": true, "message": "refreshed 2 loras" }))
}

async fn categories() -> Json<Value> {
    Json(json!({ "categories": ["root", "style"] }))
}

fn reference(index: usize) -> Value {
    json!({
        "file_name": format!("{}.png", index),
        "category": if index % 2 == 0 { "root" } else { "style" },
        "lora_name": format!("lora-{}", index),
        "image_url": format!("/api/image?path={}.png", index),
        "width": 512,
        "height": 768,
        "prompt": "ink wash",
        "negative_prompt": ""
    })
}

async fn references(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state
        .lock()
        .expect("state")
        .reference_queries
        .push(params.clone());
    if params.get("category").map(String::as_str) == Some("boom") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "reader exploded" })),
        );
    }
    let total = 5usize;
    let offset: usize = params["offset"].parse().expect("offset");
    let limit: usize = params["limit"].parse().expect("limit");
    let end = (offset + limit).min(total);
    let items: Vec<Value> = (offset.min(end)..end).map(reference).collect();
    (
        StatusCode::OK,
        Json(json!({
            "references": items,
            "total": total,
            "offset": offset,
            "limit": limit,
            "has_more": end < total,
            "categories": ["root", "style"]
        })),
    )
}

async fn spawn_backend(state: Shared) -> String {
    let app = Router::new()
        .route("/prompt_manage/get", post(get_prompts))
        .route("/prompt_manage/add", post(add_prompt))
        .route("/prompt_manage/update", post(update_prompt))
        .route("/prompt_manage/delete", post(delete_prompt))
        .route("/prompt_manage/lora/list", get(lora_list))
        .route("/prompt_manage/lora/refresh", get(lora_refresh))
        .route("/api/categories", get(categories))
        .route("/api/references", get(references))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock backend");
    });
    format!("http://{}", addr)
}

async fn client_with_state(prompts: Vec<Value>) -> (ApiClient, Shared) {
    let state = Arc::new(Mutex::new(MockState {
        prompts,
        ..MockState::default()
    }));
    let base = spawn_backend(state.clone()).await;
    let client = ApiClient::new(&base, &format!("{}/", base), Duration::from_secs(5))
        .expect("client");
    (client, state)
}

#[tokio::test]
async fn prompt_crud_round_trips_through_backend() {
    let (client, state) = client_with_state(vec![json!({
        "name": "masterpiece", "direction": "正向", "type": "质量", "note": "", "text": "best quality"
    })])
    .await;

    let prompts = client.list_prompts().await.expect("list");
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].kind, PromptKind::Quality);

    let added = client
        .add_prompt(PromptDraft {
            name: " rim light ".to_string(),
            direction: Direction::Negative,
            kind: PromptKind::Style,
            note: String::new(),
            text: "rim lighting".to_string(),
        })
        .await
        .expect("add");
    assert_eq!(added.name, "rim light");
    {
        let state = state.lock().expect("state");
        assert_eq!(state.prompts[1]["direction"], "反向");
        assert_eq!(state.prompts[1]["type"], "风格");
    }

    let updated = client
        .update_prompt(
            1,
            PromptDraft {
                name: "rim".to_string(),
                text: "rim light".to_string(),
                ..PromptDraft::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.text, "rim light");
    let update = state.lock().expect("state").updates[0].clone();
    assert_eq!(update["index"], 1);
    assert_eq!(update["name"], "rim");
    assert_eq!(update["direction"], "无");
}

#[tokio::test]
async fn blank_draft_is_rejected_before_any_request() {
    let (client, state) = client_with_state(Vec::new()).await;
    let result = client
        .add_prompt(PromptDraft {
            name: "  ".to_string(),
            text: "text".to_string(),
            ..PromptDraft::default()
        })
        .await;
    assert!(matches!(result, Err(ShelfError::InvalidInput(_))));
    let result = client.update_prompt(0, PromptDraft::default()).await;
    assert!(matches!(result, Err(ShelfError::InvalidInput(_))));
    assert_eq!(state.lock().expect("state").requests, 0);
}

#[tokio::test]
async fn batch_delete_runs_highest_index_first() {
    let prompts = (0..10)
        .map(|index| json!({ "name": format!("p{}", index), "text": "t" }))
        .collect();
    let (client, state) = client_with_state(prompts).await;

    let order = client.delete_prompts(&[5, 2, 9, 5]).await.expect("delete");
    assert_eq!(order, vec![9, 5, 2]);

    let state = state.lock().expect("state");
    assert_eq!(state.deleted, vec![9, 5, 2]);
    let names: Vec<&str> = state
        .prompts
        .iter()
        .filter_map(|prompt| prompt["name"].as_str())
        .collect();
    assert_eq!(names, vec!["p0", "p1", "p3", "p4", "p6", "p7", "p8"]);
}

#[tokio::test]
async fn references_paginate_until_total() {
    let (client, state) = client_with_state(Vec::new()).await;
    let list: PaginatedList<ReferenceItem, ApiClient> = PaginatedList::new("references", client, 2);
    let query = ListQuery::new(Some("root"), Some("ink"));

    let mut loaded = Vec::new();
    loop {
        match list.load_next_page(&query).await {
            LoadOutcome::Loaded { appended, .. } => loaded.push(appended),
            LoadOutcome::Exhausted => break,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(loaded, vec![2, 2, 1]);
    assert_eq!(list.len(), 5);
    assert!(!list.state().has_more);

    let state = state.lock().expect("state");
    let offsets: Vec<&str> = state
        .reference_queries
        .iter()
        .map(|params| params["offset"].as_str())
        .collect();
    assert_eq!(offsets, vec!["0", "2", "4"]);
    assert_eq!(state.reference_queries[0]["category"], "root");
    assert_eq!(state.reference_queries[0]["search"], "ink");
    assert_eq!(state.reference_queries[0]["limit"], "2");
}

#[tokio::test]
async fn reader_errors_surface_as_failed_loads() {
    let (client, _state) = client_with_state(Vec::new()).await;
    let list: PaginatedList<ReferenceItem, ApiClient> = PaginatedList::new("references", client, 2);

    let outcome = list
        .load_next_page(&ListQuery::new(Some("boom"), None))
        .await;
    match outcome {
        LoadOutcome::Failed(ShelfError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "reader exploded");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(list.state().loaded, 0);
    assert!(!list.is_loading());
}

#[tokio::test]
async fn lora_catalog_and_refresh() {
    let (client, state) = client_with_state(Vec::new()).await;
    let catalog = client.lora_catalog().await.expect("catalog");
    assert_eq!(catalog.loras.len(), 2);
    assert_eq!(catalog.default_category(), Some("style"));
    assert_eq!(catalog.loras[1].filename, "");

    let report = client.refresh_loras().await.expect("refresh");
    assert!(report.success);
    assert_eq!(state.lock().expect("state").refresh_modes, vec!["all"]);

    let categories = client.reference_categories().await.expect("categories");
    assert_eq!(categories, vec!["root", "style"]);
}

#[tokio::test]
async fn unreachable_backend_maps_to_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let base = format!("http://{}", addr);
    let client = ApiClient::new(&base, &base, Duration::from_secs(2)).expect("client");
    assert!(matches!(
        client.list_prompts().await,
        Err(ShelfError::Http(_))
    ));
}

#[test]
fn api_url_appends_segments_to_base_path() {
    let url = api_url("http://127.0.0.1:8188/comfy/", &["prompt_manage", "get"]).expect("url");
    assert_eq!(url.as_str(), "http://127.0.0.1:8188/comfy/prompt_manage/get");
    assert!(matches!(
        api_url("not a url", &["x"]),
        Err(ShelfError::InvalidInput(_))
    ));
}

#[test]
fn normalize_server_matrix() {
    let cases = [
        ("http://localhost:8188", "http://127.0.0.1:8188"),
        ("https://localhost:8188", "https://localhost:8188"),
        ("http://127.0.0.1:8765/", "http://127.0.0.1:8765"),
        ("not a url", "not a url"),
    ];
    for (input, expected) in cases {
        assert_eq!(normalize_server(input.to_string()), expected);
    }
}

#[test]
fn error_message_for_response_matrix() {
    let cases = [
        (
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"Not found"}"#,
            "Not found",
        ),
        (reqwest::StatusCode::BAD_REQUEST, "   ", "Bad Request"),
        (reqwest::StatusCode::BAD_GATEWAY, "upstream down", "upstream down"),
        (
            reqwest::StatusCode::CONFLICT,
            r#"{"detail":"x"}"#,
            r#"{"detail":"x"}"#,
        ),
    ];
    for (status, body, expected) in cases {
        assert_eq!(error_message_for_response(status, body), expected);
    }
}
