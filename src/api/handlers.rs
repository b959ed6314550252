//! Route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiState;
use crate::agent_core::{AgentError, DatasetSummary, ResponseEnvelope};
use crate::workforce::Dataset;

pub const STORE_SUCCESS_MESSAGE: &str = "Data stored successfully";
pub const STORE_FAILURE_MESSAGE: &str = "Error storing data";

/// Name given to uploads that do not carry one.
pub const DEFAULT_DATASET_NAME: &str = "default";

// ─── Request/Response Types ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDataRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub dataset_name: Option<String>,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetsResponse {
    pub session_id: String,
    pub datasets: Vec<DatasetSummary>,
}

type MessageReply = (StatusCode, Json<MessageResponse>);

fn message(status: StatusCode, text: &str) -> MessageReply {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
}

/// Body field first, then the session header, then the configured default.
fn resolve_session(state: &ApiState, explicit: Option<&str>, headers: &HeaderMap) -> String {
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(state.server.session_header.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(state.server.default_session.as_str())
        .to_string()
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// POST /api/store-data
pub async fn store_data(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Result<Json<StoreDataRequest>, JsonRejection>,
) -> MessageReply {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected dataset upload body");
            return message(StatusCode::BAD_REQUEST, STORE_FAILURE_MESSAGE);
        }
    };

    let session = resolve_session(&state, request.session_id.as_deref(), &headers);
    let Value::Object(mapping) = request.data else {
        tracing::warn!(session = %session, "dataset upload data is not an object");
        return message(StatusCode::BAD_REQUEST, STORE_FAILURE_MESSAGE);
    };

    let name = request
        .dataset_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_DATASET_NAME);
    let dataset = Dataset::from_mapping(name, mapping);
    let records = dataset.len();

    match state.store.put(&session, dataset).await {
        Ok(()) => {
            tracing::info!(session = %session, dataset = %name, records, "dataset stored");
            message(StatusCode::OK, STORE_SUCCESS_MESSAGE)
        }
        Err(e) => {
            tracing::error!(session = %session, dataset = %name, error = %e, "failed to store dataset");
            let status = match e {
                AgentError::Validation { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            message(status, STORE_FAILURE_MESSAGE)
        }
    }
}

/// POST /api/query
pub async fn query(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let reason = rejection.body_text();
            tracing::warn!(error = %reason, "rejected query body");
            return (StatusCode::BAD_REQUEST, Json(ResponseEnvelope::error("", reason)));
        }
    };

    let session = resolve_session(&state, request.session_id.as_deref(), &headers);
    let envelope = state.dispatcher.dispatch(&session, &request.query).await;
    (StatusCode::OK, Json(envelope))
}

/// GET /api/datasets
pub async fn list_datasets(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<SessionParams>,
) -> Result<Json<DatasetsResponse>, MessageReply> {
    let session = resolve_session(&state, params.session_id.as_deref(), &headers);
    match state.store.list(&session).await {
        Ok(datasets) => Ok(Json(DatasetsResponse {
            session_id: session,
            datasets,
        })),
        Err(e) => {
            tracing::error!(session = %session, error = %e, "failed to list datasets");
            Err(message(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let model = match &state.model {
        Some(generator) => {
            let reachable = generator.is_reachable().await;
            json!({ "name": generator.model_name(), "reachable": reachable })
        }
        None => Value::Null,
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": model,
    }))
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::agent_core::classifier::tests::ScriptedGenerator;
    use crate::agent_core::{
        ContentKind, DatasetStore, Dispatcher, IntentClassifier, MemoryDatasetStore,
    };
    use crate::api::router;
    use crate::config::ServerConfig;

    fn app(classifier_replies: &[&str]) -> (axum::Router, Arc<MemoryDatasetStore>) {
        let store = Arc::new(MemoryDatasetStore::new());
        let dispatcher = Dispatcher::new(
            IntentClassifier::new(Arc::new(ScriptedGenerator::ok(classifier_replies))),
            Arc::new(ScriptedGenerator::ok(&[])),
            store.clone(),
        );
        let state = Arc::new(ApiState::new(dispatcher, None, ServerConfig::default()));
        (router(state), store)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn crew_upload(session: &str, name: &str) -> Value {
        json!({
            "sessionId": session,
            "datasetName": name,
            "data": {
                "u1": {"Full_Name": "Ann Lee", "Individual_Active": "true"},
                "u2": {"Full_Name": "Bob Ray", "Individual_Active": "false"},
                "u3": {"Full_Name": "Cat Fox", "Individual_Active": "true"},
            }
        })
    }

    #[tokio::test]
    async fn test_store_data_success() {
        let (app, store) = app(&[]);
        let resp = app
            .oneshot(post_json("/api/store-data", crew_upload("s1", "Q1 Report")))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], STORE_SUCCESS_MESSAGE);

        let stored = store.get("s1", "q1 report").await.unwrap().unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_store_data_uses_header_session_and_default_name() {
        let (app, store) = app(&[]);
        let req = Request::builder()
            .method("POST")
            .uri("/api/store-data")
            .header("content-type", "application/json")
            .header("x-session-id", "from-header")
            .body(Body::from(json!({"data": {"u1": {"Full_Name": "Ann"}}}).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(store
            .get("from-header", DEFAULT_DATASET_NAME)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_store_data_rejects_bad_payloads() {
        for body in [
            json!({"sessionId": "s1"}),
            json!({"sessionId": "s1", "data": [1, 2, 3]}),
            json!({"sessionId": "s1", "data": "text"}),
        ] {
            let (app, store) = app(&[]);
            let resp = app.oneshot(post_json("/api/store-data", body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(resp).await["message"], STORE_FAILURE_MESSAGE);
            assert!(store.list("s1").await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_store_data_rejects_malformed_json() {
        let (app, _) = app(&[]);
        let req = Request::builder()
            .method("POST")
            .uri("/api/store-data")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_answers_from_uploaded_dataset() {
        let decision = json!({"actionType": "workforce", "processedQuery": "how many active users"});
        let (app, _) = app(&[&decision.to_string()]);

        let resp = app
            .clone()
            .oneshot(post_json("/api/store-data", crew_upload("s1", "crew")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(post_json(
                "/api/query",
                json!({"sessionId": "s1", "query": "How many active users"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let envelope: ResponseEnvelope = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(envelope.kind(), ContentKind::Text);
        assert_eq!(envelope.content(), "There are 2 active users.");
        assert_eq!(envelope.user_query(), "How many active users");
    }

    #[tokio::test]
    async fn test_query_empty_is_error_envelope() {
        let (app, _) = app(&[]);
        let resp = app
            .oneshot(post_json("/api/query", json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["error"], crate::agent_core::dispatcher::EMPTY_QUERY_MESSAGE);
    }

    #[tokio::test]
    async fn test_list_datasets_newest_first() {
        let (app, _) = app(&[]);
        for name in ["first", "second"] {
            app.clone()
                .oneshot(post_json("/api/store-data", crew_upload("s1", name)))
                .await
                .unwrap();
        }

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/datasets?sessionId=s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["sessionId"], "s1");
        assert_eq!(body["datasets"][0]["name"], "second");
        assert_eq!(body["datasets"][1]["name"], "first");
        assert_eq!(body["datasets"][0]["records"], 3);
    }

    #[tokio::test]
    async fn test_health_without_model() {
        let (app, _) = app(&[]);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["model"].is_null());
    }
}
