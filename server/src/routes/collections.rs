//! Collection CRUD routes.
//!
//! Every successful mutation pushes the collection's fresh snapshot to
//! its realtime subscribers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tether_store::Document;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::AppState;

/// Response for listing a collection.
#[derive(Serialize)]
pub struct ListResponse {
    pub documents: Vec<Document>,
}

/// Response for adding a document.
#[derive(Serialize)]
pub struct AddResponse {
    pub id: String,
}

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{name}",
            get(list_documents).post(add_document),
        )
        .route(
            "/collections/{name}/{id}",
            get(get_document)
                .patch(patch_document)
                .put(put_document)
                .delete(delete_document),
        )
}

/// GET /collections/{name} - list all documents.
async fn list_documents(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ListResponse> {
    Json(ListResponse {
        documents: state.docs.list(&name),
    })
}

/// POST /collections/{name} - add a document with a server-assigned id.
async fn add_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(name): Path<String>,
    Json(data): Json<Value>,
) -> Result<Json<AddResponse>> {
    let (id, snapshot) = state.docs.add(&name, data);
    state.conn_manager.broadcast_snapshot(&name, snapshot);
    Ok(Json(AddResponse { id }))
}

/// GET /collections/{name}/{id} - fetch one document.
async fn get_document(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    state
        .docs
        .get(&name, &id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{name}/{id}")))
}

/// PATCH /collections/{name}/{id} - merge fields into a document.
async fn patch_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((name, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<StatusCode> {
    let snapshot = state.docs.update(&name, &id, patch)?;
    state.conn_manager.broadcast_snapshot(&name, snapshot);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /collections/{name}/{id} - create or replace a document.
async fn put_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((name, id)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> Result<StatusCode> {
    let snapshot = state.docs.set(&name, &id, data);
    state.conn_manager.broadcast_snapshot(&name, snapshot);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /collections/{name}/{id} - remove a document.
async fn delete_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((name, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let snapshot = state.docs.remove(&name, &id)?;
    state.conn_manager.broadcast_snapshot(&name, snapshot);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::DocStore;
    use crate::websocket::{ConnectionManager, ServerMessage};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            docs: Arc::new(DocStore::new()),
            conn_manager: ConnectionManager::new_shared(),
            config: Arc::new(Config {
                host: "127.0.0.1".into(),
                port: 0,
                auth_secret: None,
            }),
        }
    }

    fn app(state: AppState) -> Router {
        routes().with_state(state)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn full_crud_roundtrip() {
        let state = test_state();
        let app = app(state.clone());

        // Add
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/collections/accounts",
                json!({"name": "Acme", "industry": "Paper"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        // List
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/collections/accounts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed["documents"].as_array().unwrap().len(), 1);
        assert_eq!(listed["documents"][0]["id"], id.as_str());

        // Patch
        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/collections/accounts/{id}"),
                json!({"industry": "Logistics"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Get
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/collections/accounts/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let document = body_json(response).await;
        assert_eq!(document["data"]["name"], "Acme");
        assert_eq!(document["data"]["industry"], "Logistics");

        // Delete
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/collections/accounts/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Gone
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/collections/accounts/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_of_missing_document_is_404() {
        let state = test_state();
        let response = app(state)
            .oneshot(json_request(
                "PATCH",
                "/collections/accounts/ghost",
                json!({"name": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_upserts_at_known_id() {
        let state = test_state();
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/collections/accounts/acct-1",
                json!({"name": "Acme"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.docs.list("accounts").len(), 1);
    }

    #[tokio::test]
    async fn mutations_push_snapshots_to_subscribers() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn_id = state.conn_manager.register(tx);
        state.conn_manager.subscribe(&conn_id, "accounts");

        let response = app(state)
            .oneshot(json_request(
                "POST",
                "/collections/accounts",
                json!({"name": "Acme", "industry": "Paper"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        match rx.try_recv().unwrap() {
            ServerMessage::Snapshot {
                collection,
                documents,
            } => {
                assert_eq!(collection, "accounts");
                assert_eq!(documents.len(), 1);
            }
            other => panic!("Expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_bearer_token_is_rejected_when_secret_set() {
        let mut state = test_state();
        state.config = Arc::new(Config {
            host: "127.0.0.1".into(),
            port: 0,
            auth_secret: Some("secret".into()),
        });

        let response = app(state)
            .oneshot(json_request(
                "POST",
                "/collections/accounts",
                json!({"name": "Acme"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
