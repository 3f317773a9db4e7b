//! HTTP edge of parley: JWT auth, request validation, one route per core
//! operation, and change-event publication after each successful mutation.

pub mod auth;
pub mod channels;
pub mod conversations;
pub mod error;
pub mod files;
pub mod members;
pub mod messages;
pub mod middleware;
pub mod reactions;
pub mod state;
pub mod users;
pub mod validate;
pub mod workspaces;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

pub use error::ApiError;
pub use files::LocalBlobStore;
pub use state::{AppState, AppStateInner};

/// All REST routes. The WebSocket gateway is mounted by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/files/{storage_id}", get(files::download_file));

    let actor_routes = Router::new()
        .route(
            "/users/me",
            get(users::current_user).patch(users::update_profile),
        )
        .route(
            "/workspaces",
            get(workspaces::list_workspaces).post(workspaces::create_workspace),
        )
        .route(
            "/workspaces/{id}",
            get(workspaces::get_workspace)
                .patch(workspaces::rename_workspace)
                .delete(workspaces::remove_workspace),
        )
        .route("/workspaces/{id}/info", get(workspaces::workspace_info))
        .route("/workspaces/{id}/join", post(workspaces::join_workspace))
        .route("/workspaces/{id}/join-code", post(workspaces::rotate_join_code))
        .route("/workspaces/{id}/members", get(members::list_members))
        .route("/workspaces/{id}/members/me", get(members::current_member))
        .route(
            "/workspaces/{id}/channels",
            get(channels::list_channels).post(channels::create_channel),
        )
        .route(
            "/workspaces/{id}/conversations",
            post(conversations::open_conversation),
        )
        .route(
            "/members/{id}",
            get(members::get_member)
                .patch(members::update_member)
                .delete(members::remove_member),
        )
        .route(
            "/channels/{id}",
            get(channels::get_channel)
                .patch(channels::rename_channel)
                .delete(channels::remove_channel),
        )
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/messages/{id}",
            get(messages::get_message)
                .patch(messages::update_message)
                .delete(messages::remove_message),
        )
        .route("/messages/{id}/reactions", post(reactions::toggle_reaction))
        .route("/upload-url", post(files::upload_url))
        .route(
            "/files",
            post(files::upload_file).layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE)),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_actor,
        ));

    Router::new()
        .merge(public_routes)
        .merge(actor_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use parley_core::Core;
    use parley_db::Database;
    use parley_gateway::Dispatcher;
    use parley_types::events::GatewayEvent;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    struct TestApp {
        router: Router,
        dispatcher: Dispatcher,
    }

    fn app() -> TestApp {
        let upload_dir = std::env::temp_dir().join(format!("parley-api-{}", Uuid::new_v4()));
        let blobs = Arc::new(LocalBlobStore::new(upload_dir, "http://localhost:3000"));
        let db = Arc::new(Database::open_in_memory().unwrap());
        let core = Arc::new(Core::new(db, blobs.clone()));
        let dispatcher = Dispatcher::new();

        let state = Arc::new(AppStateInner {
            core,
            dispatcher: dispatcher.clone(),
            blobs,
            jwt_secret: "test-secret".into(),
        });
        TestApp {
            router: router(state),
            dispatcher,
        }
    }

    impl TestApp {
        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let req = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn register(&self, name: &str) -> String {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/auth/register",
                    None,
                    Some(json!({
                        "name": name,
                        "email": format!("{}@example.com", name.to_lowercase()),
                        "password": "correct horse",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn register_login_and_profile() {
        let app = app();
        let token = app.register("Ana").await;

        let (status, me) = app.call(Method::GET, "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["name"], "Ana");
        assert_eq!(me["email"], "ana@example.com");

        let (status, body) = app
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "ANA@example.com", "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ana");

        let (status, body) = app
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "ana@example.com", "password": "wrong horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = app
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": "Ana2", "email": "ana@example.com", "password": "whatever1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn anonymous_and_forged_callers() {
        let app = app();

        let (status, body) = app.call(Method::GET, "/workspaces", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = app
            .call(Method::POST, "/workspaces", None, Some(json!({ "name": "Acme" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call(Method::GET, "/workspaces", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_names_are_rejected_at_the_edge() {
        let app = app();
        let token = app.register("Ana").await;

        let (status, body) = app
            .call(Method::POST, "/workspaces", Some(&token), Some(json!({ "name": "ab" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("3 to 80"));
    }

    #[tokio::test]
    async fn workspace_channel_message_reaction_flow() {
        let app = app();
        let mut events = app.dispatcher.subscribe();
        let ana = app.register("Ana").await;
        let ben = app.register("Ben").await;

        let (status, created) = app
            .call(Method::POST, "/workspaces", Some(&ana), Some(json!({ "name": "Acme" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let ws = created["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .call(
                Method::POST,
                &format!("/workspaces/{}/channels", ws),
                Some(&ana),
                Some(json!({ "name": " Team Updates " })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, channels) = app
            .call(Method::GET, &format!("/workspaces/{}/channels", ws), Some(&ana), None)
            .await;
        let names: Vec<&str> = channels
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"general"));
        assert!(names.contains(&"team-updates"));
        let general = channels
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == "general")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, _) = app
            .call(Method::GET, &format!("/workspaces/{}/channels", ws), Some(&ben), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, workspace) = app
            .call(Method::GET, &format!("/workspaces/{}", ws), Some(&ana), None)
            .await;
        let join_code = workspace["join_code"].as_str().unwrap().to_string();

        let join = json!({ "join_code": join_code });
        let (status, _) = app
            .call(
                Method::POST,
                &format!("/workspaces/{}/join", ws),
                Some(&ben),
                Some(join.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app
            .call(Method::POST, &format!("/workspaces/{}/join", ws), Some(&ben), Some(join))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, posted) = app
            .call(
                Method::POST,
                "/messages",
                Some(&ben),
                Some(json!({ "workspace_id": ws, "channel_id": general, "body": "hello" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let message_id = posted["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .call(
                Method::POST,
                &format!("/messages/{}/reactions", message_id),
                Some(&ana),
                Some(json!({ "value": "👍" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, page) = app
            .call(
                Method::GET,
                &format!("/messages?channel_id={}&limit=10", general),
                Some(&ana),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["status"], "Exhausted");
        let message = &page["page"][0];
        assert_eq!(message["body"], "hello");
        assert_eq!(message["user"]["name"], "Ben");
        assert_eq!(message["reactions"][0]["value"], "👍");
        assert_eq!(message["reactions"][0]["count"], 1);

        let (status, _) = app
            .call(
                Method::GET,
                &format!("/messages?channel_id={}&cursor=%21%21", general),
                Some(&ana),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut saw_message = false;
        while let Ok(event) = events.try_recv() {
            if let GatewayEvent::MessageCreated { message_id: id, .. } = event {
                saw_message = id.to_string() == message_id;
            }
        }
        assert!(saw_message);
    }

    #[tokio::test]
    async fn uploads_are_served_back() {
        let app = app();
        let token = app.register("Ana").await;

        let (status, body) = app.call(Method::POST, "/upload-url", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "http://localhost:3000/files");

        let req = Request::builder()
            .method(Method::POST)
            .uri("/files")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(vec![1u8, 2, 3]))
            .unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
        let storage_id = uploaded["storage_id"].as_str().unwrap();

        let req = Request::builder()
            .uri(format!("/files/{}", storage_id))
            .body(Body::empty())
            .unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &[1, 2, 3]);

        let (status, _) = app.call(Method::GET, "/files/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn message_images_must_be_uploaded() {
        let app = app();
        let ana = app.register("Ana").await;
        let (_, created) = app
            .call(Method::POST, "/workspaces", Some(&ana), Some(json!({ "name": "Acme" })))
            .await;
        let ws = created["id"].as_str().unwrap().to_string();
        let (_, channels) = app
            .call(Method::GET, &format!("/workspaces/{}/channels", ws), Some(&ana), None)
            .await;
        let general = channels[0]["id"].as_str().unwrap().to_string();

        for image in [Uuid::new_v4().to_string(), "../etc/passwd".to_string()] {
            let (status, body) = app
                .call(
                    Method::POST,
                    "/messages",
                    Some(&ana),
                    Some(json!({ "workspace_id": ws, "channel_id": general, "body": "", "image": image })),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", image);
            assert_eq!(body["error"], "Invalid input: image must reference an uploaded file");
        }

        let req = Request::builder()
            .method(Method::POST)
            .uri("/files")
            .header(header::AUTHORIZATION, format!("Bearer {}", ana))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(vec![7u8; 16]))
            .unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let uploaded: Value = serde_json::from_slice(&bytes).unwrap();

        let (status, _) = app
            .call(
                Method::POST,
                "/messages",
                Some(&ana),
                Some(json!({
                    "workspace_id": ws,
                    "channel_id": general,
                    "body": "",
                    "image": uploaded["storage_id"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
