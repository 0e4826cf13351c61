use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use cdp_cloud::coolify::{
    ApplicationPatch, CoolifyClient, CreateDockerImageRequest, normalize_base_url,
};
use cdp_cloud::{ApiError, ControlPlane};
use secrecy::SecretString;
use serde_json::{Value, json};

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn client(base: &str) -> CoolifyClient {
    CoolifyClient::new(base, SecretString::from("tok-123")).unwrap()
}

// ── URL Tests ──

#[test]
fn base_url_gets_api_prefix() {
    assert_eq!(
        normalize_base_url("https://coolify.example.com"),
        "https://coolify.example.com/api/v1"
    );
    assert_eq!(
        normalize_base_url(" https://coolify.example.com/ "),
        "https://coolify.example.com/api/v1"
    );
    assert_eq!(
        normalize_base_url("https://coolify.example.com/api/v1/"),
        "https://coolify.example.com/api/v1"
    );
}

// ── Request Tests ──

#[tokio::test]
async fn version_strips_quotes() {
    let router = Router::new().route("/api/v1/version", get(|| async { "\"4.0.0-beta.400\"\n" }));
    let base = serve(router).await;

    assert_eq!(client(&base).version().await.unwrap(), "4.0.0-beta.400");
}

#[tokio::test]
async fn requests_carry_bearer_token() {
    let router = Router::new().route(
        "/api/v1/servers",
        get(|headers: HeaderMap| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            if auth == "Bearer tok-123" {
                (StatusCode::OK, Json(json!([{ "uuid": "srv-1", "name": "localhost", "ip": null }])))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated." })))
            }
        }),
    );
    let base = serve(router).await;

    let servers = client(&base).list_servers().await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].uuid, "srv-1");
    assert_eq!(servers[0].ip, "");
}

#[tokio::test]
async fn unauthorized_is_classified() {
    let router = Router::new().route(
        "/api/v1/version",
        get(|| async { (StatusCode::UNAUTHORIZED, "Unauthenticated.") }),
    );
    let base = serve(router).await;

    let err = client(&base).version().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!err.is_transport());
}

#[tokio::test]
async fn duplicate_environment_is_conflict() {
    let router = Router::new().route(
        "/api/v1/projects/{uuid}/environments",
        post(|| async {
            (
                StatusCode::CONFLICT,
                Json(json!({ "message": "Environment with this name already exists." })),
            )
        }),
    );
    let base = serve(router).await;

    let err = client(&base)
        .create_environment("proj-1", "production")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn missing_application_is_not_found() {
    let router = Router::new().route(
        "/api/v1/applications/{uuid}",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found." }))) }),
    );
    let base = serve(router).await;

    let err = client(&base).get_application("gone").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn project_environments_match_case_insensitively() {
    let router = Router::new().route(
        "/api/v1/projects/{uuid}",
        get(|| async {
            Json(json!({
                "uuid": "proj-1",
                "name": "site",
                "description": null,
                "environments": [
                    { "uuid": "env-1", "name": "Production" },
                    { "uuid": "env-2", "name": "staging" }
                ]
            }))
        }),
    );
    let base = serve(router).await;

    let project = client(&base).get_project("proj-1").await.unwrap();
    assert_eq!(project.environment("production").unwrap().uuid, "env-1");
    assert!(project.environment("preview").is_none());
}

// ── Deployment Tests ──

#[tokio::test]
async fn deployment_list_accepts_bare_array() {
    let router = Router::new().route(
        "/api/v1/deployments/applications/{uuid}",
        get(|| async {
            Json(json!([
                { "deployment_uuid": "dep-2", "status": "in_progress", "commit": null },
                { "uuid": "dep-1", "status": "finished" }
            ]))
        }),
    );
    let base = serve(router).await;

    let deployments = client(&base).list_deployments("app-1").await.unwrap();
    assert_eq!(deployments.len(), 2);
    assert_eq!(deployments[0].canonical_uuid(), "dep-2");
    assert_eq!(deployments[1].canonical_uuid(), "dep-1");
}

#[tokio::test]
async fn deployment_list_accepts_wrapped_form() {
    let router = Router::new().route(
        "/api/v1/deployments/applications/{uuid}",
        get(|| async {
            Json(json!({
                "count": 1,
                "deployments": [{ "deployment_uuid": "dep-9", "status": "queued" }]
            }))
        }),
    );
    let base = serve(router).await;

    let deployments = client(&base).list_deployments("app-1").await.unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].status, "queued");
}

#[tokio::test]
async fn deployment_detail_tolerates_nulls() {
    let router = Router::new().route(
        "/api/v1/deployments/{uuid}",
        get(|| async { Json(json!({ "status": "running", "logs": null })) }),
    );
    let base = serve(router).await;

    let detail = client(&base).get_deployment("dep-1").await.unwrap();
    assert_eq!(detail.status, "running");
    assert_eq!(detail.logs, "");
}

#[tokio::test]
async fn deploy_sends_query_parameters() {
    let router = Router::new().route(
        "/api/v1/deploy",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let expected = params.get("uuid").map(String::as_str) == Some("app-1")
                && params.get("force").map(String::as_str) == Some("false")
                && params.get("pr").map(String::as_str) == Some("0");
            if expected {
                (
                    StatusCode::OK,
                    Json(json!({
                        "deployments": [{
                            "message": "Application queued.",
                            "resource_uuid": "app-1",
                            "deployment_uuid": "dep-1"
                        }]
                    })),
                )
            } else {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": "bad query" })))
            }
        }),
    );
    let base = serve(router).await;

    let triggers = client(&base).deploy("app-1", false, 0).await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].deployment_uuid, "dep-1");
}

// ── Application Tests ──

#[tokio::test]
async fn docker_image_application_is_not_deployed_instantly() {
    let router = Router::new().route(
        "/api/v1/applications/dockerimage",
        post(|Json(body): Json<Value>| async move {
            let ok = body["instant_deploy"] == json!(false)
                && body["docker_registry_image_tag"] == json!("production-1")
                && body.get("domains").is_none();
            if ok {
                (StatusCode::CREATED, Json(json!({ "uuid": "app-7" })))
            } else {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": "bad body" })))
            }
        }),
    );
    let base = serve(router).await;

    let request = CreateDockerImageRequest {
        project_uuid: "proj-1".to_owned(),
        server_uuid: "srv-1".to_owned(),
        environment_uuid: "env-1".to_owned(),
        name: "api".to_owned(),
        docker_registry_image_name: "ghcr.io/me/api".to_owned(),
        docker_registry_image_tag: "production-1".to_owned(),
        ports_exposes: "3000".to_owned(),
        domains: String::new(),
        instant_deploy: false,
    };
    let created = client(&base)
        .create_docker_image_application(&request)
        .await
        .unwrap();
    assert_eq!(created.uuid, "app-7");
}

#[tokio::test]
async fn patch_sends_only_set_fields() {
    let router = Router::new().route(
        "/api/v1/applications/{uuid}",
        patch(|Json(body): Json<Value>| async move {
            if body == json!({ "docker_registry_image_tag": "production-2" }) {
                (StatusCode::OK, Json(json!({ "uuid": "app-7" })))
            } else {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": "bad body" })))
            }
        }),
    );
    let base = serve(router).await;

    let patch = ApplicationPatch {
        docker_registry_image_tag: Some("production-2".to_owned()),
        ..ApplicationPatch::default()
    };
    client(&base).update_application("app-7", &patch).await.unwrap();
}

// ── Failure Tests ──

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let router = Router::new().route("/api/v1/projects", get(|| async { "<html>oops</html>" }));
    let base = serve(router).await;

    let err = client(&base).list_projects().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn closed_port_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).version().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), None);
}
