//! End-to-end State document API over a real listener.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use xapi_endpoint::params::XapiTypeValidator;
use xapi_endpoint::resources::DocumentResource;

mod common;

const ACTIVITY: &str = "http://example.com/activities/course-1";
const AGENT: &str = r#"{"objectType":"Agent","mbox":"mailto:learner@example.com"}"#;

struct Api {
    client: Client,
    url: String,
}

impl Api {
    fn new(addr: SocketAddr) -> Self {
        Self {
            client: Client::new(),
            url: format!("http://{}/data/xAPI/activities/state", addr),
        }
    }

    fn request(&self, method: reqwest::Method, state_id: Option<&str>) -> RequestBuilder {
        let mut query = vec![("activityId", ACTIVITY), ("agent", AGENT)];
        if let Some(id) = state_id {
            query.push(("stateId", id));
        }
        self.client
            .request(method, &self.url)
            .query(&query)
            .header("X-Experience-API-Version", "1.0.3")
    }
}

async fn start() -> (Api, Arc<DocumentResource>, xapi_endpoint::Shutdown) {
    let resource = Arc::new(DocumentResource::new("stateId", Arc::new(XapiTypeValidator)));
    let (addr, shutdown) = common::spawn_server("/activities/state", resource.clone()).await;
    (Api::new(addr), resource, shutdown)
}

#[tokio::test]
async fn test_missing_version_header_is_rejected() {
    let (api, _, shutdown) = start().await;

    let response = api
        .client
        .get(&api.url)
        .query(&[("activityId", ACTIVITY), ("agent", AGENT)])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("This is not an accepted version of xAPI."));
    assert_eq!(body["success"], json!(false));

    shutdown.trigger();
}

#[tokio::test]
async fn test_document_lifecycle() {
    let (api, resource, shutdown) = start().await;

    let response = api
        .request(reqwest::Method::PUT, Some("bookmark"))
        .header("content-type", "application/json")
        .body(r#"{"page":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Second blind PUT collides with the stored document.
    let response = api
        .request(reqwest::Method::PUT, Some("bookmark"))
        .body(r#"{"page":2}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = api
        .request(reqwest::Method::GET, Some("bookmark"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let etag = response.headers()["etag"].to_str().unwrap().to_string();
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"page": 1}));

    let response = api
        .request(reqwest::Method::PUT, Some("bookmark"))
        .header("if-match", "\"stale\"")
        .body(r#"{"page":2}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    let response = api
        .request(reqwest::Method::POST, Some("bookmark"))
        .header("if-match", etag.as_str())
        .header("content-type", "application/json")
        .body(r#"{"chapter":4}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let merged: Value = api
        .request(reqwest::Method::GET, Some("bookmark"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(merged, json!({"page": 1, "chapter": 4}));

    let ids: Value = api
        .request(reqwest::Method::GET, None)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids, json!(["bookmark"]));

    let response = api
        .request(reqwest::Method::DELETE, Some("bookmark"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(resource.is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn test_alternate_syntax_post_with_method_override() {
    let (api, resource, shutdown) = start().await;

    let response = api
        .client
        .post(format!("{}?method=PUT", api.url))
        .form(&[
            ("activityId", ACTIVITY),
            ("agent", AGENT),
            ("stateId", "progress"),
            ("content", r#"{"done":true}"#),
        ])
        .header("X-Experience-API-Version", "1.0.3")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(resource.len(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_agent_lists_validation_errors() {
    let (api, _, shutdown) = start().await;

    let response = api
        .client
        .get(&api.url)
        .query(&[("activityId", ACTIVITY), ("agent", r#"{"name":"anonymous"}"#)])
        .header("X-Experience-API-Version", "1.0.3")
        .header("origin", "https://lms.example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://lms.example.org"
    );
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_array());
    assert!(body.get("trace").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn test_failures_fall_back_to_base_url_origin() {
    let (api, _, shutdown) = start().await;

    let response = api
        .request(reqwest::Method::GET, Some("absent"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let origin = response.headers()["access-control-allow-origin"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(api.url.starts_with(&origin));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("No document found - absent"));
    assert!(body["trace"].is_string());

    shutdown.trigger();
}
