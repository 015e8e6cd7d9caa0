//! Drives the real router over HTTP against a fake Twitter Clone API and a
//! fake OpenAI-compatible LLM endpoint, both served locally by axum.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use tweet_proxy::api::{create_router, ServiceState};
use tweet_proxy::config::{AppConfig, GeneratorConfig, GeneratorMode};
use tweet_proxy::logic::{LlmGenerator, TweetGenerator};
use tweet_proxy::MemoryStore;

const API_KEY: &str = "alice_s3cret";

#[derive(Default)]
struct FakeUpstream {
    posts: Mutex<Vec<Value>>,
}

async fn fake_post_tweet(
    State(fake): State<Arc<FakeUpstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    if body["text"] == "fail" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if body["text"] == "slow" {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    fake.posts.lock().push(body);
    Json(json!({ "message": "Tweet posted", "tweet_id": 123 })).into_response()
}

async fn fake_list_tweets(headers: HeaderMap) -> Response {
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    Json(json!({
        "data": [
            { "username": "alice", "text": "older", "timestamp": "2024-01-01T08:00:00Z", "id": 1 },
            { "username": "bob", "text": "not mine", "timestamp": "2024-01-02T08:00:00Z", "id": 2 },
            { "username": "alice", "content": "newest", "timestamp": "2024-03-01T08:00:00Z", "likes": 4, "id": 3 },
            "malformed",
            { "username": "alice", "text": "no timestamp" },
            { "username": "alice", "timestamp": "2024-02-01T08:00:00Z", "retweets": 2 }
        ]
    }))
    .into_response()
}

async fn fake_chat_completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer llm-key") {
        return (StatusCode::UNAUTHORIZED, "bad llm key").into_response();
    }
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [
            { "message": { "role": "assistant", "content": format!("  \"Echo: {}\"  ", prompt) } }
        ]
    }))
    .into_response()
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn spawn_fake_upstream() -> (SocketAddr, Arc<FakeUpstream>) {
    let fake = Arc::new(FakeUpstream::default());
    let app = Router::new()
        .route("/post_tweet", post(fake_post_tweet))
        .route("/tweets", get(fake_list_tweets))
        .route("/chat/completions", post(fake_chat_completions))
        .with_state(fake.clone());
    (spawn(app).await, fake)
}

fn test_config(upstream: SocketAddr, api_key: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.twitter_clone.base_url = format!("http://{}", upstream);
    config.twitter_clone.api_key = Some(api_key.to_string());
    config.generator.min_delay_ms = 0;
    config.generator.max_delay_ms = 0;
    config.rate_limit.trust_forwarded_for = false;
    config
}

async fn spawn_proxy(config: &AppConfig) -> String {
    let state = ServiceState::from_config(Arc::new(MemoryStore::new()), config).unwrap();
    let addr = spawn(create_router(Arc::new(state))).await;
    format!("http://{}", addr)
}

async fn register_writer(client: &Client, base: &str) -> String {
    let registered: Value = client
        .post(format!("{}/auth/register", base))
        .json(&json!({ "username": "writer" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    registered["token"].as_str().unwrap().to_string()
}

async fn create_draft(client: &Client, base: &str, token: &str, content: &str) -> String {
    let draft: Value = client
        .post(format!("{}/drafts", base))
        .bearer_auth(token)
        .json(&json!({ "content": content }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    draft["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_post_tweet_is_relayed_with_derived_username() {
    let (upstream, fake) = spawn_fake_upstream().await;
    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;

    let response = Client::new()
        .post(format!("{}/proxy-post-tweet", base))
        .json(&json!({ "content": "Hello, world" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Tweet posted", "tweet_id": "123" }));

    let posts = fake.posts.lock().clone();
    assert_eq!(posts, vec![json!({ "username": "alice", "text": "Hello, world" })]);
}

#[tokio::test]
async fn test_upstream_status_is_passed_through() {
    let (upstream, _) = spawn_fake_upstream().await;
    let client = Client::new();

    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;
    let response = client
        .post(format!("{}/proxy-post-tweet", base))
        .json(&json!({ "content": "fail" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "External API error: boom");

    let bad_key = spawn_proxy(&test_config(upstream, "alice_wrong")).await;
    let response = client
        .get(format!("{}/tweets", bad_key))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "External API error: invalid api key");
}

#[tokio::test]
async fn test_unreachable_upstream_is_503() {
    // Grab a free port and release it so nothing is listening there
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let base = spawn_proxy(&test_config(closed, API_KEY)).await;

    let response = Client::new()
        .get(format!("{}/tweets", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to connect to external tweet service"));
}

#[tokio::test]
async fn test_tweets_filtered_and_sorted_newest_first() {
    let (upstream, _) = spawn_fake_upstream().await;
    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;

    let tweets: Vec<Value> = Client::new()
        .get(format!("{}/tweets", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let texts: Vec<&str> = tweets.iter().map(|t| t["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["newest", "No content provided", "older"]);
    assert_eq!(tweets[0]["likes"], 4);
    assert_eq!(tweets[0]["retweets"], 0);
    assert_eq!(tweets[1]["id"], Value::Null);
    assert!(tweets.iter().all(|t| t["username"] == "alice"));
}

#[tokio::test]
async fn test_publish_draft_marks_it_posted() {
    let (upstream, fake) = spawn_fake_upstream().await;
    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;
    let client = Client::new();

    let token = register_writer(&client, &base).await;
    let draft_id = create_draft(&client, &base, &token, "drafted tweet").await;
    let publish_url = format!("{}/drafts/{}/publish", base, draft_id);

    let response = client
        .post(&publish_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let published: Value = response.json().await.unwrap();
    assert_eq!(published["tweet_id"], "123");
    assert_eq!(published["draft"]["status"], "posted");
    assert_eq!(published["draft"]["external_tweet_id"], "123");
    assert_eq!(fake.posts.lock().len(), 1);

    let again = client
        .post(&publish_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);
    assert_eq!(fake.posts.lock().len(), 1);

    let edit = client
        .put(format!("{}/drafts/{}", base, draft_id))
        .bearer_auth(&token)
        .json(&json!({ "content": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_concurrent_publishes_post_once() {
    let (upstream, fake) = spawn_fake_upstream().await;
    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;
    let client = Client::new();

    let token = register_writer(&client, &base).await;
    let draft_id = create_draft(&client, &base, &token, "slow").await;
    let publish_url = format!("{}/drafts/{}/publish", base, draft_id);

    let publish = || client.post(&publish_url).bearer_auth(&token).send();
    let (first, second) = tokio::join!(publish(), publish());
    let mut statuses = vec![
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort_unstable();

    // One publish wins, the other sees the draft already claimed
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(fake.posts.lock().len(), 1);

    let draft: Value = client
        .get(format!("{}/drafts/{}", base, draft_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(draft["status"], "posted");
}

#[tokio::test]
async fn test_failed_publish_leaves_draft_editable() {
    let (upstream, fake) = spawn_fake_upstream().await;
    let base = spawn_proxy(&test_config(upstream, API_KEY)).await;
    let client = Client::new();

    let token = register_writer(&client, &base).await;
    let draft_id = create_draft(&client, &base, &token, "fail").await;
    let draft_url = format!("{}/drafts/{}", base, draft_id);

    let response = client
        .post(format!("{}/publish", draft_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(fake.posts.lock().is_empty());

    let draft: Value = client
        .get(&draft_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(draft["status"], "draft");

    let edit = client
        .put(&draft_url)
        .bearer_auth(&token)
        .json(&json!({ "content": "second try" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status(), reqwest::StatusCode::OK);

    let response = client
        .post(format!("{}/publish", draft_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(fake.posts.lock().len(), 1);
}

#[tokio::test]
async fn test_llm_generator_against_compatible_endpoint() {
    let (upstream, _) = spawn_fake_upstream().await;
    let generator = LlmGenerator::from_config(&GeneratorConfig {
        mode: GeneratorMode::Llm,
        llm_base_url: format!("http://{}/", upstream),
        llm_api_key: Some("llm-key".to_string()),
        ..Default::default()
    })
    .unwrap();

    let tweet = generator.generate("rust").await.unwrap();
    assert_eq!(tweet, "Echo: Generate a short, engaging tweet about: rust");
}

#[tokio::test]
async fn test_llm_errors_surface_as_bad_gateway() {
    let (upstream, _) = spawn_fake_upstream().await;
    let mut config = test_config(upstream, API_KEY);
    config.generator.mode = GeneratorMode::Llm;
    config.generator.llm_base_url = format!("http://{}", upstream);
    config.generator.llm_api_key = Some("wrong-key".to_string());
    let base = spawn_proxy(&config).await;

    let response = Client::new()
        .get(format!("{}/generate-tweet", base))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
}
