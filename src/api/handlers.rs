use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::api::auth_extractor::AuthUser;
use crate::api::error::{
    api_error, generator_error, internal, unprocessable, upstream_error, ApiError,
};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::logic::{filter_user_tweets, hash_token, issue_token};
use crate::model::{
    validate_tweet_content, validate_username, IdeaResponse, MessageResponse, PostTweetRequest,
    RegisterRequest, RegisterResponse, Tweet, User,
};
use crate::store::Store;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

/// Confirms the backend is up
pub async fn read_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello from the tweet proxy backend!".to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Relay a tweet to the Twitter Clone API
pub async fn proxy_post_tweet<S: Store + 'static>(
    State(state): State<AppState<S>>,
    ApiJson(request): ApiJson<PostTweetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_tweet_content(&request.content).map_err(|e| unprocessable(&e))?;

    let outcome = state
        .twitter
        .post_tweet(&request.content)
        .await
        .map_err(upstream_error)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: outcome.message,
            tweet_id: outcome.tweet_id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub topic: Option<String>,
}

/// Produce a tweet idea with the configured generator
pub async fn generate_tweet<S: Store + 'static>(
    State(state): State<AppState<S>>,
    ApiQuery(query): ApiQuery<GenerateQuery>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let topic = query
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(state.default_topic.as_str());

    let idea = state
        .generator
        .generate(topic)
        .await
        .map_err(generator_error)?;

    Ok(Json(IdeaResponse { idea }))
}

/// Fetch every upstream tweet and keep the configured account's, newest first
pub async fn get_user_tweets<S: Store + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Tweet>>, ApiError> {
    let records = state.twitter.list_tweets().await.map_err(upstream_error)?;
    let username = state.twitter.username();

    let tweets = filter_user_tweets(&records, username);
    log::info!(
        "Found {} of {} tweets for '{}' after filtering",
        tweets.len(),
        records.len(),
        username
    );

    Ok(Json(tweets))
}

/// Create a user and hand back its bearer token (shown only once)
pub async fn register<S: Store + 'static>(
    State(state): State<AppState<S>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let username = request.username.trim().to_string();
    validate_username(&username).map_err(|e| unprocessable(&e))?;

    let token = issue_token();
    let created = state
        .store
        .create_user(User::new(username.clone()), &hash_token(&token))
        .await
        .map_err(internal)?;

    match created {
        Some(user) => {
            log::info!("Registered user '{}'", user.username);
            Ok((StatusCode::CREATED, Json(RegisterResponse { user, token })))
        }
        None => Err(api_error(
            StatusCode::CONFLICT,
            &format!("Username '{}' is already taken", username),
        )),
    }
}

pub async fn current_user(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
