use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;

use crate::api::auth_extractor::AuthUser;
use crate::api::error::{api_error, internal, not_found, unprocessable, upstream_error, ApiError};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::model::{validate_tweet_content, Draft, DraftContent, DraftFilter, Id};
use crate::store::Store;

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub message: String,
    pub tweet_id: Option<String>,
    pub draft: Draft,
}

fn already_posted() -> ApiError {
    api_error(StatusCode::CONFLICT, "Draft has already been posted")
}

fn not_editable(draft: &Draft) -> ApiError {
    if draft.is_posted() {
        already_posted()
    } else {
        api_error(StatusCode::CONFLICT, "Draft is being published")
    }
}

pub async fn list_drafts<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    ApiQuery(filter): ApiQuery<DraftFilter>,
) -> Result<Json<ListResponse<Draft>>, ApiError> {
    let items = state
        .store
        .list_drafts(&user.id, &filter)
        .await
        .map_err(internal)?;
    let total = items.len();
    Ok(Json(ListResponse { items, total }))
}

pub async fn create_draft<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<DraftContent>,
) -> Result<(StatusCode, Json<Draft>), ApiError> {
    validate_tweet_content(&body.content).map_err(|e| unprocessable(&e))?;

    let draft = state
        .store
        .create_draft(Draft::new(user.id, body.content))
        .await
        .map_err(internal)?;

    Ok((StatusCode::CREATED, Json(draft)))
}

pub async fn get_draft<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id>,
) -> Result<Json<Draft>, ApiError> {
    let draft = load_draft(&state, &user.id, &id).await?;
    Ok(Json(draft))
}

pub async fn update_draft<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<DraftContent>,
) -> Result<Json<Draft>, ApiError> {
    validate_tweet_content(&body.content).map_err(|e| unprocessable(&e))?;

    let draft = load_draft(&state, &user.id, &id).await?;
    if !draft.is_editable() {
        return Err(not_editable(&draft));
    }

    state
        .store
        .update_draft_content(&user.id, &id, &body.content)
        .await
        .map_err(internal)?
        .map(Json)
        // Claimed or posted between the check and the update
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "Draft is no longer editable"))
}

pub async fn delete_draft<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete_draft(&user.id, &id)
        .await
        .map_err(internal)?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Draft"))
    }
}

/// Send a draft upstream and record the resulting tweet id.
///
/// The draft is claimed (`draft` -> `publishing`) before the upstream call so
/// concurrent publishes of the same draft post at most once.
pub async fn publish_draft<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id>,
) -> Result<Json<PublishResponse>, ApiError> {
    let draft = load_draft(&state, &user.id, &id).await?;
    if !draft.is_editable() {
        return Err(not_editable(&draft));
    }

    let draft = state
        .store
        .claim_for_publish(&user.id, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "Draft is being published"))?;

    let outcome = match state.twitter.post_tweet(&draft.content).await {
        Ok(outcome) => outcome,
        Err(e) => {
            match state.store.release_publish(&user.id, &id).await {
                Ok(true) => {}
                Ok(false) => log::warn!("Draft {} was not in publishing state on release", id),
                Err(release) => log::error!("Failed to release draft {}: {:#}", id, release),
            }
            return Err(upstream_error(e));
        }
    };

    let draft = state
        .store
        .mark_posted(&user.id, &id, outcome.tweet_id.clone())
        .await
        .map_err(internal)?
        .ok_or_else(already_posted)?;

    log::info!("Published draft {} for '{}'", draft.id, user.username);

    Ok(Json(PublishResponse {
        message: outcome.message,
        tweet_id: outcome.tweet_id,
        draft,
    }))
}

async fn load_draft<S: Store>(state: &AppState<S>, user_id: &Id, id: &Id) -> Result<Draft, ApiError> {
    state
        .store
        .get_draft(user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Draft"))
}
