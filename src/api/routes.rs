use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::api::state::AppState;
use crate::api::{draft_handlers, handlers, rate_limit};
use crate::config::CorsConfig;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>(state: AppState<S>) -> Router {
    // Routes that reach the upstream API or the LLM are rate limited per client IP
    let limited: Router<AppState<S>> = Router::new()
        .route("/proxy-post-tweet", post(handlers::proxy_post_tweet::<S>))
        .route("/generate-tweet", get(handlers::generate_tweet::<S>))
        .route(
            "/drafts/:id/publish",
            post(draft_handlers::publish_draft::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce_rate_limit::<S>,
        ));

    Router::<AppState<S>>::new()
        .route("/", get(handlers::read_root))
        .route("/health", get(handlers::health_check))
        .route("/tweets", get(handlers::get_user_tweets::<S>))
        // Auth
        .route("/auth/register", post(handlers::register::<S>))
        .route("/auth/me", get(handlers::current_user))
        // Drafts
        .route(
            "/drafts",
            get(draft_handlers::list_drafts::<S>).post(draft_handlers::create_draft::<S>),
        )
        .route(
            "/drafts/:id",
            get(draft_handlers::get_draft::<S>)
                .put(draft_handlers::update_draft::<S>)
                .delete(draft_handlers::delete_draft::<S>),
        )
        .merge(limited)
        .layer(cors_layer(&state.cors))
        .with_state(state)
}

/// Credentialed CORS for the configured frontend origins
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::RETRY_AFTER])
}
