use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, CorsConfig};
use crate::logic::{build_generator, FixedWindowLimiter, TweetGenerator};
use crate::upstream::TwitterCloneClient;

/// Everything a handler needs, shared across requests
pub struct ServiceState<S> {
    pub store: Arc<S>,
    pub twitter: TwitterCloneClient,
    pub generator: Arc<dyn TweetGenerator>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub default_topic: String,
    pub trust_forwarded_for: bool,
    pub cors: CorsConfig,
}

pub type AppState<S> = Arc<ServiceState<S>>;

impl<S> ServiceState<S> {
    pub fn from_config(store: Arc<S>, config: &AppConfig) -> anyhow::Result<Self> {
        let twitter = TwitterCloneClient::new(&config.twitter_clone)?;
        let generator: Arc<dyn TweetGenerator> = build_generator(&config.generator)?.into();
        let limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        ));

        Ok(Self {
            store,
            twitter,
            generator,
            limiter,
            default_topic: config.generator.default_topic.clone(),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            cors: config.cors.clone(),
        })
    }
}
