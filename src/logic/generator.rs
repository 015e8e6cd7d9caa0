use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{GeneratorConfig, GeneratorMode};
use crate::model::MAX_TWEET_CHARS;

pub const PROMPT_TEMPLATE: &str = "Generate a short, engaging tweet about: {topic}";

pub const SIMULATED_TWEET_IDEAS: [&str; 10] = [
    "Exploring the latest in web development. What new tech are you excited about? #WebDev #Tech",
    "Just finished a great book on [topic]! Highly recommend it. 📖 #Reading",
    "The future of AI is fascinating. What ethical considerations should we prioritize?",
    "Enjoying a productive coding session. What's your secret to staying focused? #CodingLife",
    "Coffee break! ☕ What's your go-to beverage for creative thinking?",
    "Thinking about community building on social media. Any tips for engaging followers?",
    "If you could automate one daily task with AI, what would it be? #AI #Automation",
    "Beautiful day for learning! What new skill are you picking up? #LifelongLearning",
    "Reflecting on personal growth this year. What's one challenge you've overcome recently?",
    "Dreaming of new features for the AI Agent. What would make it even more helpful?",
];

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("LLM API key not configured")]
    NotConfigured,
    #[error("failed to reach the LLM provider: {0}")]
    Network(#[from] reqwest::Error),
    #[error("LLM provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("LLM provider returned no completion text")]
    EmptyCompletion,
}

pub fn render_prompt(topic: &str) -> String {
    PROMPT_TEMPLATE.replace("{topic}", topic)
}

#[async_trait::async_trait]
pub trait TweetGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<String, GeneratorError>;
}

/// Build the generator selected by configuration
pub fn build_generator(
    config: &GeneratorConfig,
) -> Result<Box<dyn TweetGenerator>, GeneratorError> {
    match config.mode {
        GeneratorMode::Simulated => Ok(Box::new(SimulatedGenerator::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        ))),
        GeneratorMode::Llm => Ok(Box::new(LlmGenerator::from_config(config)?)),
    }
}

/// Picks a canned idea after a random delay that mimics provider latency
pub struct SimulatedGenerator {
    min_delay: Duration,
    max_delay: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedGenerator {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self::with_rng(min_delay, max_delay, StdRng::from_entropy())
    }

    pub fn with_seed(min_delay: Duration, max_delay: Duration, seed: u64) -> Self {
        Self::with_rng(min_delay, max_delay, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min_delay: Duration, max_delay: Duration, rng: StdRng) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
            rng: Mutex::new(rng),
        }
    }

    fn pick(&self) -> (Duration, &'static str) {
        let mut rng = self.rng.lock();
        let delay = if self.min_delay == self.max_delay {
            self.min_delay
        } else {
            rng.gen_range(self.min_delay..=self.max_delay)
        };
        let idea = SIMULATED_TWEET_IDEAS[rng.gen_range(0..SIMULATED_TWEET_IDEAS.len())];
        (delay, idea)
    }
}

#[async_trait::async_trait]
impl TweetGenerator for SimulatedGenerator {
    async fn generate(&self, topic: &str) -> Result<String, GeneratorError> {
        log::info!("Using simulated generation for topic: '{}'", topic);
        let (delay, idea) = self.pick();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(idea.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Calls an OpenAI-compatible `chat/completions` endpoint
pub struct LlmGenerator {
    client: Client,
    base_url: String,
    /// Without a key every `generate` call fails with `NotConfigured`
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl LlmGenerator {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let api_key = config.llm_api_key.clone().filter(|key| !key.is_empty());
        if api_key.is_none() {
            log::warn!("LLM generator selected but no API key is set; /generate-tweet will fail");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.llm_model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl TweetGenerator for LlmGenerator {
    async fn generate(&self, topic: &str) -> Result<String, GeneratorError> {
        let api_key = self.api_key.as_deref().ok_or(GeneratorError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.base_url);
        log::info!("Requesting tweet from {} (model {})", url, self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(render_prompt(topic)),
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("LLM provider error: {} - {}", status, body);
            return Err(GeneratorError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| clean_completion(&text))
            .filter(|text| !text.is_empty())
            .ok_or(GeneratorError::EmptyCompletion)
    }
}

/// Trim whitespace and wrapping quotes, then cap at tweet length
pub fn clean_completion(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['"', '“', '\'']
        .iter()
        .find_map(|&open| {
            let close = if open == '“' { '”' } else { open };
            trimmed
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        })
        .unwrap_or(trimmed)
        .trim();
    unquoted.chars().take(MAX_TWEET_CHARS).collect()
}
