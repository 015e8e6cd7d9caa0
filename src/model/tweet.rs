use serde::{Deserialize, Serialize};

/// Body of `POST /proxy-post-tweet`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTweetRequest {
    pub content: String,
}

/// A tweet as returned to the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub username: String,
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub retweets: i64,
    pub id: Option<i64>,
}

/// Payload sent to the Twitter Clone `/post_tweet` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ExternalPostPayload<'a> {
    pub username: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub tweet_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaResponse {
    pub idea: String,
}
