use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{generate_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,      // Saved locally, not yet sent upstream
    Publishing, // Claimed by an in-flight publish
    Posted,     // Relayed to the Twitter Clone API
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Publishing => "publishing",
            DraftStatus::Posted => "posted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(DraftStatus::Draft),
            "publishing" => Some(DraftStatus::Publishing),
            "posted" => Some(DraftStatus::Posted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Id,
    pub user_id: Id,
    pub content: String,
    pub status: DraftStatus,
    pub external_tweet_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn new(user_id: Id, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            user_id,
            content,
            status: DraftStatus::Draft,
            external_tweet_id: None,
            created_at: now,
            updated_at: now,
            posted_at: None,
        }
    }

    pub fn is_posted(&self) -> bool {
        self.status == DraftStatus::Posted
    }

    /// Only plain drafts may be edited or published
    pub fn is_editable(&self) -> bool {
        self.status == DraftStatus::Draft
    }
}

/// Body of `POST /drafts` and `PUT /drafts/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct DraftContent {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftFilter {
    pub status: Option<DraftStatus>,
}
