use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;

use crate::model::{Draft, DraftFilter, DraftStatus, Id, User};
use crate::store::traits::{DraftStore, UserStore};

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<Id, User>,
    /// token digest -> user id
    tokens: HashMap<String, Id>,
}

/// Process-local store used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    drafts: RwLock<HashMap<Id, Draft>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: User, token_hash: &str) -> Result<Option<User>> {
        let mut users = self.users.write();
        if users.by_id.values().any(|u| u.username == user.username) {
            return Ok(None);
        }
        users.tokens.insert(token_hash.to_string(), user.id.clone());
        users.by_id.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        let users = self.users.read();
        Ok(users
            .tokens
            .get(token_hash)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read();
        Ok(users.by_id.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait::async_trait]
impl DraftStore for MemoryStore {
    async fn create_draft(&self, draft: Draft) -> Result<Draft> {
        self.drafts.write().insert(draft.id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>> {
        Ok(self
            .drafts
            .read()
            .get(id)
            .filter(|d| &d.user_id == user_id)
            .cloned())
    }

    async fn list_drafts(&self, user_id: &Id, filter: &DraftFilter) -> Result<Vec<Draft>> {
        let mut drafts: Vec<Draft> = self
            .drafts
            .read()
            .values()
            .filter(|d| &d.user_id == user_id)
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(drafts)
    }

    async fn update_draft_content(&self, user_id: &Id, id: &Id, content: &str) -> Result<Option<Draft>> {
        let mut drafts = self.drafts.write();
        let Some(draft) = drafts
            .get_mut(id)
            .filter(|d| &d.user_id == user_id && d.status == DraftStatus::Draft)
        else {
            return Ok(None);
        };
        draft.content = content.to_string();
        draft.updated_at = Utc::now();
        Ok(Some(draft.clone()))
    }

    async fn claim_for_publish(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>> {
        // Check and transition under one write lock
        let mut drafts = self.drafts.write();
        let Some(draft) = drafts
            .get_mut(id)
            .filter(|d| &d.user_id == user_id && d.status == DraftStatus::Draft)
        else {
            return Ok(None);
        };
        draft.status = DraftStatus::Publishing;
        draft.updated_at = Utc::now();
        Ok(Some(draft.clone()))
    }

    async fn release_publish(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let mut drafts = self.drafts.write();
        let Some(draft) = drafts
            .get_mut(id)
            .filter(|d| &d.user_id == user_id && d.status == DraftStatus::Publishing)
        else {
            return Ok(false);
        };
        draft.status = DraftStatus::Draft;
        draft.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_posted(
        &self,
        user_id: &Id,
        id: &Id,
        external_tweet_id: Option<String>,
    ) -> Result<Option<Draft>> {
        let mut drafts = self.drafts.write();
        let Some(draft) = drafts
            .get_mut(id)
            .filter(|d| &d.user_id == user_id && d.status == DraftStatus::Publishing)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        draft.status = DraftStatus::Posted;
        draft.external_tweet_id = external_tweet_id;
        draft.posted_at = Some(now);
        draft.updated_at = now;
        Ok(Some(draft.clone()))
    }

    async fn delete_draft(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let mut drafts = self.drafts.write();
        let owned = drafts.get(id).is_some_and(|d| &d.user_id == user_id);
        if owned {
            drafts.remove(id);
        }
        Ok(owned)
    }
}
