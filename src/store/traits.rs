use crate::model::{Draft, DraftFilter, Id, User};
use anyhow::Result;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with its token digest. Returns `None` if the username is taken.
    async fn create_user(&self, user: User, token_hash: &str) -> Result<Option<User>>;
    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Draft/post persistence. Every call is scoped to the owning user.
#[async_trait::async_trait]
pub trait DraftStore: Send + Sync {
    async fn create_draft(&self, draft: Draft) -> Result<Draft>;
    async fn get_draft(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>>;
    /// Newest first
    async fn list_drafts(&self, user_id: &Id, filter: &DraftFilter) -> Result<Vec<Draft>>;
    /// Replace the content of an unposted draft. Returns `None` if no such draft is still editable.
    async fn update_draft_content(&self, user_id: &Id, id: &Id, content: &str) -> Result<Option<Draft>>;
    /// Atomically move a draft from `draft` to `publishing`.
    /// Returns `None` if it does not exist or is not in the `draft` state.
    async fn claim_for_publish(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>>;
    /// Return a `publishing` draft to `draft` after a failed upstream post
    async fn release_publish(&self, user_id: &Id, id: &Id) -> Result<bool>;
    /// Move a `publishing` draft to `posted`. Returns `None` if it is not being published.
    async fn mark_posted(
        &self,
        user_id: &Id,
        id: &Id,
        external_tweet_id: Option<String>,
    ) -> Result<Option<Draft>>;
    async fn delete_draft(&self, user_id: &Id, id: &Id) -> Result<bool>;
}

pub trait Store: UserStore + DraftStore + Send + Sync {}
impl<T: UserStore + DraftStore + Send + Sync> Store for T {}
