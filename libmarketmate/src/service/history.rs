//! Content history queries

use std::sync::Arc;

use crate::db::Database;
use crate::error::Result;
use crate::types::{ContentPost, ContentStatus, Platform};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Optional narrowing of a user's history
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub platform: Option<Platform>,
    pub status: Option<ContentStatus>,
    pub limit: Option<usize>,
}

#[derive(Clone)]
pub struct HistoryService {
    db: Arc<Database>,
}

impl HistoryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Newest entries first. Filters apply after the limit, as the store only
    /// orders and limits by time.
    pub async fn list(&self, user_id: &str, query: &HistoryQuery) -> Result<Vec<ContentPost>> {
        let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let posts = self.db.content_history(user_id, limit).await?;

        Ok(posts
            .into_iter()
            .filter(|p| query.platform.map_or(true, |platform| p.platform == platform))
            .filter(|p| query.status.map_or(true, |status| p.status == status))
            .collect())
    }

    pub async fn get(&self, history_id: &str) -> Result<Option<ContentPost>> {
        self.db.get_content_post(history_id).await
    }
}
