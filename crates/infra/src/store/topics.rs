use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use forumhub_core::{Entity, TopicId};
use forumhub_forum::Topic;

use super::{poisoned, Page, PageRequest, StoreError};

/// Topic persistence.
///
/// `insert` and `update` enforce the title+message uniqueness rule
/// atomically and report violations as `Conflict`.
#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn insert(&self, topic: Topic) -> Result<(), StoreError>;

    async fn get(&self, id: TopicId) -> Result<Option<Topic>, StoreError>;

    /// Replace an existing topic; `NotFound` if it does not exist.
    async fn update(&self, topic: Topic) -> Result<(), StoreError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: TopicId) -> Result<bool, StoreError>;

    /// Topics ordered by creation date (oldest first).
    async fn list(&self, page: PageRequest) -> Result<Page<Topic>, StoreError>;

    async fn find_by_course_and_year(
        &self,
        course_name: &str,
        year: i32,
    ) -> Result<Vec<Topic>, StoreError>;
}

/// In-memory topic store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTopicStore {
    inner: RwLock<HashMap<TopicId, Topic>>,
}

impl InMemoryTopicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_conflict() -> StoreError {
    StoreError::Conflict("a topic with the same title and message already exists".to_string())
}

fn sorted(mut topics: Vec<Topic>) -> Vec<Topic> {
    topics.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
    topics
}

#[async_trait]
impl TopicStore for InMemoryTopicStore {
    async fn insert(&self, topic: Topic) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|existing| existing.duplicates(&topic)) {
            return Err(duplicate_conflict());
        }
        map.insert(topic.id(), topic);
        Ok(())
    }

    async fn get(&self, id: TopicId) -> Result<Option<Topic>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn update(&self, topic: Topic) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if !map.contains_key(&topic.id()) {
            return Err(StoreError::NotFound);
        }
        if map.values().any(|existing| existing.duplicates(&topic)) {
            return Err(duplicate_conflict());
        }
        map.insert(topic.id(), topic);
        Ok(())
    }

    async fn delete(&self, id: TopicId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Topic>, StoreError> {
        let all = {
            let map = self.inner.read().map_err(|_| poisoned())?;
            sorted(map.values().cloned().collect())
        };
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn find_by_course_and_year(
        &self,
        course_name: &str,
        year: i32,
    ) -> Result<Vec<Topic>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(sorted(
            map.values()
                .filter(|t| t.is_in_course_year(course_name, year))
                .cloned()
                .collect(),
        ))
    }
}
