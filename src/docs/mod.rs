pub mod extract;
pub mod types;

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use types::ContextExcerpt;

/// Holds each user's current excerpt until they upload another document or clear it.
#[derive(Default)]
pub struct ContextStore {
    excerpts: RwLock<HashMap<u64, ContextExcerpt>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's excerpt, returning the previous one.
    pub async fn replace(&self, user_id: u64, excerpt: ContextExcerpt) -> Option<ContextExcerpt> {
        debug!(user_id, source = %excerpt.source, chars = excerpt.char_count(), "Context replaced");
        self.excerpts.write().await.insert(user_id, excerpt)
    }

    /// Current excerpt, or an empty one when nothing was uploaded.
    pub async fn current(&self, user_id: u64) -> ContextExcerpt {
        self.excerpts
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear(&self, user_id: u64) -> Option<ContextExcerpt> {
        self.excerpts.write().await.remove(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_excerpt_lifecycle() {
        let store = ContextStore::new();
        assert!(store.current(7).await.is_empty());

        store.replace(7, ContextExcerpt::new("a.pdf", "first")).await;
        let prev = store.replace(7, ContextExcerpt::new("b.pdf", "second")).await;
        assert_eq!(prev.unwrap().text, "first");
        assert_eq!(store.current(7).await.text, "second");
        assert!(store.current(8).await.is_empty());

        assert_eq!(store.clear(7).await.unwrap().source, "b.pdf");
        assert!(store.current(7).await.is_empty());
    }
}
