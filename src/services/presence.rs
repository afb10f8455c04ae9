use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::core::ports::PresenceService;

/// Process-local presence table
///
/// Clients report themselves online through `set_online`; the feed reads it
/// back through `PresenceService`.
#[derive(Debug, Default)]
pub struct InMemoryPresence {
    online: RwLock<HashSet<String>>,
}

impl InMemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, user_id: &str, online: bool) {
        let mut set = self.online.write().unwrap_or_else(PoisonError::into_inner);
        if online {
            set.insert(user_id.to_string());
        } else {
            set.remove(user_id);
        }
    }

    pub fn online_count(&self) -> usize {
        self.online.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl PresenceService for InMemoryPresence {
    async fn prefetch_online_status(&self, user_ids: &[String]) {
        let online = self.online.read().unwrap_or_else(PoisonError::into_inner);
        let count = user_ids.iter().filter(|id| online.contains(*id)).count();
        tracing::trace!("Presence prefetch: {}/{} online", count, user_ids.len());
    }

    fn is_online(&self, user_id: &str) -> bool {
        self.online
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_presence_toggle() {
        let presence = InMemoryPresence::new();
        presence.set_online("a", true);
        presence.set_online("b", true);
        presence.set_online("b", false);

        presence.prefetch_online_status(&["a".to_string(), "b".to_string()]).await;

        assert!(presence.is_online("a"));
        assert!(!presence.is_online("b"));
        assert_eq!(presence.online_count(), 1);
    }
}
